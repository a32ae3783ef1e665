pub mod fmp;

pub use fmp::Fmp;
