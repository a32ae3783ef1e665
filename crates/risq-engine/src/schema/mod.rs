pub mod company;
pub mod prediction;

pub use company::{CompanyFinancialRecord, FeatureVector, Ratios};
pub use prediction::*;
