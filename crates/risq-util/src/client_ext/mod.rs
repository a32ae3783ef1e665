pub mod util;

pub use reqwest::Client;
