pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod normalize;
pub mod pipeline;
pub mod schema;
pub mod source;
pub mod store;

pub use error::{PipelineFailure, SourceError, StoreError};
pub use pipeline::Pipeline;
