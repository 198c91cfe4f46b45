pub mod error;
pub mod pipeline;
pub mod types;
pub mod verdict;

pub use error::AnalysisError;
pub use pipeline::analyze;
pub use types::{AnalysisRequest, AnalysisResult};
