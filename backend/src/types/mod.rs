mod environment;
mod error;
mod extractors;

pub use environment::Environment;
pub use error::{ApiErrorResponse, AppError};
pub use extractors::{ValidatedJson, VideoIdPath};
