pub mod baseline_error;
pub mod source_error;

pub use baseline_error::BaselineError;
pub use source_error::SourceError;
