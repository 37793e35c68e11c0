pub mod model;
pub mod source;

pub use model::ToolCall;
pub use source::{JsonlFileSource, ToolCallSource};
