mod format;

pub use format::{ErrorLine, StructuredLogger};
