//! Command-line argument parsing and handling.

pub mod definition;
pub mod targets;

// Re-export commonly used items
pub use definition::Args;
pub use targets::gather;
