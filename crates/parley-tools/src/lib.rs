//! Tools for Parley.
//!
//! Defines the [`Tool`] contract, the [`ToolRegistry`] that dispatches
//! execution by name, and the built-in tools the chat engine can trigger.

pub mod builtin;
pub mod error;
pub mod registry;
pub mod tool;

pub use error::ToolError;
pub use registry::ToolRegistry;
pub use tool::Tool;
