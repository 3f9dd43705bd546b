//! Shared helpers: file system operations and external tool invocation.

pub mod fs;
pub mod process;
