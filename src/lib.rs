//! macOS installer package builder library
//!
//! Assembles flat component packages and distribution installers from a
//! declarative [`bundler::PackageSpec`], driving `pkgbuild`, `productbuild`
//! and `productsign`.
//!
//! It can be used both as a CLI tool and as a library dependency.

pub mod bundler;
pub mod cli;
pub mod error;
pub mod manifest;

// Re-export commonly used types
pub use error::{BundlerError, CliError, Result};
