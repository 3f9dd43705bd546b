//! macOS installer packaging.
//!
//! # Build Requirements
//!
//! | Step | Tool | Notes |
//! |------|------|-------|
//! | Component package | `pkgbuild` | Xcode Command Line Tools |
//! | Distribution | `productbuild` | Xcode Command Line Tools |
//! | Signing | `productsign`, `security` | Developer ID Installer identity |
//!
//! Tool locations come from [`Toolchain`](crate::bundler::Toolchain).

pub mod pkg;
pub mod sign;
