//! Platform-specific packaging implementations.
//!
//! Only macOS installer packages are produced. The pipeline itself builds on
//! any Unix host because every native tool is reached through a configurable
//! [`Toolchain`](crate::bundler::Toolchain) path; on other hosts the default
//! tool paths simply do not exist and the build fails with a "not found"
//! diagnostic.

pub mod macos;

use serde::Serialize;
use std::fmt;

/// Kinds of installer package the pipeline produces.
///
/// # Examples
///
/// ```no_run
/// use kodegen_bundler_pkg::bundler::PackageType;
///
/// for kind in [PackageType::Flat, PackageType::Distribution] {
///     println!("{kind}: priority {}", kind.priority());
/// }
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum PackageType {
    /// Flat component package built by `pkgbuild`.
    Flat,

    /// Distribution (product archive) composed by `productbuild`.
    ///
    /// Requires the [`Flat`](Self::Flat) component to be built first.
    Distribution,
}

impl PackageType {
    /// Returns the short name used in CLI output.
    pub fn short_name(&self) -> &'static str {
        match self {
            PackageType::Flat => "flat",
            PackageType::Distribution => "distribution",
        }
    }

    /// Returns the build order. Lower numbers are built first.
    pub fn priority(&self) -> u32 {
        match self {
            PackageType::Flat => 0,
            PackageType::Distribution => 1, // wraps the flat component
        }
    }
}

impl fmt::Display for PackageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short_name())
    }
}
