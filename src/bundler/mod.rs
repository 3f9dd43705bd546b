//! macOS installer package assembly.
//!
//! This module turns a declarative [`PackageSpec`] into a flat component
//! package or a distribution-style installer by driving the native
//! `pkgbuild`, `productbuild` and `productsign` tools.
//!
//! # Configuration
//!
//! Packages are described programmatically with [`PackageSpecBuilder`] or in
//! a TOML manifest (see [`crate::manifest`]):
//!
//! ```toml
//! output = "dist/MyApp.pkg"
//! identifier = "com.example.myapp"
//! version = "1.2.0"
//!
//! [[files]]
//! source = "build/MyApp.app"
//! destination = "/Applications/MyApp.app"
//!
//! [scripts]
//! postinstall = "scripts/postinstall.sh"
//! ```
//!
//! # Package Kinds
//!
//! | Kind | Tools | Notes |
//! |------|-------|-------|
//! | [`PackageType::Flat`] | `pkgbuild` | Payload and scripts only |
//! | [`PackageType::Distribution`] | `pkgbuild`, `productbuild` | Title, pages, backgrounds, extra packages |
//!
//! Either kind is signed with `productsign` when a signing identity is set.
//!
//! # Example
//!
//! ```no_run
//! use kodegen_bundler_pkg::bundler::{Packager, PackageSpecBuilder};
//!
//! # async fn example() -> kodegen_bundler_pkg::bundler::Result<()> {
//! let spec = PackageSpecBuilder::new("A.pkg", "com.x.a")
//!     .file("App.app", "/Applications/App.app")
//!     .build()?;
//!
//! let result = Packager::new(spec)?.run().await;
//! if !result.success() {
//!     eprintln!("{}", result.diagnostic().unwrap_or_default());
//! }
//! # Ok(())
//! # }
//! ```

mod builder;
mod error;
pub(crate) mod platform;
mod settings;
mod utils;

// Public re-exports
pub use builder::{BuildStage, Packager};
pub use error::{Context, Error, ErrorExt, ErrorKind, ResourceKind, Result};
pub use platform::PackageType;
pub use platform::macos::pkg::{
    BackgroundImage, Backgrounds, ChoiceEntry, CommonMark, ComponentPackage, DEFAULT_TITLE,
    DistributionDescriptor, MarkdownRenderer, Page, PageKind, StagingArea, assemble_scripts,
    build_component, build_descriptor, build_distribution, components_for, stage,
};
pub use platform::macos::sign::sign_package;
pub use settings::{
    ComponentRef, DEFAULT_INSTALL_LOCATION, DEFAULT_VERSION, DistributionSettings, FileMapping,
    LifecycleScripts, Markdown, PackageSpec, PackageSpecBuilder, ScriptKind, Toolchain,
};

use serde::Serialize;
use std::path::PathBuf;

/// Metadata about a delivered installer package.
///
/// Returned by [`Packager::build`] after the artifact has been written to
/// the spec's output path.
///
/// # Examples
///
/// ```no_run
/// use kodegen_bundler_pkg::bundler::{Packager, PackageSpec};
///
/// # async fn example(spec: PackageSpec) -> kodegen_bundler_pkg::bundler::Result<()> {
/// let artifact = Packager::new(spec)?.build().await?;
/// println!("Created {} package: {} bytes", artifact.package_type, artifact.size);
/// println!("SHA256: {}", artifact.checksum);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct BundledArtifact {
    /// Flat component package or distribution.
    pub package_type: PackageType,

    /// Location of the delivered artifact (the spec's output path).
    pub path: PathBuf,

    /// Size of the artifact in bytes.
    pub size: u64,

    /// SHA-256 checksum of the artifact.
    pub checksum: String,

    /// Whether the delivered artifact carries a signature.
    pub signed: bool,
}

/// Outcome of one build: success with the artifact, or the failure with a
/// diagnostic for the operator.
#[derive(Debug)]
pub struct BuildResult {
    result: Result<BundledArtifact>,
}

impl BuildResult {
    /// True when the artifact was delivered.
    pub fn success(&self) -> bool {
        self.result.is_ok()
    }

    /// The delivered artifact, if any.
    pub fn artifact(&self) -> Option<&BundledArtifact> {
        self.result.as_ref().ok()
    }

    /// The failure, if any.
    pub fn error(&self) -> Option<&Error> {
        self.result.as_ref().err()
    }

    /// Human-readable description of the failure, including any captured
    /// tool output.
    pub fn diagnostic(&self) -> Option<String> {
        self.error().map(ToString::to_string)
    }

    /// Converts back into a plain `Result`.
    pub fn into_result(self) -> Result<BundledArtifact> {
        self.result
    }
}

impl From<Result<BundledArtifact>> for BuildResult {
    fn from(result: Result<BundledArtifact>) -> Self {
        Self { result }
    }
}
