//! Error types for package assembly.
//!
//! Provides contextual error chaining, filesystem errors carrying the failing
//! path, and one variant per failure category of the pipeline:
//!
//! | Kind | Raised when |
//! |------|-------------|
//! | [`ErrorKind::Configuration`] | the [`PackageSpec`](crate::bundler::PackageSpec) is invalid or contradictory |
//! | [`ErrorKind::MissingResource`] | a declared source, script, image or markdown file does not exist |
//! | [`ErrorKind::Staging`] | copying the payload into the staging area fails |
//! | [`ErrorKind::BuildTool`] | `pkgbuild` or `productbuild` exits non-zero |
//! | [`ErrorKind::Signing`] | `productsign` (or the identity lookup) fails |
//!
//! # Example
//!
//! ```no_run
//! use kodegen_bundler_pkg::bundler::{ErrorKind, Packager, PackageSpec};
//!
//! # async fn example(spec: PackageSpec) {
//! let packager = Packager::new(spec).expect("valid spec");
//! if let Err(err) = packager.build().await {
//!     if err.kind() == ErrorKind::Signing {
//!         eprintln!("package built but could not be signed: {err}");
//!     }
//! }
//! # }
//! ```

use std::{
    fmt::{self, Display},
    io,
    path::{self, PathBuf},
};
use thiserror::Error as DeriveError;

/// Errors returned by the package assembly pipeline.
#[derive(Debug, DeriveError)]
#[non_exhaustive]
pub enum Error {
    /// Error with context. Created by the [`Context`] trait.
    #[error("{0}: {1}")]
    Context(String, Box<Self>),

    /// File system error with path context.
    ///
    /// Created by the [`ErrorExt`] trait's `fs_context` method.
    #[error("{context} {path}: {error}")]
    Fs {
        /// Context describing the operation (e.g., "writing descriptor")
        context: &'static str,
        /// Path that was being accessed
        path: PathBuf,
        /// The underlying I/O error
        error: io::Error,
    },

    /// The package specification is invalid or contradictory.
    #[error("invalid package configuration: {0}")]
    Configuration(String),

    /// A declared input does not exist on disk.
    #[error("{kind} not found: {}", path.display())]
    MissingResource {
        /// What the missing path was declared as
        kind: ResourceKind,
        /// The declared path
        path: PathBuf,
    },

    /// Copy or permission failure while materializing the payload.
    #[error("staging failed while {context} {}: {error}", path.display())]
    Staging {
        /// Operation in progress (e.g., "copying")
        context: &'static str,
        /// Path being written or read
        path: PathBuf,
        /// The underlying I/O error
        error: io::Error,
    },

    /// A native build tool exited non-zero or could not be launched.
    #[error("{tool} failed\n{diagnostic}")]
    BuildTool {
        /// Tool name (`pkgbuild`, `productbuild`)
        tool: String,
        /// Captured tool output, verbatim
        diagnostic: String,
    },

    /// Signing the artifact failed.
    #[error("failed to sign package: {0}")]
    Sign(String),

    /// Generic I/O error.
    #[error("{0}")]
    IoError(#[from] io::Error),

    /// Error walking a directory tree.
    #[error("{0}")]
    WalkdirError(#[from] walkdir::Error),

    /// Path prefix stripping error.
    #[error("{0}")]
    StripError(#[from] path::StripPrefixError),

    /// Handlebars template rendering error.
    #[error("{0}")]
    HandleBarsError(#[from] handlebars::RenderError),

    /// Handlebars template parsing error.
    #[error("{0}")]
    Template(#[from] handlebars::TemplateError),

    /// Property list writing error.
    #[error("{0}")]
    Plist(#[from] plist::Error),

    /// Manifest parsing error.
    #[error("invalid manifest: {0}")]
    Toml(#[from] toml::de::Error),

    /// Generic error with custom message.
    #[error("{0}")]
    GenericError(String),
}

/// Failure category of an [`Error`], independent of any context wrapping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid or contradictory package specification.
    Configuration,
    /// A declared input file does not exist.
    MissingResource,
    /// Payload materialization failed.
    Staging,
    /// `pkgbuild` or `productbuild` failed.
    BuildTool,
    /// Signing failed.
    Signing,
    /// Anything else (I/O outside staging, template errors, ...).
    Other,
}

/// The role a missing path was declared with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceKind {
    /// An entry of the file mapping.
    Source,
    /// A lifecycle script.
    Script,
    /// An auxiliary file shipped next to the scripts.
    ScriptResource,
    /// A distribution background image.
    Background,
    /// A markdown page source file.
    Markdown,
    /// A prebuilt component package referenced by a distribution.
    ComponentPackage,
}

impl Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Source => "source file",
            Self::Script => "script",
            Self::ScriptResource => "script resource",
            Self::Background => "background image",
            Self::Markdown => "markdown file",
            Self::ComponentPackage => "component package",
        })
    }
}

impl Error {
    /// Returns the failure category, looking through [`Error::Context`] layers.
    pub fn kind(&self) -> ErrorKind {
        match self.root_cause() {
            Self::Configuration(_) | Self::Toml(_) => ErrorKind::Configuration,
            Self::MissingResource { .. } => ErrorKind::MissingResource,
            Self::Staging { .. } => ErrorKind::Staging,
            Self::BuildTool { .. } => ErrorKind::BuildTool,
            Self::Sign(_) => ErrorKind::Signing,
            _ => ErrorKind::Other,
        }
    }

    /// Returns the innermost error under any context layers.
    pub fn root_cause(&self) -> &Self {
        let mut current = self;
        while let Self::Context(_, inner) = current {
            current = inner;
        }
        current
    }
}

/// Convenient type alias for Result.
pub type Result<T> = std::result::Result<T, Error>;

/// Trait for adding context to errors.
///
/// Similar to `anyhow::Context` but integrated with the bundler's Error type.
/// Works with both `Result<T, E>` and `Option<T>`.
pub trait Context<T> {
    /// Add context to an error.
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static;

    /// Add context to an error using a closure (lazy evaluation).
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T> Context<T> for Result<T> {
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
    {
        self.map_err(|e| Error::Context(context.to_string(), Box::new(e)))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.map_err(|e| Error::Context(f().to_string(), Box::new(e)))
    }
}

impl<T> Context<T> for Option<T> {
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
    {
        self.ok_or_else(|| Error::GenericError(context.to_string()))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.ok_or_else(|| Error::GenericError(f().to_string()))
    }
}

/// Extension trait for filesystem operations with automatic path context.
///
/// ```no_run
/// # use std::path::Path;
/// # use kodegen_bundler_pkg::bundler::{ErrorExt, Result};
/// fn create_resources_dir(path: &Path) -> Result<()> {
///     std::fs::create_dir_all(path).fs_context("creating resources directory", path)?;
///     Ok(())
/// }
/// ```
pub trait ErrorExt<T> {
    /// Add filesystem context to an I/O error.
    ///
    /// The `context` should be a present-tense verb phrase describing the operation,
    /// e.g., "reading file", "creating directory".
    fn fs_context(self, context: &'static str, path: impl Into<PathBuf>) -> Result<T>;

    /// Classify an I/O error as a staging failure for `path`.
    fn staging_context(self, context: &'static str, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> ErrorExt<T> for std::result::Result<T, io::Error> {
    fn fs_context(self, context: &'static str, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|error| Error::Fs {
            context,
            path: path.into(),
            error,
        })
    }

    fn staging_context(self, context: &'static str, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|error| Error::Staging {
            context,
            path: path.into(),
            error,
        })
    }
}

/// Macro for early return with error.
///
/// Converts the message into a [`Error::GenericError`] and returns immediately.
///
/// ```ignore
/// bail!("operation failed");
/// bail!("invalid value: {}", value);
/// ```
#[macro_export]
macro_rules! bail {
    ($msg:literal $(,)?) => {
        return Err($crate::bundler::Error::GenericError($msg.into()))
    };
    ($err:expr $(,)?) => {
        return Err($crate::bundler::Error::GenericError($err.to_string()))
    };
    ($fmt:expr, $($arg:tt)*) => {
        return Err($crate::bundler::Error::GenericError(format!($fmt, $($arg)*)))
    };
}
