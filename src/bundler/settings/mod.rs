//! Configuration structures for package assembly.
//!
//! [`PackageSpec`] declares what goes into the installer; [`Toolchain`]
//! declares which native tools build it and where temporary state lives.

mod builder;
mod package;
mod toolchain;

pub use builder::PackageSpecBuilder;
pub use package::{
    ComponentRef, DEFAULT_INSTALL_LOCATION, DEFAULT_VERSION, DistributionSettings, FileMapping,
    LifecycleScripts, Markdown, PackageSpec, ScriptKind,
};
pub use toolchain::Toolchain;
