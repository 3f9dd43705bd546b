//! macOS installer package (`.pkg`) assembly.
//!
//! The stages, leaf first:
//! - `staging` - ephemeral working tree and payload materialization
//! - `scripts` - lifecycle scripts and their resources
//! - `component` - flat component package via `pkgbuild`
//! - `descriptor` - distribution document with pages and backgrounds
//! - `distribution` - product archive via `productbuild`
//!
//! [`Packager`](crate::bundler::Packager) sequences them.

pub mod component;
pub mod descriptor;
pub mod distribution;
pub mod markdown;
pub mod scripts;
pub mod staging;
mod template;

pub use component::{ComponentPackage, build_component};
pub use descriptor::{
    BackgroundImage, Backgrounds, ChoiceEntry, DEFAULT_TITLE, DistributionDescriptor, Page,
    PageKind, build_descriptor,
};
pub use distribution::{build_distribution, components_for};
pub use markdown::{CommonMark, MarkdownRenderer};
pub use scripts::assemble_scripts;
pub use staging::{StagingArea, stage};
