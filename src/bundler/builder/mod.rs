//! Build orchestration and coordination.
//!
//! This module provides the [`Packager`] that turns a
//! [`PackageSpec`](crate::bundler::PackageSpec) into an installer package.
//!
//! # Overview
//!
//! The packager:
//! 1. Validates the spec and checks every declared input and tool
//! 2. Stages the payload and assembles lifecycle scripts
//! 3. Builds the component package, then the distribution if requested
//! 4. Signs when an identity is configured
//! 5. Delivers the artifact and returns a [`BundledArtifact`](crate::bundler::BundledArtifact)
//!
//! # Module Organization
//!
//! - [`checksum`] - SHA256 checksum calculation for artifacts
//! - [`orchestrator`] - [`Packager`] and its [`BuildStage`]s
//! - [`tool_detection`] - External tool availability checking

pub mod checksum;
pub mod orchestrator;
pub mod tool_detection;

pub use orchestrator::{BuildStage, Packager};
