//! Command line argument parsing and validation.
//!
//! This module provides CLI argument parsing using clap, with validation of
//! the combinations clap cannot express.

use crate::bundler::PackageSpec;
use clap::Parser;
use std::path::PathBuf;

/// macOS installer package builder
#[derive(Parser, Debug)]
#[command(
    name = "kodegen_bundler_pkg",
    version,
    about = "macOS installer package builder",
    long_about = "Builds a flat component package or a distribution installer from a TOML manifest
using pkgbuild, productbuild and productsign.

Usage:
  kodegen_bundler_pkg --manifest pkg.toml
  kodegen_bundler_pkg -m pkg.toml --output dist/MyApp.pkg --distribution
  kodegen_bundler_pkg -m pkg.toml --sign \"Developer ID Installer: Example (TEAMID)\"

Exit code 0 = artifact guaranteed to exist at output path."
)]
pub struct Args {
    /// Package manifest (TOML)
    #[arg(short = 'm', long, value_name = "PATH", default_value = "pkg.toml")]
    pub manifest: PathBuf,

    /// Output path for the created package, overriding the manifest
    ///
    /// Parent directories are created if they don't exist. An existing file
    /// is replaced only once the new package is complete.
    #[arg(short = 'o', long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Sign with this installer identity, overriding the manifest
    #[arg(long, value_name = "IDENTITY", env = "PKG_SIGNING_IDENTITY")]
    pub sign: Option<String>,

    /// Build a distribution installer even without a [distribution] table
    #[arg(long)]
    pub distribution: bool,

    /// Deliver an unsigned package when signing fails
    #[arg(long)]
    pub allow_unsigned: bool,

    /// Print the artifact report as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Enable verbose output
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only print errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> Result<(), String> {
        if self.manifest.as_os_str().is_empty() {
            return Err("Manifest path cannot be empty".to_string());
        }

        if let Some(output) = &self.output
            && output.file_name().is_none()
        {
            return Err(format!(
                "Output path must name a file: {}",
                output.display()
            ));
        }

        if let Some(identity) = &self.sign
            && identity.trim().is_empty()
        {
            return Err("Signing identity cannot be empty".to_string());
        }

        Ok(())
    }

    /// Apply command line overrides to a spec loaded from the manifest.
    pub fn apply_overrides(&self, spec: &mut PackageSpec) {
        if let Some(output) = &self.output {
            spec.output = output.clone();
        }
        if let Some(identity) = &self.sign {
            spec.signing_identity = Some(identity.clone());
        }
        if self.distribution {
            spec.as_distribution = true;
        }
    }
}

/// Configuration derived from command line arguments
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Output manager for colored terminal output
    output: super::OutputManager,
    json: bool,
}

impl From<&Args> for RuntimeConfig {
    fn from(args: &Args) -> Self {
        // JSON reports own stdout
        let output = super::OutputManager::new(args.verbose, args.quiet || args.json);

        Self {
            output,
            json: args.json,
        }
    }
}

impl RuntimeConfig {
    /// Get a reference to the output manager
    pub fn output(&self) -> &super::OutputManager {
        &self.output
    }

    /// Whether the artifact report is printed as JSON
    pub fn json(&self) -> bool {
        self.json
    }

    /// Print verbose message if in verbose mode
    pub fn verbose_println(&self, message: &str) -> std::io::Result<()> {
        self.output.verbose(message)
    }

    /// Print warning message if not in quiet mode
    pub fn warn(&self, message: &str) -> std::io::Result<()> {
        self.output.warn(message)
    }

    /// Print progress message
    pub fn progress(&self, message: &str) -> std::io::Result<()> {
        self.output.progress(message)
    }

    /// Print error message (always shown)
    pub fn error_println(&self, message: &str) {
        self.output.error(message)
    }
}
