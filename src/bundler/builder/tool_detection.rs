//! External tool availability checking.
//!
//! Runs before any file is staged so a missing `pkgbuild` or `productsign`
//! is reported with a plain "not found" instead of a spawn error halfway
//! through the build.

use crate::bundler::{
    error::{Error, Result},
    settings::{PackageSpec, Toolchain},
};
use std::path::{Path, PathBuf};

/// Resolves `tool` to an executable, searching `PATH` for bare names.
pub fn locate(tool: &Path) -> Option<PathBuf> {
    match which::which(tool) {
        Ok(path) => {
            log::debug!("Found {} at: {}", tool.display(), path.display());
            Some(path)
        }
        Err(e) => {
            log::debug!("{} not found: {}", tool.display(), e);
            None
        }
    }
}

/// Checks that every tool `spec` will invoke is executable.
///
/// # Errors
///
/// - [`Error::BuildTool`] for a missing `pkgbuild` or `productbuild`
/// - [`Error::Sign`] for a missing `productsign` or `security`, only when
///   the spec carries a signing identity
pub fn check_tools(spec: &PackageSpec, toolchain: &Toolchain) -> Result<()> {
    let mut build_tools = vec![("pkgbuild", &toolchain.pkgbuild)];
    if spec.as_distribution {
        build_tools.push(("productbuild", &toolchain.productbuild));
    }
    for (name, path) in build_tools {
        if locate(path).is_none() {
            return Err(Error::BuildTool {
                tool: name.to_string(),
                diagnostic: format!("{} not found", path.display()),
            });
        }
    }

    if spec.signing_identity.is_some() {
        for path in [&toolchain.security, &toolchain.productsign] {
            if locate(path).is_none() {
                return Err(Error::Sign(format!("{} not found", path.display())));
            }
        }
    }

    Ok(())
}
