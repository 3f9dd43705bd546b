//! Locations of the native packaging tools and build-wide policies.

use std::path::{Path, PathBuf};

/// Default location of `pkgbuild`.
pub const PKGBUILD: &str = "/usr/bin/pkgbuild";
/// Default location of `productbuild`.
pub const PRODUCTBUILD: &str = "/usr/bin/productbuild";
/// Default location of `productsign`.
pub const PRODUCTSIGN: &str = "/usr/bin/productsign";
/// Default location of `security`.
pub const SECURITY: &str = "/usr/bin/security";

/// Native tools the pipeline drives, plus where temporary state lives.
///
/// # Environment overrides
///
/// [`Toolchain::from_env`] honours `PKGBUILD`, `PRODUCTBUILD`, `PRODUCTSIGN`
/// and `SECURITY`, each naming an alternative executable.
#[derive(Clone, Debug)]
pub struct Toolchain {
    /// Component package builder.
    pub pkgbuild: PathBuf,
    /// Distribution composer.
    pub productbuild: PathBuf,
    /// Package signer.
    pub productsign: PathBuf,
    /// Keychain query tool used to verify signing identities.
    pub security: PathBuf,
    /// Parent directory for staging areas. Default: the system temp dir.
    pub temp_root: Option<PathBuf>,
    /// Fail the build when signing fails.
    ///
    /// When false, a signing failure is logged and the unsigned artifact is
    /// delivered. Default: true
    pub require_signature: bool,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            pkgbuild: PathBuf::from(PKGBUILD),
            productbuild: PathBuf::from(PRODUCTBUILD),
            productsign: PathBuf::from(PRODUCTSIGN),
            security: PathBuf::from(SECURITY),
            temp_root: None,
            require_signature: true,
        }
    }
}

impl Toolchain {
    /// System tool locations with environment overrides applied.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var_os(key).map(PathBuf::from))
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<PathBuf>) -> Self {
        let defaults = Self::default();
        Self {
            pkgbuild: lookup("PKGBUILD").unwrap_or(defaults.pkgbuild),
            productbuild: lookup("PRODUCTBUILD").unwrap_or(defaults.productbuild),
            productsign: lookup("PRODUCTSIGN").unwrap_or(defaults.productsign),
            security: lookup("SECURITY").unwrap_or(defaults.security),
            ..defaults
        }
    }

    /// Sets the directory staging areas are created under.
    pub fn temp_root(mut self, dir: impl AsRef<Path>) -> Self {
        self.temp_root = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Sets whether a signing failure fails the build.
    pub fn require_signature(mut self, required: bool) -> Self {
        self.require_signature = required;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_point_at_system_tools() {
        let tools = Toolchain::default();
        assert_eq!(tools.pkgbuild, Path::new("/usr/bin/pkgbuild"));
        assert_eq!(tools.productsign, Path::new("/usr/bin/productsign"));
        assert!(tools.require_signature);
        assert!(tools.temp_root.is_none());
    }

    #[test]
    fn lookup_overrides_individual_tools() {
        let env = HashMap::from([("PKGBUILD", "/opt/fake/pkgbuild")]);
        let tools = Toolchain::from_lookup(|k| env.get(k).map(PathBuf::from));
        assert_eq!(tools.pkgbuild, Path::new("/opt/fake/pkgbuild"));
        assert_eq!(tools.productbuild, Path::new(PRODUCTBUILD));
    }
}
