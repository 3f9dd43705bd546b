//! Builder for constructing a [`PackageSpec`].

use super::{ComponentRef, FileMapping, Markdown, PackageSpec, ScriptKind};
use std::path::{Path, PathBuf};

/// Builder for constructing [`PackageSpec`].
///
/// Provides a fluent API; [`build`](Self::build) runs the same validation
/// as [`PackageSpec::validate`].
///
/// # Examples
///
/// ```no_run
/// use kodegen_bundler_pkg::bundler::PackageSpecBuilder;
///
/// # fn example() -> kodegen_bundler_pkg::bundler::Result<()> {
/// let spec = PackageSpecBuilder::new("build/MyApp.pkg", "com.example.myapp")
///     .version("2.1.0")
///     .file("build/MyApp.app", "/Applications/MyApp.app")
///     .postinstall("scripts/postinstall.sh")
///     .as_distribution(true)
///     .title("My App")
///     .welcome("# Welcome\n\nThis installs **My App**.")
///     .background("assets/background.png")
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct PackageSpecBuilder {
    spec: PackageSpec,
}

impl PackageSpecBuilder {
    /// Starts a spec for `identifier`, written to `output`.
    pub fn new(output: impl AsRef<Path>, identifier: impl Into<String>) -> Self {
        Self {
            spec: PackageSpec::new(output.as_ref(), identifier),
        }
    }

    /// Sets the package version. Default: `1.0.0`
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.spec.version = version.into();
        self
    }

    /// Sets the install location. Default: `/`
    pub fn install_location(mut self, location: impl Into<String>) -> Self {
        self.spec.install_location = location.into();
        self
    }

    /// Sets whether a bundle payload may be relocated. Default: true
    pub fn allow_relocation(mut self, allow: bool) -> Self {
        self.spec.allow_relocation = allow;
        self
    }

    /// Appends a payload entry. Order is preserved.
    pub fn file(mut self, source: impl AsRef<Path>, destination: impl AsRef<Path>) -> Self {
        self.spec
            .files
            .push(FileMapping::new(source.as_ref(), destination.as_ref()));
        self
    }

    /// Sets the script for a lifecycle hook.
    pub fn script(mut self, kind: ScriptKind, path: impl AsRef<Path>) -> Self {
        self.spec.scripts.set(kind, path.as_ref().to_path_buf());
        self
    }

    /// Sets the `preinstall` script.
    pub fn preinstall(self, path: impl AsRef<Path>) -> Self {
        self.script(ScriptKind::Preinstall, path)
    }

    /// Sets the `postinstall` script.
    pub fn postinstall(self, path: impl AsRef<Path>) -> Self {
        self.script(ScriptKind::Postinstall, path)
    }

    /// Sets the `preflight` script.
    pub fn preflight(self, path: impl AsRef<Path>) -> Self {
        self.script(ScriptKind::Preflight, path)
    }

    /// Sets the `postflight` script.
    pub fn postflight(self, path: impl AsRef<Path>) -> Self {
        self.script(ScriptKind::Postflight, path)
    }

    /// Adds a file or directory shipped next to the scripts.
    pub fn script_resource(mut self, path: impl AsRef<Path>) -> Self {
        self.spec.script_resources.push(path.as_ref().to_path_buf());
        self
    }

    /// Signs the artifact with `identity`.
    pub fn signing_identity(mut self, identity: impl Into<String>) -> Self {
        self.spec.signing_identity = Some(identity.into());
        self
    }

    /// Builds a distribution instead of a flat package.
    pub fn as_distribution(mut self, enabled: bool) -> Self {
        self.spec.as_distribution = enabled;
        self
    }

    /// Sets the installer title. Distribution only.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.spec.distribution.title = Some(title.into());
        self
    }

    /// Sets the welcome page. Distribution only.
    pub fn welcome(mut self, markdown: impl Into<Markdown>) -> Self {
        self.spec.distribution.welcome = Some(markdown.into());
        self
    }

    /// Sets the read-me page. Distribution only.
    pub fn readme(mut self, markdown: impl Into<Markdown>) -> Self {
        self.spec.distribution.readme = Some(markdown.into());
        self
    }

    /// Sets the license page. Distribution only.
    pub fn license(mut self, markdown: impl Into<Markdown>) -> Self {
        self.spec.distribution.license = Some(markdown.into());
        self
    }

    /// Sets the light-appearance background image. Distribution only.
    pub fn background(mut self, path: impl AsRef<Path>) -> Self {
        self.spec.distribution.background = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the dark-appearance background image. Distribution only.
    pub fn background_dark(mut self, path: impl AsRef<Path>) -> Self {
        self.spec.distribution.background_dark = Some(path.as_ref().to_path_buf());
        self
    }

    /// Appends a prebuilt component package. Distribution only.
    pub fn component_package(
        mut self,
        path: impl Into<PathBuf>,
        identifier: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        self.spec.distribution.packages.push(ComponentRef {
            path: path.into(),
            identifier: identifier.into(),
            version: version.into(),
            install_location: None,
        });
        self
    }

    /// Validates and returns the spec.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`](crate::bundler::Error::Configuration)
    /// when the spec breaks an invariant.
    pub fn build(self) -> crate::bundler::Result<PackageSpec> {
        self.spec.validate()?;
        Ok(self.spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::error::ErrorKind;

    #[test]
    fn builds_flat_spec_with_defaults() {
        let spec = PackageSpecBuilder::new("A.pkg", "com.x.a")
            .file("App.app", "/Applications/App.app")
            .build()
            .unwrap();

        assert_eq!(spec.version, "1.0.0");
        assert_eq!(spec.files.len(), 1);
        assert!(spec.scripts.is_empty());
    }

    #[test]
    fn preserves_file_order() {
        let spec = PackageSpecBuilder::new("A.pkg", "com.x.a")
            .file("c", "/c")
            .file("a", "/a")
            .file("b", "/b")
            .build()
            .unwrap();

        let order: Vec<_> = spec.files.iter().map(|f| f.source.clone()).collect();
        assert_eq!(order, [PathBuf::from("c"), "a".into(), "b".into()]);
    }

    #[test]
    fn rejects_gui_metadata_on_flat_package() {
        let err = PackageSpecBuilder::new("A.pkg", "com.x.a")
            .preinstall("pre.sh")
            .license("MIT")
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn rejects_empty_spec() {
        let err = PackageSpecBuilder::new("A.pkg", "com.x.a").build().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }
}
