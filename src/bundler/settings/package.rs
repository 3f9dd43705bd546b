//! Package specification: what goes into the installer and how it is built.

use crate::bundler::error::{Error, ResourceKind, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::ffi::OsStr;
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Default package version when none is declared.
pub const DEFAULT_VERSION: &str = "1.0.0";

/// Default install location.
pub const DEFAULT_INSTALL_LOCATION: &str = "/";

fn default_version() -> String {
    DEFAULT_VERSION.to_string()
}

fn default_install_location() -> String {
    DEFAULT_INSTALL_LOCATION.to_string()
}

fn default_true() -> bool {
    true
}

/// One entry of the payload: a file or directory on disk and where it installs.
///
/// Directory sources are copied recursively; the kind is detected from the
/// source, never from the destination.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileMapping {
    /// File or directory to package.
    pub source: PathBuf,
    /// Absolute install path, e.g. `/Applications/MyApp.app`.
    pub destination: PathBuf,
}

impl FileMapping {
    /// Creates a mapping from `source` to `destination`.
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
        }
    }

    /// Destination relative to the payload root (`/Applications/A.app` → `Applications/A.app`).
    pub fn root_relative_destination(&self) -> PathBuf {
        self.destination
            .components()
            .filter(|c| matches!(c, Component::Normal(_)))
            .collect()
    }

    /// Whether the source is a self-contained bundle (`Contents/Info.plist` present).
    pub fn is_bundle(&self) -> bool {
        self.source.join("Contents").join("Info.plist").is_file()
    }
}

/// Installer lifecycle hooks understood by `pkgbuild`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScriptKind {
    /// Runs before the payload is laid down.
    Preinstall,
    /// Runs after the payload is laid down.
    Postinstall,
    /// Legacy bundle-style hook run before installation.
    Preflight,
    /// Legacy bundle-style hook run after installation.
    Postflight,
}

impl ScriptKind {
    /// All hooks, in the order they are assembled.
    pub const ALL: [ScriptKind; 4] = [
        Self::Preinstall,
        Self::Preflight,
        Self::Postinstall,
        Self::Postflight,
    ];

    /// Conventional file name `pkgbuild` discovers the hook by.
    pub fn file_name(self) -> &'static str {
        match self {
            Self::Preinstall => "preinstall",
            Self::Postinstall => "postinstall",
            Self::Preflight => "preflight",
            Self::Postflight => "postflight",
        }
    }
}

impl fmt::Display for ScriptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// Paths to the lifecycle scripts. All optional.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LifecycleScripts {
    /// Script installed as `preinstall`.
    #[serde(default)]
    pub preinstall: Option<PathBuf>,
    /// Script installed as `postinstall`.
    #[serde(default)]
    pub postinstall: Option<PathBuf>,
    /// Script installed as `preflight`.
    #[serde(default)]
    pub preflight: Option<PathBuf>,
    /// Script installed as `postflight`.
    #[serde(default)]
    pub postflight: Option<PathBuf>,
}

impl LifecycleScripts {
    /// Returns the path declared for `kind`.
    pub fn get(&self, kind: ScriptKind) -> Option<&Path> {
        match kind {
            ScriptKind::Preinstall => self.preinstall.as_deref(),
            ScriptKind::Postinstall => self.postinstall.as_deref(),
            ScriptKind::Preflight => self.preflight.as_deref(),
            ScriptKind::Postflight => self.postflight.as_deref(),
        }
    }

    /// Sets the path for `kind`.
    pub fn set(&mut self, kind: ScriptKind, path: PathBuf) {
        let slot = match kind {
            ScriptKind::Preinstall => &mut self.preinstall,
            ScriptKind::Postinstall => &mut self.postinstall,
            ScriptKind::Preflight => &mut self.preflight,
            ScriptKind::Postflight => &mut self.postflight,
        };
        *slot = Some(path);
    }

    /// Declared scripts in assembly order.
    pub fn iter(&self) -> impl Iterator<Item = (ScriptKind, &Path)> {
        ScriptKind::ALL
            .into_iter()
            .filter_map(|kind| self.get(kind).map(|path| (kind, path)))
    }

    /// True when no script is declared.
    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

/// Markdown source for a distribution page.
///
/// In a manifest either a plain string (inline markdown) or `{ file = "..." }`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Markdown {
    /// Markdown text given directly.
    Inline(String),
    /// Markdown read from a file at build time.
    File {
        /// Path to the markdown file.
        file: PathBuf,
    },
}

impl From<&str> for Markdown {
    fn from(text: &str) -> Self {
        Self::Inline(text.to_string())
    }
}

impl From<String> for Markdown {
    fn from(text: String) -> Self {
        Self::Inline(text)
    }
}

/// A prebuilt component package included in a distribution.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComponentRef {
    /// Path to the existing flat `.pkg`.
    pub path: PathBuf,
    /// Package identifier it was built with.
    pub identifier: String,
    /// Package version it was built with.
    pub version: String,
    /// Install location shown for the choice. Default: `/`
    #[serde(default)]
    pub install_location: Option<String>,
}

/// GUI metadata used only when building a distribution.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DistributionSettings {
    /// Installer window title.
    #[serde(default)]
    pub title: Option<String>,
    /// Welcome page.
    #[serde(default)]
    pub welcome: Option<Markdown>,
    /// Read Me page.
    #[serde(default)]
    pub readme: Option<Markdown>,
    /// License page.
    #[serde(default)]
    pub license: Option<Markdown>,
    /// Background image for light appearance.
    #[serde(default)]
    pub background: Option<PathBuf>,
    /// Background image for dark appearance. Falls back to `background`.
    #[serde(default)]
    pub background_dark: Option<PathBuf>,
    /// Extra component packages appended after the one built from the payload.
    #[serde(default)]
    pub packages: Vec<ComponentRef>,
}

impl DistributionSettings {
    /// True when no distribution-only field is set.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Declarative description of one installer package.
///
/// Construct with [`PackageSpecBuilder`](super::PackageSpecBuilder) or load
/// from a TOML manifest with [`load_manifest`](crate::manifest::load_manifest).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageSpec {
    /// Where the finished `.pkg` is written.
    pub output: PathBuf,

    /// Reverse-DNS package identifier, e.g. `com.example.myapp`.
    pub identifier: String,

    /// Package version. Default: `1.0.0`
    #[serde(default = "default_version")]
    pub version: String,

    /// Absolute install location. Default: `/`
    #[serde(default = "default_install_location")]
    pub install_location: String,

    /// Let Installer update a bundle where the user moved it.
    ///
    /// Only meaningful when the payload's single entry is a bundle.
    /// Default: true
    #[serde(default = "default_true")]
    pub allow_relocation: bool,

    /// Ordered payload mapping.
    #[serde(default)]
    pub files: Vec<FileMapping>,

    /// Lifecycle scripts.
    #[serde(default)]
    pub scripts: LifecycleScripts,

    /// Files or directories copied next to the scripts.
    #[serde(default)]
    pub script_resources: Vec<PathBuf>,

    /// `productsign` identity. Unsigned when absent.
    #[serde(default)]
    pub signing_identity: Option<String>,

    /// Build a distribution (product archive) instead of a flat package.
    #[serde(default)]
    pub as_distribution: bool,

    /// Distribution-only GUI metadata.
    #[serde(default)]
    pub distribution: DistributionSettings,
}

impl PackageSpec {
    /// Creates a spec with defaults for everything but the output and identifier.
    pub fn new(output: impl Into<PathBuf>, identifier: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            identifier: identifier.into(),
            version: default_version(),
            install_location: default_install_location(),
            allow_relocation: true,
            files: Vec::new(),
            scripts: LifecycleScripts::default(),
            script_resources: Vec::new(),
            signing_identity: None,
            as_distribution: false,
            distribution: DistributionSettings::default(),
        }
    }

    /// File name of the output artifact.
    pub fn output_file_name(&self) -> Result<&str> {
        self.output
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                Error::Configuration(format!(
                    "output path has no usable file name: {}",
                    self.output.display()
                ))
            })
    }

    /// Checks the structural invariants of the spec. Touches no files.
    pub fn validate(&self) -> Result<()> {
        self.output_file_name()?;
        validate_identifier(&self.identifier)?;

        if self.version.trim().is_empty() {
            return Err(Error::Configuration("version must not be empty".into()));
        }

        if !self.install_location.starts_with('/') {
            return Err(Error::Configuration(format!(
                "install location must be absolute, got '{}'",
                self.install_location
            )));
        }

        if self.files.is_empty() && self.scripts.is_empty() {
            return Err(Error::Configuration(
                "a package needs a file mapping or at least one lifecycle script".into(),
            ));
        }

        let mut destinations = HashSet::new();
        for mapping in &self.files {
            if mapping
                .destination
                .components()
                .any(|c| matches!(c, Component::ParentDir))
            {
                return Err(Error::Configuration(format!(
                    "destination must not contain '..': {}",
                    mapping.destination.display()
                )));
            }
            let relative = mapping.root_relative_destination();
            if relative.as_os_str().is_empty() {
                return Err(Error::Configuration(format!(
                    "destination must name a path below the install root: {}",
                    mapping.destination.display()
                )));
            }
            if !destinations.insert(relative) {
                return Err(Error::Configuration(format!(
                    "destination declared more than once: {}",
                    mapping.destination.display()
                )));
            }
        }

        if !self.as_distribution && !self.distribution.is_empty() {
            return Err(Error::Configuration(
                "title, welcome, readme, license, backgrounds and extra packages require a distribution build"
                    .into(),
            ));
        }

        let mut choice_ids = HashSet::from([self.identifier.as_str()]);
        // productbuild resolves pkg-refs by file name alone
        let built = format!("{}.pkg", self.identifier);
        let mut file_names = HashSet::from([OsStr::new(&built)]);
        for component in &self.distribution.packages {
            validate_identifier(&component.identifier)?;
            if !choice_ids.insert(component.identifier.as_str()) {
                return Err(Error::Configuration(format!(
                    "package identifier used more than once in distribution: {}",
                    component.identifier
                )));
            }
            let Some(name) = component.path.file_name() else {
                return Err(Error::Configuration(format!(
                    "component package path has no file name: {}",
                    component.path.display()
                )));
            };
            if !file_names.insert(name) {
                return Err(Error::Configuration(format!(
                    "component package file name used more than once in distribution: {}",
                    component.path.display()
                )));
            }
        }

        if let Some(identity) = &self.signing_identity
            && identity.trim().is_empty()
        {
            return Err(Error::Configuration(
                "signing identity must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// Verifies every declared input exists. Touches no files.
    ///
    /// Runs before staging so a missing input aborts the build before any
    /// temporary state is created.
    pub fn check_resources(&self) -> Result<()> {
        let mut declared: Vec<(ResourceKind, &Path)> = Vec::new();
        declared.extend(
            self.files
                .iter()
                .map(|m| (ResourceKind::Source, m.source.as_path())),
        );
        declared.extend(self.scripts.iter().map(|(_, p)| (ResourceKind::Script, p)));
        declared.extend(
            self.script_resources
                .iter()
                .map(|p| (ResourceKind::ScriptResource, p.as_path())),
        );

        let dist = &self.distribution;
        declared.extend(
            [&dist.background, &dist.background_dark]
                .into_iter()
                .flatten()
                .map(|p| (ResourceKind::Background, p.as_path())),
        );
        declared.extend(
            [&dist.welcome, &dist.readme, &dist.license]
                .into_iter()
                .flatten()
                .filter_map(|md| match md {
                    Markdown::File { file } => Some((ResourceKind::Markdown, file.as_path())),
                    Markdown::Inline(_) => None,
                }),
        );
        declared.extend(
            dist.packages
                .iter()
                .map(|c| (ResourceKind::ComponentPackage, c.path.as_path())),
        );

        for (kind, path) in declared {
            // symlink_metadata so a dangling link still counts as declared-and-present
            if std::fs::symlink_metadata(path).is_err() {
                return Err(Error::MissingResource {
                    kind,
                    path: path.to_path_buf(),
                });
            }
        }

        Ok(())
    }
}

fn validate_identifier(identifier: &str) -> Result<()> {
    let well_formed = !identifier.is_empty()
        && identifier.contains('.')
        && !identifier.starts_with('.')
        && !identifier.ends_with('.')
        && identifier
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'));

    if well_formed {
        Ok(())
    } else {
        Err(Error::Configuration(format!(
            "identifier must be reverse-DNS style (e.g. com.example.app), got '{identifier}'"
        )))
    }
}
