//! Distribution descriptor generation.
//!
//! [`build_descriptor`] turns the spec's GUI metadata and an ordered list of
//! component packages into a [`DistributionDescriptor`]. Rendering to XML is
//! a separate step ([`DistributionDescriptor::to_xml`]) so the document can
//! be inspected before anything is written.

use super::{
    component::ComponentPackage,
    markdown::{self, MarkdownRenderer},
    template::DISTRIBUTION_TEMPLATE,
};
use crate::bundler::{
    error::{Error, ResourceKind, Result},
    settings::{Markdown, PackageSpec},
};
use handlebars::Handlebars;
use serde_json::json;
use std::{
    collections::BTreeMap,
    fmt,
    path::{Path, PathBuf},
};

/// Title used when the spec declares none.
pub const DEFAULT_TITLE: &str = "Installer";

/// Installer pane a page is shown in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageKind {
    Welcome,
    Readme,
    License,
}

impl PageKind {
    /// Resource file the page is written to.
    pub fn file_name(self) -> &'static str {
        match self {
            Self::Welcome => "WELCOME.html",
            Self::Readme => "README.html",
            Self::License => "LICENSE.html",
        }
    }

    /// Descriptor element naming the pane.
    pub fn element(self) -> &'static str {
        match self {
            Self::Welcome => "welcome",
            Self::Readme => "readme",
            Self::License => "license",
        }
    }
}

impl fmt::Display for PageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.element())
    }
}

/// A rendered page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Page {
    pub kind: PageKind,
    /// Complete HTML document.
    pub html: String,
}

/// One background image and the resource name it is copied to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackgroundImage {
    pub source: PathBuf,
    pub file_name: String,
}

/// Background images per appearance.
///
/// `dark` equals `light` when no distinct dark variant was supplied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Backgrounds {
    pub light: BackgroundImage,
    pub dark: BackgroundImage,
}

impl Backgrounds {
    /// True when both appearances use the light image.
    pub fn shares_light(&self) -> bool {
        self.light == self.dark
    }
}

/// One install choice.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChoiceEntry {
    pub identifier: String,
    pub version: String,
    /// Package file name, resolved by `productbuild --package-path`.
    pub file_name: String,
    pub install_location: String,
    /// Location of the package on disk.
    pub path: PathBuf,
}

impl From<&ComponentPackage> for ChoiceEntry {
    fn from(component: &ComponentPackage) -> Self {
        Self {
            identifier: component.identifier.clone(),
            version: component.version.clone(),
            file_name: component.file_name(),
            install_location: component.install_location.clone(),
            path: component.path.clone(),
        }
    }
}

/// Generated distribution document. Never persisted beyond one build.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DistributionDescriptor {
    pub title: String,
    /// Pages in welcome, readme, license order. Absent pages are skipped.
    pub pages: Vec<Page>,
    pub background: Option<Backgrounds>,
    /// Choices in declaration order.
    pub choices: Vec<ChoiceEntry>,
}

impl DistributionDescriptor {
    /// Renders the descriptor as a `productbuild` distribution document.
    pub fn to_xml(&self) -> Result<String> {
        let mut handlebars = Handlebars::new();
        handlebars.register_template_string("distribution", DISTRIBUTION_TEMPLATE)?;

        let mut data = BTreeMap::new();
        data.insert("title", json!(self.title));
        data.insert(
            "pages",
            self.pages
                .iter()
                .map(|p| json!({ "element": p.kind.element(), "file": p.kind.file_name() }))
                .collect(),
        );
        if let Some(bg) = &self.background {
            data.insert(
                "background",
                json!({ "light": bg.light.file_name, "dark": bg.dark.file_name }),
            );
        }
        data.insert(
            "choices",
            self.choices
                .iter()
                .map(|c| {
                    json!({
                        "identifier": c.identifier,
                        "version": c.version,
                        "pkg_ref": urlencoding::encode(&c.file_name),
                        "install_location": c.install_location,
                    })
                })
                .collect(),
        );

        Ok(handlebars.render("distribution", &data)?)
    }
}

/// Builds the descriptor for `spec` over `components`, in the given order.
///
/// Reads declared markdown files; touches nothing else.
///
/// # Errors
///
/// [`Error::MissingResource`] when a background image or markdown file is missing.
pub fn build_descriptor(
    spec: &PackageSpec,
    components: &[ComponentPackage],
    renderer: &dyn MarkdownRenderer,
) -> Result<DistributionDescriptor> {
    let dist = &spec.distribution;

    let mut pages = Vec::new();
    for (kind, source) in [
        (PageKind::Welcome, &dist.welcome),
        (PageKind::Readme, &dist.readme),
        (PageKind::License, &dist.license),
    ] {
        if let Some(source) = source {
            pages.push(render_page(kind, source, renderer)?);
        }
    }

    let background = match &dist.background {
        Some(light) => Some(backgrounds(light, dist.background_dark.as_deref())?),
        None => None,
    };

    Ok(DistributionDescriptor {
        title: dist
            .title
            .clone()
            .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        pages,
        background,
        choices: components.iter().map(ChoiceEntry::from).collect(),
    })
}

fn render_page(
    kind: PageKind,
    source: &Markdown,
    renderer: &dyn MarkdownRenderer,
) -> Result<Page> {
    let text = markdown::load(source)?;
    Ok(Page {
        kind,
        html: markdown::html_page(&renderer.render(&text)),
    })
}

fn backgrounds(light: &Path, dark: Option<&Path>) -> Result<Backgrounds> {
    let light = background_image(light, "BACKGROUND")?;
    let dark = match dark {
        Some(dark) if dark != light.source.as_path() => {
            background_image(dark, "BACKGROUND-DARK")?
        }
        Some(dark) => {
            require_image(dark)?;
            light.clone()
        }
        None => light.clone(),
    };
    Ok(Backgrounds { light, dark })
}

fn background_image(source: &Path, stem: &str) -> Result<BackgroundImage> {
    require_image(source)?;
    let file_name = match source.extension() {
        Some(ext) => format!("{stem}.{}", ext.to_string_lossy()),
        None => stem.to_string(),
    };
    Ok(BackgroundImage {
        source: source.to_path_buf(),
        file_name,
    })
}

fn require_image(path: &Path) -> Result<()> {
    if !path.is_file() {
        return Err(Error::MissingResource {
            kind: ResourceKind::Background,
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::ErrorKind;

    struct Echo;

    impl MarkdownRenderer for Echo {
        fn render(&self, markdown: &str) -> String {
            format!("<p>{markdown}</p>\n")
        }
    }

    fn component(id: &str) -> ComponentPackage {
        ComponentPackage {
            path: PathBuf::from(format!("/stage/components/{id}.pkg")),
            identifier: id.to_string(),
            version: "1.0.0".into(),
            install_location: "/".into(),
        }
    }

    fn spec() -> PackageSpec {
        let mut spec = PackageSpec::new("A.pkg", "com.x.a");
        spec.as_distribution = true;
        spec
    }

    #[test]
    fn choices_follow_declaration_order() {
        let components = [component("com.x.a"), component("com.x.b"), component("com.x.c")];
        let descriptor = build_descriptor(&spec(), &components, &Echo).unwrap();

        let ids: Vec<_> = descriptor.choices.iter().map(|c| c.identifier.as_str()).collect();
        assert_eq!(ids, ["com.x.a", "com.x.b", "com.x.c"]);

        let xml = descriptor.to_xml().unwrap();
        let pos = |id: &str| xml.find(&format!("<pkg-ref id=\"{id}\" version")).unwrap();
        assert!(pos("com.x.a") < pos("com.x.b"));
        assert!(pos("com.x.b") < pos("com.x.c"));
        assert!(xml.contains(">com.x.b.pkg</pkg-ref>"));
    }

    #[test]
    fn package_references_are_percent_encoded() {
        let mut helper = component("com.x.helper");
        helper.path = PathBuf::from("/build/My Helper.pkg");
        let descriptor = build_descriptor(&spec(), &[component("com.x.a"), helper], &Echo).unwrap();

        assert_eq!(descriptor.choices[1].file_name, "My Helper.pkg");
        let xml = descriptor.to_xml().unwrap();
        assert!(xml.contains(">My%20Helper.pkg</pkg-ref>"), "{xml}");
        assert!(xml.contains(">com.x.a.pkg</pkg-ref>"));
    }

    #[test]
    fn dark_background_falls_back_to_light() {
        let dir = tempfile::tempdir().unwrap();
        let light = dir.path().join("bg.png");
        std::fs::write(&light, "png").unwrap();

        let mut spec = spec();
        spec.distribution.background = Some(light.clone());
        let descriptor = build_descriptor(&spec, &[component("com.x.a")], &Echo).unwrap();

        let bg = descriptor.background.unwrap();
        assert!(bg.shares_light());
        assert_eq!(bg.light.file_name, "BACKGROUND.png");
        assert_eq!(bg.dark.file_name, "BACKGROUND.png");

        spec.distribution.background_dark = Some(light);
        let bg = build_descriptor(&spec, &[], &Echo).unwrap().background.unwrap();
        assert!(bg.shares_light());
    }

    #[test]
    fn distinct_dark_background_gets_its_own_resource() {
        let dir = tempfile::tempdir().unwrap();
        let light = dir.path().join("bg.png");
        let dark = dir.path().join("bg-dark.jpg");
        std::fs::write(&light, "png").unwrap();
        std::fs::write(&dark, "jpg").unwrap();

        let mut spec = spec();
        spec.distribution.background = Some(light);
        spec.distribution.background_dark = Some(dark);
        let xml = build_descriptor(&spec, &[], &Echo).unwrap().to_xml().unwrap();

        assert!(xml.contains(
            r#"<background file="BACKGROUND.png" alignment="bottomleft" scaling="tofit"/>"#
        ));
        assert!(xml.contains(
            r#"<background-darkAqua file="BACKGROUND-DARK.jpg" alignment="bottomleft" scaling="tofit"/>"#
        ));
    }

    #[test]
    fn missing_background_is_reported() {
        let mut spec = spec();
        spec.distribution.background = Some(PathBuf::from("/nonexistent/bg.png"));
        let err = build_descriptor(&spec, &[], &Echo).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingResource);
    }

    #[test]
    fn pages_render_in_pane_order_with_default_title() {
        let mut spec = spec();
        spec.distribution.license = Some("MIT".into());
        spec.distribution.welcome = Some("Hello".into());
        let descriptor = build_descriptor(&spec, &[], &Echo).unwrap();

        assert_eq!(descriptor.title, DEFAULT_TITLE);
        let kinds: Vec<_> = descriptor.pages.iter().map(|p| p.kind).collect();
        assert_eq!(kinds, [PageKind::Welcome, PageKind::License]);
        assert!(descriptor.pages[0].html.contains("<p>Hello</p>"));

        let xml = descriptor.to_xml().unwrap();
        assert!(xml.contains(r#"<welcome file="WELCOME.html" mime-type="text/html"/>"#));
        assert!(!xml.contains("README.html"));
        assert!(!xml.contains("<background"));
    }

    #[test]
    fn title_is_escaped() {
        let mut spec = spec();
        spec.distribution.title = Some("Tom & Jerry <Pro>".into());
        let xml = build_descriptor(&spec, &[], &Echo).unwrap().to_xml().unwrap();
        assert!(xml.contains("<title>Tom &amp; Jerry &lt;Pro&gt;</title>"));
    }
}
