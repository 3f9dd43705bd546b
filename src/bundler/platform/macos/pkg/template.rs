//! Distribution descriptor template.

/// Handlebars template for the `productbuild --distribution` document.
///
/// Expects `title`, `pages` (`element`, `file`), an optional `background`
/// (`light`, `dark`) and `choices` (`identifier`, `version`, `pkg_ref`,
/// `install_location`). `pkg_ref` is the percent-encoded package file name.
/// Values are XML-escaped by the default escape function.
pub const DISTRIBUTION_TEMPLATE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<installer-gui-script minSpecVersion="2">
    <title>{{title}}</title>
    {{~#each pages}}
    <{{element}} file="{{file}}" mime-type="text/html"/>
    {{~/each}}
    {{~#if background}}
    <background file="{{background.light}}" alignment="bottomleft" scaling="tofit"/>
    <background-darkAqua file="{{background.dark}}" alignment="bottomleft" scaling="tofit"/>
    {{~/if}}
    <options customize="never" require-scripts="false" hostArchitectures="x86_64,arm64"/>
    <domains enable_localSystem="true"/>
    <choices-outline>
        {{~#each choices}}
        <line choice="{{identifier}}"/>
        {{~/each}}
    </choices-outline>
    {{~#each choices}}
    <choice id="{{identifier}}" visible="false" customLocation="{{install_location}}">
        <pkg-ref id="{{identifier}}"/>
    </choice>
    {{~/each}}
    {{~#each choices}}
    <pkg-ref id="{{identifier}}" version="{{version}}" onConclusion="none">{{pkg_ref}}</pkg-ref>
    {{~/each}}
</installer-gui-script>
"#;
