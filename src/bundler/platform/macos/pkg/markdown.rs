//! Markdown page rendering for distribution installers.

use crate::bundler::{
    error::{Error, ErrorExt, ResourceKind, Result},
    settings::Markdown,
};

/// Converts markdown to an HTML fragment.
pub trait MarkdownRenderer {
    /// Renders `markdown` as HTML body content.
    fn render(&self, markdown: &str) -> String;
}

/// CommonMark renderer with tables and strikethrough enabled.
#[derive(Clone, Copy, Debug, Default)]
pub struct CommonMark;

impl MarkdownRenderer for CommonMark {
    fn render(&self, markdown: &str) -> String {
        use pulldown_cmark::{Options, Parser, html};

        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);

        let mut out = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut out, Parser::new_ext(markdown, options));
        out
    }
}

const PAGE_HEAD: &str = "<!DOCTYPE html>\n<html>\n<head>\n<style>\nbody { font-family: -apple-system; }\n</style>\n</head>\n<body>\n";
const PAGE_TAIL: &str = "</body>\n</html>\n";

/// Wraps a rendered fragment in a complete HTML document using the system font.
pub fn html_page(body: &str) -> String {
    let mut page = String::with_capacity(PAGE_HEAD.len() + body.len() + PAGE_TAIL.len());
    page.push_str(PAGE_HEAD);
    page.push_str(body);
    page.push_str(PAGE_TAIL);
    page
}

/// Returns the markdown text, reading it from disk when given as a file.
pub fn load(markdown: &Markdown) -> Result<String> {
    match markdown {
        Markdown::Inline(text) => Ok(text.clone()),
        Markdown::File { file } => {
            if !file.is_file() {
                return Err(Error::MissingResource {
                    kind: ResourceKind::Markdown,
                    path: file.clone(),
                });
            }
            std::fs::read_to_string(file).fs_context("reading markdown", file)
        }
    }
}
