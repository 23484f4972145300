//! Markdown rendering for post bodies.
//!
//! Headings are demoted two levels (capped at `h6`); each one gets a slug id
//! and a leading `#` self-link.

use std::{cell::RefCell, collections::HashSet, collections::VecDeque, rc::Rc, sync::Arc};

use ammonia::Builder as AmmoniaBuilder;
use comrak::{
    Arena, Options, format_html,
    nodes::{AstNode, NodeValue},
    parse_document,
};
use lol_html::{RewriteStrSettings, element, html_content::ContentType, rewrite_str};
use once_cell::sync::Lazy;
use thiserror::Error;

use crate::domain::slug::AnchorSlugger;

/// Levels added to every markdown heading.
pub const HEADING_SHIFT: u8 = 2;
const MAX_HEADING_LEVEL: u8 = 6;
const MARKDOWN_HEADINGS: &str = "h1[data-sourcepos], h2[data-sourcepos], h3[data-sourcepos], \
    h4[data-sourcepos], h5[data-sourcepos], h6[data-sourcepos]";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("markdown formatting failed: {message}")]
    Markdown { message: String },
    #[error("heading rewrite failed: {message}")]
    Document { message: String },
}

pub struct MarkdownRenderer {
    options: Options<'static>,
    sanitizer: AmmoniaBuilder<'static>,
}

static RENDERER: Lazy<Arc<MarkdownRenderer>> = Lazy::new(|| Arc::new(MarkdownRenderer::new()));

/// Shared renderer instance, built on first use.
pub fn markdown_renderer() -> Arc<MarkdownRenderer> {
    Arc::clone(&RENDERER)
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownRenderer {
    pub fn new() -> Self {
        Self {
            options: default_options(),
            sanitizer: build_sanitizer(),
        }
    }

    pub fn render(&self, markdown: &str) -> Result<String, RenderError> {
        let arena = Arena::new();
        let root = parse_document(&arena, markdown, &self.options);

        let anchors = shift_headings(root);

        let mut html = String::new();
        format_html(root, &self.options, &mut html).map_err(|err| RenderError::Markdown {
            message: err.to_string(),
        })?;

        let linked = link_headings(&html, anchors)?;
        Ok(self.sanitizer.clean(&linked).to_string())
    }
}

/// Demote every heading and return their anchors in document order.
fn shift_headings<'a>(root: &'a AstNode<'a>) -> VecDeque<String> {
    let mut slugger = AnchorSlugger::new();
    let mut anchors = VecDeque::new();

    for node in root.descendants() {
        let is_heading = {
            let mut data = node.data.borrow_mut();
            if let NodeValue::Heading(heading) = &mut data.value {
                heading.level = heading
                    .level
                    .saturating_add(HEADING_SHIFT)
                    .min(MAX_HEADING_LEVEL);
                true
            } else {
                false
            }
        };

        if is_heading {
            anchors.push_back(slugger.anchor_for(&collect_inline_text(node)));
        }
    }

    anchors
}

fn link_headings(html: &str, anchors: VecDeque<String>) -> Result<String, RenderError> {
    let anchors = Rc::new(RefCell::new(anchors));

    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!(MARKDOWN_HEADINGS, {
                let anchors = Rc::clone(&anchors);
                move |el| {
                    if let Some(anchor) = anchors.borrow_mut().pop_front() {
                        el.set_attribute("id", &anchor)?;
                        el.prepend(
                            &format!(
                                "<a class=\"heading-link\" href=\"#{anchor}\" aria-hidden=\"true\">#</a>"
                            ),
                            ContentType::Html,
                        );
                    }
                    el.remove_attribute("data-sourcepos");
                    Ok(())
                }
            })],
            ..RewriteStrSettings::new()
        },
    )
    .map_err(|err| RenderError::Document {
        message: err.to_string(),
    })
}

fn collect_inline_text(node: &AstNode<'_>) -> String {
    fn walk(node: &AstNode<'_>, buffer: &mut String) {
        {
            let data = node.data.borrow();
            match &data.value {
                NodeValue::Text(text) => buffer.push_str(text),
                NodeValue::Code(code) => buffer.push_str(&code.literal),
                NodeValue::LineBreak | NodeValue::SoftBreak => buffer.push(' '),
                _ => {}
            }
        }
        let mut child = node.first_child();
        while let Some(next) = child {
            walk(next, buffer);
            child = next.next_sibling();
        }
    }

    let mut text = String::new();
    let mut child = node.first_child();
    while let Some(next) = child {
        walk(next, &mut text);
        child = next.next_sibling();
    }
    text
}

fn default_options() -> Options<'static> {
    let mut options = Options::default();

    let ext = &mut options.extension;
    ext.strikethrough = true;
    ext.table = true;
    ext.autolink = true;
    ext.tasklist = true;
    ext.footnotes = true;

    let render = &mut options.render;
    render.github_pre_lang = true;
    render.r#unsafe = true;
    render.sourcepos = true;

    options
}

fn build_sanitizer() -> AmmoniaBuilder<'static> {
    let mut builder = AmmoniaBuilder::default();

    let tags: HashSet<&'static str> = HashSet::from([
        "a",
        "abbr",
        "blockquote",
        "br",
        "code",
        "del",
        "div",
        "em",
        "figcaption",
        "figure",
        "h1",
        "h2",
        "h3",
        "h4",
        "h5",
        "h6",
        "hr",
        "i",
        "img",
        "input",
        "kbd",
        "li",
        "ol",
        "p",
        "pre",
        "s",
        "section",
        "span",
        "strong",
        "sub",
        "sup",
        "table",
        "tbody",
        "td",
        "th",
        "thead",
        "tr",
        "u",
        "ul",
    ]);
    builder.tags(tags);

    let generic: HashSet<&'static str> = HashSet::from([
        "class",
        "id",
        "title",
        "lang",
        "aria-hidden",
        "aria-label",
        "data-footnote-ref",
        "data-footnotes",
        "data-footnote-backref",
    ]);
    builder.generic_attributes(generic);

    builder.add_tag_attributes("img", &["width", "height", "alt", "loading"]);
    builder.add_tag_attributes("pre", &["lang"]);
    builder.add_tag_attributes("th", &["align"]);
    builder.add_tag_attributes("td", &["align"]);
    builder.add_tag_attributes("input", &["type", "checked", "disabled"]);
    builder.add_url_schemes(["http", "https", "mailto"].iter().copied());

    builder
}
