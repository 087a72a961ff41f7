//! Document bodies and procedure records as commit content.

use canonical::{LawDocument, XmlElement};
use lookup::ProcedureRecord;
use once_cell::sync::Lazy;
use regex::Regex;

static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("tag pattern compiles"));

/// Block-level markup produced from a law document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading { level: u8, text: String },
    Paragraph(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Markup {
    pub blocks: Vec<Block>,
}

/// Turns documents and procedure records into text for the history store.
pub trait Renderer: Send + Sync {
    fn render(&self, doc: &LawDocument) -> Markup;

    fn markup_to_text(&self, markup: &Markup) -> String;

    fn procedure_to_text(&self, record: &ProcedureRecord) -> String {
        strip_markup(&record.markup)
    }
}

/// Markdown with one `##` heading per norm and one paragraph per `<P>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownRenderer;

impl Renderer for MarkdownRenderer {
    fn render(&self, doc: &LawDocument) -> Markup {
        let mut blocks = Vec::new();
        if let Some(title) = doc.formal_title() {
            blocks.push(Block::Heading { level: 1, text: title });
        }
        for norm in doc.root().descendants("norm") {
            let heading = norm_heading(norm);
            if !heading.is_empty() {
                blocks.push(Block::Heading {
                    level: 2,
                    text: heading,
                });
            }
            let content = norm
                .child("textdaten")
                .and_then(|t| t.child("text"))
                .and_then(|t| t.child("Content"));
            if let Some(content) = content {
                blocks.extend(
                    content
                        .descendants("P")
                        .map(|p| collapse_whitespace(&p.text()))
                        .filter(|text| !text.is_empty())
                        .map(Block::Paragraph),
                );
            }
        }
        Markup { blocks }
    }

    fn markup_to_text(&self, markup: &Markup) -> String {
        let mut out = markup
            .blocks
            .iter()
            .map(|block| match block {
                Block::Heading { level, text } => {
                    format!("{} {text}", "#".repeat(usize::from(*level).max(1)))
                }
                Block::Paragraph(text) => text.clone(),
            })
            .collect::<Vec<_>>()
            .join("\n\n");
        out.push('\n');
        out
    }
}

fn norm_heading(norm: &XmlElement) -> String {
    let Some(meta) = norm.child("metadaten") else {
        return String::new();
    };
    ["enbez", "titel"]
        .iter()
        .filter_map(|field| meta.child(field))
        .map(|el| collapse_whitespace(&el.text()))
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Plain text of an HTML fragment: tags removed, entities decoded,
/// whitespace collapsed per line, blank lines dropped.
pub fn strip_markup(markup: &str) -> String {
    let text = TAG.replace_all(markup, "");
    text.lines()
        .map(|line| collapse_whitespace(&html_escape::decode_html_entities(line)))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
