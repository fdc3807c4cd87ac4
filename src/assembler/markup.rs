use anyhow::{Context, Result};
use regex::Regex;
use scraper::{Html, Node};
use thiserror::Error;

const BLOCK_ELEMENTS: &[&str] = &[
    "p",
    "div",
    "br",
    "li",
    "tr",
    "table",
    "ul",
    "ol",
    "dl",
    "dt",
    "dd",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "heading",
    "claim",
    "claim-text",
];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MarkupError {
    #[error("malformed markup: {0}")]
    Malformed(String),
}

/// Renders embedded markup fragments as plain text. Block-level elements
/// start a new line; inline runs of whitespace collapse to one space.
///
/// Conversion only fails when the parser reported errors and nothing
/// readable survived them.
#[derive(Debug, Clone)]
pub struct MarkupConverter {
    inline_whitespace: Regex,
}

impl MarkupConverter {
    pub fn new() -> Result<Self> {
        let inline_whitespace =
            Regex::new(r"[ \t\u{a0}]+").context("failed to compile whitespace regex")?;
        Ok(Self { inline_whitespace })
    }

    pub fn convert(&self, text: &str) -> Result<String, MarkupError> {
        if !text.contains('<') && !text.contains('&') {
            return Ok(text.to_string());
        }

        // The parser recovers from most errors (XML-style `<figref/>`, a bare
        // `<` in running text); render whatever tree it built.
        let fragment = Html::parse_fragment(text);

        let mut rendered = String::with_capacity(text.len());
        for node in fragment.root_element().descendants() {
            match node.value() {
                Node::Text(run) => rendered.push_str(run),
                Node::Element(element) if BLOCK_ELEMENTS.contains(&element.name()) => {
                    rendered.push('\n');
                }
                _ => {}
            }
        }

        let plain = self.tidy(&rendered);
        match fragment.errors.first() {
            Some(first) if plain.is_empty() => Err(MarkupError::Malformed(first.to_string())),
            _ => Ok(plain),
        }
    }

    fn tidy(&self, rendered: &str) -> String {
        rendered
            .lines()
            .map(|line| self.inline_whitespace.replace_all(line, " "))
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .collect::<Vec<String>>()
            .join("\n")
    }
}
