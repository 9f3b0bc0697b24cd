//! Markdown to printable document elements
//!
//! [`to_elements`] walks markdown source one line at a time and produces a
//! flat list of styled elements for a page-layout stage. The classification is
//! deliberately shallow: headings up to level 3, fenced code, bullet and
//! numbered lines, body paragraphs with inline emphasis, and spacers for blank
//! lines. Nothing is nested and malformed input never fails.

pub mod inline;
pub mod style;
#[cfg(feature = "pdf")]
pub mod writer;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::diagram::FENCE;
pub use style::{ParagraphStyle, PdfStyles, Rgb, StyleName, INCH};

#[cfg(feature = "pdf")]
pub use writer::{FontSource, PdfWriter};

static NUMBERED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\.\s").expect("valid regex"));

/// Glyph prefixed to bullet items.
pub const BULLET: &str = "\u{2022}";

/// One printable element, in source order
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Element {
    Heading { level: u8, text: String },
    CodeBlock { text: String },
    Bullet { text: String },
    Numbered { text: String },
    /// Body text carrying emphasis markup (see [`inline`])
    Body { text: String },
    /// Vertical space in points
    Spacer { height: f32 },
}

impl Element {
    /// Paragraph style for this element; `None` for spacers.
    pub fn style(&self) -> Option<StyleName> {
        match self {
            Element::Heading { level: 1, .. } => Some(StyleName::Heading1),
            Element::Heading { level: 2, .. } => Some(StyleName::Heading2),
            Element::Heading { .. } => Some(StyleName::Heading3),
            Element::CodeBlock { .. } => Some(StyleName::CodeBlock),
            Element::Bullet { .. } | Element::Numbered { .. } | Element::Body { .. } => {
                Some(StyleName::Body)
            }
            Element::Spacer { .. } => None,
        }
    }

    pub fn is_spacer(&self) -> bool {
        matches!(self, Element::Spacer { .. })
    }

    fn spacer(inches: f32) -> Self {
        Element::Spacer {
            height: inches * INCH,
        }
    }
}

const HEADINGS: [(&str, u8, f32); 3] = [("### ", 3, 0.1), ("## ", 2, 0.15), ("# ", 1, 0.2)];

/// Convert markdown into printable elements.
pub fn to_elements(markdown: &str) -> Vec<Element> {
    let lines: Vec<&str> = markdown
        .split('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .collect();
    let mut elements = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        let trimmed = line.trim();

        if let Some((marker, level, gap)) = HEADINGS.iter().find(|(m, _, _)| line.starts_with(m)) {
            elements.push(Element::Heading {
                level: *level,
                text: line[marker.len()..].to_string(),
            });
            elements.push(Element::spacer(*gap));
        } else if line.starts_with(FENCE) {
            let start = i + 1;
            i = start;
            while i < lines.len() && !lines[i].starts_with(FENCE) {
                i += 1;
            }
            let closed = i < lines.len();
            let code = &lines[start..i];

            if !code.is_empty() {
                elements.push(Element::CodeBlock {
                    text: code.join("\n"),
                });
                if closed {
                    elements.push(Element::spacer(0.1));
                }
            }
        } else if let Some(rest) = trimmed
            .strip_prefix("- ")
            .or_else(|| trimmed.strip_prefix("* "))
        {
            elements.push(Element::Bullet {
                text: format!("{BULLET} {rest}"),
            });
        } else if NUMBERED.is_match(trimmed) {
            elements.push(Element::Numbered {
                text: trimmed.to_string(),
            });
        } else if !trimmed.is_empty() {
            elements.push(Element::Body {
                text: inline::apply_emphasis(trimmed),
            });
        } else {
            elements.push(Element::spacer(0.1));
        }

        i += 1;
    }

    log::debug!("converted {} lines into {} elements", lines.len(), elements.len());
    elements
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(elements: &[Element]) -> Vec<&'static str> {
        elements
            .iter()
            .map(|e| match e {
                Element::Heading { .. } => "heading",
                Element::CodeBlock { .. } => "code",
                Element::Bullet { .. } => "bullet",
                Element::Numbered { .. } => "numbered",
                Element::Body { .. } => "body",
                Element::Spacer { .. } => "spacer",
            })
            .collect()
    }

    #[test]
    fn headings_strip_marker_and_add_spacer() {
        let elements = to_elements("# One\n## Two\n### Three");
        assert_eq!(
            elements,
            vec![
                Element::Heading { level: 1, text: "One".into() },
                Element::Spacer { height: 0.2 * INCH },
                Element::Heading { level: 2, text: "Two".into() },
                Element::Spacer { height: 0.15 * INCH },
                Element::Heading { level: 3, text: "Three".into() },
                Element::Spacer { height: 0.1 * INCH },
            ]
        );
    }

    #[test]
    fn deeper_headings_fall_through_to_body() {
        let elements = to_elements("#### Four");
        assert_eq!(elements, vec![Element::Body { text: "#### Four".into() }]);
    }

    #[test]
    fn hash_without_space_is_body() {
        let elements = to_elements("#tag");
        assert_eq!(kinds(&elements), vec!["body"]);
    }

    #[test]
    fn fenced_code_is_one_block_plus_spacer() {
        let elements = to_elements("```rust\nfn main() {\n    # not a heading\n}\n```\nafter");
        assert_eq!(
            elements[0],
            Element::CodeBlock {
                text: "fn main() {\n    # not a heading\n}".into()
            }
        );
        assert_eq!(kinds(&elements), vec!["code", "spacer", "body"]);
    }

    #[test]
    fn unterminated_fence_runs_to_end_without_spacer() {
        let elements = to_elements("text\n```\nline 1\n\nline 3");
        assert_eq!(kinds(&elements), vec!["body", "code"]);
        assert_eq!(
            elements[1],
            Element::CodeBlock {
                text: "line 1\n\nline 3".into()
            }
        );
    }

    #[test]
    fn empty_fence_emits_nothing() {
        let elements = to_elements("```\n```\nx");
        assert_eq!(kinds(&elements), vec!["body"]);
    }

    #[test]
    fn bullets_get_glyph() {
        let elements = to_elements("- one\n  * two\n-three");
        assert_eq!(elements[0], Element::Bullet { text: "\u{2022} one".into() });
        assert_eq!(elements[1], Element::Bullet { text: "\u{2022} two".into() });
        assert_eq!(kinds(&elements)[2], "body");
    }

    #[test]
    fn numbered_items_are_not_renumbered() {
        let elements = to_elements("  7. seventh\n1.no space");
        assert_eq!(elements[0], Element::Numbered { text: "7. seventh".into() });
        assert_eq!(kinds(&elements)[1], "body");
    }

    #[test]
    fn body_gets_inline_markup() {
        let elements = to_elements("Use **care** with `code`");
        assert_eq!(
            elements,
            vec![Element::Body {
                text: "Use <b>care</b> with <font name=\"Courier\">code</font>".into()
            }]
        );
    }

    #[test]
    fn bullets_keep_raw_emphasis() {
        let elements = to_elements("- **not** converted");
        assert_eq!(elements[0], Element::Bullet { text: "\u{2022} **not** converted".into() });
    }

    #[test]
    fn blank_lines_become_spacers() {
        let elements = to_elements("a\n\n   \nb\n");
        assert_eq!(kinds(&elements), vec!["body", "spacer", "spacer", "body", "spacer"]);
    }

    #[test]
    fn crlf_input_is_handled() {
        let elements = to_elements("# Title\r\n\r\nbody\r\n");
        assert_eq!(elements[0], Element::Heading { level: 1, text: "Title".into() });
        assert_eq!(kinds(&elements), vec!["heading", "spacer", "spacer", "body", "spacer"]);
    }

    #[test]
    fn output_follows_input_order() {
        let src = "# H\npara 1\n- item\n```\ncode\n```\n2. two\n\npara 2";
        let elements: Vec<Element> = to_elements(src)
            .into_iter()
            .filter(|e| !e.is_spacer())
            .collect();
        let texts: Vec<String> = elements
            .iter()
            .map(|e| match e {
                Element::Heading { text, .. }
                | Element::CodeBlock { text }
                | Element::Bullet { text }
                | Element::Numbered { text }
                | Element::Body { text } => text.clone(),
                Element::Spacer { .. } => unreachable!(),
            })
            .collect();
        assert_eq!(
            texts,
            vec!["H", "para 1", "\u{2022} item", "code", "2. two", "para 2"]
        );
    }

    #[test]
    fn styles_by_element() {
        assert_eq!(
            Element::Heading { level: 2, text: String::new() }.style(),
            Some(StyleName::Heading2)
        );
        assert_eq!(Element::CodeBlock { text: String::new() }.style(), Some(StyleName::CodeBlock));
        assert_eq!(Element::Bullet { text: String::new() }.style(), Some(StyleName::Body));
        assert_eq!(Element::Spacer { height: 1.0 }.style(), None);
    }

    #[test]
    fn empty_input_is_one_spacer() {
        assert_eq!(kinds(&to_elements("")), vec!["spacer"]);
    }
}
