//! Diagram fence preprocessing
//!
//! Mermaid diagrams arrive as fenced code blocks. Before HTML conversion they
//! are rewritten into raw `<div class="mermaid">` containers so the renderer
//! passes them through instead of escaping them as code.

/// Opening and closing marker for fenced blocks.
pub const FENCE: &str = "```";

/// Language tag that marks a fence as a diagram regardless of its content.
pub const DIAGRAM_LANGUAGE: &str = "mermaid";

/// Prefixes of the first non-blank line that identify an untagged diagram.
pub const DIAGRAM_KEYWORDS: [&str; 2] = ["graph ", "flowchart "];

const WRAPPER_OPEN: &str = "<div class=\"mermaid\">";
const WRAPPER_CLOSE: &str = "</div>";

/// How a fence block will be rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FenceKind {
    Diagram,
    Code,
}

/// A fenced region found in markdown source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FenceBlock {
    /// Language tag after the opening marker, if any
    pub language: Option<String>,
    pub lines: Vec<String>,
    /// Zero-based line index of the opening marker
    pub start_line: usize,
    /// False when input ended before a closing marker
    pub closed: bool,
    pub kind: FenceKind,
}

fn fence_language(line: &str) -> Option<String> {
    let tag = line.trim().trim_start_matches('`').trim();
    if tag.is_empty() {
        None
    } else {
        Some(tag.to_string())
    }
}

fn starts_with_keyword(line: &str) -> bool {
    let lower = line.to_lowercase();
    DIAGRAM_KEYWORDS.iter().any(|kw| lower.starts_with(kw))
}

/// Classify a fence from its language tag and content.
///
/// Only the first non-blank content line is sniffed.
pub fn classify(language: Option<&str>, lines: &[String]) -> FenceKind {
    if language.is_some_and(|lang| lang.eq_ignore_ascii_case(DIAGRAM_LANGUAGE)) {
        return FenceKind::Diagram;
    }

    match lines.iter().map(|l| l.trim()).find(|l| !l.is_empty()) {
        Some(first) if starts_with_keyword(first) => FenceKind::Diagram,
        _ => FenceKind::Code,
    }
}

fn fence_header(language: Option<&str>) -> String {
    format!("{}{}", FENCE, language.unwrap_or(""))
}

/// Rewrite diagram fences into raw HTML containers.
///
/// Non-diagram fences are re-emitted with a normalised header. A fence left
/// open at end of input is flushed with its header and content but no closing
/// marker.
pub fn preprocess(markdown: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut in_fence = false;
    let mut language: Option<String> = None;
    let mut buf: Vec<String> = Vec::new();

    for line in markdown.split('\n') {
        if !in_fence {
            if line.starts_with(FENCE) {
                in_fence = true;
                language = fence_language(line);
                buf.clear();
            } else {
                out.push(line.to_string());
            }
            continue;
        }

        if !line.starts_with(FENCE) {
            buf.push(line.to_string());
            continue;
        }

        match classify(language.as_deref(), &buf) {
            FenceKind::Diagram => {
                out.push(WRAPPER_OPEN.to_string());
                out.append(&mut buf);
                out.push(WRAPPER_CLOSE.to_string());
            }
            FenceKind::Code => {
                out.push(fence_header(language.as_deref()));
                out.append(&mut buf);
                out.push(FENCE.to_string());
            }
        }
        in_fence = false;
        language = None;
    }

    if in_fence {
        log::debug!("unterminated fence at end of input, flushing without closing marker");
        out.push(fence_header(language.as_deref()));
        out.append(&mut buf);
    }

    out.join("\n")
}

/// List every fence block in the source, including an unterminated trailing one.
pub fn scan_fences(markdown: &str) -> Vec<FenceBlock> {
    let mut blocks = Vec::new();
    let mut open: Option<(usize, Option<String>, Vec<String>)> = None;

    for (idx, line) in markdown.split('\n').enumerate() {
        match open.take() {
            None => {
                if line.starts_with(FENCE) {
                    open = Some((idx, fence_language(line), Vec::new()));
                }
            }
            Some((start, language, lines)) if line.starts_with(FENCE) => {
                let kind = classify(language.as_deref(), &lines);
                blocks.push(FenceBlock {
                    language,
                    lines,
                    start_line: start,
                    closed: true,
                    kind,
                });
            }
            Some((start, language, mut lines)) => {
                lines.push(line.to_string());
                open = Some((start, language, lines));
            }
        }
    }

    if let Some((start, language, lines)) = open {
        let kind = classify(language.as_deref(), &lines);
        blocks.push(FenceBlock {
            language,
            lines,
            start_line: start,
            closed: false,
            kind,
        });
    }

    blocks
}

/// A run of preprocessed markdown
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Markdown(String),
    /// One diagram container, wrapper lines included
    Diagram(String),
}

/// Split [`preprocess`] output into markdown runs and whole diagram containers.
///
/// A markdown parser closes a raw HTML block at the first blank line, so each
/// container must reach the renderer as a single unit. Wrapper lines inside
/// code fences, and an opening wrapper with no closing line, stay markdown.
pub fn split_diagrams(preprocessed: &str) -> Vec<Segment> {
    let lines: Vec<&str> = preprocessed.split('\n').collect();
    let mut segments = Vec::new();
    let mut text: Vec<&str> = Vec::new();
    let mut in_code = false;
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        if line.starts_with(FENCE) {
            in_code = !in_code;
        } else if !in_code && line == WRAPPER_OPEN {
            if let Some(offset) = lines[i + 1..].iter().position(|l| *l == WRAPPER_CLOSE) {
                if !text.is_empty() {
                    segments.push(Segment::Markdown(text.join("\n")));
                    text.clear();
                }
                let end = i + 1 + offset;
                segments.push(Segment::Diagram(lines[i..=end].join("\n")));
                i = end + 1;
                continue;
            }
        }
        text.push(line);
        i += 1;
    }

    if !text.is_empty() {
        segments.push(Segment::Markdown(text.join("\n")));
    }
    segments
}
