//! Inline emphasis for body paragraphs
//!
//! Markdown emphasis is rewritten into the small tag vocabulary the writer
//! understands: `<b>`, `<i>` and `<font name="Courier">`. Substitutions run in
//! a fixed order (code, bold, italic), each pattern matching the narrowest
//! delimiter pair that excludes its own delimiter character. Overlapping
//! markers are left to whatever the patterns produce.

use once_cell::sync::Lazy;
use regex::Regex;

pub const MONO_OPEN: &str = "<font name=\"Courier\">";
pub const MONO_CLOSE: &str = "</font>";

static CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`]+)`").expect("valid regex"));
static BOLD_STARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*([^*]+)\*\*").expect("valid regex"));
static BOLD_UNDERSCORES: Lazy<Regex> = Lazy::new(|| Regex::new(r"__([^_]+)__").expect("valid regex"));
static ITALIC_STAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*([^*]+)\*").expect("valid regex"));
static ITALIC_UNDERSCORE: Lazy<Regex> = Lazy::new(|| Regex::new(r"_([^_]+)_").expect("valid regex"));

/// Apply the ordered emphasis substitutions to one line.
pub fn apply_emphasis(line: &str) -> String {
    let line = CODE.replace_all(line, format!("{MONO_OPEN}${{1}}{MONO_CLOSE}").as_str());
    let line = BOLD_STARS.replace_all(&line, "<b>${1}</b>");
    let line = BOLD_UNDERSCORES.replace_all(&line, "<b>${1}</b>");
    let line = ITALIC_STAR.replace_all(&line, "<i>${1}</i>");
    let line = ITALIC_UNDERSCORE.replace_all(&line, "<i>${1}</i>");
    line.into_owned()
}

/// A run of text with uniform emphasis
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Span {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
    pub monospace: bool,
}

#[derive(Default)]
struct SpanState {
    bold: u32,
    italic: u32,
    mono: u32,
}

const TAGS: [&str; 6] = ["<b>", "</b>", "<i>", "</i>", MONO_OPEN, MONO_CLOSE];

/// Split emphasis markup back into styled runs.
///
/// Only the tags produced by [`apply_emphasis`] are recognised; any other
/// `<` is literal text. Unbalanced closing tags are ignored.
pub fn spans(markup: &str) -> Vec<Span> {
    let mut out: Vec<Span> = Vec::new();
    let mut state = SpanState::default();
    let mut text = String::new();
    let mut rest = markup;

    let flush = |text: &mut String, state: &SpanState, out: &mut Vec<Span>| {
        if !text.is_empty() {
            out.push(Span {
                text: std::mem::take(text),
                bold: state.bold > 0,
                italic: state.italic > 0,
                monospace: state.mono > 0,
            });
        }
    };

    while !rest.is_empty() {
        let tag = if rest.starts_with('<') {
            TAGS.iter().find(|t| rest.starts_with(**t)).copied()
        } else {
            None
        };

        let Some(tag) = tag else {
            let ch = rest.chars().next().unwrap_or_default();
            text.push(ch);
            rest = &rest[ch.len_utf8()..];
            continue;
        };

        flush(&mut text, &state, &mut out);
        match tag {
            "<b>" => state.bold += 1,
            "</b>" => state.bold = state.bold.saturating_sub(1),
            "<i>" => state.italic += 1,
            "</i>" => state.italic = state.italic.saturating_sub(1),
            MONO_OPEN => state.mono += 1,
            _ => state.mono = state.mono.saturating_sub(1),
        }
        rest = &rest[tag.len()..];
    }
    flush(&mut text, &state, &mut out);

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_span() {
        assert_eq!(
            apply_emphasis("run `cargo test` now"),
            "run <font name=\"Courier\">cargo test</font> now"
        );
    }

    #[test]
    fn bold_and_italic() {
        assert_eq!(apply_emphasis("**a** and __b__"), "<b>a</b> and <b>b</b>");
        assert_eq!(apply_emphasis("*a* and _b_"), "<i>a</i> and <i>b</i>");
    }

    #[test]
    fn bold_runs_before_italic() {
        assert_eq!(apply_emphasis("**bold** *it*"), "<b>bold</b> <i>it</i>");
    }

    #[test]
    fn nested_italic_inside_bold() {
        assert_eq!(apply_emphasis("**a _b_ c**"), "<b>a <i>b</i> c</b>");
    }

    #[test]
    fn underscores_inside_code_are_still_rewritten() {
        // Ordered substitution does not protect code spans.
        assert_eq!(
            apply_emphasis("`snake_case_name`"),
            "<font name=\"Courier\">snake<i>case</i>name</font>"
        );
    }

    #[test]
    fn unmatched_markers_stay_literal() {
        assert_eq!(apply_emphasis("2 * 3 = 6"), "2 * 3 = 6");
        assert_eq!(apply_emphasis("a ` b"), "a ` b");
    }

    #[test]
    fn spans_from_markup() {
        let runs = spans("plain <b>bold <i>both</i></b> <font name=\"Courier\">x</font>");
        assert_eq!(runs.len(), 5);
        assert_eq!(runs[0].text, "plain ");
        assert!(!runs[0].bold);
        assert!(runs[1].bold && !runs[1].italic);
        assert!(runs[2].bold && runs[2].italic);
        assert_eq!(runs[3].text, " ");
        assert!(runs[4].monospace);
    }

    #[test]
    fn literal_angle_brackets_survive() {
        let runs = spans("a < b <x> c");
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].text, "a < b <x> c");
    }

    #[test]
    fn stray_closing_tag_is_ignored() {
        let runs = spans("x</b>y");
        assert_eq!(runs.len(), 2);
        assert!(runs.iter().all(|s| !s.bold));
    }
}
