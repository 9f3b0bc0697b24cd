//! Heading extraction and anchor slugs

use std::collections::HashSet;

use crate::diagram::FENCE;

/// A heading in a markdown document
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Heading {
    pub level: u8,
    pub text: String,
    /// Zero-based source line
    pub line: usize,
    pub anchor: String,
}

/// Extract ATX and Setext headings, skipping fenced code.
pub fn extract_headings(text: &str) -> Vec<Heading> {
    let lines: Vec<&str> = text.lines().collect();
    let mut anchors = AnchorSet::default();
    let mut headings = Vec::new();
    let mut in_fence = false;

    let mut idx = 0;
    while idx < lines.len() {
        let line = lines[idx].trim_end();

        if line.trim_start().starts_with(FENCE) {
            in_fence = !in_fence;
            idx += 1;
            continue;
        }
        if in_fence {
            idx += 1;
            continue;
        }

        if let Some((level, title)) = parse_atx_heading(line) {
            headings.push(Heading {
                level,
                anchor: anchors.unique(&title),
                text: title,
                line: idx,
            });
        } else if !line.trim().is_empty() {
            if let Some(level) = lines.get(idx + 1).and_then(|next| parse_setext_underline(next)) {
                let title = line.trim().to_string();
                headings.push(Heading {
                    level,
                    anchor: anchors.unique(&title),
                    text: title,
                    line: idx,
                });
                idx += 1;
            }
        }

        idx += 1;
    }

    headings
}

fn parse_atx_heading(line: &str) -> Option<(u8, String)> {
    let trimmed = line.trim_start();
    let hashes = trimmed.chars().take_while(|&c| c == '#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }

    let rest = &trimmed[hashes..];
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }

    // Closing hashes are decoration
    let title = rest.trim().trim_end_matches('#').trim_end();
    Some((hashes as u8, title.to_string()))
}

fn parse_setext_underline(line: &str) -> Option<u8> {
    let trimmed = line.trim();
    if !trimmed.is_empty() && trimmed.chars().all(|c| c == '=') {
        Some(1)
    } else if trimmed.len() >= 2 && trimmed.chars().all(|c| c == '-') {
        Some(2)
    } else {
        None
    }
}

/// Build an anchor slug: lowercase, punctuation dropped, whitespace and
/// hyphen runs collapsed to a single `-`.
pub fn slugify(text: &str) -> String {
    let kept: String = text
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-' || c.is_whitespace())
        .collect::<String>()
        .trim()
        .to_lowercase();

    let mut slug = String::with_capacity(kept.len());
    let mut pending_sep = false;
    for c in kept.chars() {
        if c == '-' || c.is_whitespace() {
            pending_sep = true;
            continue;
        }
        if pending_sep && !slug.is_empty() {
            slug.push('-');
        }
        pending_sep = false;
        slug.push(c);
    }
    slug
}

/// Hands out unique anchors within one document.
///
/// Repeats get `_1`, `_2`, ... appended.
#[derive(Debug, Default)]
pub struct AnchorSet {
    taken: HashSet<String>,
}

impl AnchorSet {
    pub fn unique(&mut self, text: &str) -> String {
        let mut base = slugify(text);
        if base.is_empty() {
            base.push('_');
        }

        if self.taken.insert(base.clone()) {
            return base;
        }
        let mut n = 1;
        loop {
            let candidate = format!("{}_{}", base, n);
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

/// Indented outline, one heading per line.
pub fn outline(headings: &[Heading]) -> String {
    headings
        .iter()
        .map(|h| {
            format!(
                "{}{} (line {}, #{})",
                "  ".repeat(usize::from(h.level.saturating_sub(1))),
                h.text,
                h.line + 1,
                h.anchor
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
