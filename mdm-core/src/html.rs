//! Markdown to HTML
//!
//! Fixed extension set: tables, fenced code, heading anchors, newline to
//! `<br />`, heading attributes, definition lists and strikethrough. Diagram
//! fences are rewritten first so they reach the page as raw markup.

use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag, TagEnd};

use crate::diagram::{self, Segment};
use crate::session::ViewSettings;
use crate::toc::AnchorSet;

const MERMAID_SCRIPT: &str = "https://cdn.jsdelivr.net/npm/mermaid@10/dist/mermaid.min.js";

fn options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_HEADING_ATTRIBUTES
        | Options::ENABLE_DEFINITION_LIST
}

/// Give every heading without an explicit `{#id}` a unique slug id.
fn assign_heading_ids(events: &mut [Event<'_>]) {
    let mut anchors = AnchorSet::default();

    for i in 0..events.len() {
        let needs_id = matches!(&events[i], Event::Start(Tag::Heading { id: None, .. }));
        if !needs_id {
            continue;
        }

        let mut title = String::new();
        for event in &events[i + 1..] {
            match event {
                Event::End(TagEnd::Heading(_)) => break,
                Event::Text(t) | Event::Code(t) => title.push_str(t),
                _ => {}
            }
        }

        let anchor = anchors.unique(&title);
        if let Event::Start(Tag::Heading { id, .. }) = &mut events[i] {
            *id = Some(CowStr::from(anchor));
        }
    }
}

fn push_markdown_events<'a>(events: &mut Vec<Event<'a>>, text: &'a str) {
    for event in Parser::new_ext(text, options()) {
        match event {
            Event::SoftBreak => events.push(Event::HardBreak),
            Event::Start(Tag::CodeBlock(kind)) => {
                events.push(Event::Html(CowStr::Borrowed("<div class=\"highlight\">")));
                events.push(Event::Start(Tag::CodeBlock(kind)));
            }
            Event::End(TagEnd::CodeBlock) => {
                events.push(Event::End(TagEnd::CodeBlock));
                events.push(Event::Html(CowStr::Borrowed("</div>\n")));
            }
            other => events.push(other),
        }
    }
}

/// Render markdown to an HTML fragment.
///
/// Diagram containers bypass the parser and are emitted verbatim.
pub fn render_markdown(content: &str) -> String {
    let source = diagram::preprocess(content);
    let segments = diagram::split_diagrams(&source);

    let mut events: Vec<Event<'_>> = Vec::new();
    for segment in &segments {
        match segment {
            Segment::Markdown(text) => push_markdown_events(&mut events, text),
            Segment::Diagram(block) => {
                events.push(Event::Html(CowStr::from(format!("{}\n", block))));
            }
        }
    }
    assign_heading_ids(&mut events);

    let mut out = String::with_capacity(source.len() * 3 / 2);
    html::push_html(&mut out, events.into_iter());
    out
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Wrap a rendered fragment in a standalone, print-ready page.
///
/// The page loads mermaid, renders diagrams, then opens the print dialog.
pub fn build_printable_html(fragment: &str, title: &str, view: &ViewSettings) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>{title}</title>
    <style>
      body {{ margin: 16px; font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; color: {text_color}; background: {background}; }}
      .markdown-content {{ line-height: {line_height}; font-size: {font_size}px; max-width: {width}px; margin: 0 auto; }}
      .markdown-content h1, .markdown-content h2, .markdown-content h3 {{ margin-top: 1.5em; margin-bottom: 0.5em; }}
      .markdown-content pre {{ background-color: #f8f9fa; border: 1px solid #e9ecef; border-radius: 4px; padding: 1rem; overflow-x: auto; margin: 1em 0; }}
      .markdown-content code {{ background-color: #f8f9fa; padding: 0.2em 0.4em; border-radius: 3px; font-size: 0.9em; font-family: 'Monaco', 'Consolas', 'Courier New', monospace; }}
      .markdown-content pre code {{ background: transparent; padding: 0; }}
      .markdown-content table {{ border-collapse: collapse; width: 100%; margin: 1em 0; }}
      .markdown-content th, .markdown-content td {{ border: 1px solid #ddd; padding: 8px 12px; text-align: left; }}
      .markdown-content th {{ background-color: #f2f2f2; font-weight: bold; }}
      @media print {{
        @page {{ margin: 16mm; }}
        body {{ background: #fff; color: #000; }}
        .markdown-content {{ max-width: none; }}
        a[href^="http"]::after {{ content: " (" attr(href) ")"; font-size: 0.85em; color: #666; }}
        pre, code, table, svg, .mermaid {{ break-inside: avoid; }}
      }}
    </style>
    <script src="{script}"></script>
    <script>
      if (window.mermaid) {{
        try {{ mermaid.initialize({{ startOnLoad: true, securityLevel: 'loose' }}); }} catch (e) {{ console.error('Mermaid init error', e); }}
      }}
      window.addEventListener('load', function() {{
        try {{ if (window.mermaid) {{ mermaid.init(undefined, document.querySelectorAll('.mermaid')); }} }} catch (e) {{}}
        setTimeout(function() {{ window.print(); }}, 800);
      }});
    </script>
  </head>
  <body>
    <div class="markdown-content">{fragment}</div>
  </body>
</html>
"#,
        title = escape_html(title),
        text_color = if view.high_contrast { "#000" } else { "#333" },
        background = if view.high_contrast { "#fff" } else { "transparent" },
        line_height = view.line_height,
        font_size = view.font_size,
        width = view.reading_width,
        script = MERMAID_SCRIPT,
        fragment = fragment,
    )
}
