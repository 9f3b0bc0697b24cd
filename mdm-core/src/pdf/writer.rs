//! PDF file output with genpdf
//!
//! Lays an element list out on A4 pages with one-inch margins. Fonts are
//! TrueType files loaded from a directory using genpdf's naming scheme
//! (`<Family>-Regular.ttf`, `-Bold`, `-Italic`, `-BoldItalic`).

use anyhow::{anyhow, Context, Result};
use genpdf::elements::{Break, LinearLayout, Paragraph};
use genpdf::fonts::{self, Font, FontData, FontFamily};
use genpdf::style::{Color, Style, StyledString};
use genpdf::{Document, Element as _, Margins, PaperSize, SimplePageDecorator};
use std::path::{Path, PathBuf};

use super::inline::{self, Span};
use super::style::{ParagraphStyle, PdfStyles, Rgb};
use super::Element;

/// Page margin: 72pt
const MARGIN_MM: f64 = 25.4;

/// Where the writer finds its fonts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontSource {
    pub dir: PathBuf,
    pub family: String,
    pub mono_family: String,
}

impl FontSource {
    fn load(&self, family: &str) -> Result<FontFamily<FontData>> {
        fonts::from_files(&self.dir, family, None).map_err(|e| {
            anyhow!(
                "Failed to load font family '{}' from {}: {}",
                family,
                self.dir.display(),
                e
            )
        })
    }
}

fn pt_to_mm(points: f32) -> f64 {
    f64::from(points) * 25.4 / 72.0
}

/// Number of body lines a spacer of `height` points occupies.
fn spacer_lines(height: f32, body: &ParagraphStyle) -> f64 {
    f64::from(height / body.leading)
}

fn color(rgb: Rgb) -> Color {
    Color::Rgb(rgb.0, rgb.1, rgb.2)
}

/// Renders element lists to PDF files
pub struct PdfWriter {
    styles: PdfStyles,
    fonts: FontSource,
    title: String,
}

impl PdfWriter {
    pub fn new(fonts: FontSource, title: impl Into<String>) -> Self {
        Self {
            styles: PdfStyles::default(),
            fonts,
            title: title.into(),
        }
    }

    fn base_style(&self, style: &ParagraphStyle, mono: FontFamily<Font>) -> Style {
        let mut s = Style::new()
            .with_font_size(style.font_size.round() as u8)
            .with_color(color(style.color))
            .with_line_spacing(f64::from(style.leading / style.font_size));
        if style.bold {
            s = s.bold();
        }
        if style.monospace {
            s = s.with_font_family(mono);
        }
        s
    }

    fn span_style(&self, base: Style, span: &Span, mono: FontFamily<Font>) -> Style {
        let mut s = base;
        if span.bold {
            s = s.bold();
        }
        if span.italic {
            s = s.italic();
        }
        if span.monospace {
            s = s.with_font_family(mono);
        }
        s
    }

    fn margins(style: &ParagraphStyle) -> Margins {
        Margins::trbl(
            pt_to_mm(style.space_before),
            pt_to_mm(style.right_indent),
            pt_to_mm(style.space_after),
            pt_to_mm(style.left_indent),
        )
    }

    fn push_element(&self, doc: &mut Document, element: &Element, mono: FontFamily<Font>) {
        let Some(name) = element.style() else {
            if let Element::Spacer { height } = element {
                doc.push(Break::new(spacer_lines(*height, &self.styles.body)));
            }
            return;
        };
        let style = self.styles.get(name);
        let base = self.base_style(style, mono);

        match element {
            Element::CodeBlock { text } => {
                let mut layout = LinearLayout::vertical();
                for line in text.split('\n') {
                    if line.is_empty() {
                        layout.push(Break::new(1));
                    } else {
                        layout.push(Paragraph::new(StyledString::new(line.to_string(), base)));
                    }
                }
                doc.push(layout.padded(Self::margins(style)));
            }
            Element::Body { text } => {
                let mut paragraph = Paragraph::default();
                for span in inline::spans(text) {
                    let s = self.span_style(base, &span, mono);
                    paragraph.push(StyledString::new(span.text, s));
                }
                doc.push(paragraph.padded(Self::margins(style)));
            }
            Element::Heading { text, .. } | Element::Bullet { text } | Element::Numbered { text } => {
                doc.push(
                    Paragraph::new(StyledString::new(text.clone(), base))
                        .padded(Self::margins(style)),
                );
            }
            Element::Spacer { .. } => {}
        }
    }

    /// Lay out `elements` and write the PDF to `path`.
    pub fn render_to_file(&self, elements: &[Element], path: &Path) -> Result<()> {
        let regular = self.fonts.load(&self.fonts.family)?;
        let mono_data = self.fonts.load(&self.fonts.mono_family)?;

        let mut doc = Document::new(regular);
        let mono = doc.add_font_family(mono_data);
        doc.set_title(self.title.clone());
        doc.set_paper_size(PaperSize::A4);

        let mut decorator = SimplePageDecorator::new();
        decorator.set_margins(Margins::all(MARGIN_MM));
        doc.set_page_decorator(decorator);

        for element in elements {
            self.push_element(&mut doc, element, mono);
        }

        log::info!("writing {} elements to {}", elements.len(), path.display());
        doc.render_to_file(path)
            .map_err(|e| anyhow!("{}", e))
            .with_context(|| format!("Failed to write PDF: {}", path.display()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_conversion() {
        assert!((pt_to_mm(72.0) - 25.4).abs() < 1e-9);
        assert_eq!(pt_to_mm(0.0), 0.0);
    }

    #[test]
    fn spacer_lines_scale_with_body_leading() {
        let styles = PdfStyles::default();
        assert!((spacer_lines(14.0, &styles.body) - 1.0).abs() < 1e-6);
        assert!((spacer_lines(7.2, &styles.body) - 0.514).abs() < 1e-3);
    }

    #[test]
    fn missing_fonts_are_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let writer = PdfWriter::new(
            FontSource {
                dir: dir.path().to_path_buf(),
                family: "Missing".into(),
                mono_family: "MissingMono".into(),
            },
            "Doc",
        );
        let out = dir.path().join("out.pdf");
        let err = writer
            .render_to_file(&[Element::Body { text: "x".into() }], &out)
            .unwrap_err();
        assert!(err.to_string().contains("Missing"));
        assert!(!out.exists());
    }
}
