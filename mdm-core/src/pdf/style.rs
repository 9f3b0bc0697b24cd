//! Paragraph styles for printable output

use serde::Serialize;

/// Points per inch, used for spacer heights.
pub const INCH: f32 = 72.0;

/// Style names understood by the writer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StyleName {
    #[serde(rename = "CustomH1")]
    Heading1,
    #[serde(rename = "CustomH2")]
    Heading2,
    #[serde(rename = "CustomH3")]
    Heading3,
    #[serde(rename = "CodeBlock")]
    CodeBlock,
    #[serde(rename = "CustomBody")]
    Body,
}

impl StyleName {
    pub fn as_str(&self) -> &'static str {
        match self {
            StyleName::Heading1 => "CustomH1",
            StyleName::Heading2 => "CustomH2",
            StyleName::Heading3 => "CustomH3",
            StyleName::CodeBlock => "CodeBlock",
            StyleName::Body => "CustomBody",
        }
    }
}

/// An sRGB colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Parse `#rrggbb`
    pub const fn hex(value: u32) -> Self {
        Rgb(
            ((value >> 16) & 0xff) as u8,
            ((value >> 8) & 0xff) as u8,
            (value & 0xff) as u8,
        )
    }
}

/// Layout attributes of a paragraph style. Sizes are in points.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParagraphStyle {
    pub name: StyleName,
    pub font_size: f32,
    pub leading: f32,
    pub color: Rgb,
    pub space_before: f32,
    pub space_after: f32,
    pub left_indent: f32,
    pub right_indent: f32,
    pub monospace: bool,
    pub bold: bool,
    pub background: Option<Rgb>,
}

impl ParagraphStyle {
    fn base(name: StyleName, font_size: f32, color: Rgb) -> Self {
        Self {
            name,
            font_size,
            leading: font_size * 1.2,
            color,
            space_before: 0.0,
            space_after: 0.0,
            left_indent: 0.0,
            right_indent: 0.0,
            monospace: false,
            bold: false,
            background: None,
        }
    }
}

/// The fixed stylesheet
#[derive(Debug, Clone, Serialize)]
pub struct PdfStyles {
    pub h1: ParagraphStyle,
    pub h2: ParagraphStyle,
    pub h3: ParagraphStyle,
    pub code: ParagraphStyle,
    pub body: ParagraphStyle,
}

impl Default for PdfStyles {
    fn default() -> Self {
        Self {
            h1: ParagraphStyle {
                space_before: 12.0,
                space_after: 12.0,
                bold: true,
                ..ParagraphStyle::base(StyleName::Heading1, 24.0, Rgb::hex(0x2c3e50))
            },
            h2: ParagraphStyle {
                space_before: 10.0,
                space_after: 10.0,
                bold: true,
                ..ParagraphStyle::base(StyleName::Heading2, 18.0, Rgb::hex(0x34495e))
            },
            h3: ParagraphStyle {
                space_before: 8.0,
                space_after: 8.0,
                bold: true,
                ..ParagraphStyle::base(StyleName::Heading3, 14.0, Rgb::hex(0x34495e))
            },
            code: ParagraphStyle {
                space_before: 10.0,
                space_after: 10.0,
                left_indent: 10.0,
                right_indent: 10.0,
                monospace: true,
                background: Some(Rgb::hex(0xf6f8fa)),
                ..ParagraphStyle::base(StyleName::CodeBlock, 9.0, Rgb::hex(0x000000))
            },
            body: ParagraphStyle {
                leading: 14.0,
                space_after: 8.0,
                ..ParagraphStyle::base(StyleName::Body, 11.0, Rgb::hex(0x333333))
            },
        }
    }
}

impl PdfStyles {
    pub fn get(&self, name: StyleName) -> &ParagraphStyle {
        match name {
            StyleName::Heading1 => &self.h1,
            StyleName::Heading2 => &self.h2,
            StyleName::Heading3 => &self.h3,
            StyleName::CodeBlock => &self.code,
            StyleName::Body => &self.body,
        }
    }
}
