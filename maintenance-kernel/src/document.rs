//! Small typed document tree used for plans and reports.
//!
//! Composition code builds `Section`s; only `Display` turns them into text,
//! so section order and bullet prefixes live in one place.
//!
//! Numbers go through [`fmt_number`]: always plain decimal notation, whole
//! values with one decimal, so an integer reading of 92 renders as `92.0`.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum SectionBody {
    /// `- item` per entry
    Bullets(Vec<String>),
    /// `1. item`, `2. item`, ...
    Numbered(Vec<String>),
    /// verbatim text, may span several lines
    Paragraph(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub title: String,
    pub body: SectionBody,
}

impl Section {
    pub fn bullets(title: impl Into<String>, items: Vec<String>) -> Self {
        Self { title: title.into(), body: SectionBody::Bullets(items) }
    }

    pub fn numbered(title: impl Into<String>, items: Vec<String>) -> Self {
        Self { title: title.into(), body: SectionBody::Numbered(items) }
    }

    pub fn paragraph(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self { title: title.into(), body: SectionBody::Paragraph(text.into()) }
    }
}

/// `# title`, optional preamble lines, then `## section` blocks.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub title: String,
    pub preamble: Vec<String>,
    pub sections: Vec<Section>,
}

impl Document {
    pub fn new(title: impl Into<String>) -> Self {
        Self { title: title.into(), preamble: Vec::new(), sections: Vec::new() }
    }

    pub fn with_preamble(mut self, line: impl Into<String>) -> Self {
        self.preamble.push(line.into());
        self
    }

    pub fn with_section(mut self, section: Section) -> Self {
        self.sections.push(section);
        self
    }

    pub fn section(&self, title: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.title == title)
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "# {}", self.title)?;
        for line in &self.preamble {
            write!(f, "\n{line}")?;
        }
        for section in &self.sections {
            write!(f, "\n## {}", section.title)?;
            match &section.body {
                SectionBody::Bullets(items) => {
                    for item in items {
                        write!(f, "\n- {item}")?;
                    }
                }
                SectionBody::Numbered(items) => {
                    for (i, item) in items.iter().enumerate() {
                        write!(f, "\n{}. {item}", i + 1)?;
                    }
                }
                SectionBody::Paragraph(text) => write!(f, "\n{text}")?,
            }
        }
        Ok(())
    }
}

/// Render a number the way reports show it: whole values keep one decimal
/// (`2.0`), others use the shortest round-trip form (`0.7`, `8.2`).
///
/// Readings are `f64` once parsed, so an integer JSON reading such as
/// `"Temperature": 92` prints as `92.0`, in queries and rationales alike.
/// Magnitudes of 1e15 and above, and non-finite values, fall back to Rust's
/// `Display` for `f64` (`10000000000000000`, `inf`); there is no exponent form.
pub fn fmt_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

/// First `max_chars` characters of `text` (char boundary safe).
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_sections_in_order() {
        let doc = Document::new("Title")
            .with_preamble("intro")
            .with_section(Section::bullets("List", vec!["a".into(), "b".into()]))
            .with_section(Section::numbered("Steps", vec!["x".into(), "y".into()]))
            .with_section(Section::paragraph("Note", "line1\nline2"));
        assert_eq!(
            doc.to_string(),
            "# Title\nintro\n## List\n- a\n- b\n## Steps\n1. x\n2. y\n## Note\nline1\nline2"
        );
    }

    #[test]
    fn number_formatting() {
        assert_eq!(fmt_number(0.0), "0.0");
        assert_eq!(fmt_number(0.7), "0.7");
        assert_eq!(fmt_number(3.5), "3.5");
        assert_eq!(fmt_number(2.0), "2.0");
        assert_eq!(fmt_number(92.0), "92.0");
        assert_eq!(fmt_number(8.2), "8.2");
        assert_eq!(fmt_number(1e16), "10000000000000000");
        assert_eq!(fmt_number(0.0001), "0.0001");
    }

    #[test]
    fn truncation_respects_multibyte_chars() {
        assert_eq!(truncate_chars("°C°C", 3), "°C°");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }
}
