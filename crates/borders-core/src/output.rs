//! Text serializations of extracted borders for sector metadata files.

use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// One border as written to sector metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorderRecord {
    pub allegiance: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub wrap_label: bool,
    /// Hex labels in loop order
    pub path: Vec<String>,
}

impl BorderRecord {
    pub fn new(allegiance: &str, path: Vec<String>) -> Self {
        Self {
            allegiance: allegiance.to_string(),
            label: None,
            wrap_label: false,
            path,
        }
    }

    pub fn with_label(mut self, label: &str, wrap: bool) -> Self {
        self.label = Some(label.to_string());
        self.wrap_label = wrap;
        self
    }
}

/// Output format selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BorderFormat {
    #[default]
    Xml,
    Msec,
    Json,
}

impl BorderFormat {
    pub fn render(self, records: &[BorderRecord]) -> String {
        match self {
            BorderFormat::Xml => to_xml(records),
            BorderFormat::Msec => to_msec(records),
            BorderFormat::Json => to_json(records),
        }
    }
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// `<Borders>` element for sector XML metadata
pub fn to_xml(records: &[BorderRecord]) -> String {
    let mut out = String::from("<Borders>\n");
    for record in records {
        // Writing into a String cannot fail
        let _ = write!(out, "  <Border Allegiance=\"{}\"", escape_xml(&record.allegiance));
        if let Some(label) = &record.label {
            let _ = write!(out, " Label=\"{}\"", escape_xml(label));
        }
        if record.wrap_label {
            out.push_str(" WrapLabel=\"true\"");
        }
        let _ = writeln!(out, ">{}</Border>", escape_xml(&record.path.join(" ")));
    }
    out.push_str("</Borders>\n");
    out
}

/// `border` lines for MSEC metadata, each preceded by a comment naming the
/// allegiance.
pub fn to_msec(records: &[BorderRecord]) -> String {
    let mut out = String::new();
    for record in records {
        let _ = match &record.label {
            Some(label) => writeln!(out, "# {} {}", record.allegiance, label),
            None => writeln!(out, "# {}", record.allegiance),
        };
        let _ = writeln!(out, "border {}", record.path.join(" "));
    }
    out
}

pub fn to_json(records: &[BorderRecord]) -> String {
    serde_json::to_string_pretty(records).unwrap_or_else(|_| "[]".to_string())
}
