//! Report rendering.
//!
//! Every format reads the same [`Report`] and goes through the helpers in
//! this module for numbers, so a value rounds identically in each output.
//! Rounding to two decimals happens here and nowhere earlier.

mod chat;
mod json;
mod text;

use serde::Serialize;

use crate::change::ChangeResult;
use crate::model::{Report, Unit};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Format {
    Text,
    Json,
    ChatMarkup,
}

impl Format {
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Text => "text",
            Format::Json => "json",
            Format::ChatMarkup => "chat_markup",
        }
    }

    /// Whether `content` is already a JSON document.
    pub fn is_json(&self) -> bool {
        matches!(self, Format::Json | Format::ChatMarkup)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedArtifact {
    pub format: Format,
    pub content: String,
}

pub fn render(report: &Report, format: Format) -> RenderedArtifact {
    let content = match format {
        Format::Text => text::render(report),
        Format::Json => json::render(report),
        Format::ChatMarkup => chat::render(report),
    };

    RenderedArtifact { format, content }
}

pub fn render_all(report: &Report, formats: &[Format]) -> Vec<RenderedArtifact> {
    formats.iter().map(|f| render(report, *f)).collect()
}

pub(crate) fn title(report: &Report) -> String {
    format!("Market Summary for {}", report.date().format("%Y-%m-%d"))
}

pub fn round2(value: f64) -> f64 {
    let rounded = (value * 100.0).round() / 100.0;
    // fold -0.0 into 0.0
    if rounded == 0.0 { 0.0 } else { rounded }
}

/// Two decimals with thousands separators: `-1,234.50`.
pub fn grouped(value: f64) -> String {
    let value = round2(value);
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut out = String::with_capacity(fixed.len() + int_part.len() / 3 + 1);
    if value < 0.0 {
        out.push('-');
    }
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out.push('.');
    out.push_str(frac_part);
    out
}

/// Like [`grouped`] but always carries a sign unless the rounded value is zero.
pub fn signed(value: f64) -> String {
    if round2(value) > 0.0 {
        format!("+{}", grouped(value))
    } else {
        grouped(value)
    }
}

impl Unit {
    pub fn format_value(self, value: f64) -> String {
        match self {
            Unit::Price | Unit::Level => grouped(value),
            Unit::Percent => format!("{}%", grouped(value)),
        }
    }

    pub fn format_change(self, change: &ChangeResult) -> String {
        match self {
            Unit::Percent => format!("{} pp", signed(change.absolute_change)),
            Unit::Price | Unit::Level => {
                let pct = change
                    .percent_change
                    .map(|p| format!("{}%", signed(p)))
                    .unwrap_or_else(|| "n/a".to_string());
                format!("{} ({})", signed(change.absolute_change), pct)
            }
        }
    }
}
