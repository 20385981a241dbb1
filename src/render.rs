//! Presentation: turn an analysis into a readable Markdown card.
//!
//! Pure functions only. Whatever combination of extracted, enriched, raw and
//! error is available gets rendered; missing values show [`PLACEHOLDER`],
//! lists are joined or bulleted, and confidence is clamped to `[0, 1]`.

use crate::error::{Stage, WineLabelError};
use crate::record::{AnalysisOutput, EnrichedRecord, ExtractedRecord};
use std::fmt::Write as _;

/// Shown for any null or missing field.
pub const PLACEHOLDER: &str = "—";

/// Status line shown while a stage is running.
pub fn status_message(stage: Stage) -> &'static str {
    match stage {
        Stage::Prepare => "Preparing image…",
        Stage::Extraction => "Reading the label…",
        Stage::Enrichment => "Looking up the wine…",
    }
}

/// Clamp a decoded confidence into `[0, 1]`. NaN is unknown.
///
/// Decoding already maps text, booleans and other non-numbers to `None`
/// (see [`crate::record::ExtractedRecord::confidence`]).
pub fn clamp_confidence(confidence: Option<f64>) -> Option<f64> {
    confidence
        .filter(|n| !n.is_nan())
        .map(|n| n.clamp(0.0, 1.0))
}

/// Percentage display of a confidence, or the placeholder.
pub fn format_confidence(confidence: Option<f64>) -> String {
    match clamp_confidence(confidence) {
        Some(n) => format!("{:.0}%", n * 100.0),
        None => PLACEHOLDER.to_string(),
    }
}

/// A field value, or the placeholder when missing or blank.
pub fn field(value: Option<&str>) -> &str {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => PLACEHOLDER,
    }
}

/// Comma-joined list, or the placeholder when empty.
pub fn join_list(items: &[String]) -> String {
    if items.is_empty() {
        PLACEHOLDER.to_string()
    } else {
        items.join(", ")
    }
}

/// Markdown bullet list, or the placeholder when empty.
pub fn bullet_list(items: &[String]) -> String {
    if items.is_empty() {
        return PLACEHOLDER.to_string();
    }
    items
        .iter()
        .map(|item| format!("- {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render a full analysis card.
pub fn render_card(output: &AnalysisOutput) -> String {
    let mut card = String::new();
    card.push_str(&render_extracted(&output.extracted));

    if let Some(ref enriched) = output.enriched {
        card.push('\n');
        card.push_str(&render_enriched(enriched));
    }

    if let Some(ref error) = output.enrichment_error {
        card.push_str("\n## About this wine\n\n");
        let _ = writeln!(card, "Could not explain this wine: {error}");
        if let Some(ref raw) = output.raw {
            card.push('\n');
            card.push_str(&raw_block(raw));
        }
    }

    card
}

/// Render the label-grounded half of the card.
pub fn render_extracted(rec: &ExtractedRecord) -> String {
    let mut out = String::new();

    let title: Vec<&str> = [rec.producer.as_deref(), rec.wine_name.as_deref(), rec.vintage.as_deref()]
        .into_iter()
        .flatten()
        .filter(|s| !s.trim().is_empty())
        .collect();
    let title = if title.is_empty() {
        "Unidentified wine".to_string()
    } else {
        title.join(" · ")
    };
    let _ = writeln!(out, "# {title}\n");
    let _ = writeln!(out, "Confidence: {}\n", format_confidence(rec.confidence));

    out.push_str("## From the label\n\n");
    let grapes = rec.grapes.as_deref().map(join_list);
    let rows = [
        ("Producer", field(rec.producer.as_deref())),
        ("Wine", field(rec.wine_name.as_deref())),
        ("Vintage", field(rec.vintage.as_deref())),
        ("Region", field(rec.region.as_deref())),
        ("Country", field(rec.country.as_deref())),
        ("Appellation", field(rec.appellation.as_deref())),
        ("Grapes", field(grapes.as_deref())),
        ("ABV", field(rec.abv.as_deref())),
    ];
    for (label, value) in rows {
        let _ = writeln!(out, "- **{label}:** {value}");
    }

    out.push_str("\n### Label text\n\n");
    match rec.label_text.as_deref().filter(|t| !t.trim().is_empty()) {
        Some(text) => {
            for line in text.lines() {
                let _ = writeln!(out, "> {line}");
            }
        }
        None => {
            let _ = writeln!(out, "{PLACEHOLDER}");
        }
    }
    out
}

/// Render the inferred half of the card.
pub fn render_enriched(rec: &EnrichedRecord) -> String {
    let mut out = String::new();
    out.push_str("## About this wine\n\n");
    out.push_str("_Inferred from the label; typical, not verified._\n\n");

    let _ = writeln!(out, "**Overview:** {}\n", field(rec.overview.as_deref()));
    let _ = writeln!(out, "**Style:** {}\n", field(rec.style.as_deref()));

    out.push_str("### Tasting notes\n\n");
    let notes = rec.tasting_notes.clone().unwrap_or_default();
    let _ = writeln!(out, "- **Nose:** {}", field(notes.nose.as_deref()));
    let _ = writeln!(out, "- **Palate:** {}", field(notes.palate.as_deref()));
    let _ = writeln!(out, "- **Finish:** {}\n", field(notes.finish.as_deref()));

    out.push_str("### Food pairings\n\n");
    let _ = writeln!(out, "{}\n", bullet_list(&rec.food_pairings));

    out.push_str("### Serving\n\n");
    let serving = rec.serving.clone().unwrap_or_default();
    let _ = writeln!(out, "- **Temperature:** {}", field(serving.temperature.as_deref()));
    let _ = writeln!(out, "- **Decanting:** {}", field(serving.decanting.as_deref()));
    let _ = writeln!(out, "- **Glassware:** {}\n", field(serving.glassware.as_deref()));

    let _ = writeln!(out, "**Aging window:** {}\n", field(rec.aging_window.as_deref()));
    let _ = writeln!(out, "**Producer:** {}\n", field(rec.producer_background.as_deref()));
    let _ = writeln!(out, "**Region:** {}\n", field(rec.region_background.as_deref()));
    let _ = writeln!(out, "**Price:** {}\n", field(rec.price_context.as_deref()));

    out.push_str("### Uncertainties\n\n");
    let _ = writeln!(out, "{}\n", bullet_list(&rec.uncertainties));

    out.push_str("### Worth checking\n\n");
    let _ = writeln!(out, "{}", bullet_list(&rec.follow_up_questions));
    out
}

/// Render a fatal failure, including any raw model or upstream text.
pub fn render_failure(err: &WineLabelError) -> String {
    let mut out = String::new();
    out.push_str("# Could not read this label\n\n");
    let _ = writeln!(out, "{err}");
    if let Some(raw) = err.raw_material() {
        out.push('\n');
        out.push_str(&raw_block(raw));
    }
    out
}

fn raw_block(raw: &str) -> String {
    // A fence longer than any run of backticks in the text keeps it intact.
    let longest_run = raw
        .split(|c| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    let fence = "`".repeat(longest_run.max(2) + 1);
    format!("Raw response:\n\n{fence}text\n{raw}\n{fence}\n")
}
