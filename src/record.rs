//! Records produced by the two passes and the combined analysis output.
//!
//! Models are loose about JSON types ("vintage": 2015 vs "2015", a single
//! grape as a bare string, tasting notes as one sentence), so decoding is
//! lenient: a value in an unexpected shape is kept as text, never dropped.
//! Encoding is strict: every declared field is always present, `null` when
//! unknown.

use crate::error::StageError;
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Fields read from the label itself (Pass A).
///
/// Every field is optional and is only populated when the label text
/// supports it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedRecord {
    #[serde(default, deserialize_with = "text")]
    pub producer: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub wine_name: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub vintage: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub region: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub country: Option<String>,
    /// One or many varieties.
    #[serde(default, deserialize_with = "one_or_many")]
    pub grapes: Option<Vec<String>>,
    #[serde(default, deserialize_with = "text")]
    pub appellation: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub abv: Option<String>,
    /// Transcript of the legible label text.
    #[serde(default, deserialize_with = "text")]
    pub label_text: Option<String>,
    /// Model's self-reported confidence. Not clamped here; see
    /// [`crate::render::clamp_confidence`].
    #[serde(default, deserialize_with = "number")]
    pub confidence: Option<f64>,
}

/// Contextual, explicitly inferred explanation (Pass B).
///
/// Contains no label fields, so it cannot override what Pass A read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    #[serde(default, deserialize_with = "text")]
    pub overview: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub style: Option<String>,
    /// A bare string is kept as the palate note.
    #[serde(default, deserialize_with = "tasting_notes")]
    pub tasting_notes: Option<TastingNotes>,
    #[serde(default, deserialize_with = "list")]
    pub food_pairings: Vec<String>,
    /// A bare string is kept as the temperature line.
    #[serde(default, deserialize_with = "serving")]
    pub serving: Option<ServingGuidance>,
    #[serde(default, deserialize_with = "text")]
    pub aging_window: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub producer_background: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub region_background: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub price_context: Option<String>,
    #[serde(default, deserialize_with = "list")]
    pub uncertainties: Vec<String>,
    #[serde(default, deserialize_with = "list")]
    pub follow_up_questions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TastingNotes {
    #[serde(default, alias = "aroma", deserialize_with = "text")]
    pub nose: Option<String>,
    #[serde(default, alias = "taste", deserialize_with = "text")]
    pub palate: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub finish: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServingGuidance {
    #[serde(default, deserialize_with = "text")]
    pub temperature: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub decanting: Option<String>,
    #[serde(default, alias = "glass", deserialize_with = "text")]
    pub glassware: Option<String>,
}

/// Everything one analysis produced.
///
/// `enrichment_error` and `raw` are set together when the enrichment pass
/// failed after a successful extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOutput {
    pub extracted: ExtractedRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enriched: Option<EnrichedRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrichment_error: Option<StageError>,
    /// Raw enrichment material (model text or upstream body) on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
    pub stats: AnalysisStats,
}

impl AnalysisOutput {
    /// True when enrichment was attempted and failed.
    pub fn is_partial(&self) -> bool {
        self.enrichment_error.is_some()
    }
}

/// Wall-clock timings for one analysis.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisStats {
    pub extraction_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrichment_ms: Option<u64>,
    pub total_ms: u64,
}

// ── Lenient decoders ─────────────────────────────────────────────────────
//
// Only `null`, a missing key or blank text decode to `None`. Any other shape
// keeps its content as text so nothing the model wrote is lost.

fn text<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(de)?.and_then(flatten_text))
}

fn one_or_many<'de, D>(de: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let items = list(de)?;
    Ok((!items.is_empty()).then_some(items))
}

fn number<'de, D>(de: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(de)?
        .as_ref()
        .and_then(numeric)
        .filter(|n| n.is_finite()))
}

fn list<'de, D>(de: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(de)? {
        Some(Value::Array(items)) => items.into_iter().filter_map(flatten_text).collect(),
        Some(other) => flatten_text(other).into_iter().collect(),
        None => Vec::new(),
    })
}

fn tasting_notes<'de, D>(de: D) -> Result<Option<TastingNotes>, D::Error>
where
    D: Deserializer<'de>,
{
    nested(de, |note| TastingNotes {
        palate: Some(note),
        ..Default::default()
    })
}

fn serving<'de, D>(de: D) -> Result<Option<ServingGuidance>, D::Error>
where
    D: Deserializer<'de>,
{
    nested(de, |note| ServingGuidance {
        temperature: Some(note),
        ..Default::default()
    })
}

/// An object decodes field by field; any other non-null shape becomes one
/// line of text placed by `from_text`.
fn nested<'de, D, T, F>(de: D, from_text: F) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
    F: FnOnce(String) -> T,
{
    match Option::<Value>::deserialize(de)? {
        Some(obj @ Value::Object(_)) => T::deserialize(obj).map(Some).map_err(D::Error::custom),
        Some(other) => Ok(flatten_text(other).map(from_text)),
        None => Ok(None),
    }
}

/// Text content of an arbitrary JSON value.
///
/// Strings are kept as-is, numbers and booleans are printed, arrays are
/// joined with `", "`. A single-entry object yields its value; a larger one
/// is kept as compact JSON.
fn flatten_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => (!s.trim().is_empty()).then_some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.into_iter().filter_map(flatten_text).collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        Value::Object(map) if map.len() <= 1 => {
            map.into_iter().next().and_then(|(_, v)| flatten_text(v))
        }
        obj @ Value::Object(_) => Some(obj.to_string()),
    }
}

/// Read a JSON number, or a string that parses as one.
pub(crate) fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn omitted_fields_become_null() {
        let rec: ExtractedRecord = serde_json::from_str(r#"{"producer":"Chateau X"}"#).unwrap();
        assert_eq!(rec.producer.as_deref(), Some("Chateau X"));
        assert!(rec.vintage.is_none());

        let out = serde_json::to_value(&rec).unwrap();
        let obj = out.as_object().unwrap();
        assert_eq!(obj.len(), 10);
        assert_eq!(obj["wine_name"], Value::Null);
        assert_eq!(obj["grapes"], Value::Null);
        assert_eq!(obj["confidence"], Value::Null);
    }

    #[test]
    fn unknown_keys_are_dropped() {
        let rec: ExtractedRecord =
            serde_json::from_str(r#"{"producer":"X","critic_score":98}"#).unwrap();
        let out = serde_json::to_value(&rec).unwrap();
        assert!(out.get("critic_score").is_none());
    }

    #[test]
    fn vintage_and_abv_accept_numbers() {
        let rec: ExtractedRecord = serde_json::from_str(r#"{"vintage":2015,"abv":13.5}"#).unwrap();
        assert_eq!(rec.vintage.as_deref(), Some("2015"));
        assert_eq!(rec.abv.as_deref(), Some("13.5"));
    }

    #[test]
    fn grapes_one_or_many() {
        let one: ExtractedRecord = serde_json::from_str(r#"{"grapes":"Nebbiolo"}"#).unwrap();
        assert_eq!(one.grapes, Some(vec!["Nebbiolo".to_string()]));

        let many: ExtractedRecord =
            serde_json::from_str(r#"{"grapes":["Cinsault","Carignan",null]}"#).unwrap();
        assert_eq!(
            many.grapes,
            Some(vec!["Cinsault".to_string(), "Carignan".to_string()])
        );

        let empty: ExtractedRecord = serde_json::from_str(r#"{"grapes":[]}"#).unwrap();
        assert_eq!(empty.grapes, None);
    }

    #[test]
    fn confidence_non_numeric_is_unknown() {
        let rec: ExtractedRecord = serde_json::from_str(r#"{"confidence":"high"}"#).unwrap();
        assert_eq!(rec.confidence, None);
        let rec: ExtractedRecord = serde_json::from_str(r#"{"confidence":"0.7"}"#).unwrap();
        assert_eq!(rec.confidence, Some(0.7));
        let rec: ExtractedRecord = serde_json::from_str(r#"{"confidence":1.4}"#).unwrap();
        assert_eq!(rec.confidence, Some(1.4));
    }

    #[test]
    fn enriched_lists_tolerate_null() {
        let rec: EnrichedRecord = serde_json::from_value(json!({
            "overview": "A structured Lebanese red.",
            "food_pairings": null,
            "uncertainties": ["Blend proportions are not on the label."]
        }))
        .unwrap();
        assert!(rec.food_pairings.is_empty());
        assert_eq!(rec.uncertainties.len(), 1);
        assert!(rec.follow_up_questions.is_empty());
    }

    #[test]
    fn label_fields_in_other_shapes_keep_their_text() {
        let rec: ExtractedRecord = serde_json::from_value(json!({
            "producer": "Chateau X",
            "region": ["Bordeaux", "Pomerol"],
            "appellation": {"name": "Pomerol"},
            "country": {"name": "France", "code": "FR"},
            "wine_name": "  ",
            "label_text": 1961
        }))
        .unwrap();
        assert_eq!(rec.region.as_deref(), Some("Bordeaux, Pomerol"));
        assert_eq!(rec.appellation.as_deref(), Some("Pomerol"));
        let country = rec.country.unwrap();
        assert!(country.contains(r#""name":"France""#));
        assert!(country.contains(r#""code":"FR""#));
        assert_eq!(rec.wine_name, None);
        assert_eq!(rec.label_text.as_deref(), Some("1961"));
    }

    #[test]
    fn grapes_accept_nested_shapes() {
        let rec: ExtractedRecord = serde_json::from_value(json!({
            "grapes": [{"variety": "Merlot"}, "Cabernet Franc", ""]
        }))
        .unwrap();
        assert_eq!(
            rec.grapes,
            Some(vec!["Merlot".to_string(), "Cabernet Franc".to_string()])
        );
    }

    #[test]
    fn enriched_tolerates_flat_sections() {
        let rec: EnrichedRecord = serde_json::from_value(json!({
            "overview": "A Right Bank red.",
            "style": 7,
            "tasting_notes": "Plum, cedar, cocoa",
            "serving": "16-18°C",
            "aging_window": ["2025", "2040"],
            "food_pairings": "Duck"
        }))
        .unwrap();
        assert_eq!(rec.overview.as_deref(), Some("A Right Bank red."));
        assert_eq!(rec.style.as_deref(), Some("7"));
        let notes = rec.tasting_notes.unwrap();
        assert_eq!(notes.palate.as_deref(), Some("Plum, cedar, cocoa"));
        assert_eq!(notes.nose, None);
        assert_eq!(rec.serving.unwrap().temperature.as_deref(), Some("16-18°C"));
        assert_eq!(rec.aging_window.as_deref(), Some("2025, 2040"));
        assert_eq!(rec.food_pairings, vec!["Duck".to_string()]);
    }

    #[test]
    fn enriched_sections_accept_aliases_and_lists() {
        let rec: EnrichedRecord = serde_json::from_value(json!({
            "tasting_notes": {"aroma": ["violet", "tar"], "finish": "Long"},
            "serving": {"temperature": 17, "glass": "Burgundy bowl"},
            "tasting_notes_extra": "ignored"
        }))
        .unwrap();
        let notes = rec.tasting_notes.unwrap();
        assert_eq!(notes.nose.as_deref(), Some("violet, tar"));
        assert_eq!(notes.finish.as_deref(), Some("Long"));
        let serving = rec.serving.unwrap();
        assert_eq!(serving.temperature.as_deref(), Some("17"));
        assert_eq!(serving.glassware.as_deref(), Some("Burgundy bowl"));
    }

    #[test]
    fn output_omits_absent_enrichment() {
        let out = AnalysisOutput {
            extracted: ExtractedRecord::default(),
            enriched: None,
            enrichment_error: None,
            raw: None,
            stats: AnalysisStats::default(),
        };
        let v = serde_json::to_value(&out).unwrap();
        assert!(v.get("enriched").is_none());
        assert!(v.get("raw").is_none());
        assert!(!out.is_partial());
    }
}
