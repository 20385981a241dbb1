//! Prompts for the two model passes.
//!
//! Pass A ([`EXTRACTION_PROMPT`]) may only report what is printed on the
//! label. Pass B ([`enrichment_prompt`]) receives Pass A's JSON as context and
//! adds explanation that is explicitly inferred. The "label-grounded only"
//! policy is enforced here, in the instructions, not in code.

/// Instruction sent with the label photo in the extraction pass.
pub const EXTRACTION_PROMPT: &str = r#"You are reading a photograph of a wine label.

Return STRICT JSON only. No prose, no markdown fences, no comments.

Use exactly these keys:
{
  "producer": string | null,
  "wine_name": string | null,
  "vintage": string | null,
  "region": string | null,
  "country": string | null,
  "grapes": string[] | null,
  "appellation": string | null,
  "abv": string | null,
  "label_text": string | null,
  "confidence": number
}

Rules:
- Only fill a field when it is explicitly printed on the label. If it is not
  printed, use null. Do not guess from the producer, region or style.
- "grapes" lists varieties named on the label; null if none are named.
- "abv" is the alcohol strength as printed, e.g. "13.5% vol".
- "label_text" is a faithful transcript of the legible text, top to bottom,
  lines separated by "\n".
- "confidence" is your confidence from 0 to 1 that the fields are read
  correctly (lower it for blur, glare, or partial labels)."#;

/// Build the text-only enrichment prompt around the extraction result.
///
/// `extracted_json` is embedded verbatim so the model sees exactly what was
/// read from the label and nothing else.
pub fn enrichment_prompt(extracted_json: &str) -> String {
    format!(
        r#"Below is JSON read directly from a wine label. Treat every non-null field as fact.

LABEL DATA:
{extracted_json}

Explain this wine to a curious drinker. Return STRICT JSON only. No prose, no markdown fences.

Use exactly these keys:
{{
  "overview": string | null,
  "style": string | null,
  "tasting_notes": {{ "nose": string | null, "palate": string | null, "finish": string | null }} | null,
  "food_pairings": string[],
  "serving": {{ "temperature": string | null, "decanting": string | null, "glassware": string | null }} | null,
  "aging_window": string | null,
  "producer_background": string | null,
  "region_background": string | null,
  "price_context": string | null,
  "uncertainties": string[],
  "follow_up_questions": string[]
}}

Rules:
- Do not restate, correct, or contradict the label data. Build on it.
- Everything you add is inferred from what is typical for this producer,
  region, grape and vintage. Phrase it as typical ("usually", "typically"),
  never as a verified fact about this bottle.
- Do not invent awards, critic scores, exact prices, production volumes or
  technical specifics (residual sugar, oak regime) you cannot know.
- List in "uncertainties" anything that depends on facts missing from the
  label, and in "follow_up_questions" what the drinker could check to
  resolve them.
- Use null or an empty list rather than filler."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extraction_prompt_names_every_field() {
        for key in [
            "producer",
            "wine_name",
            "vintage",
            "region",
            "country",
            "grapes",
            "appellation",
            "abv",
            "label_text",
            "confidence",
        ] {
            assert!(
                EXTRACTION_PROMPT.contains(&format!("\"{key}\"")),
                "missing key {key}"
            );
        }
        assert!(EXTRACTION_PROMPT.contains("use null"));
    }

    #[test]
    fn enrichment_prompt_embeds_extraction_verbatim() {
        let extracted = r#"{"producer":"Château Musar","vintage":"2015"}"#;
        let prompt = enrichment_prompt(extracted);
        assert!(prompt.contains(extracted));
        assert!(prompt.contains("\"uncertainties\""));
        assert!(prompt.contains("Do not invent awards"));
    }
}
