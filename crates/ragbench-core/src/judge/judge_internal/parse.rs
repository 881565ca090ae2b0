use serde::de::DeserializeOwned;

/// Drop a surrounding Markdown code fence (with or without a language tag).
pub(crate) fn strip_fences(text: &str) -> &str {
    let t = text.trim();
    let Some(rest) = t.strip_prefix("```") else {
        return t;
    };
    // skip the info string ("json", "JSON", ...)
    let body = match rest.find('\n') {
        Some(nl) => &rest[nl + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// First JSON object in the model output, tolerating fences and surrounding prose.
pub(crate) fn extract_json(text: &str) -> anyhow::Result<serde_json::Value> {
    let text = strip_fences(text);
    let start = text
        .find('{')
        .ok_or_else(|| anyhow::anyhow!("No JSON object start found in judge output"))?;
    let segment = &text[start..];

    serde_json::Deserializer::from_str(segment)
        .into_iter::<serde_json::Value>()
        .next()
        .ok_or_else(|| anyhow::anyhow!("No JSON object found in extracted text"))?
        .map_err(|e| anyhow::anyhow!("Invalid JSON: {}", e))
}

pub(crate) fn parse_verdict<T: DeserializeOwned>(text: &str) -> anyhow::Result<T> {
    let value = extract_json(text)?;
    serde_json::from_value(value).map_err(|e| anyhow::anyhow!("Unexpected judge JSON shape: {}", e))
}

pub(crate) fn clamp_score(v: f64) -> f64 {
    if v.is_finite() {
        v.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

pub(crate) fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tagged_and_bare_fences() {
        assert_eq!(strip_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_fences("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_fences("  {\"a\":1} "), "{\"a\":1}");
    }

    #[test]
    fn extracts_object_out_of_prose() {
        let v = extract_json("Sure! Here you go: {\"score\": 0.5} hope that helps {\"x\":1}").unwrap();
        assert_eq!(v["score"], 0.5);
    }

    #[test]
    fn no_object_is_an_error() {
        assert!(extract_json("I cannot grade this.").is_err());
        assert!(extract_json("{\"score\": ").is_err());
    }

    #[test]
    fn clamps_out_of_range_scores() {
        assert_eq!(clamp_score(1.7), 1.0);
        assert_eq!(clamp_score(-0.2), 0.0);
        assert_eq!(clamp_score(f64::NAN), 0.0);
        assert_eq!(round3(0.123_456), 0.123);
    }
}
