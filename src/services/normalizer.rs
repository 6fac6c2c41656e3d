//! Feed item normalization.
//!
//! Feed payloads are wildly inconsistent: the same logical field may arrive
//! as a bare string, wrapped one level under a text-content key, or inside an
//! attribute-bearing element. Normalization flattens every field through one
//! extraction path and validates the result, so the rest of the pipeline only
//! ever sees a canonical draft.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::models::job::JobDraft;

/// Text-content keys probed, in order, when a field arrives wrapped in an
/// object instead of as a bare string.
const TEXT_KEYS: [&str; 2] = ["#text", "_"];

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum NormalizeError {
    #[error("item has neither a title nor a url")]
    MissingRequiredFields,
}

/// Extract the textual value of one field, whatever its shape.
///
/// Tries the bare value first, then each text-content alias on a wrapping
/// object; the first string-typed hit wins. Anything else is an empty string.
pub fn field_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(map) => TEXT_KEYS
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    }
}

/// Look up `key` on a raw item and extract its text. Repeated tags parse into
/// arrays; the first occurrence is the one that counts.
pub fn item_field(item: &Value, key: &str) -> String {
    match item.get(key) {
        None => String::new(),
        Some(Value::Array(values)) => values.first().map(field_text).unwrap_or_default(),
        Some(value) => field_text(value),
    }
}

fn first_field(item: &Value, keys: &[&str]) -> String {
    keys.iter()
        .map(|key| item_field(item, key))
        .find(|text| !text.is_empty())
        .unwrap_or_default()
}

/// Lenient timestamp parsing: RSS uses RFC 2822, Atom uses RFC 3339. A date
/// that parses as neither is dropped rather than failing the item.
pub fn parse_posted_date(text: &str) -> Option<DateTime<Utc>> {
    if text.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc2822(text)
        .or_else(|_| DateTime::parse_from_rfc3339(text))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Normalize one raw feed item into a job draft.
///
/// An item whose title and url both resolve empty is a validation failure,
/// not a silently imported shell. The raw item is preserved verbatim in the
/// draft regardless of which fields resolved.
pub fn normalize_item(item: &Value) -> Result<JobDraft, NormalizeError> {
    let title = item_field(item, "title");
    let url = first_field(item, &["url", "link"]);

    if title.is_empty() && url.is_empty() {
        return Err(NormalizeError::MissingRequiredFields);
    }

    let posted_date = parse_posted_date(&first_field(item, &["pubDate", "published", "date"]));

    Ok(JobDraft {
        title,
        company: first_field(item, &["company", "author", "creator"]),
        location: item_field(item, "location"),
        description: first_field(item, &["description", "summary", "content"]),
        url,
        category: item_field(item, "category"),
        job_type: first_field(item, &["jobType", "type"]),
        region: item_field(item, "region"),
        posted_date,
        raw_payload: item.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bare_string_field() {
        assert_eq!(field_text(&json!("Engineer")), "Engineer");
    }

    #[test]
    fn wrapped_text_field() {
        assert_eq!(field_text(&json!({"#text": "Engineer"})), "Engineer");
    }

    #[test]
    fn alias_key_probed_after_primary() {
        assert_eq!(field_text(&json!({"_": "Engineer"})), "Engineer");
        // Primary alias wins when both are present.
        assert_eq!(
            field_text(&json!({"#text": "primary", "_": "alias"})),
            "primary"
        );
    }

    #[test]
    fn non_string_shapes_resolve_empty() {
        assert_eq!(field_text(&json!(42)), "");
        assert_eq!(field_text(&json!({"href": "http://x"})), "");
        assert_eq!(field_text(&json!(null)), "");
    }

    #[test]
    fn fallback_is_per_field() {
        let item = json!({
            "title": "Eng",
            "description": {"#text": "wrapped"},
            "company": {"_": "Acme"},
        });
        let draft = normalize_item(&item).unwrap();
        assert_eq!(draft.title, "Eng");
        assert_eq!(draft.description, "wrapped");
        assert_eq!(draft.company, "Acme");
    }

    #[test]
    fn url_falls_back_to_link() {
        let item = json!({"title": "Eng", "link": "http://x/1"});
        let draft = normalize_item(&item).unwrap();
        assert_eq!(draft.url, "http://x/1");
    }

    #[test]
    fn missing_title_and_url_is_a_validation_failure() {
        let item = json!({"description": "no title, no link"});
        assert_eq!(
            normalize_item(&item),
            Err(NormalizeError::MissingRequiredFields)
        );
    }

    #[test]
    fn title_alone_is_enough() {
        let item = json!({"title": "Eng"});
        let draft = normalize_item(&item).unwrap();
        assert_eq!(draft.title, "Eng");
        assert_eq!(draft.url, "");
    }

    #[test]
    fn raw_payload_preserved_verbatim() {
        let item = json!({"title": "Eng", "weird": {"nested": [1, 2]}});
        let draft = normalize_item(&item).unwrap();
        assert_eq!(draft.raw_payload, item);
    }

    #[test]
    fn rfc2822_and_rfc3339_dates_parse() {
        assert!(parse_posted_date("Tue, 01 Jul 2025 09:00:00 GMT").is_some());
        assert!(parse_posted_date("2025-07-01T09:00:00Z").is_some());
        assert!(parse_posted_date("next Tuesday").is_none());
    }

    #[test]
    fn repeated_category_uses_first() {
        let item = json!({"title": "Eng", "category": ["rust", "backend"]});
        let draft = normalize_item(&item).unwrap();
        assert_eq!(draft.category, "rust");
    }
}
