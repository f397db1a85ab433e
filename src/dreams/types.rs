//! Dream record shape and its mapping onto store records.
//!
//! The store keeps an opaque document plus a metadata map; this module owns
//! the translation between that shape and [`Dream`]. A dream's document is
//! `"{title}\n{entry}"` so both fields weigh into similarity search.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::store::Record;

/// Metadata keys a dream record carries.
const KEY_TITLE: &str = "title";
const KEY_DATE: &str = "date";
const KEY_ENTRY: &str = "entry";
const KEY_OWNER: &str = "owner_email";
const KEY_ANALYSIS: &str = "analysis";
const KEY_IMAGE: &str = "image";

/// A dream journal entry.
///
/// `id` and `owner_email` are immutable after creation; `analysis` and
/// `image` are the only mutable fields, set by the enrichment workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dream {
    pub id: String,
    pub title: String,
    /// Caller-supplied free text; not validated as a calendar date.
    pub date: String,
    pub entry: String,
    pub owner_email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Dream {
    /// Rebuild a dream from a raw store record.
    ///
    /// Returns `None` for records whose metadata is missing a required field;
    /// such records are skipped by list and search rather than failing them.
    pub fn from_record(record: &Record) -> Option<Self> {
        let meta = &record.metadata;
        Some(Self {
            id: record.id.clone(),
            title: meta_str(meta, KEY_TITLE)?,
            date: meta_str(meta, KEY_DATE)?,
            entry: meta_str(meta, KEY_ENTRY)?,
            owner_email: meta_str(meta, KEY_OWNER)?,
            analysis: meta_str(meta, KEY_ANALYSIS),
            image: meta_str(meta, KEY_IMAGE),
        })
    }

    /// The store document for this dream's title and entry.
    pub fn document(title: &str, entry: &str) -> String {
        format!("{title}\n{entry}")
    }

    /// Initial metadata map for a new dream.
    pub fn initial_metadata(
        title: &str,
        date: &str,
        entry: &str,
        owner_email: &str,
    ) -> Map<String, Value> {
        let mut meta = Map::new();
        meta.insert(KEY_TITLE.into(), Value::String(title.into()));
        meta.insert(KEY_DATE.into(), Value::String(date.into()));
        meta.insert(KEY_ENTRY.into(), Value::String(entry.into()));
        meta.insert(KEY_OWNER.into(), Value::String(owner_email.into()));
        meta
    }
}

/// A partial update: only supplied fields are written.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DreamPatch {
    /// Raw JSON so a non-string value can be rejected rather than coerced.
    pub analysis: Option<Value>,
    pub image: Option<Value>,
}

impl DreamPatch {
    pub fn is_empty(&self) -> bool {
        self.analysis.is_none() && self.image.is_none()
    }

    /// Field name / supplied value pairs, in a fixed order.
    pub fn fields(&self) -> [(&'static str, Option<&Value>); 2] {
        [
            (KEY_ANALYSIS, self.analysis.as_ref()),
            (KEY_IMAGE, self.image.as_ref()),
        ]
    }
}

fn meta_str(meta: &Map<String, Value>, key: &str) -> Option<String> {
    meta.get(key).and_then(|v| v.as_str()).map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_with(meta: Map<String, Value>) -> Record {
        Record {
            id: "rec-1".into(),
            category: "dreams".into(),
            document: "Title\nEntry".into(),
            metadata: meta,
            created_at: "2026-01-01T00:00:00Z".into(),
            updated_at: "2026-01-01T00:00:00Z".into(),
        }
    }

    #[test]
    fn from_record_maps_all_fields() {
        let mut meta = Dream::initial_metadata("Title", "2026-01-01", "Entry", "a@example.com");
        meta.insert("analysis".into(), Value::String("deep".into()));

        let dream = Dream::from_record(&record_with(meta)).unwrap();
        assert_eq!(dream.id, "rec-1");
        assert_eq!(dream.title, "Title");
        assert_eq!(dream.owner_email, "a@example.com");
        assert_eq!(dream.analysis.as_deref(), Some("deep"));
        assert!(dream.image.is_none());
    }

    #[test]
    fn from_record_rejects_missing_owner() {
        let mut meta = Dream::initial_metadata("T", "d", "e", "a@example.com");
        meta.remove("owner_email");
        assert!(Dream::from_record(&record_with(meta)).is_none());
    }

    #[test]
    fn document_joins_title_and_entry() {
        assert_eq!(Dream::document("Flight", "I could fly"), "Flight\nI could fly");
    }

    #[test]
    fn empty_patch_is_empty() {
        assert!(DreamPatch::default().is_empty());
        let patch = DreamPatch {
            analysis: Some(Value::String("a".into())),
            image: None,
        };
        assert!(!patch.is_empty());
    }
}
