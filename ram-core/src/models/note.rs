use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer, IgnoredAny, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub note: String,
    pub url: String,
    pub tags: Vec<String>,
    pub created: DateTime<Utc>,
    pub done: bool,
    /// True until the note has been written to or read from the store.
    #[serde(skip)]
    pub(crate) phantom: bool,
}

impl Note {
    /// Builds a new, not yet persisted note from raw user input.
    pub fn new(note: impl Into<String>, url: impl Into<String>, raw_tags: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            note: note.into(),
            url: url.into(),
            tags: split_tags(raw_tags),
            created: Utc::now(),
            done: false,
            phantom: true,
        }
    }

    pub fn is_phantom(&self) -> bool {
        self.phantom
    }

    /// Marks the note as confirmed present in the store.
    pub fn mark_persisted(&mut self) {
        self.phantom = false;
    }
}

impl From<CreateNoteInput> for Note {
    fn from(input: CreateNoteInput) -> Self {
        Note::new(input.note, input.url, &input.tags)
    }
}

/// Splits a raw tag string on runs of `,`, `;` and whitespace.
///
/// Order and duplicates are kept; empty fragments are dropped.
pub fn split_tags(raw: &str) -> Vec<String> {
    raw.trim()
        .split(|c: char| c == ',' || c == ';' || c.is_whitespace())
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

/// Body of `PUT /notes`. `Tags` is a single raw string, not an array.
///
/// Field names match case-insensitively and a repeated field keeps its last
/// value. Unknown fields and `null` values are skipped, and a `null` body is
/// an empty note.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateNoteInput {
    #[serde(rename = "Note")]
    pub note: String,
    #[serde(rename = "Url")]
    pub url: String,
    #[serde(rename = "Tags")]
    pub tags: String,
}

impl<'de> Deserialize<'de> for CreateNoteInput {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(CreateNoteInputVisitor)
    }
}

struct CreateNoteInputVisitor;

impl<'de> Visitor<'de> for CreateNoteInputVisitor {
    type Value = CreateNoteInput;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a note object or null")
    }

    fn visit_unit<E>(self) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(CreateNoteInput::default())
    }

    fn visit_none<E>(self) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(CreateNoteInput::default())
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut input = CreateNoteInput::default();
        while let Some(key) = map.next_key::<String>()? {
            let field = match key.to_lowercase().as_str() {
                "note" => &mut input.note,
                "url" => &mut input.url,
                "tags" => &mut input.tags,
                _ => {
                    map.next_value::<IgnoredAny>()?;
                    continue;
                }
            };
            if let Some(value) = map.next_value::<Option<String>>()? {
                *field = value;
            }
        }
        Ok(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_tags_on_mixed_separators() {
        assert_eq!(split_tags("a, b;;c  d"), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn split_tags_blank_input_is_empty() {
        assert!(split_tags("   ").is_empty());
        assert!(split_tags("").is_empty());
        assert!(split_tags(",;, ;").is_empty());
    }

    #[test]
    fn split_tags_keeps_order_and_duplicates() {
        assert_eq!(
            split_tags("\thome\nwork,home ; errand"),
            vec!["home", "work", "home", "errand"]
        );
    }

    #[test]
    fn new_note_is_phantom_and_open() {
        let note = Note::new("buy milk", "https://example.org", "errand, home");

        assert!(note.is_phantom());
        assert!(!note.done);
        assert_eq!(note.tags, vec!["errand", "home"]);
        assert!(Uuid::parse_str(&note.id).is_ok());
    }

    #[test]
    fn new_notes_get_distinct_ids() {
        let a = Note::new("a", "", "");
        let b = Note::new("a", "", "");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn mark_persisted_clears_phantom() {
        let mut note = Note::new("x", "", "");
        note.mark_persisted();
        assert!(!note.is_phantom());
    }

    #[test]
    fn serialized_note_omits_phantom() {
        let note = Note::new("x", "", "a b");
        let value = serde_json::to_value(&note).unwrap();

        assert!(value.get("phantom").is_none());
        assert_eq!(value["tags"], serde_json::json!(["a", "b"]));
        assert_eq!(value["done"], serde_json::json!(false));
        assert!(value["created"].is_string());
    }

    #[test]
    fn create_input_accepts_capitalized_and_lowercase_fields() {
        let upper: CreateNoteInput =
            serde_json::from_str(r#"{"Note":"n","Url":"u","Tags":"t"}"#).unwrap();
        assert_eq!(upper.note, "n");
        assert_eq!(upper.url, "u");
        assert_eq!(upper.tags, "t");

        let lower: CreateNoteInput = serde_json::from_str(r#"{"note":"n"}"#).unwrap();
        assert_eq!(lower.note, "n");
        assert_eq!(lower.url, "");
        assert_eq!(lower.tags, "");
    }

    #[test]
    fn create_input_field_names_ignore_case() {
        let input: CreateNoteInput =
            serde_json::from_str(r#"{"NOTE":"n","uRl":"u","tAGS":"t","extra":[1]}"#).unwrap();
        assert_eq!(input.note, "n");
        assert_eq!(input.url, "u");
        assert_eq!(input.tags, "t");
    }

    #[test]
    fn create_input_repeated_field_keeps_last_value() {
        let input: CreateNoteInput =
            serde_json::from_str(r#"{"Note":"a","note":"b","Url":"u","url":null}"#).unwrap();
        assert_eq!(input.note, "b");
        assert_eq!(input.url, "u");
    }

    #[test]
    fn create_input_null_body_is_empty_note() {
        let input: CreateNoteInput = serde_json::from_str("null").unwrap();
        assert_eq!(input.note, "");
        assert_eq!(input.tags, "");
    }

    #[test]
    fn create_input_rejects_wrong_shapes() {
        assert!(serde_json::from_str::<CreateNoteInput>(r#"{"Note":1}"#).is_err());
        assert!(serde_json::from_str::<CreateNoteInput>(r#""note""#).is_err());
        assert!(serde_json::from_str::<CreateNoteInput>("[]").is_err());
    }
}
