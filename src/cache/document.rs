//! The resolved configuration of one component.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const UTF8_BOM: char = '\u{feff}';

/// A component's configuration: always a JSON object.
///
/// Replaced as a whole on every resolution; there is no merge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigDocument(Map<String, Value>);

impl ConfigDocument {
    /// The `{}` document used when nothing on disk resolves.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse JSON text. Anything other than an object is rejected.
    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        let text = text.strip_prefix(UTF8_BOM).unwrap_or(text);
        serde_json::from_str::<Map<String, Value>>(text).map(Self)
    }

    /// Compact JSON text, as written to the cache store.
    pub fn to_json_string(&self) -> String {
        Value::Object(self.0.clone()).to_string()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for ConfigDocument {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_object() {
        let doc = ConfigDocument::from_json_str(r#"{"title":"Foo"}"#).unwrap();
        assert_eq!(doc.get("title"), Some(&Value::String("Foo".into())));
        assert_eq!(doc.to_json_string(), r#"{"title":"Foo"}"#);
    }

    #[test]
    fn test_rejects_non_object_json() {
        assert!(ConfigDocument::from_json_str("[1, 2]").is_err());
        assert!(ConfigDocument::from_json_str("\"text\"").is_err());
        assert!(ConfigDocument::from_json_str("{\"title\":").is_err());
    }

    #[test]
    fn test_strips_byte_order_mark() {
        let doc = ConfigDocument::from_json_str("\u{feff}{\"a\":1}").unwrap();
        assert_eq!(doc.get("a"), Some(&Value::from(1)));
    }

    #[test]
    fn test_empty_document_serializes_as_empty_object() {
        assert_eq!(ConfigDocument::empty().to_json_string(), "{}");
        assert!(ConfigDocument::empty().is_empty());
    }
}
