use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Text returned by the extraction endpoints.
///
/// The backend is inconsistent about the shape: sometimes a bare string,
/// sometimes `{"text": ..}` or `{"content": ..}`, sometimes a one-level list
/// of those. Structured extractor output (an object whose `content` is a list
/// of blocks) is passed on as its JSON text. The raw value is kept as
/// received; [`ExtractedContent::normalize`] is the single place that turns
/// any of them into plain text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtractedContent {
    Text(String),
    Fields(ContentFields),
    List(Vec<ExtractedContent>),
    Other(Value),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ContentFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl ContentFields {
    fn normalize(&self) -> String {
        match (self.text.as_deref(), self.content.as_deref()) {
            (Some(text), _) if !text.trim().is_empty() => text.trim().to_string(),
            (_, Some(content)) => content.trim().to_string(),
            (Some(_), None) => String::new(),
            (None, None) => serde_json::to_string(self).unwrap_or_default(),
        }
    }
}

impl ExtractedContent {
    pub fn normalize(&self) -> String {
        self.normalize_at(0)
    }

    fn normalize_at(&self, depth: usize) -> String {
        match self {
            ExtractedContent::Text(s) => s.trim().to_string(),
            ExtractedContent::Fields(fields) => fields.normalize(),
            // Only one level of nesting is meaningful.
            ExtractedContent::List(items) if depth == 0 => items
                .iter()
                .map(|item| item.normalize_at(depth + 1))
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join("\n"),
            ExtractedContent::Other(value @ Value::Object(map)) => ["text", "content"]
                .iter()
                .find_map(|key| map.get(*key).and_then(Value::as_str))
                .map(|s| s.trim().to_string())
                .unwrap_or_else(|| value.to_string()),
            ExtractedContent::List(_) | ExtractedContent::Other(_) => String::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.normalize().is_empty()
    }
}

impl From<&str> for ExtractedContent {
    fn from(s: &str) -> Self {
        ExtractedContent::Text(s.to_string())
    }
}

/// Envelope of `/api/extract_file` and `/api/extract_url`.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractResponse {
    #[serde(default)]
    pub content: Option<ExtractedContent>,
    #[serde(default)]
    pub error: Option<String>,
}
