use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::error::{CopilotError, Result};
use crate::text::tokenize;

const REQUIRED_FIELDS: [&str; 7] = [
    "id", "title", "summary", "details", "tags", "source", "license",
];

/// A single knowledge base entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Unique entry identifier, e.g. "kb-ransomware-01"
    pub id: String,
    pub title: String,
    pub summary: String,
    pub details: String,
    /// Free-form tags in the order given by the source
    pub tags: Vec<String>,
    /// Attribution for the guidance
    pub source: String,
    pub license: String,
}

impl Document {
    /// Text used for indexing: title, summary, details and tags, one per line.
    pub fn full_text(&self) -> String {
        let tags = self.tags.join(", ");
        [
            self.title.as_str(),
            self.summary.as_str(),
            self.details.as_str(),
            tags.as_str(),
        ]
        .join("\n")
    }

    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "id": self.id,
            "title": self.title,
            "summary": self.summary,
            "details": self.details,
            "tags": self.tags,
            "source": self.source,
            "license": self.license,
        })
    }

    /// Rebuild a document from its field mapping, applying the same checks
    /// as knowledge base loading.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(entry) = value else {
            return Err(CopilotError::Validation(
                "knowledge base entry must be an object".to_string(),
            ));
        };
        validate_entry(&entry)?;
        serde_json::from_value(Value::Object(entry))
            .map_err(|e| CopilotError::Validation(format!("invalid knowledge base entry: {e}")))
    }
}

fn validate_entry(entry: &Map<String, Value>) -> Result<()> {
    let missing: Vec<&str> = REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|field| !entry.contains_key(*field))
        .collect();
    if !missing.is_empty() {
        let mut missing = missing;
        missing.sort_unstable();
        return Err(CopilotError::Validation(format!(
            "knowledge base entry missing fields: {}",
            missing.join(", ")
        )));
    }
    if !entry["tags"].is_array() {
        return Err(CopilotError::Validation(
            "knowledge base entry 'tags' must be a list".to_string(),
        ));
    }
    Ok(())
}

/// Fixed corpus of entries, validated as a whole and read-only afterwards.
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    documents: Vec<Document>,
    index_by_id: HashMap<String, usize>,
}

impl KnowledgeBase {
    /// Build a corpus from already-parsed documents.
    ///
    /// Fails if there are no documents or if any id repeats.
    pub fn new(documents: Vec<Document>) -> Result<Self> {
        if documents.is_empty() {
            return Err(CopilotError::Validation(
                "knowledge base must contain at least one document".to_string(),
            ));
        }
        let mut index_by_id = HashMap::with_capacity(documents.len());
        for (pos, doc) in documents.iter().enumerate() {
            if index_by_id.insert(doc.id.clone(), pos).is_some() {
                return Err(CopilotError::Validation(format!(
                    "duplicate document id in knowledge base: {}",
                    doc.id
                )));
            }
        }
        Ok(Self {
            documents,
            index_by_id,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CopilotError::Config(format!(
                "failed to read knowledge base {}: {e}",
                path.display()
            ))
        })?;
        let kb = Self::from_json_str(&content)?;
        info!(
            path = %path.display(),
            entries = kb.len(),
            fingerprint = %kb.fingerprint(),
            "knowledge base loaded"
        );
        Ok(kb)
    }

    /// Parse a JSON array of entries. Every entry is validated before any
    /// document is accepted.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let payload: Value = serde_json::from_str(content)
            .map_err(|e| CopilotError::Validation(format!("malformed knowledge base JSON: {e}")))?;
        let Value::Array(entries) = payload else {
            return Err(CopilotError::Validation(
                "knowledge base must be a JSON array of entries".to_string(),
            ));
        };
        let documents = entries
            .into_iter()
            .map(Document::from_value)
            .collect::<Result<Vec<_>>>()?;
        Self::new(documents)
    }

    pub fn get(&self, id: &str) -> Option<&Document> {
        self.index_by_id.get(id).map(|&pos| &self.documents[pos])
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Always false for a constructed knowledge base.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Document> {
        self.documents.iter()
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Stopword-filtered tokens of every document, in corpus order.
    pub fn tokenised_documents(&self) -> Vec<Vec<String>> {
        self.documents
            .iter()
            .map(|doc| tokenize(&doc.full_text(), true))
            .collect()
    }

    /// Hex SHA-256 over every document's fields in corpus order.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for doc in &self.documents {
            for field in [
                &doc.id,
                &doc.title,
                &doc.summary,
                &doc.details,
                &doc.source,
                &doc.license,
            ] {
                hasher.update(field.as_bytes());
                hasher.update([0u8]);
            }
            for tag in &doc.tags {
                hasher.update(tag.as_bytes());
                hasher.update([0u8]);
            }
            hasher.update([0xffu8]);
        }
        format!("{:x}", hasher.finalize())
    }
}

impl<'a> IntoIterator for &'a KnowledgeBase {
    type Item = &'a Document;
    type IntoIter = std::slice::Iter<'a, Document>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
