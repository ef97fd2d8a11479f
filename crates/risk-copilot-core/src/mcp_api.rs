use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::agent::AgentOutput;
use crate::knowledge::Document;
use crate::rules::{
    recommendations_for, DEFAULT_SEVERITY, DOMAIN_RULES, FALLBACK_DOMAIN, SEVERITY_HINTS,
};

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct AnalyseRiskParams {
    /// Free-text risk question, e.g. "We had a ransomware breach on our endpoints".
    pub query: String,
    /// Number of knowledge base entries to retrieve (default: server setting, max: 20).
    pub top_k: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GetEntryParams {
    /// Knowledge base entry ID.
    pub entry_id: String,
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct ListEntriesParams {
    /// Only return entries carrying this tag (case-insensitive).
    pub tag: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EntryDetailResponse {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub details: String,
    pub tags: Vec<String>,
    pub source: String,
    pub license: String,
}

impl From<&Document> for EntryDetailResponse {
    fn from(doc: &Document) -> Self {
        Self {
            id: doc.id.clone(),
            title: doc.title.clone(),
            summary: doc.summary.clone(),
            details: doc.details.clone(),
            tags: doc.tags.clone(),
            source: doc.source.clone(),
            license: doc.license.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RetrievedEntry {
    #[serde(flatten)]
    pub entry: EntryDetailResponse,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AnalyseRiskResponse {
    pub query: String,
    pub severity: String,
    pub domains: Vec<String>,
    pub keywords: Vec<String>,
    pub retrieved: Vec<RetrievedEntry>,
    pub risk_summary: String,
    pub actions: Vec<String>,
    pub reasoning_trace: Vec<String>,
    pub report: String,
}

impl From<AgentOutput<'_>> for AnalyseRiskResponse {
    fn from(output: AgentOutput<'_>) -> Self {
        Self {
            query: output.query,
            severity: output.severity.to_string(),
            domains: output.domains.iter().map(|d| d.to_string()).collect(),
            keywords: output.keywords,
            retrieved: output
                .retrieved
                .into_iter()
                .map(|item| RetrievedEntry {
                    entry: item.document.into(),
                    score: item.score,
                })
                .collect(),
            risk_summary: output.risk_summary,
            actions: output.actions,
            reasoning_trace: output.reasoning_trace,
            report: output.report,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EntrySummary {
    pub id: String,
    pub title: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EntryListResponse {
    pub entries: Vec<EntrySummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DomainInfo {
    pub domain: String,
    /// Substrings that select this domain
    pub keywords: Vec<String>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SeverityInfo {
    pub level: String,
    pub hints: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DomainListResponse {
    /// Domains in evaluation order
    pub domains: Vec<DomainInfo>,
    pub fallback_domain: String,
    /// Severity levels in evaluation order
    pub severities: Vec<SeverityInfo>,
    pub default_severity: String,
}

impl DomainListResponse {
    /// Snapshot of the static classification tables.
    pub fn from_rules() -> Self {
        let to_strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            domains: DOMAIN_RULES
                .iter()
                .map(|rule| DomainInfo {
                    domain: rule.domain.to_string(),
                    keywords: to_strings(rule.keywords),
                    recommendations: to_strings(recommendations_for(rule.domain)),
                })
                .collect(),
            fallback_domain: FALLBACK_DOMAIN.to_string(),
            severities: SEVERITY_HINTS
                .iter()
                .map(|(level, hints)| SeverityInfo {
                    level: level.to_string(),
                    hints: to_strings(*hints),
                })
                .collect(),
            default_severity: DEFAULT_SEVERITY.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct KnowledgeBaseInfoResponse {
    pub entry_count: usize,
    pub source: String,
    /// Hex SHA-256 over the loaded entries
    pub fingerprint: String,
    pub average_entry_tokens: f64,
}
