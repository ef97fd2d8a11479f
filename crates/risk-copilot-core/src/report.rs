use crate::retrieval::RankedDocument;
use crate::rules::{QueryProfile, Severity, FALLBACK_DOMAIN};

pub const REPORT_HEADER: &str = "=== Agentic RAG Risk Copilot Report ===";
pub const BASELINE_FOCUS: &str =
    "No specific knowledge base entries matched, so apply baseline governance and control checks.";

/// One-sentence framing of the scenario followed by the retrieved highlights.
pub fn compose_risk_summary(
    severity: Severity,
    domains: &[&str],
    ranked_docs: &[RankedDocument<'_>],
) -> String {
    let primary_domain = domains.first().copied().unwrap_or(FALLBACK_DOMAIN);
    let highlights = if ranked_docs.is_empty() {
        BASELINE_FOCUS.to_string()
    } else {
        ranked_docs
            .iter()
            .map(|item| format!("{}: {}", item.document.title, item.document.summary))
            .collect::<Vec<_>>()
            .join(" ")
    };
    format!(
        "The query reflects a {} priority {primary_domain} risk scenario. Focus areas: {highlights}",
        severity.as_str().to_uppercase()
    )
}

pub fn render_report(
    query: &str,
    risk_summary: &str,
    actions: &[String],
    ranked_docs: &[RankedDocument<'_>],
    profile: &QueryProfile,
) -> String {
    let key_terms = if profile.keywords.is_empty() {
        "n/a".to_string()
    } else {
        profile.keywords.join(", ")
    };

    let mut lines = vec![
        REPORT_HEADER.to_string(),
        format!("Query: {query}"),
        String::new(),
        format!("Detected domains: {}", profile.domain_candidates.join(", ")),
        format!("Estimated severity: {}", profile.severity),
        format!("Key terms: {key_terms}"),
        String::new(),
        "Risk Summary:".to_string(),
        format!("  {risk_summary}"),
        String::new(),
        "Recommended Actions:".to_string(),
    ];
    if actions.is_empty() {
        lines.push("  - No specific actions generated.".to_string());
    } else {
        lines.extend(actions.iter().map(|action| format!("  - {action}")));
    }

    lines.push(String::new());
    lines.push("Supporting Knowledge Base Entries:".to_string());
    if ranked_docs.is_empty() {
        lines.push("  - None".to_string());
    } else {
        lines.extend(ranked_docs.iter().map(|item| {
            format!(
                "  - {} (score={:.2}, id={})",
                item.document.title, item.score, item.document.id
            )
        }));
    }
    lines.join("\n")
}
