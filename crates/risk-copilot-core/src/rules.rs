use std::fmt;

use serde::Serialize;

use crate::text::{tokenize, unique_preserve_order};

/// Domain reported when no rule matches.
pub const FALLBACK_DOMAIN: &str = "governance";
pub const DEFAULT_KEYWORD_LIMIT: usize = 6;
pub const DEFAULT_MAX_ACTIONS: usize = 5;

/// Keyword substrings that put a query into a risk domain.
#[derive(Debug, Clone, Copy)]
pub struct DomainRule {
    pub domain: &'static str,
    pub keywords: &'static [&'static str],
}

/// Evaluated in order; matched domains are reported in this order.
pub const DOMAIN_RULES: &[DomainRule] = &[
    DomainRule {
        domain: "cyber",
        keywords: &[
            "cyber",
            "malware",
            "ransomware",
            "phishing",
            "breach",
            "endpoint",
            "network",
            "intrusion",
            "siem",
            "detection",
        ],
    },
    DomainRule {
        domain: "privacy",
        keywords: &[
            "privacy",
            "personal",
            "gdpr",
            "pii",
            "consent",
            "data subject",
            "retention",
        ],
    },
    DomainRule {
        domain: "third-party",
        keywords: &[
            "third-party",
            "third party",
            "vendor",
            "supplier",
            "outsourc",
            "msa",
        ],
    },
    DomainRule {
        domain: "operational",
        keywords: &[
            "business continuity",
            "disaster",
            "availability",
            "resilience",
            "uptime",
            "process",
        ],
    },
    DomainRule {
        domain: "governance",
        keywords: &[
            "policy",
            "register",
            "risk register",
            "governance",
            "board",
            "reporting",
        ],
    },
    DomainRule {
        domain: "incident-response",
        keywords: &[
            "incident",
            "response",
            "playbook",
            "forensics",
            "containment",
        ],
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Checked top to bottom; the first level with a matching hint wins.
pub const SEVERITY_HINTS: &[(Severity, &[&str])] = &[
    (
        Severity::High,
        &[
            "breach",
            "compromised",
            "ransomware",
            "outage",
            "critical",
            "urgent",
            "severe",
        ],
    ),
    (
        Severity::Medium,
        &["concern", "gap", "weakness", "exposure", "moderate"],
    ),
    (
        Severity::Low,
        &["question", "awareness", "curious", "minor"],
    ),
];

pub const DEFAULT_SEVERITY: Severity = Severity::Medium;

pub const RECOMMENDATIONS: &[(&str, &[&str])] = &[
    (
        "cyber",
        &[
            "Refresh the asset inventory and map controls using the NIST CSF functions.",
            "Prioritise detection and response runbooks for the top attack paths.",
            "Validate backup integrity and network segmentation.",
        ],
    ),
    (
        "privacy",
        &[
            "Verify lawful bases and consent tracking for the targeted processing activity.",
            "Update privacy notices and data retention schedules.",
            "Ensure fulfilment of data subject requests within mandated timelines.",
        ],
    ),
    (
        "third-party",
        &[
            "Conduct due diligence questionnaires focused on security posture and data handling.",
            "Align SLAs and contract clauses with risk tolerance and regulatory needs.",
            "Implement continuous monitoring triggers for service changes and incidents.",
        ],
    ),
    (
        "operational",
        &[
            "Run a business impact analysis to confirm recovery time objectives.",
            "Exercise continuity plans with cross-functional stakeholders.",
            "Check dependency mapping for single points of failure.",
        ],
    ),
    (
        "governance",
        &[
            "Update the risk register with clear ownership, residual ratings, and review dates.",
            "Align risk reporting cadence with executive governance forums.",
            "Track control remediation progress through measurable indicators.",
        ],
    ),
    (
        "incident-response",
        &[
            "Trigger the incident response playbook and confirm escalation paths.",
            "Preserve evidence and coordinate with legal and communications teams.",
            "Assess readiness of recovery plans, including clean restore procedures.",
        ],
    ),
];

/// Recommendations for `domain`, empty for unknown labels.
pub fn recommendations_for(domain: &str) -> &'static [&'static str] {
    RECOMMENDATIONS
        .iter()
        .find(|(label, _)| *label == domain)
        .map(|(_, actions)| *actions)
        .unwrap_or(&[])
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryProfile {
    /// Matched domains in rule order, never empty
    pub domain_candidates: Vec<&'static str>,
    pub severity: Severity,
    pub keywords: Vec<String>,
}

/// Domains whose keywords occur in the query, in `DOMAIN_RULES` order.
///
/// Matching runs against the query's tokens re-joined with single spaces, so
/// punctuation and hyphens read as word breaks ("data-subject" matches
/// "data subject").
pub fn infer_domain_candidates(query: &str) -> Vec<&'static str> {
    let token_text = tokenize(query, false).join(" ");
    let matches: Vec<&'static str> = DOMAIN_RULES
        .iter()
        .filter(|rule| rule.keywords.iter().any(|hint| token_text.contains(hint)))
        .map(|rule| rule.domain)
        .collect();
    if matches.is_empty() {
        return vec![FALLBACK_DOMAIN];
    }
    unique_preserve_order(matches)
}

pub fn estimate_severity(query: &str) -> Severity {
    let lowered = query.to_lowercase();
    SEVERITY_HINTS
        .iter()
        .find(|(_, hints)| hints.iter().any(|hint| lowered.contains(hint)))
        .map(|(level, _)| *level)
        .unwrap_or(DEFAULT_SEVERITY)
}

/// The first `top_n` stopword-free query tokens, in query order.
///
/// This is a positional cut, not a salience ranking.
pub fn extract_salient_keywords(query: &str, top_n: usize) -> Vec<String> {
    let mut tokens = tokenize(query, true);
    tokens.truncate(top_n);
    tokens
}

pub fn profile_query(query: &str) -> QueryProfile {
    QueryProfile {
        domain_candidates: infer_domain_candidates(query),
        severity: estimate_severity(query),
        keywords: extract_salient_keywords(query, DEFAULT_KEYWORD_LIMIT),
    }
}

/// Ordered actions for the given domains, capped at `max_actions`.
///
/// When documents were retrieved a provenance line naming them is appended
/// before the cap is applied, so a full domain list can push it out.
pub fn recommended_actions(domains: &[&str], top_docs: &[&str], max_actions: usize) -> Vec<String> {
    let mut suggestions: Vec<String> = domains
        .iter()
        .flat_map(|domain| recommendations_for(domain))
        .map(|action| action.to_string())
        .collect();
    if suggestions.is_empty() {
        suggestions.extend(
            recommendations_for(FALLBACK_DOMAIN)
                .iter()
                .map(|action| action.to_string()),
        );
    }
    if !top_docs.is_empty() {
        suggestions.push(format!(
            "Review knowledge base entries: {}.",
            top_docs.join(", ")
        ));
    }
    suggestions.truncate(max_actions);
    suggestions
}
