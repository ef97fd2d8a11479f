use serde::Serialize;
use tracing::debug;

use crate::knowledge::KnowledgeBase;
use crate::report::{compose_risk_summary, render_report};
use crate::retrieval::{Bm25Retriever, RankedDocument};
use crate::rules::{profile_query, recommended_actions, Severity, DEFAULT_MAX_ACTIONS};

pub const DEFAULT_TOP_K: usize = 3;

/// Everything produced for one query. Built fresh per call.
#[derive(Debug, Clone, Serialize)]
pub struct AgentOutput<'a> {
    pub query: String,
    pub severity: Severity,
    pub domains: Vec<&'static str>,
    pub keywords: Vec<String>,
    pub retrieved: Vec<RankedDocument<'a>>,
    pub risk_summary: String,
    pub actions: Vec<String>,
    pub reasoning_trace: Vec<String>,
    pub report: String,
}

/// Stateless analysis service over an immutable knowledge base.
///
/// `analyse` takes `&self` and keeps all per-query state local, so one
/// instance can be shared (e.g. behind an `Arc`) by concurrent callers.
pub struct RiskCopilot {
    retriever: Bm25Retriever,
}

impl RiskCopilot {
    pub fn new(kb: KnowledgeBase) -> Self {
        Self {
            retriever: Bm25Retriever::new(kb),
        }
    }

    pub fn knowledge_base(&self) -> &KnowledgeBase {
        self.retriever.knowledge_base()
    }

    pub fn retriever(&self) -> &Bm25Retriever {
        &self.retriever
    }

    /// Analyse `query`, retrieving at most `top_k` entries (0 is treated as 1).
    pub fn analyse(&self, query: &str, top_k: usize) -> AgentOutput<'_> {
        let top_k = top_k.max(1);
        let mut trace = Vec::with_capacity(5);

        let profile = profile_query(query);
        trace.push(format!(
            "Profiled query -> domains: [{}], severity: {}, keywords: [{}]",
            profile.domain_candidates.join(", "),
            profile.severity,
            profile.keywords.join(", ")
        ));

        let ranked = self.retriever.rank(query, top_k);
        if ranked.is_empty() {
            trace.push("Retriever returned no documents with positive BM25 score.".to_string());
        } else {
            trace.push(format!(
                "Retriever returned {} documents with BM25 > 0.",
                ranked.len()
            ));
        }

        let risk_summary = compose_risk_summary(profile.severity, &profile.domain_candidates, &ranked);
        trace.push(format!(
            "Composed risk summary based on heuristics and {} retrieved docs.",
            ranked.len()
        ));

        let doc_ids: Vec<&str> = ranked.iter().map(|item| item.document.id.as_str()).collect();
        let actions = recommended_actions(&profile.domain_candidates, &doc_ids, DEFAULT_MAX_ACTIONS);
        trace.push(format!("Generated {} recommended actions.", actions.len()));

        let report = render_report(query, &risk_summary, &actions, &ranked, &profile);
        trace.push("Assembled final structured report.".to_string());

        debug!(
            domains = ?profile.domain_candidates,
            severity = %profile.severity,
            retrieved = ranked.len(),
            actions = actions.len(),
            "query analysed"
        );

        AgentOutput {
            query: query.to_string(),
            severity: profile.severity,
            domains: profile.domain_candidates,
            keywords: profile.keywords,
            retrieved: ranked,
            risk_summary,
            actions,
            reasoning_trace: trace,
            report,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::tests::doc;
    use crate::knowledge::Document;
    use crate::report::{BASELINE_FOCUS, REPORT_HEADER};

    fn copilot() -> RiskCopilot {
        RiskCopilot::new(
            KnowledgeBase::new(vec![
                Document {
                    id: "d1".to_string(),
                    title: "Ransomware Guide".to_string(),
                    summary: "ransomware response".to_string(),
                    details: "...".to_string(),
                    tags: vec!["cyber".to_string()],
                    source: "s".to_string(),
                    license: "CC-BY-4.0".to_string(),
                },
                doc("d2", "Vendor Reviews", "supplier due diligence", "Annual questionnaires.", &["third-party"]),
            ])
            .expect("valid corpus"),
        )
    }

    #[test]
    fn ransomware_query_produces_full_output() {
        let copilot = copilot();
        let output = copilot.analyse("We had a ransomware breach on our endpoints", 3);
        assert_eq!(output.severity, Severity::High);
        assert!(output.domains.contains(&"cyber"));
        assert_eq!(output.retrieved.len(), 1);
        assert_eq!(output.retrieved[0].document.id, "d1");
        assert!(output.risk_summary.contains("HIGH priority cyber"));
        assert!(output.risk_summary.contains("Ransomware Guide: ransomware response"));
        assert_eq!(output.actions.len(), 4);
        assert_eq!(output.actions[3], "Review knowledge base entries: d1.");
        assert!(output.report.contains("Ransomware Guide (score="));
        assert_eq!(output.reasoning_trace.len(), 5);
        assert!(output.reasoning_trace[1].contains("returned 1 documents"));
    }

    #[test]
    fn unmatched_query_degrades_to_defaults() {
        let copilot = copilot();
        let output = copilot.analyse("hello there friend", 3);
        assert_eq!(output.domains, vec!["governance"]);
        assert_eq!(output.severity, Severity::Medium);
        assert!(output.retrieved.is_empty());
        assert!(output.risk_summary.ends_with(BASELINE_FOCUS));
        assert!(output.reasoning_trace[1].contains("no documents"));
        for section in [
            REPORT_HEADER,
            "Query: hello there friend",
            "Detected domains: governance",
            "Estimated severity: medium",
            "Risk Summary:",
            "Recommended Actions:",
            "Supporting Knowledge Base Entries:\n  - None",
        ] {
            assert!(output.report.contains(section), "missing section: {section}");
        }
    }

    #[test]
    fn zero_top_k_is_clamped() {
        let copilot = copilot();
        let output = copilot.analyse("ransomware supplier", 0);
        assert_eq!(output.retrieved.len(), 1);
    }

    #[test]
    fn trace_has_one_line_per_stage_in_order() {
        let copilot = copilot();
        let output = copilot.analyse("supplier concern", 3);
        let trace = &output.reasoning_trace;
        assert!(trace[0].starts_with("Profiled query -> domains: [third-party]"));
        assert!(trace[1].starts_with("Retriever returned"));
        assert!(trace[2].starts_with("Composed risk summary"));
        assert!(trace[3].starts_with("Generated"));
        assert_eq!(trace[4], "Assembled final structured report.");
    }

    #[test]
    fn output_serializes_to_field_mapping() {
        let copilot = copilot();
        let output = copilot.analyse("ransomware", 3);
        let value = serde_json::to_value(&output).expect("serializable");
        assert_eq!(value["severity"], "high");
        assert_eq!(value["domains"][0], "cyber");
        assert_eq!(value["retrieved"][0]["id"], "d1");
        assert_eq!(value["retrieved"][0]["tags"][0], "cyber");
        assert!(value["retrieved"][0]["score"].as_f64().unwrap() > 0.0);
        assert!(value["report"].as_str().unwrap().starts_with(REPORT_HEADER));
    }

    #[test]
    fn shared_copilot_serves_concurrent_callers() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RiskCopilot>();

        let kb = KnowledgeBase::from_json_str(include_str!("../../../data/knowledge_base.json"))
            .expect("bundled knowledge base");
        let copilot = std::sync::Arc::new(RiskCopilot::new(kb));
        let queries = [
            "We had a ransomware breach on our endpoints",
            "just curious about policy",
            "Vendor outage exposed personal data",
            "hello there friend",
            "incident playbook for phishing",
            "business continuity gap in payments",
        ];
        fn snapshot(copilot: &RiskCopilot, query: &str) -> serde_json::Value {
            serde_json::to_value(copilot.analyse(query, 3)).expect("serializable")
        }
        let expected: Vec<serde_json::Value> =
            queries.iter().map(|q| snapshot(&copilot, q)).collect();

        let handles: Vec<_> = queries
            .iter()
            .map(|q| {
                let copilot = std::sync::Arc::clone(&copilot);
                let query = q.to_string();
                std::thread::spawn(move || {
                    (0..20)
                        .map(|_| snapshot(&copilot, &query))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        for (handle, expected) in handles.into_iter().zip(&expected) {
            let outputs = handle.join().expect("worker panicked");
            assert!(outputs.iter().all(|out| out == expected));
        }
    }

    #[test]
    fn bundled_knowledge_base_answers_common_questions() {
        let kb = KnowledgeBase::from_json_str(include_str!("../../../data/knowledge_base.json"))
            .expect("bundled knowledge base");
        let copilot = RiskCopilot::new(kb);
        let output = copilot.analyse("Our vendor suffered a ransomware breach", 3);
        assert!(!output.retrieved.is_empty());
        assert!(output.retrieved.len() <= 3);
        assert_eq!(output.domains, vec!["cyber", "third-party"]);
    }
}
