use std::sync::Arc;

use rmcp::{
    Json, ServerHandler,
    handler::server::router::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::*,
    tool, tool_handler, tool_router,
};
use tracing::info;

use risk_copilot_core::mcp_api::{
    AnalyseRiskParams, AnalyseRiskResponse, DomainListResponse, EntryDetailResponse,
    EntryListResponse, EntrySummary, GetEntryParams, KnowledgeBaseInfoResponse,
    ListEntriesParams,
};
use risk_copilot_core::RiskCopilot;

use crate::config::Config;

const MAX_TOP_K: u32 = 20;

/// MCP server exposing `analyse_risk`, `get_entry`, `list_entries`,
/// `list_domains` and `knowledge_base_info`.
///
/// The copilot is immutable after startup, so clones share it without locking.
#[derive(Clone)]
pub struct RiskCopilotServer {
    copilot: Arc<RiskCopilot>,
    config: Arc<Config>,
    tool_router: ToolRouter<RiskCopilotServer>,
}

impl RiskCopilotServer {
    pub fn new(copilot: Arc<RiskCopilot>, config: Config) -> Self {
        Self {
            copilot,
            config: Arc::new(config),
            tool_router: Self::tool_router(),
        }
    }
}

#[tool_router]
impl RiskCopilotServer {
    #[tool(description = "Analyse a free-text risk question. Returns detected domains, severity, supporting knowledge base entries, recommended actions, a reasoning trace and a rendered report.")]
    async fn analyse_risk(
        &self,
        Parameters(params): Parameters<AnalyseRiskParams>,
    ) -> Result<Json<AnalyseRiskResponse>, String> {
        if params.query.trim().is_empty() {
            return Err("query must not be empty".to_string());
        }

        let top_k = params
            .top_k
            .map(|k| k.clamp(1, MAX_TOP_K) as usize)
            .unwrap_or(self.config.top_k);

        let output = self.copilot.analyse(&params.query, top_k);
        info!(
            severity = %output.severity,
            domains = ?output.domains,
            retrieved = output.retrieved.len(),
            "analyse_risk completed"
        );
        Ok(Json(output.into()))
    }

    #[tool(description = "Get a knowledge base entry by ID.")]
    async fn get_entry(
        &self,
        Parameters(params): Parameters<GetEntryParams>,
    ) -> Result<Json<EntryDetailResponse>, String> {
        let entry_id = params.entry_id.trim().to_string();
        if entry_id.is_empty() {
            return Err("entry_id must not be empty".to_string());
        }

        let kb = self.copilot.knowledge_base();
        let doc = kb
            .get(&entry_id)
            .or_else(|| kb.iter().find(|d| d.id.eq_ignore_ascii_case(&entry_id)))
            .ok_or_else(|| format!("entry not found: {entry_id}"))?;

        Ok(Json(doc.into()))
    }

    #[tool(description = "List knowledge base entries in corpus order, optionally only those with a given tag.")]
    async fn list_entries(
        &self,
        Parameters(params): Parameters<ListEntriesParams>,
    ) -> Result<Json<EntryListResponse>, String> {
        let tag = params
            .tag
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        let entries: Vec<EntrySummary> = self
            .copilot
            .knowledge_base()
            .iter()
            .filter(|doc| match &tag {
                Some(tag) => doc.tags.iter().any(|t| t.eq_ignore_ascii_case(tag)),
                None => true,
            })
            .map(|doc| EntrySummary {
                id: doc.id.clone(),
                title: doc.title.clone(),
                tags: doc.tags.clone(),
            })
            .collect();

        Ok(Json(EntryListResponse { entries }))
    }

    #[tool(description = "List risk domains in evaluation order with their trigger keywords and recommendations, plus the severity hint tables.")]
    async fn list_domains(&self) -> Result<Json<DomainListResponse>, String> {
        Ok(Json(DomainListResponse::from_rules()))
    }

    #[tool(description = "Describe the loaded knowledge base: entry count, source path and content fingerprint.")]
    async fn knowledge_base_info(&self) -> Result<Json<KnowledgeBaseInfoResponse>, String> {
        let kb = self.copilot.knowledge_base();
        Ok(Json(KnowledgeBaseInfoResponse {
            entry_count: kb.len(),
            source: self.config.kb_path().display().to_string(),
            fingerprint: kb.fingerprint(),
            average_entry_tokens: self.copilot.retriever().average_document_length(),
        }))
    }
}

#[tool_handler]
impl ServerHandler for RiskCopilotServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_06_18,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "risk-copilot".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Offline risk copilot. Use analyse_risk for free-text risk questions; it \
                 classifies the question into risk domains and a severity, ranks the local \
                 knowledge base with BM25 and returns recommended actions with a report. Use \
                 get_entry and list_entries to read the knowledge base, list_domains to see \
                 the classification rules, and knowledge_base_info for the loaded corpus."
                    .to_string(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use risk_copilot_core::KnowledgeBase;

    use super::*;

    fn server() -> RiskCopilotServer {
        let kb_path: PathBuf =
            Path::new(env!("CARGO_MANIFEST_DIR")).join("../../data/knowledge_base.json");
        let kb = KnowledgeBase::from_file(&kb_path).expect("bundled knowledge base");
        let config = Config {
            kb_path,
            top_k: 3,
            tcp_listen_addr: None,
        };
        RiskCopilotServer::new(Arc::new(RiskCopilot::new(kb)), config)
    }

    #[test]
    fn tools_publish_output_schemas() {
        let tools = RiskCopilotServer::tool_router().list_all();
        for name in [
            "analyse_risk",
            "get_entry",
            "list_entries",
            "list_domains",
            "knowledge_base_info",
        ] {
            let tool = tools
                .iter()
                .find(|t| t.name == name)
                .unwrap_or_else(|| panic!("missing tool: {name}"));
            assert!(
                tool.output_schema.is_some(),
                "tool {name} should publish output_schema"
            );
        }
    }

    #[tokio::test]
    async fn analyse_risk_rejects_blank_query() {
        let err = server()
            .analyse_risk(Parameters(AnalyseRiskParams {
                query: "   ".to_string(),
                top_k: None,
            }))
            .await
            .err()
            .expect("blank query must fail");
        assert!(err.contains("must not be empty"));
    }

    #[tokio::test]
    async fn analyse_risk_caps_and_defaults_top_k() {
        let server = server();
        let Json(response) = server
            .analyse_risk(Parameters(AnalyseRiskParams {
                query: "ransomware breach with a vendor incident and privacy consent gaps".to_string(),
                top_k: Some(0),
            }))
            .await
            .expect("analysis succeeds");
        assert_eq!(response.retrieved.len(), 1);
        assert_eq!(response.severity, "high");

        let Json(response) = server
            .analyse_risk(Parameters(AnalyseRiskParams {
                query: "ransomware breach with a vendor incident and privacy consent gaps".to_string(),
                top_k: None,
            }))
            .await
            .expect("analysis succeeds");
        assert_eq!(response.retrieved.len(), 3);
        assert_eq!(response.reasoning_trace.len(), 5);
    }

    #[tokio::test]
    async fn analyse_risk_echoes_query_as_sent() {
        let query = "  Vendor outage concern  ";
        let Json(response) = server()
            .analyse_risk(Parameters(AnalyseRiskParams {
                query: query.to_string(),
                top_k: None,
            }))
            .await
            .expect("analysis succeeds");
        assert_eq!(response.query, query);
        assert!(response.report.contains(&format!("Query: {query}\n")));
    }

    #[tokio::test]
    async fn get_entry_matches_ids_case_insensitively() {
        let server = server();
        let Json(entry) = server
            .get_entry(Parameters(GetEntryParams {
                entry_id: "KB-PRIVACY-CONSENT".to_string(),
            }))
            .await
            .expect("entry exists");
        assert_eq!(entry.id, "kb-privacy-consent");

        let err = server
            .get_entry(Parameters(GetEntryParams {
                entry_id: "kb-missing".to_string(),
            }))
            .await
            .err()
            .expect("unknown id must fail");
        assert!(err.contains("entry not found"));
    }

    #[tokio::test]
    async fn list_entries_filters_by_tag() {
        let server = server();
        let Json(all) = server
            .list_entries(Parameters(ListEntriesParams::default()))
            .await
            .unwrap();
        assert_eq!(all.entries.len(), 8);

        let Json(privacy) = server
            .list_entries(Parameters(ListEntriesParams {
                tag: Some("Privacy".to_string()),
            }))
            .await
            .unwrap();
        let ids: Vec<&str> = privacy.entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["kb-privacy-consent", "kb-privacy-dsar"]);
    }

    #[tokio::test]
    async fn knowledge_base_info_reports_fingerprint() {
        let Json(info) = server().knowledge_base_info().await.unwrap();
        assert_eq!(info.entry_count, 8);
        assert_eq!(info.fingerprint.len(), 64);
        assert!(info.source.ends_with("knowledge_base.json"));
        assert!(info.average_entry_tokens > 0.0);
    }
}
