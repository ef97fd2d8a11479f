pub mod agent;
pub mod error;
pub mod knowledge;
pub mod mcp_api;
pub mod report;
pub mod retrieval;
pub mod rules;
pub mod text;

pub use agent::{AgentOutput, RiskCopilot, DEFAULT_TOP_K};
pub use error::CopilotError;
pub use knowledge::{Document, KnowledgeBase};
pub use retrieval::{Bm25Retriever, RankedDocument};
pub use rules::{QueryProfile, Severity};
