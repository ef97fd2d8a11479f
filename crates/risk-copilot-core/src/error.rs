/// Errors raised while building the knowledge base. Both are fatal and surface
/// before any query is served.
#[derive(Debug, thiserror::Error)]
pub enum CopilotError {
    /// The knowledge base source is missing or unreadable.
    #[error("config error: {0}")]
    Config(String),

    /// The knowledge base content violates a structural rule.
    #[error("validation error: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, CopilotError>;
