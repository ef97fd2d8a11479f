use risk_copilot_core::CopilotError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Copilot(#[from] CopilotError),
}
