use std::path::{Path, PathBuf};

use tracing::warn;

use risk_copilot_core::DEFAULT_TOP_K;

use crate::error::AppError;

pub const DEFAULT_KB_PATH: &str = "data/knowledge_base.json";

#[derive(Debug, Clone)]
pub struct Config {
    /// JSON knowledge base loaded once at startup.
    pub kb_path: PathBuf,
    /// Entries retrieved per query when the caller does not say.
    pub top_k: usize,
    /// Serve MCP over TCP on this address instead of stdio.
    pub tcp_listen_addr: Option<String>,
}

impl Config {
    /// Optional:
    /// - `RISK_COPILOT_KB_PATH` (default: "data/knowledge_base.json")
    /// - `RISK_COPILOT_TOP_K` (default: 3)
    /// - `MCP_TCP_LISTEN_ADDR`
    ///
    /// `kb_path` and `top_k` given on the command line win over the environment.
    pub fn from_env(kb_path: Option<PathBuf>, top_k: Option<usize>) -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok(), kb_path, top_k)
    }

    fn from_lookup<F>(lookup: F, kb_path: Option<PathBuf>, top_k: Option<usize>) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let kb_path = kb_path
            .or_else(|| lookup("RISK_COPILOT_KB_PATH").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_KB_PATH));
        if !kb_path.is_file() {
            return Err(AppError::Config(format!(
                "knowledge base file not found: {} (set RISK_COPILOT_KB_PATH or pass --kb)",
                kb_path.display()
            )));
        }

        let top_k = match top_k {
            Some(n) => n,
            None => match lookup("RISK_COPILOT_TOP_K") {
                Some(raw) => raw.trim().parse::<usize>().map_err(|_| {
                    AppError::Config(format!(
                        "RISK_COPILOT_TOP_K must be a positive integer, got '{raw}'"
                    ))
                })?,
                None => DEFAULT_TOP_K,
            },
        };
        let top_k = if top_k == 0 {
            warn!("top_k of 0 requested, using 1");
            1
        } else {
            top_k
        };

        Ok(Self {
            kb_path,
            top_k,
            tcp_listen_addr: lookup("MCP_TCP_LISTEN_ADDR").filter(|addr| !addr.trim().is_empty()),
        })
    }

    pub fn kb_path(&self) -> &Path {
        &self.kb_path
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn bundled_kb() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("../../data/knowledge_base.json")
    }

    fn lookup(vars: &[(&str, String)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    fn kb_var() -> (&'static str, String) {
        ("RISK_COPILOT_KB_PATH", bundled_kb().to_string_lossy().to_string())
    }

    #[test]
    fn defaults_apply_when_only_path_is_set() {
        let config = Config::from_lookup(lookup(&[kb_var()]), None, None).unwrap();
        assert_eq!(config.top_k, DEFAULT_TOP_K);
        assert!(config.tcp_listen_addr.is_none());
        assert_eq!(config.kb_path(), bundled_kb().as_path());
    }

    #[test]
    fn cli_values_override_environment() {
        let vars = [
            ("RISK_COPILOT_KB_PATH", "/nonexistent/kb.json".to_string()),
            ("RISK_COPILOT_TOP_K", "9".to_string()),
        ];
        let config = Config::from_lookup(lookup(&vars), Some(bundled_kb()), Some(2)).unwrap();
        assert_eq!(config.top_k, 2);
        assert_eq!(config.kb_path, bundled_kb());
    }

    #[test]
    fn top_k_from_env_is_parsed_and_clamped() {
        let vars = [kb_var(), ("RISK_COPILOT_TOP_K", " 5 ".to_string())];
        assert_eq!(Config::from_lookup(lookup(&vars), None, None).unwrap().top_k, 5);

        let vars = [kb_var(), ("RISK_COPILOT_TOP_K", "0".to_string())];
        assert_eq!(Config::from_lookup(lookup(&vars), None, None).unwrap().top_k, 1);

        let vars = [kb_var(), ("RISK_COPILOT_TOP_K", "three".to_string())];
        let err = Config::from_lookup(lookup(&vars), None, None).unwrap_err();
        assert!(matches!(err, AppError::Config(msg) if msg.contains("RISK_COPILOT_TOP_K")));
    }

    #[test]
    fn missing_knowledge_base_is_a_config_error() {
        let vars = [("RISK_COPILOT_KB_PATH", "/nonexistent/kb.json".to_string())];
        let err = Config::from_lookup(lookup(&vars), None, None).unwrap_err();
        assert!(matches!(err, AppError::Config(msg) if msg.contains("/nonexistent/kb.json")));
    }

    #[test]
    fn tcp_address_is_optional() {
        let vars = [kb_var(), ("MCP_TCP_LISTEN_ADDR", "127.0.0.1:7300".to_string())];
        let config = Config::from_lookup(lookup(&vars), None, None).unwrap();
        assert_eq!(config.tcp_listen_addr.as_deref(), Some("127.0.0.1:7300"));
    }
}
