// src/ai_bootstrap.rs
use crate::ai_adapter::{build_chat_model, DynChatModel};
use crate::config::ai::AiConfig;
use tracing::{info, warn};

pub struct AiRuntime {
    pub cfg: AiConfig,
    pub model: Option<DynChatModel>,
}

impl AiRuntime {
    /// Same lookup order as [`AiConfig::load_default`]. A broken config file
    /// leaves the model unconfigured rather than failing startup.
    pub fn from_env() -> Self {
        match AiConfig::load_default() {
            Ok(cfg) => Self::from_config(cfg),
            Err(e) => {
                warn!(error = ?e, "AI config unreadable; model-backed features disabled");
                Self {
                    cfg: AiConfig::default(),
                    model: None,
                }
            }
        }
    }

    pub fn from_config(cfg: AiConfig) -> Self {
        // Safe diagnostics: only provider + enabled + key length
        info!(
            "AI cfg loaded: provider={}, model={}, enabled={}, key_len={}",
            cfg.provider,
            cfg.model,
            cfg.enabled,
            cfg.api_key.len()
        );
        let model = build_chat_model(&cfg);
        if model.is_none() {
            warn!("AI client not configured; sentiment analysis will report a configuration error");
        }
        Self { cfg, model }
    }
}
