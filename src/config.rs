use anyhow::{Result, anyhow};

pub const TRANSCRIPTION_API_URL: &str = "https://api.siliconflow.cn/v1/audio/transcriptions";
pub const CHAT_API_URL: &str = "https://api.siliconflow.cn/v1/chat/completions";

pub const TRANSCRIPTION_MODEL: &str = "FunAudioLLM/SenseVoiceSmall";
pub const CORRECTION_MODEL: &str = "Qwen/Qwen3-235B-A22B";

/// Process-wide configuration, read once at startup and immutable afterwards.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub transcription_api_key: String,
    pub llm_api_key: String,
}

impl AppConfig {
    /// Loads both API keys from the environment. The server refuses to start
    /// when either is missing or empty.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            transcription_api_key: require_env("SILICON_FLOW_API_KEY")?,
            llm_api_key: require_env("LLM_API_KEY")?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(anyhow!("{} must be set as an environment variable", key)),
    }
}
