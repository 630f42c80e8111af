use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    /// Public hostname the gateway reaches us on; used to build the media
    /// websocket URL in the answer document.
    pub public_host: String,
    /// Gateway webhook signing secret. Empty skips signature validation (dev).
    pub gateway_auth_token: String,
    pub llm_provider: String,
    pub llm_base_url: String,
    pub llm_api_key: String,
    pub llm_model: String,
    pub ollama_url: String,
    pub ollama_model: String,
    pub speech_url: String,
    pub speech_api_key: String,
    pub speech_voice: String,
    pub pms_base_url: String,
    pub pms_api_key: String,
    pub keepalive_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "frontdesk.db".to_string()),
            public_host: env::var("PUBLIC_HOST").unwrap_or_else(|_| "localhost:3000".to_string()),
            gateway_auth_token: env::var("GATEWAY_AUTH_TOKEN").unwrap_or_default(),
            llm_provider: env::var("LLM_PROVIDER").unwrap_or_else(|_| "ollama".to_string()),
            llm_base_url: env::var("LLM_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            llm_api_key: env::var("LLM_API_KEY").unwrap_or_default(),
            llm_model: env::var("LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            ollama_url: env::var("OLLAMA_URL")
                .unwrap_or_else(|_| "http://localhost:11434".to_string()),
            ollama_model: env::var("OLLAMA_MODEL").unwrap_or_else(|_| "llama3.2".to_string()),
            speech_url: env::var("SPEECH_AGENT_URL").unwrap_or_else(|_| {
                "wss://api.openai.com/v1/realtime?model=gpt-4o-realtime-preview".to_string()
            }),
            speech_api_key: env::var("SPEECH_AGENT_API_KEY").unwrap_or_default(),
            speech_voice: env::var("SPEECH_VOICE").unwrap_or_else(|_| "alloy".to_string()),
            pms_base_url: env::var("PMS_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080/api".to_string()),
            pms_api_key: env::var("PMS_API_KEY").unwrap_or_default(),
            keepalive_secs: env::var("KEEPALIVE_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(15),
        }
    }
}
