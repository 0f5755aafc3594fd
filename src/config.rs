use std::env;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_UPSTREAM_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_ALLOWED_ORIGINS: &str = "https://purelyhomecare.carrd.co";

/// Origins permitted to receive a non-"null" Access-Control-Allow-Origin.
#[derive(Debug, Clone)]
pub enum AllowedOrigins {
    Any,
    List(Vec<String>),
}

impl AllowedOrigins {
    pub fn from_spec(spec: &str) -> Self {
        if spec.trim() == "*" {
            return AllowedOrigins::Any;
        }
        let origins = spec
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        AllowedOrigins::List(origins)
    }

    /// Resolve the Access-Control-Allow-Origin value for a request origin.
    /// Disallowed (or absent) origins get the literal "null" rather than a
    /// reflected value or an omitted header.
    pub fn allow_origin_value<'a>(&self, origin: &'a str) -> &'a str {
        match self {
            AllowedOrigins::Any if !origin.is_empty() => origin,
            AllowedOrigins::List(list) if list.iter().any(|o| o == origin) => origin,
            _ => "null",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub host: String,
    pub port: u16,
    pub api_key: Option<String>,
    pub model: String,
    pub upstream_url: String,
    pub allowed_origins: AllowedOrigins,
    pub timeout: u64,
    pub max_payload_size: usize,
}

impl RelayConfig {
    /// Read the environment-supplied half of the configuration once at
    /// startup. A missing credential is kept as None so the server can
    /// start and reject each request with the configuration error.
    pub fn from_env(host: String, port: u16, timeout: u64, max_payload_size: usize) -> Self {
        let allowed = env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| DEFAULT_ALLOWED_ORIGINS.to_string());
        RelayConfig {
            host,
            port,
            api_key: env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty()),
            model: env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            upstream_url: env::var("OPENAI_API_URL")
                .unwrap_or_else(|_| DEFAULT_UPSTREAM_URL.to_string()),
            allowed_origins: AllowedOrigins::from_spec(&allowed),
            timeout,
            max_payload_size,
        }
    }
}
