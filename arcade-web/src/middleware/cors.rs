use axum::http::{HeaderName, HeaderValue, Method};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};

/// CORS configuration for the control API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Allowed origins; `["*"]` allows any origin
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub expose_headers: Vec<String>,
    /// Maximum age for preflight cache
    pub max_age: Option<Duration>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".to_string()],
            allowed_methods: vec!["GET".to_string(), "POST".to_string(), "OPTIONS".to_string()],
            allowed_headers: vec![
                "content-type".to_string(),
                "accept".to_string(),
                "x-request-id".to_string(),
            ],
            expose_headers: vec!["x-request-id".to_string()],
            max_age: Some(Duration::from_secs(3600)), // 1 hour
        }
    }
}

impl CorsConfig {
    pub fn with_origins(allowed_origins: Vec<String>) -> Self {
        Self {
            allowed_origins,
            ..Default::default()
        }
    }

    fn allows_any_origin(&self) -> bool {
        self.allowed_origins.iter().any(|origin| origin == "*")
    }
}

/// Create CORS layer with the default permissive configuration
pub fn cors_layer() -> CorsLayer {
    cors_layer_with_config(CorsConfig::default())
}

/// Create CORS layer allowing the given origins
pub fn cors_layer_with_origins(origins: &[String]) -> CorsLayer {
    cors_layer_with_config(CorsConfig::with_origins(origins.to_vec()))
}

/// Create CORS layer with custom configuration
pub fn cors_layer_with_config(config: CorsConfig) -> CorsLayer {
    let mut cors = CorsLayer::new();

    if config.allows_any_origin() || config.allowed_origins.is_empty() {
        cors = cors.allow_origin(Any);
        tracing::debug!("CORS configured to allow any origin");
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|origin| match origin.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!("Ignoring invalid CORS origin '{}': {}", origin, e);
                    None
                }
            })
            .collect();
        cors = cors.allow_origin(origins);
    }

    let methods: Vec<Method> = config
        .allowed_methods
        .iter()
        .filter_map(|method| method.parse().ok())
        .collect();
    cors = cors.allow_methods(methods);

    let headers: Vec<HeaderName> = config
        .allowed_headers
        .iter()
        .filter_map(|header| header.parse().ok())
        .collect();
    cors = cors.allow_headers(headers);

    let expose_headers: Vec<HeaderName> = config
        .expose_headers
        .iter()
        .filter_map(|header| header.parse().ok())
        .collect();
    cors = cors.expose_headers(expose_headers);

    if let Some(max_age) = config.max_age {
        cors = cors.max_age(max_age);
    }

    cors
}
