//! # Arcade Web Utilities
//!
//! Middleware and error handling shared by the Arcade HTTP control surface.
//!
//! ## Example
//!
//! ```rust,no_run
//! use axum::{middleware, routing::get, Router};
//! use arcade_web::middleware::{cors_layer_with_origins, request_id_middleware};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let app: Router = Router::new()
//!     .route("/", get(|| async { "ok" }))
//!     .layer(middleware::from_fn(request_id_middleware))
//!     .layer(cors_layer_with_origins(&["*".to_string()]));
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:5003").await.unwrap();
//! axum::serve(listener, app).await.unwrap();
//! # }
//! ```

pub mod errors;
pub mod middleware;

// Re-export commonly used types and functions
pub use errors::WebError;
pub use middleware::{
    cors_layer, cors_layer_with_config, cors_layer_with_origins, request_id_middleware, CorsConfig, RequestId,
    REQUEST_ID_HEADER,
};
