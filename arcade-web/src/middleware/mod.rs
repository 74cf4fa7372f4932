pub mod cors;
pub mod request_id;

// Re-export layer creation functions
pub use cors::{cors_layer, cors_layer_with_config, cors_layer_with_origins, CorsConfig};
pub use request_id::{request_id_middleware, RequestId, REQUEST_ID_HEADER};
