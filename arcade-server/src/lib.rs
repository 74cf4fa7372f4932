//! Arcade control server
//!
//! Exposes the worker supervisor over HTTP so the browser game client can
//! start, stop and inspect activity workers.

pub mod app;
pub mod context;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod startup;

pub use app::create_app;
pub use context::AppState;
pub use errors::{RestError, RestResult};
pub use startup::Server;
