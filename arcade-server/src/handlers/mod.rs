//! HTTP request handlers

pub mod health;
pub mod workers;

pub use health::{health_check, not_found, root};
pub use workers::{list_workers, start_worker, stop_all_workers, stop_worker, worker_logs};
