pub mod models;
pub mod monitor;

pub use monitor::{format_summary, MosquitoMonitor};
