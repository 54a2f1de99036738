pub mod filter;
pub mod pipeline;
pub mod selector;
pub mod service;
pub mod stores;

pub use filter::{decide, Decision, SkipReason};
pub use pipeline::{Responder, RunContext, RunReport};
pub use selector::{render, select, select_with};
pub use service::ResponderService;
pub use stores::{DedupStore, WatermarkStore};
