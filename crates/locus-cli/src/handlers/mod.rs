//! Command handlers, kept out of main.rs for testability

pub mod cache;
pub mod reduce;
pub mod resolve;

pub use cache::{execute_cache, render_json, render_records, render_summaries, summarize, SuiteSummary};
pub use reduce::{execute_reduce, reduce_file};
pub use resolve::{describe, execute_resolve, load_config, resolve_on};
