//! Client-side disclosure workflow: upload, analyze, tease, unlock, compare.

pub mod app;
pub mod fanout;
pub mod progress;
pub mod screens;
pub mod service;
pub mod session;
pub mod upload;
pub mod viewer;

pub use app::{AnalysisOutcome, App, WorkflowTimings};
pub use service::HttpStyleService;
