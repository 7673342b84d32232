//! BackendService: reset and event-delta access against a target web
//! application's backend.

pub mod http;
pub mod service;

pub use http::HttpBackendService;
pub use service::{BackendError, BackendService, NullBackendService};
