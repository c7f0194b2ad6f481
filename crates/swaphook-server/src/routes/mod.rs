//! HTTP route handlers.

pub mod test_app;
pub mod webhook;
