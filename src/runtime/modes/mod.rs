//! Mode routing
//!
//! Server mode is the only long-running mode; `generate-config` is handled
//! directly in `main`.

pub mod server;

pub use server::run_server;
