//! Skafolio - digital business card service
//!
//! Users publish business cards under a public slug, collect view/click
//! analytics for them and order printed NFC cards paid through PayFast.
//!
//! # Architecture
//! - `storage`: Sea-ORM backend and domain models
//! - `analytics`: summary aggregation and background refresh
//! - `payments`: PayFast signing, IPN verification and pricing
//! - `services`: business operations behind the HTTP layer
//! - `api`: HTTP handlers, extractors and middleware
//! - `config`: configuration management
//! - `runtime`: application lifecycle and execution modes
//! - `system`: logging setup

pub mod analytics;
pub mod api;
pub mod cli;
pub mod config;
pub mod errors;
pub mod metrics_core;
pub mod payments;
pub mod runtime;
pub mod services;
pub mod storage;
pub mod system;
pub mod utils;
