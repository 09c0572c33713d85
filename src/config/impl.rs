use std::sync::{Arc, OnceLock};

use arc_swap::ArcSwap;

use super::StaticConfig;

static CONFIG: OnceLock<ArcSwap<StaticConfig>> = OnceLock::new();

/// Get the global configuration instance
///
/// Returns an Arc pointer to the configuration, which is cheap to clone
/// and doesn't hold any locks.
pub fn get_config() -> Arc<StaticConfig> {
    CONFIG
        .get()
        .expect("Config not initialized. Call init_config() first.")
        .load_full()
}

/// Initialize the global configuration
///
/// Loads configuration from "config.toml" in the current directory and
/// `SK__*` environment variables. Repeated calls are no-ops.
///
/// # Examples
/// ```no_run
/// use skafolio::config::init_config;
/// init_config();
/// ```
pub fn init_config() {
    CONFIG.get_or_init(|| ArcSwap::from_pointee(StaticConfig::load()));
}

/// Replace the global configuration with a modified copy
///
/// Readers holding an earlier `Arc` keep seeing the old snapshot.
pub fn update_config<F>(f: F)
where
    F: FnOnce(&mut StaticConfig),
{
    init_config();
    if let Some(cell) = CONFIG.get() {
        let mut next = (*cell.load_full()).clone();
        f(&mut next);
        cell.store(Arc::new(next));
    }
}
