//! Layered configuration for the depth cache.
//!
//! Configuration is loaded in layers with increasing priority:
//! 1. Compiled-in defaults (30 minute snapshot refresh, 1 000 buffered events)
//! 2. TOML configuration file (if provided)
//! 3. Environment variable overrides (prefix `LOB_`, nested with `__`)

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::fixed::MAX_PRECISION;
use crate::types::{Precision, Symbol};

// ── Default value functions ────────────────────────────────────────────

/// Default full-snapshot refresh interval: 30 minutes.
fn default_refresh_interval_secs() -> u64 {
    30 * 60
}

/// Default delay before retrying a failed snapshot fetch: 5 seconds.
fn default_retry_interval_secs() -> u64 {
    5
}

/// Default number of depth events buffered while a symbol resyncs.
fn default_buffer_capacity() -> usize {
    1_000
}

/// Default depth of the compact snapshot text: 5 levels per side.
fn default_snapshot_levels() -> usize {
    5
}

// ── Configuration structs ──────────────────────────────────────────────

/// Top-level application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Depth cache behaviour.
    pub depth: DepthConfig,
    /// Symbols to maintain books for.
    #[serde(default)]
    pub symbols: Vec<SymbolConfig>,
    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Depth cache refresh, buffering and sequencing settings.
#[derive(Debug, Clone, Deserialize)]
pub struct DepthConfig {
    /// Seconds between full snapshot refreshes. `0` disables refreshing.
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    /// Seconds to wait before retrying a failed snapshot fetch.
    #[serde(default = "default_retry_interval_secs")]
    pub retry_interval_secs: u64,
    /// Maximum number of depth events buffered before a snapshot arrives.
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,
    /// Levels per side written to compact snapshot text.
    #[serde(default = "default_snapshot_levels")]
    pub snapshot_levels: usize,
    /// Reject delta batches whose sequence does not advance.
    #[serde(default)]
    pub strict_sequencing: bool,
}

impl DepthConfig {
    /// Refresh interval as a [`Duration`], `None` when refreshing is disabled.
    pub fn refresh_interval(&self) -> Option<Duration> {
        (self.refresh_interval_secs > 0).then(|| Duration::from_secs(self.refresh_interval_secs))
    }

    /// Delay before retrying a failed snapshot fetch.
    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_secs)
    }
}

impl Default for DepthConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval_secs(),
            retry_interval_secs: default_retry_interval_secs(),
            buffer_capacity: default_buffer_capacity(),
            snapshot_levels: default_snapshot_levels(),
            strict_sequencing: false,
        }
    }
}

/// Per-symbol precision settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SymbolConfig {
    /// Trading pair, e.g. `ETHBTC`.
    pub symbol: String,
    /// Decimal places of prices.
    pub price_precision: u32,
    /// Decimal places of volumes.
    pub volume_precision: u32,
}

impl SymbolConfig {
    /// Normalised symbol.
    pub fn symbol(&self) -> Symbol {
        Symbol::new(self.symbol.as_str())
    }

    /// Validated precision pair.
    pub fn precision(&self) -> Result<Precision> {
        Precision::new(self.price_precision, self.volume_precision)
            .with_context(|| format!("invalid precision for {}", self.symbol))
    }
}

/// Log output settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    /// Emit JSON instead of pretty-printed logs.
    #[serde(default)]
    pub json: bool,
}

impl AppConfig {
    /// Load configuration using layered sources.
    ///
    /// 1. Compiled-in defaults.
    /// 2. TOML file at `config_path` (if `Some`).
    /// 3. Environment variable overrides with prefix `LOB_` and `__` as
    ///    the nesting separator (e.g., `LOB_DEPTH__STRICT_SEQUENCING=true`).
    pub fn load(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder()
            // ── Layer 1: compiled-in defaults ───────────────────────
            .set_default("depth.refresh_interval_secs", default_refresh_interval_secs() as i64)?
            .set_default("depth.retry_interval_secs", default_retry_interval_secs() as i64)?
            .set_default("depth.buffer_capacity", default_buffer_capacity() as i64)?
            .set_default("depth.snapshot_levels", default_snapshot_levels() as i64)?
            .set_default("depth.strict_sequencing", false)?
            .set_default("logging.json", false)?;

        // ── Layer 2: TOML file ─────────────────────────────────────
        if let Some(path) = config_path {
            let path_str = path.to_str().context("config path is not valid UTF-8")?;
            builder = builder.add_source(File::with_name(path_str).required(true));
        }

        // ── Layer 3: env var overrides (LOB_ prefix) ──────────────
        // The prefix separator is set explicitly; otherwise `config` would
        // reuse the `__` nesting separator after the prefix.
        builder = builder.add_source(
            Environment::with_prefix("LOB")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let cfg: AppConfig = builder
            .build()
            .context("failed to build configuration")?
            .try_deserialize()
            .context("failed to deserialize configuration")?;

        cfg.validate()?;
        tracing::debug!(
            symbols = cfg.symbols.len(),
            refresh_interval_secs = cfg.depth.refresh_interval_secs,
            strict_sequencing = cfg.depth.strict_sequencing,
            "configuration loaded"
        );
        Ok(cfg)
    }

    /// Validate configuration invariants.
    fn validate(&self) -> Result<()> {
        if self.depth.buffer_capacity == 0 {
            bail!("depth.buffer_capacity must be greater than zero");
        }
        if self.depth.snapshot_levels == 0 {
            bail!("depth.snapshot_levels must be greater than zero");
        }

        let mut seen = HashSet::new();
        for sym in &self.symbols {
            if sym.price_precision > MAX_PRECISION || sym.volume_precision > MAX_PRECISION {
                bail!(
                    "precision for {} exceeds the maximum of {}",
                    sym.symbol,
                    MAX_PRECISION
                );
            }
            if !seen.insert(sym.symbol()) {
                bail!("duplicate symbol {}", sym.symbol);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;

    /// Global mutex to serialize tests that manipulate environment variables.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn lock_env() -> std::sync::MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn clear_env() {
        std::env::remove_var("LOB_DEPTH__STRICT_SEQUENCING");
        std::env::remove_var("LOB_DEPTH__BUFFER_CAPACITY");
    }

    /// Helper: create a temporary TOML config file and return its path.
    fn write_temp_toml(content: &str) -> (tempfile::NamedTempFile, PathBuf) {
        let mut f = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("create temp file");
        write!(f, "{}", content).expect("write temp file");
        let path = f.path().to_path_buf();
        (f, path)
    }

    #[test]
    fn test_load_defaults_only() {
        let _lock = lock_env();
        clear_env();

        let cfg = AppConfig::load(None).expect("load defaults");
        assert_eq!(cfg.depth.refresh_interval_secs, 1800);
        assert_eq!(cfg.depth.refresh_interval(), Some(Duration::from_secs(1800)));
        assert_eq!(cfg.depth.retry_interval(), Duration::from_secs(5));
        assert_eq!(cfg.depth.buffer_capacity, 1000);
        assert_eq!(cfg.depth.snapshot_levels, 5);
        assert!(!cfg.depth.strict_sequencing);
        assert!(cfg.symbols.is_empty());
        assert!(!cfg.logging.json);
    }

    #[test]
    fn test_load_from_toml() {
        let _lock = lock_env();
        clear_env();

        let toml_content = r#"
[depth]
refresh_interval_secs = 0
snapshot_levels = 10

[logging]
json = true

[[symbols]]
symbol = "ethbtc"
price_precision = 6
volume_precision = 3

[[symbols]]
symbol = "BTCUSDT"
price_precision = 2
volume_precision = 6
"#;
        let (_f, path) = write_temp_toml(toml_content);
        let cfg = AppConfig::load(Some(path)).expect("load from toml");

        assert_eq!(cfg.depth.refresh_interval(), None);
        assert_eq!(cfg.depth.snapshot_levels, 10);
        assert_eq!(cfg.depth.buffer_capacity, 1000);
        assert!(cfg.logging.json);
        assert_eq!(cfg.symbols.len(), 2);
        assert_eq!(cfg.symbols[0].symbol(), Symbol::new("ETHBTC"));
        assert_eq!(cfg.symbols[0].precision().unwrap(), Precision::new(6, 3).unwrap());
    }

    #[test]
    fn test_env_var_overrides() {
        let _lock = lock_env();
        clear_env();
        std::env::set_var("LOB_DEPTH__STRICT_SEQUENCING", "true");
        std::env::set_var("LOB_DEPTH__BUFFER_CAPACITY", "64");

        let cfg = AppConfig::load(None).expect("load with env override");
        assert!(cfg.depth.strict_sequencing);
        assert_eq!(cfg.depth.buffer_capacity, 64);

        clear_env();
    }

    #[test]
    fn test_duplicate_symbol_rejected() {
        let _lock = lock_env();
        clear_env();

        let toml_content = r#"
[[symbols]]
symbol = "ethbtc"
price_precision = 6
volume_precision = 3

[[symbols]]
symbol = "ETHBTC"
price_precision = 6
volume_precision = 3
"#;
        let (_f, path) = write_temp_toml(toml_content);
        let err = AppConfig::load(Some(path)).unwrap_err();
        assert!(format!("{err}").contains("duplicate symbol"));
    }

    #[test]
    fn test_excessive_precision_rejected() {
        let _lock = lock_env();
        clear_env();

        let toml_content = r#"
[[symbols]]
symbol = "ETHBTC"
price_precision = 19
volume_precision = 3
"#;
        let (_f, path) = write_temp_toml(toml_content);
        assert!(AppConfig::load(Some(path)).is_err());
    }

    #[test]
    fn test_zero_buffer_capacity_rejected() {
        let _lock = lock_env();
        clear_env();

        let toml_content = r#"
[depth]
buffer_capacity = 0
"#;
        let (_f, path) = write_temp_toml(toml_content);
        let err = AppConfig::load(Some(path)).unwrap_err();
        assert!(format!("{err}").contains("buffer_capacity"));
    }
}
