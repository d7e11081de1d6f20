use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Text-transformation service endpoint (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Base URL of the transformation service.
    pub base_url: String,
    /// Model name sent with every request.
    pub model: String,
    /// Connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Per-request transfer timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "mistral".to_string(),
            connect_timeout_secs: 15,
            request_timeout_secs: 120,
        }
    }
}

/// Global configuration loaded from `~/.config/dfq/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DfqConfig {
    /// Hard cap on workers reserved across all running jobs.
    pub worker_budget: usize,
    /// Backstop scheduler tick in seconds.
    pub tick_interval_secs: u64,
    /// How long queue count snapshots may be served from cache, in seconds.
    pub stats_cache_secs: u64,
    /// A drain pass held longer than this is logged as stuck, in seconds.
    pub stuck_drain_secs: u64,
    /// A job running longer than this is reported by `dfq metrics`, in seconds.
    pub stuck_job_secs: u64,
    /// Terminal queue rows older than this many days are removed on `dfq run`.
    pub cleanup_max_age_days: u64,
    /// Optional transformation service settings; defaults target a local Ollama.
    #[serde(default)]
    pub service: Option<ServiceConfig>,
}

impl Default for DfqConfig {
    fn default() -> Self {
        Self {
            worker_budget: 6,
            tick_interval_secs: 5,
            stats_cache_secs: 30,
            stuck_drain_secs: 60,
            stuck_job_secs: 600,
            cleanup_max_age_days: 7,
            service: None,
        }
    }
}

impl DfqConfig {
    /// Service settings, falling back to the built-in local defaults.
    pub fn service(&self) -> ServiceConfig {
        self.service.clone().unwrap_or_default()
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("dfq")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<DfqConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = DfqConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: DfqConfig = toml::from_str(&data)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = DfqConfig::default();
        assert_eq!(cfg.worker_budget, 6);
        assert_eq!(cfg.tick_interval_secs, 5);
        assert_eq!(cfg.stats_cache_secs, 30);
        assert_eq!(cfg.cleanup_max_age_days, 7);
        assert!(cfg.service.is_none());
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = DfqConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: DfqConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.worker_budget, cfg.worker_budget);
        assert_eq!(parsed.tick_interval_secs, cfg.tick_interval_secs);
        assert_eq!(parsed.stats_cache_secs, cfg.stats_cache_secs);
    }

    #[test]
    fn config_toml_custom_values() {
        let toml = r#"
            worker_budget = 4
            tick_interval_secs = 10
            stats_cache_secs = 5
            stuck_drain_secs = 30
            stuck_job_secs = 300
            cleanup_max_age_days = 1
        "#;
        let cfg: DfqConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.worker_budget, 4);
        assert_eq!(cfg.tick_interval_secs, 10);
        assert_eq!(cfg.stats_cache_secs, 5);
        assert!(cfg.service.is_none());
        // Absent service section falls back to local defaults.
        assert_eq!(cfg.service().base_url, "http://localhost:11434");
    }

    #[test]
    fn config_toml_service_section() {
        let toml = r#"
            worker_budget = 6
            tick_interval_secs = 5
            stats_cache_secs = 30
            stuck_drain_secs = 60
            stuck_job_secs = 600
            cleanup_max_age_days = 7

            [service]
            base_url = "http://fmt.internal:8080"
            model = "formatter-v2"
            connect_timeout_secs = 5
            request_timeout_secs = 60
        "#;
        let cfg: DfqConfig = toml::from_str(toml).unwrap();
        let svc = cfg.service.as_ref().unwrap();
        assert_eq!(svc.base_url, "http://fmt.internal:8080");
        assert_eq!(svc.model, "formatter-v2");
        assert_eq!(svc.connect_timeout_secs, 5);
        assert_eq!(svc.request_timeout_secs, 60);
    }
}
