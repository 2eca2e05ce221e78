use std::fs;
use std::path::{Path, PathBuf};

use claudegate_types::{BackendKind, ConfigError, GatewayConfig};
use tracing::{debug, info};
use validator::Validate;

use crate::error::AppResult;

const CONFIG_DIR: &str = "claudegate";
const CONFIG_FILE: &str = "config.json";
const ENV_PREFIX: &str = "CLAUDEGATE_";

/// `<config dir>/claudegate/config.json`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
}

/// Load the gateway configuration.
///
/// An explicit path must exist. Without one, a missing default file yields
/// the built-in defaults.
pub fn load_config(path: Option<&Path>) -> AppResult<GatewayConfig> {
    let (path, explicit) = match path {
        Some(p) => (p.to_path_buf(), true),
        None => match default_config_path() {
            Some(p) => (p, false),
            None => {
                debug!("No platform config directory; using defaults");
                return Ok(GatewayConfig::default());
            }
        },
    };

    if !explicit && !path.exists() {
        debug!("Config file {} not found; using defaults", path.display());
        return Ok(GatewayConfig::default());
    }

    let content = fs::read_to_string(&path).map_err(|e| ConfigError::from_io_error(&path, &e))?;
    let config: GatewayConfig =
        serde_json::from_str(&content).map_err(|e| ConfigError::from_json_error(&e))?;
    info!("Loaded config from {}", path.display());
    Ok(config)
}

/// Save configuration atomically (temp file + rename).
pub fn save_config(path: &Path, config: &GatewayConfig) -> AppResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let temp_path = path.with_extension("json.tmp");
    let content = serde_json::to_string_pretty(config)?;
    fs::write(&temp_path, content)?;
    fs::rename(&temp_path, path)?;
    Ok(())
}

/// Apply `CLAUDEGATE_*` overrides read through `lookup`.
///
/// Takes a lookup function rather than reading the process environment so
/// callers and tests control the source.
pub fn apply_env_overrides<F>(config: &mut GatewayConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name)).filter(|v| !v.trim().is_empty());

    if let Some(host) = var("HOST") {
        config.host = host;
    }
    if let Some(port) = var("PORT") {
        config.port = port.trim().parse().map_err(|_| ConfigError::ValidationError {
            field: "CLAUDEGATE_PORT".to_string(),
            message: format!("'{}' is not a valid port", port),
        })?;
    }
    if let Some(kind) = var("BACKEND") {
        config.backend.kind = BackendKind::from_string(&kind).ok_or_else(|| ConfigError::ValidationError {
            field: "CLAUDEGATE_BACKEND".to_string(),
            message: format!("unknown backend '{}' (expected vertex or anthropic)", kind),
        })?;
    }
    if let Some(url) = var("BACKEND_URL") {
        config.backend.base_url = Some(url);
    }
    if let Some(key) = var("API_KEY") {
        config.backend.api_key = Some(key);
    }
    if let Some(project) = var("PROJECT_ID") {
        config.backend.project_id = Some(project);
    }
    if let Some(region) = var("REGION") {
        config.backend.region = region;
    }
    if let Some(path) = var("REQUEST_LOG") {
        config.request_log = Some(PathBuf::from(path));
    }
    Ok(())
}

pub fn validate_config(config: &GatewayConfig) -> Result<(), ConfigError> {
    config.validate().map_err(|e| ConfigError::from_validation(&e))
}
