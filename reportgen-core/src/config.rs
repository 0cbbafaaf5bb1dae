//! YAML configuration file.
//!
//! # Storage layout
//!
//! ```text
//! ~/.reportgen/
//!   config.yaml   (mode 0600, created by `reportgen config init`)
//! ```
//!
//! # API pattern
//!
//! Every function touching the file system has two forms:
//! - `fn_at(home: &Path, …)`: explicit home, used in tests with `TempDir`
//! - `fn(…)`: derives home from `dirs::home_dir()`, delegates to `_at`
//!
//! A missing file is not an error: [`load_at`] returns [`Settings::default`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::BrandProfile;

pub const DEFAULT_SERVICE_URL: &str = "http://127.0.0.1:8787";
pub const DEFAULT_PRODUCT_NAME: &str = "Market Reports";
pub const DEFAULT_PRIMARY_COLOR: &str = "#1f3b5c";
pub const DEFAULT_ACCENT_COLOR: &str = "#c8a24a";

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Root of `config.yaml`. Every section falls back to its defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub service: ServiceSettings,
    pub polling: PollSettings,
    pub brand: BrandSettings,
    pub preview: PreviewSettings,
}

/// Where the report service lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    pub base_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SERVICE_URL.to_string(),
            api_key: None,
            request_timeout_secs: 15,
        }
    }
}

/// Job polling cadence and budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollSettings {
    pub interval_ms: u64,
    pub max_attempts: u32,
    pub progress_tick_ms: u64,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval_ms: 2_000,
            max_attempts: 60,
            progress_tick_ms: 500,
        }
    }
}

impl PollSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn progress_tick(&self) -> Duration {
        Duration::from_millis(self.progress_tick_ms)
    }
}

/// Product defaults used when a brand profile leaves a field empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrandSettings {
    pub product_name: String,
    pub primary_color: String,
    pub accent_color: String,
    /// Optional path to a local brand profile YAML used instead of the account service.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_path: Option<PathBuf>,
}

impl Default for BrandSettings {
    fn default() -> Self {
        Self {
            product_name: DEFAULT_PRODUCT_NAME.to_string(),
            primary_color: DEFAULT_PRIMARY_COLOR.to_string(),
            accent_color: DEFAULT_ACCENT_COLOR.to_string(),
            profile_path: None,
        }
    }
}

/// Live-preview tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewSettings {
    pub debounce_ms: u64,
}

impl Default for PreviewSettings {
    fn default() -> Self {
        Self { debounce_ms: 500 }
    }
}

impl PreviewSettings {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Settings {
    /// Rejects values that would make polling unbounded or styling invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service.base_url.trim().is_empty() {
            return Err(invalid("service.base_url", "must not be empty"));
        }
        if self.polling.interval_ms == 0 {
            return Err(invalid("polling.interval_ms", "must be at least 1"));
        }
        if self.polling.max_attempts == 0 {
            return Err(invalid("polling.max_attempts", "must be at least 1"));
        }
        if self.polling.progress_tick_ms == 0 {
            return Err(invalid("polling.progress_tick_ms", "must be at least 1"));
        }
        if !is_hex_color(&self.brand.primary_color) {
            return Err(invalid(
                "brand.primary_color",
                format!("'{}' is not a #rgb or #rrggbb color", self.brand.primary_color),
            ));
        }
        if !is_hex_color(&self.brand.accent_color) {
            return Err(invalid(
                "brand.accent_color",
                format!("'{}' is not a #rgb or #rrggbb color", self.brand.accent_color),
            ));
        }
        Ok(())
    }
}

/// `#rgb` or `#rrggbb`, case-insensitive.
pub fn is_hex_color(value: &str) -> bool {
    let Some(hex) = value.strip_prefix('#') else {
        return false;
    };
    matches!(hex.len(), 3 | 6) && hex.bytes().all(|b| b.is_ascii_hexdigit())
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// `<home>/.reportgen/config.yaml`. Pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    home.join(".reportgen").join("config.yaml")
}

// ---------------------------------------------------------------------------
// Load / save / init
// ---------------------------------------------------------------------------

/// Load and validate `<home>/.reportgen/config.yaml`, or defaults when absent.
pub fn load_at(home: &Path) -> Result<Settings, ConfigError> {
    let path = config_path_at(home);
    if !path.exists() {
        return Ok(Settings::default());
    }
    let contents = std::fs::read_to_string(&path)?;
    let settings: Settings =
        serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse { path, source: e })?;
    settings.validate()?;
    Ok(settings)
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<Settings, ConfigError> {
    load_at(&home()?)
}

/// Atomically save settings: serialize → `.yaml.tmp` sibling → `chmod 0600` → `rename`.
pub fn save_at(home: &Path, settings: &Settings) -> Result<PathBuf, ConfigError> {
    settings.validate()?;
    let path = config_path_at(home);
    if let Some(dir) = path.parent() {
        if !dir.exists() {
            std::fs::create_dir_all(dir)?;
            set_dir_permissions(dir)?;
        }
    }
    let tmp_path = path.with_file_name("config.yaml.tmp");
    let yaml = serde_yaml::to_string(settings)?;
    std::fs::write(&tmp_path, yaml)?;
    set_file_permissions(&tmp_path)?;
    std::fs::rename(&tmp_path, &path)?;
    Ok(path)
}

/// `save_at` convenience wrapper.
pub fn save(settings: &Settings) -> Result<PathBuf, ConfigError> {
    save_at(&home()?, settings)
}

/// Write a default config if none exists. Idempotent: an existing file is
/// loaded and returned unchanged.
pub fn init_at(home: &Path) -> Result<(PathBuf, Settings), ConfigError> {
    let path = config_path_at(home);
    if path.exists() {
        return Ok((path, load_at(home)?));
    }
    let settings = Settings::default();
    let path = save_at(home, &settings)?;
    Ok((path, settings))
}

/// `init_at` convenience wrapper.
pub fn init() -> Result<(PathBuf, Settings), ConfigError> {
    init_at(&home()?)
}

/// Read a [`BrandProfile`] from a YAML file, e.g. `brand.profile_path`.
pub fn load_brand_profile(path: &Path) -> Result<BrandProfile, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    #[test]
    fn config_path_is_correct() {
        let home = TempDir::new().expect("tempdir");
        assert!(config_path_at(home.path()).ends_with(".reportgen/config.yaml"));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let home = TempDir::new().expect("tempdir");
        let settings = load_at(home.path()).expect("load");
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.polling.interval(), Duration::from_secs(2));
        assert_eq!(settings.polling.max_attempts, 60);
    }

    #[test]
    fn partial_file_fills_remaining_defaults() {
        let home = TempDir::new().expect("tempdir");
        let dir = home.path().join(".reportgen");
        std::fs::create_dir_all(&dir).expect("mkdir");
        std::fs::write(
            dir.join("config.yaml"),
            "polling:\n  interval_ms: 250\nbrand:\n  product_name: Acme Reports\n",
        )
        .expect("write");

        let settings = load_at(home.path()).expect("load");
        assert_eq!(settings.polling.interval_ms, 250);
        assert_eq!(settings.polling.max_attempts, 60);
        assert_eq!(settings.brand.product_name, "Acme Reports");
        assert_eq!(settings.brand.primary_color, DEFAULT_PRIMARY_COLOR);
    }

    #[test]
    fn init_then_save_roundtrip_and_cleans_tmp() {
        let home = TempDir::new().expect("tempdir");
        let (path, mut settings) = init_at(home.path()).expect("init");
        assert!(path.exists());

        settings.service.base_url = "https://reports.example.com".to_string();
        save_at(home.path(), &settings).expect("save");
        assert!(!path.with_file_name("config.yaml.tmp").exists());

        let loaded = load_at(home.path()).expect("load");
        assert_eq!(loaded.service.base_url, "https://reports.example.com");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
            assert_eq!(mode, 0o600);
        }
    }

    #[test]
    fn corrupt_yaml_reports_path() {
        let home = TempDir::new().expect("tempdir");
        let dir = home.path().join(".reportgen");
        std::fs::create_dir_all(&dir).expect("mkdir");
        std::fs::write(dir.join("config.yaml"), "polling: [unclosed").expect("write");

        let err = load_at(home.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
        assert!(err.to_string().contains("config.yaml"));
    }

    #[test]
    fn zero_attempt_budget_is_invalid() {
        let mut settings = Settings::default();
        settings.polling.max_attempts = 0;
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("polling.max_attempts"));
    }

    #[test]
    fn brand_profile_loads_from_yaml() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("brand.yaml");
        std::fs::write(
            &path,
            "display_name: Hill Country Realty\nprimary_color: \"#0a3d62\"\ncontact_lines:\n  - Dana Ortiz\n",
        )
        .expect("write");

        let profile = load_brand_profile(&path).expect("load");
        assert_eq!(profile.display_name.as_deref(), Some("Hill Country Realty"));
        assert_eq!(profile.primary_color.as_deref(), Some("#0a3d62"));
        assert_eq!(profile.contact_lines, ["Dana Ortiz"]);
        assert!(profile.logo_url.is_none());
    }

    #[rstest]
    #[case("#fff", true)]
    #[case("#1F3B5C", true)]
    #[case("1f3b5c", false)]
    #[case("#12345", false)]
    #[case("#ggg", false)]
    #[case("red", false)]
    fn hex_colors(#[case] value: &str, #[case] ok: bool) {
        assert_eq!(is_hex_color(value), ok);
    }
}
