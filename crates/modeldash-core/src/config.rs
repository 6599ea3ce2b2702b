//! Paths and knobs, resolved once at startup.
//!
//! Precedence: profile defaults, then the optional TOML file. The profile
//! comes from the caller (a CLI flag), else `MODELDASH_PROFILE`, else `local`.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{DashError, Result};
use crate::normalize::{DEFAULT_INPUT, DEFAULT_OUTPUT};
use crate::sync::DEFAULT_PROVIDER;

pub const PROFILE_ENV: &str = "MODELDASH_PROFILE";
pub const DEFAULT_UPLOAD_DIR: &str = "temp_uploads";
pub const DEFAULT_IMPORT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Profile {
    #[default]
    Local,
    Docker,
}

impl FromStr for Profile {
    type Err = DashError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "docker" | "container" => Ok(Self::Docker),
            other => Err(DashError::MalformedInput(format!("unknown profile '{other}'"))),
        }
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Docker => write!(f, "docker"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub profile: Profile,
    /// Router config the sync reads model names from.
    pub litellm_config: PathBuf,
    /// Router-client JSON config whose provider list gets updated.
    pub router_config: PathBuf,
    /// Normalized table the dashboard shows.
    pub processed_path: PathBuf,
    /// Where uploaded files are staged before processing.
    pub upload_dir: PathBuf,
    pub provider_name: String,
    pub import_timeout: Duration,
}

impl Settings {
    pub fn for_profile(profile: Profile) -> Self {
        let (litellm_config, router_config) = match profile {
            Profile::Local => (
                PathBuf::from(DEFAULT_INPUT),
                dirs::home_dir()
                    .unwrap_or_default()
                    .join(".claude-code-router")
                    .join("config.json"),
            ),
            Profile::Docker => (
                PathBuf::from("/app/real_litellmconfig.yaml"),
                PathBuf::from("/app/claude_config.json"),
            ),
        };
        Self {
            profile,
            litellm_config,
            router_config,
            processed_path: PathBuf::from(DEFAULT_OUTPUT),
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            provider_name: DEFAULT_PROVIDER.to_string(),
            import_timeout: Duration::from_secs(DEFAULT_IMPORT_TIMEOUT_SECS),
        }
    }

    /// Resolve settings. An explicit `config_file` must exist; the default
    /// location is used only if present.
    pub fn resolve(profile: Option<Profile>, config_file: Option<&Path>) -> Result<Self> {
        let profile = match profile {
            Some(p) => p,
            None => match std::env::var(PROFILE_ENV) {
                Ok(v) if !v.trim().is_empty() => v.parse()?,
                _ => Profile::default(),
            },
        };
        let mut settings = Self::for_profile(profile);

        let file = match config_file {
            Some(p) => Some(load_file(p)?),
            None => match default_config_path() {
                Some(p) if p.exists() => Some(load_file(&p)?),
                _ => None,
            },
        };
        if let Some(file) = file {
            settings.apply(file);
        }
        tracing::debug!(?settings, "resolved settings");
        Ok(settings)
    }

    fn apply(&mut self, f: SettingsFile) {
        if let Some(p) = f.litellm_config {
            self.litellm_config = expand_home(&p);
        }
        if let Some(p) = f.router_config {
            self.router_config = expand_home(&p);
        }
        if let Some(p) = f.processed_path {
            self.processed_path = expand_home(&p);
        }
        if let Some(p) = f.upload_dir {
            self.upload_dir = expand_home(&p);
        }
        if let Some(name) = f.provider_name {
            self.provider_name = name;
        }
        if let Some(secs) = f.import_timeout_secs {
            self.import_timeout = Duration::from_secs(secs);
        }
    }
}

/// Optional overrides, e.g. `~/.config/modeldash/config.toml`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SettingsFile {
    litellm_config: Option<String>,
    router_config: Option<String>,
    processed_path: Option<String>,
    upload_dir: Option<String>,
    provider_name: Option<String>,
    import_timeout_secs: Option<u64>,
}

fn load_file(path: &Path) -> Result<SettingsFile> {
    let content = std::fs::read_to_string(path).map_err(|e| DashError::io(path, e))?;
    toml::from_str(&content)
        .map_err(|e| DashError::MalformedInput(format!("bad {}: {e}", path.display())))
}

pub fn default_config_path() -> Option<PathBuf> {
    Some(dirs::config_dir()?.join("modeldash").join("config.toml"))
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn docker_profile_paths() {
        let s = Settings::for_profile(Profile::Docker);
        assert_eq!(s.litellm_config, PathBuf::from("/app/real_litellmconfig.yaml"));
        assert_eq!(s.router_config, PathBuf::from("/app/claude_config.json"));
        assert_eq!(s.import_timeout, Duration::from_secs(30));
        assert_eq!(s.provider_name, "lite");
    }

    #[test]
    fn profile_parsing() {
        assert_eq!("Docker".parse::<Profile>().unwrap(), Profile::Docker);
        assert_eq!("local".parse::<Profile>().unwrap(), Profile::Local);
        assert!("staging".parse::<Profile>().is_err());
    }

    #[test]
    fn file_overrides_individual_fields() {
        let tmp = tempfile::TempDir::new().expect("temp dir");
        let cfg = tmp.path().join("config.toml");
        std::fs::write(
            &cfg,
            "processed_path = \"/data/processed.yaml\"\nprovider_name = \"proxy\"\nimport_timeout_secs = 5\n",
        )
        .unwrap();
        let s = Settings::resolve(Some(Profile::Docker), Some(&cfg)).unwrap();
        assert_eq!(s.processed_path, PathBuf::from("/data/processed.yaml"));
        assert_eq!(s.provider_name, "proxy");
        assert_eq!(s.import_timeout, Duration::from_secs(5));
        assert_eq!(s.litellm_config, PathBuf::from("/app/real_litellmconfig.yaml"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let tmp = tempfile::TempDir::new().expect("temp dir");
        let cfg = tmp.path().join("config.toml");
        std::fs::write(&cfg, "procesed_path = \"x\"\n").unwrap();
        let err = Settings::resolve(Some(Profile::Local), Some(&cfg)).unwrap_err();
        assert!(matches!(err, DashError::MalformedInput(_)));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let err = Settings::resolve(Some(Profile::Local), Some(Path::new("/nope/config.toml")))
            .unwrap_err();
        assert!(matches!(err, DashError::FileNotFound(_)));
    }
}
