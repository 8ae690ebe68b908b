use anyhow::{Context, Result};
use serde::Deserialize;
use std::{collections::HashSet, env, path::PathBuf, time::Duration};

pub const CONFIG_PATH_ENV: &str = "TONIE_CONFIG_PATH";

const DEFAULT_AUDIO_EXTENSIONS: &[&str] = &["mp3", "m4a", "m4b", "ogg", "opus", "flac", "wav"];

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub library: LibraryConfig,
    pub tonie_cloud: TonieCloudConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LibraryConfig {
    pub audiobooks_dir: PathBuf,
    pub covers_dir: PathBuf,
    #[serde(default)]
    pub audio_extensions: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TonieCloudConfig {
    pub base_url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub request_timeout_secs: u64,
    pub refresh_interval_secs: u64,
}

impl Settings {
    pub fn load(config_path: Option<PathBuf>) -> Result<Self> {
        let config_path = match config_path {
            Some(path) => path,
            None => default_config_path()?,
        };
        let builder = config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 5000)?
            .set_default("library.audiobooks_dir", "assets/audiobooks")?
            .set_default("library.covers_dir", "assets/covers")?
            .set_default(
                "library.audio_extensions",
                DEFAULT_AUDIO_EXTENSIONS
                    .iter()
                    .map(|ext| ext.to_string())
                    .collect::<Vec<_>>(),
            )?
            .set_default("tonie_cloud.base_url", "https://api.tonie.cloud/v2")?
            .set_default("tonie_cloud.request_timeout_secs", 30)?
            .set_default("tonie_cloud.refresh_interval_secs", 300)?
            .add_source(config::File::from(config_path).required(false))
            .add_source(config::Environment::with_prefix("TONIE").separator("__"));

        let mut settings: Settings = builder.build()?.try_deserialize()?;
        settings.apply_env_overrides()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(value) = env::var("TONIE__SERVER_HOST") {
            self.server.host = value;
        }
        if let Ok(value) = env::var("TONIE__SERVER_PORT") {
            self.server.port = value
                .parse()
                .context("TONIE__SERVER_PORT must be a valid u16")?;
        }
        if let Ok(value) = env::var("TONIE__AUDIOBOOKS_DIR") {
            self.library.audiobooks_dir = PathBuf::from(value);
        }
        if let Ok(value) = env::var("TONIE__COVERS_DIR") {
            self.library.covers_dir = PathBuf::from(value);
        }
        // Credential names kept from the original deployment environment.
        if let Ok(value) = env::var("TONIE_AUDIO_MATCH_USER") {
            self.tonie_cloud.username = value;
        }
        if let Ok(value) = env::var("TONIE_AUDIO_MATCH_PASS") {
            self.tonie_cloud.password = value;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.library.audiobooks_dir.as_os_str().is_empty() {
            anyhow::bail!("library.audiobooks_dir must not be empty");
        }
        if self.library.covers_dir.as_os_str().is_empty() {
            anyhow::bail!("library.covers_dir must not be empty");
        }
        if self.library.audio_extensions.is_empty() {
            anyhow::bail!("library.audio_extensions must list at least one extension");
        }
        for ext in &self.library.audio_extensions {
            let ext = ext.trim().trim_start_matches('.');
            if ext.is_empty() || !ext.bytes().all(|byte| byte.is_ascii_alphanumeric()) {
                anyhow::bail!("library.audio_extensions entry '{}' is invalid", ext);
            }
        }
        if self.tonie_cloud.base_url.trim().is_empty() {
            anyhow::bail!("tonie_cloud.base_url must not be empty");
        }
        if self.tonie_cloud.request_timeout_secs == 0 {
            anyhow::bail!("tonie_cloud.request_timeout_secs must be at least 1");
        }
        if self.tonie_cloud.refresh_interval_secs == 0 {
            anyhow::bail!("tonie_cloud.refresh_interval_secs must be at least 1");
        }
        Ok(())
    }
}

impl LibraryConfig {
    /// Recognized extensions, lowercased and without leading dots.
    pub fn extension_set(&self) -> HashSet<String> {
        self.audio_extensions
            .iter()
            .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect()
    }
}

impl TonieCloudConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

fn default_config_path() -> Result<PathBuf> {
    let cwd = env::current_dir().context("failed to resolve current directory")?;
    Ok(cwd.join("config").join("default.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> Settings {
        Settings {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 5000,
            },
            library: LibraryConfig {
                audiobooks_dir: PathBuf::from("assets/audiobooks"),
                covers_dir: PathBuf::from("assets/covers"),
                audio_extensions: vec!["mp3".to_string(), ".FLAC".to_string()],
            },
            tonie_cloud: TonieCloudConfig {
                base_url: "https://api.tonie.cloud/v2".to_string(),
                username: String::new(),
                password: String::new(),
                request_timeout_secs: 30,
                refresh_interval_secs: 300,
            },
        }
    }

    #[test]
    fn extension_set_normalizes_case_and_dots() {
        let settings = defaults();
        let extensions = settings.library.extension_set();
        assert!(extensions.contains("mp3"));
        assert!(extensions.contains("flac"));
        assert_eq!(extensions.len(), 2);
    }

    #[test]
    fn validate_rejects_zero_refresh_interval() {
        let mut settings = defaults();
        settings.tonie_cloud.refresh_interval_secs = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn validate_rejects_bogus_extension() {
        let mut settings = defaults();
        settings.library.audio_extensions = vec!["mp/3".to_string()];
        assert!(settings.validate().is_err());
    }

    #[test]
    fn validate_accepts_defaults() {
        assert!(defaults().validate().is_ok());
    }
}
