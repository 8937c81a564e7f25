use std::env;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

pub const APP_NAME: &str = "gallery";

/// Gallery configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub catalog: CatalogConfig,
    pub site: SiteConfig,
}

/// HTTP listener and asset locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind: String,
    /// Port to listen on
    pub port: u16,
    /// Directory served verbatim under `/static`
    pub static_dir: PathBuf,
    /// Optional directory with `index.html`, `category.html` and `item.html`
    /// that replace the built-in views. Re-read on every request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub templates_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8080,
            static_dir: PathBuf::from("static"),
            templates_dir: None,
        }
    }
}

/// Location of the category/item tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Catalog root; its subdirectories are categories
    pub root: PathBuf,
    /// List dot-prefixed files and directories
    pub show_hidden: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("static/images"),
            show_hidden: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Page title shown on every view
    pub title: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "Gallery".to_string(),
        }
    }
}

/// Values given on the command line; they win over file and environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub bind: Option<String>,
    pub port: Option<u16>,
    pub root: Option<PathBuf>,
    pub static_dir: Option<PathBuf>,
    pub templates_dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from defaults, an optional TOML file, `GALLERY__*`
    /// environment variables and command line overrides, in that order.
    pub fn load(file: &Path, overrides: &ConfigOverrides) -> Result<Self> {
        let built = config::Config::builder()
            .add_source(
                config::File::from(file)
                    .format(config::FileFormat::Toml)
                    .required(false),
            )
            .add_source(
                config::Environment::with_prefix(&env_prefix())
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("server.bind", overrides.bind.clone())?
            .set_override_option("server.port", overrides.port.map(i64::from))?
            .set_override_option("catalog.root", overrides.root.as_deref().map(path_value))?
            .set_override_option(
                "server.static_dir",
                overrides.static_dir.as_deref().map(path_value),
            )?
            .set_override_option(
                "server.templates_dir",
                overrides.templates_dir.as_deref().map(path_value),
            )?
            .build()
            .with_context(|| format!("loading configuration from {}", file.display()))?;

        let config: Config = built
            .try_deserialize()
            .context("parsing configuration")?;
        config.expand_paths()
    }

    /// Expand `~` and environment variables in every configured path.
    pub fn expand_paths(mut self) -> Result<Self> {
        self.catalog.root = expand_path(&self.catalog.root)?;
        self.server.static_dir = expand_path(&self.server.static_dir)?;
        if let Some(dir) = self.server.templates_dir.take() {
            self.server.templates_dir = Some(expand_path(&dir)?);
        }
        Ok(self)
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.server.bind, self.server.port)
            .parse()
            .with_context(|| {
                format!(
                    "invalid listen address {}:{}",
                    self.server.bind, self.server.port
                )
            })
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("serializing configuration to TOML")
    }
}

/// Default config file location: `$XDG_CONFIG_HOME/gallery/config.toml`.
pub fn default_config_file() -> Result<PathBuf> {
    Ok(default_config_dir()?.join("config.toml"))
}

/// Resolve a `--config` argument; a directory means `<dir>/config.toml`.
pub fn resolve_config_file(override_path: Option<&Path>) -> Result<PathBuf> {
    match override_path {
        Some(path) => {
            let expanded = expand_path(path)?;
            if expanded.is_dir() {
                Ok(expanded.join("config.toml"))
            } else {
                Ok(expanded)
            }
        }
        None => default_config_file(),
    }
}

fn default_config_dir() -> Result<PathBuf> {
    if let Some(dir) = env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir).join(APP_NAME));
    }

    if let Some(dir) = dirs::config_dir() {
        return Ok(dir.join(APP_NAME));
    }

    dirs::home_dir()
        .map(|home| home.join(".config").join(APP_NAME))
        .ok_or_else(|| anyhow!("unable to determine configuration directory"))
}

fn expand_path(path: &Path) -> Result<PathBuf> {
    let Some(text) = path.to_str() else {
        return Ok(path.to_path_buf());
    };
    let expanded = shellexpand::full(text)
        .with_context(|| format!("expanding path {text}"))?;
    Ok(PathBuf::from(expanded.into_owned()))
}

fn path_value(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn env_prefix() -> String {
    APP_NAME.to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_match_classic_layout() {
        let config = Config::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.static_dir, PathBuf::from("static"));
        assert_eq!(config.catalog.root, PathBuf::from("static/images"));
        assert!(config.server.templates_dir.is_none());
        assert!(!config.catalog.show_hidden);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let config = Config::load(
            &temp.path().join("absent.toml"),
            &ConfigOverrides::default(),
        )
        .unwrap();
        assert_eq!(config.server.bind, "127.0.0.1");
        assert_eq!(config.site.title, "Gallery");
    }

    #[test]
    fn test_load_file_and_overrides() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("config.toml");
        std::fs::write(
            &file,
            r#"
[server]
port = 9000
static_dir = "/srv/static"

[catalog]
root = "/srv/static/photos"
show_hidden = true

[site]
title = "Photos"
"#,
        )
        .unwrap();

        let overrides = ConfigOverrides {
            port: Some(9100),
            templates_dir: Some(PathBuf::from("/srv/templates")),
            ..Default::default()
        };
        let config = Config::load(&file, &overrides).unwrap();

        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.static_dir, PathBuf::from("/srv/static"));
        assert_eq!(
            config.server.templates_dir,
            Some(PathBuf::from("/srv/templates"))
        );
        assert_eq!(config.catalog.root, PathBuf::from("/srv/static/photos"));
        assert!(config.catalog.show_hidden);
        assert_eq!(config.site.title, "Photos");
    }

    #[test]
    fn test_socket_addr() {
        let mut config = Config::default();
        assert_eq!(
            config.socket_addr().unwrap(),
            "127.0.0.1:8080".parse::<SocketAddr>().unwrap()
        );

        config.server.bind = "not an address".to_string();
        assert!(config.socket_addr().is_err());
    }

    #[test]
    fn test_to_toml_round_trips() {
        let config = Config::default();
        let text = config.to_toml().unwrap();
        assert!(text.contains("[server]"));
        assert!(!text.contains("templates_dir"));

        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.server.port, config.server.port);
    }

    #[test]
    fn test_resolve_config_file_directory() {
        let temp = TempDir::new().unwrap();
        let resolved = resolve_config_file(Some(temp.path())).unwrap();
        assert_eq!(resolved, temp.path().join("config.toml"));
    }
}
