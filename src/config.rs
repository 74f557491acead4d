use crate::list_view::{ListView, SortField, SortOrder};
use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// Where the hosted project lives. The anon key is the public client key,
/// not a secret of the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ServiceConfig {
    pub url: Option<String>,
    pub anon_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_true")]
    pub color: bool,
    #[serde(default)]
    pub default_sort_field: SortField,
    #[serde(default)]
    pub default_sort_order: SortOrder,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            color: true,
            default_sort_field: SortField::default(),
            default_sort_order: SortOrder::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_true")]
    pub persist: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { persist: true }
    }
}

fn default_true() -> bool {
    true
}

/// Keys accepted by `config set`.
pub const SETTABLE_KEYS: &[&str] = &[
    "service.url",
    "service.anon_key",
    "display.color",
    "display.default_sort_field",
    "display.default_sort_order",
    "session.persist",
];

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&get_config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        // If config doesn't exist, create default
        if !config_path.exists() {
            let default_config = Config::default();
            default_config.save_to(config_path)?;
            return Ok(default_config);
        }

        let content = fs::read_to_string(config_path).context("Failed to read config file")?;
        toml::from_str(&content).context("Failed to parse config file")
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&get_config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(config_path, content).context("Failed to write config file")?;
        Ok(())
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match key {
            "service.url" => self.service.url = non_empty(value),
            "service.anon_key" => self.service.anon_key = non_empty(value),
            "display.color" => self.display.color = parse_bool(value)?,
            "display.default_sort_field" => {
                self.display.default_sort_field = value.parse().map_err(|e: String| anyhow!(e))?
            }
            "display.default_sort_order" => {
                self.display.default_sort_order = value.parse().map_err(|e: String| anyhow!(e))?
            }
            "session.persist" => self.session.persist = parse_bool(value)?,
            _ => {
                return Err(anyhow!(
                    "Clave desconocida '{}'. Claves válidas: {}",
                    key,
                    SETTABLE_KEYS.join(", ")
                ));
            }
        }
        Ok(())
    }

    /// Values from `lookup` win over the file.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(crate::env_manager::URL_VAR) {
            self.service.url = Some(url);
        }
        if let Some(key) = lookup(crate::env_manager::ANON_KEY_VAR) {
            self.service.anon_key = Some(key);
        }
    }

    pub fn list_view(&self) -> ListView {
        ListView::new(self.display.default_sort_field, self.display.default_sort_order)
    }

    /// TOML for display, with the anon key shortened.
    pub fn to_display_string(&self) -> Result<String> {
        let mut shown = self.clone();
        if let Some(key) = &shown.service.anon_key {
            let visible: String = key.chars().take(8).collect();
            shown.service.anon_key = Some(format!("{}…", visible));
        }
        Ok(toml::to_string_pretty(&shown)?)
    }
}

fn non_empty(value: &str) -> Option<String> {
    Some(value.to_string()).filter(|v| !v.is_empty())
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "on" | "si" | "sí" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        other => Err(anyhow!("Valor booleano inválido: {}", other)),
    }
}

pub fn get_config_path() -> Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("com", "agenda", "agenda")
        .context("Failed to determine config directory")?;

    Ok(proj_dirs.config_dir().join("config.toml"))
}
