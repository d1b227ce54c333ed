use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

static DEFAULT_CONFIG: &str = include_str!("default_config.toml");

#[derive(Debug, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub links: LinksConfig,
    pub page: PageConfig,
    pub html: HtmlConfig,
}

/// Link styling in Typst output
#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct LinksConfig {
    pub color: String,
    pub underline: bool,
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            color: "#1a4f8b".to_string(),
            underline: true,
        }
    }
}

#[derive(Debug, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct PageConfig {
    pub numbers: bool,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct HtmlConfig {
    /// Prefix of the CSS classes put on lists and tables, e.g. `wiki-table`
    pub class_prefix: String,
    /// Wrap each table in a `<div>` so it can scroll horizontally
    pub wrap_tables: bool,
}

impl Default for HtmlConfig {
    fn default() -> Self {
        Self {
            class_prefix: "wiki".to_string(),
            wrap_tables: true,
        }
    }
}

impl HtmlConfig {
    pub fn class(&self, name: &str) -> String {
        if self.class_prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}-{}", self.class_prefix, name)
        }
    }
}

impl Config {
    /// The defaults shipped in `default_config.toml`.
    pub fn compiled_default() -> Self {
        match toml::from_str(DEFAULT_CONFIG) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("bundled default config is invalid, using built-in defaults: {}", e);
                Self::default()
            }
        }
    }

    /// Load config from a TOML file. Keys missing from the file keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&content).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Load config from a TOML file, or return the compiled defaults if there is none.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::compiled_default())
        }
    }
}
