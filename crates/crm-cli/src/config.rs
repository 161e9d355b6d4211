// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_VERSION: i64 = 1;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub storage: Storage,
    #[serde(default)]
    pub session: Session,
    #[serde(default)]
    pub export: Export,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Storage {
    pub db_path: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Session {
    pub default_user: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Export {
    pub out_dir: Option<String>,
}

impl Config {
    fn defaults() -> Self {
        Self {
            version: CONFIG_VERSION,
            ..Self::default()
        }
    }

    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("CRM_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set CRM_CONFIG_PATH to the config file")
        })?;

        let app_dir = config_root.join(crm_db::APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create config directory {}", app_dir.display()))?;
        Ok(app_dir.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::defaults());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} is not versioned. Add `version = 1` and put values under [storage], [session], and [export]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(db_path) = &self.storage.db_path {
            crm_db::validate_db_path(db_path)?;
        }

        if let Some(user) = &self.session.default_user
            && user.trim().is_empty()
        {
            bail!(
                "session.default_user in {} is blank; remove it or name a user id such as \"user-1\"",
                path.display()
            );
        }

        if let Some(out_dir) = &self.export.out_dir
            && out_dir.trim().is_empty()
        {
            bail!(
                "export.out_dir in {} is blank; remove it to write exports to stdout",
                path.display()
            );
        }

        Ok(())
    }

    pub fn db_path(&self) -> Result<PathBuf> {
        match &self.storage.db_path {
            Some(path) => Ok(PathBuf::from(path)),
            None => crm_db::default_db_path(),
        }
    }

    pub fn default_user(&self) -> Option<&str> {
        self.session.default_user.as_deref().map(str::trim)
    }

    pub fn out_dir(&self) -> Option<PathBuf> {
        self.export.out_dir.as_deref().map(PathBuf::from)
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# crm config\n# Place this file at: {}\n\nversion = 1\n\n[storage]\n# Optional. Default is platform data dir (for example ~/.local/share/crm/crm.db)\n# db_path = \"/absolute/path/to/crm.db\"\n\n[session]\n# User signed in on a fresh database.\n# default_user = \"user-1\"\n\n[export]\n# Directory for export and template files. Unset writes to stdout.\n# out_dir = \"/absolute/path/to/exports\"\n",
            path.display(),
        )
    }
}
