use super::Config;
use anyhow::{Context, Result};
use directories::UserDirs;
use std::fs;
use std::path::Path;

impl Config {
    /// Load `~/.pdfbinder/config.toml`, writing a default one on first run.
    pub fn load_or_init() -> Result<Self> {
        let home = UserDirs::new()
            .map(|u| u.home_dir().to_path_buf())
            .context("Could not find home directory")?;
        Self::load_or_init_at(&home.join(".pdfbinder").join("config.toml"))
    }

    /// Same as [`Config::load_or_init`] for an explicit config file. The
    /// workspace lives next to it.
    pub fn load_or_init_at(config_path: &Path) -> Result<Self> {
        let base_dir = config_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let workspace_dir = base_dir.join("workspace");

        if !workspace_dir.exists() {
            fs::create_dir_all(&workspace_dir).context("Failed to create workspace directory")?;
        }

        if config_path.exists() {
            let contents = fs::read_to_string(config_path).context("Failed to read config file")?;
            let mut config: Config =
                toml::from_str(&contents).context("Failed to parse config file")?;
            config.config_path = config_path.to_path_buf();
            config.workspace_dir = workspace_dir;
            Ok(config)
        } else {
            let config = Self {
                config_path: config_path.to_path_buf(),
                workspace_dir,
                ..Self::default()
            };
            config.save()?;
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        let toml_str = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&self.config_path, toml_str).context("Failed to write config file")?;
        Ok(())
    }
}
