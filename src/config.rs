use crate::error::{Result, SoilAmendError};
use dialoguer::{Confirm, Input};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub amendment: AmendmentConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AmendmentConfig {
    /// How far other nutrients may overshoot their target when a compound
    /// product is applied for a deficient one (percent of target).
    #[serde(default = "default_allowed_excess")]
    pub allowed_excess_percent: f64,
    /// Deviation below target (percent) past which a nutrient counts as
    /// deficient.
    #[serde(default = "default_deficiency_threshold")]
    pub deficiency_threshold_percent: f64,
    /// Product rows the auto-selection driver will stack per nutrient.
    #[serde(default = "default_max_products")]
    pub max_products_per_nutrient: usize,
}

fn default_allowed_excess() -> f64 {
    25.0
}

fn default_deficiency_threshold() -> f64 {
    25.0
}

fn default_max_products() -> usize {
    4
}

impl Default for AmendmentConfig {
    fn default() -> Self {
        Self {
            allowed_excess_percent: default_allowed_excess(),
            deficiency_threshold_percent: default_deficiency_threshold(),
            max_products_per_nutrient: default_max_products(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CatalogConfig {
    /// Replacement fertilizer catalog (YAML or JSON). Absent means the
    /// built-in product list.
    #[serde(default)]
    pub fertilizer_file: Option<PathBuf>,
}

impl Config {
    pub fn load(config_override: Option<PathBuf>) -> Result<Self> {
        let config_path = match config_override {
            Some(p) => p,
            None => Self::find_config_path()?,
        };

        if !config_path.exists() {
            tracing::debug!(path = %config_path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let config_str = std::fs::read_to_string(&config_path)
            .map_err(|e| SoilAmendError::Config(format!("Failed to read config: {}", e)))?;

        // Substitute environment variables
        let config_str = Self::substitute_env_vars(&config_str);

        let config: Config = serde_yaml::from_str(&config_str)
            .map_err(|e| SoilAmendError::Config(format!("Failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Search for config.yaml in standard locations.
    /// Returns the path of the first found config, or the XDG default path if none found.
    fn find_config_path() -> Result<PathBuf> {
        // Try current directory first
        let local_config = PathBuf::from("config/config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        // Try XDG config directory
        if let Some(config_dir) = dirs::config_dir() {
            let xdg_config = config_dir.join("soilamend").join("config.yaml");
            if xdg_config.exists() {
                return Ok(xdg_config);
            }
        }

        // Return XDG path as the default (will trigger the defaults in load)
        let default_path = dirs::config_dir()
            .ok_or_else(|| SoilAmendError::Config("Cannot determine config directory".into()))?
            .join("soilamend")
            .join("config.yaml");
        Ok(default_path)
    }

    /// Default path for writing new config files (~/.config/soilamend/config.yaml).
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| SoilAmendError::Config("Cannot determine config directory".into()))?
            .join("soilamend");
        Ok(config_dir.join("config.yaml"))
    }

    /// Run interactive setup prompts and write config to disk.
    /// Returns the loaded Config and the path it was written to.
    pub fn setup_interactive() -> Result<(Self, PathBuf)> {
        println!();
        println!("Let's set up soilamend!");
        println!();

        println!("Amendment rules");
        let allowed_excess_percent: f64 = Input::new()
            .with_prompt("  Max allowed excess for other nutrients (%)")
            .default(default_allowed_excess())
            .interact_text()
            .map_err(|e| SoilAmendError::Config(format!("Input error: {}", e)))?;

        let deficiency_threshold_percent: f64 = Input::new()
            .with_prompt("  Deficiency threshold below target (%)")
            .default(default_deficiency_threshold())
            .interact_text()
            .map_err(|e| SoilAmendError::Config(format!("Input error: {}", e)))?;

        let max_products_per_nutrient: usize = Input::new()
            .with_prompt("  Max products per nutrient")
            .default(default_max_products())
            .interact_text()
            .map_err(|e| SoilAmendError::Config(format!("Input error: {}", e)))?;

        println!();

        println!("Fertilizer catalog");
        let use_custom = Confirm::new()
            .with_prompt("  Use a custom catalog file instead of the built-in product list?")
            .default(false)
            .interact()
            .map_err(|e| SoilAmendError::Config(format!("Input error: {}", e)))?;

        let fertilizer_file = if use_custom {
            let path: String = Input::new()
                .with_prompt("  Catalog path (YAML or JSON)")
                .interact_text()
                .map_err(|e| SoilAmendError::Config(format!("Input error: {}", e)))?;
            Some(PathBuf::from(path))
        } else {
            None
        };

        println!();

        let config = Config {
            amendment: AmendmentConfig {
                allowed_excess_percent,
                deficiency_threshold_percent,
                max_products_per_nutrient,
            },
            catalog: CatalogConfig { fertilizer_file },
        };

        // Write to default config path
        let config_path = Self::default_config_path()?;
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let yaml = serde_yaml::to_string(&config)
            .map_err(|e| SoilAmendError::Config(format!("Failed to serialize config: {}", e)))?;

        // Write with a header comment
        let content = format!(
            "# soilamend Configuration\n# Generated by `soilamend init`\n# Environment variable substitution (${{VAR}}) is supported.\n\n{}",
            yaml
        );
        std::fs::write(&config_path, content)?;

        println!("Configuration saved to {}", config_path.display());
        println!();

        Ok((config, config_path))
    }

    fn substitute_env_vars(content: &str) -> String {
        let mut result = content.to_string();

        // Find all ${VAR_NAME} patterns and substitute
        let re = regex_lite::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap();

        for cap in re.captures_iter(content) {
            let var_name = &cap[1];
            let placeholder = &cap[0];
            if let Ok(value) = std::env::var(var_name) {
                result = result.replace(placeholder, &value);
            }
        }

        result
    }
}
