use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Tool configuration: column headers and sheet conventions of the
/// address program exports. Every field has a built-in default matching
/// the exports this tool was written for, so a config file is optional.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub columns: ColumnSpec,
    #[serde(default)]
    pub sheet: SheetConfig,
}

/// Column headers the source tables are expected to carry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ColumnSpec {
    /// Unique row identifier used for joining the two tables
    pub key: String,
    /// Address column, compared field-by-field in the diff
    pub address: String,
    /// Traffic metric column, compared field-by-field in the diff
    pub metric: String,
    /// Manually curated category column carried over from the old table
    pub category: String,
}

/// Worksheet selection and layout conventions
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SheetConfig {
    /// Prefix used to find candidate worksheets in the old file
    /// (matched case-insensitively against trimmed sheet names)
    pub name_prefix: String,
    /// Number of preamble rows above the header row
    pub skip_rows: u32,
}

impl Default for ColumnSpec {
    fn default() -> Self {
        Self {
            key: "GID".to_string(),
            address: "Адрес".to_string(),
            metric: "Средняя проходимость месяц".to_string(),
            category: "Округ".to_string(),
        }
    }
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            name_prefix: "СДЭК".to_string(),
            skip_rows: 32,
        }
    }
}

impl ColumnSpec {
    /// Columns both source tables must carry
    pub fn required(&self) -> Vec<&str> {
        vec![&self.key, &self.address, &self.metric]
    }

    /// Columns the old table must carry (the category lives only there)
    pub fn required_old(&self) -> Vec<&str> {
        vec![&self.key, &self.address, &self.metric, &self.category]
    }
}

pub fn get_config() -> Result<Config> {
    // Priority order (highest to lowest):
    // 1. Explicit config file via ADDRDIFF_CONFIG env var
    // 2. Local config file (addrdiff.toml)
    // 3. Saved global config file (~/.config/addrdiff/config.toml)
    // 4. Default configuration

    if let Ok(config_path) = env::var("ADDRDIFF_CONFIG") {
        return load_config_file(Path::new(&config_path));
    }

    let local_path = Path::new("addrdiff.toml");
    if local_path.exists() {
        return load_config_file(local_path);
    }

    if let Some(global_path) = global_config_path() {
        if global_path.exists() {
            return load_config_file(&global_path);
        }
    }

    Ok(Config::default())
}

/// Location of the per-user config file
pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("addrdiff").join("config.toml"))
}

fn load_config_file(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read config file {}: {e}", path.display()))?;
    let config: Config = toml::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Failed to parse config file {}: {e}", path.display()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_columns() {
        let config = Config::default();
        assert_eq!(config.columns.key, "GID");
        assert_eq!(config.columns.address, "Адрес");
        assert_eq!(config.columns.metric, "Средняя проходимость месяц");
        assert_eq!(config.columns.category, "Округ");
        assert_eq!(config.sheet.name_prefix, "СДЭК");
        assert_eq!(config.sheet.skip_rows, 32);
    }

    #[test]
    fn test_required_column_sets() {
        let columns = ColumnSpec::default();
        assert_eq!(columns.required().len(), 3);
        assert_eq!(columns.required_old().len(), 4);
        assert!(columns.required_old().contains(&"Округ"));
        assert!(!columns.required().contains(&"Округ"));
    }

    #[test]
    fn test_parse_partial_config() {
        let toml_str = r#"
            [sheet]
            name_prefix = "export"
            skip_rows = 0
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.sheet.name_prefix, "export");
        assert_eq!(config.sheet.skip_rows, 0);
        // Column names fall back to defaults
        assert_eq!(config.columns.key, "GID");
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let serialized = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed, config);
    }
}
