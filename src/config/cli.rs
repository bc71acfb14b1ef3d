use super::AppConfig;
use crate::utils::error::Result;
use crate::utils::validation::{validate_path, Validate};
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "uni-records")]
#[command(about = "University course records: enrollment, submissions and grades")]
pub struct CliConfig {
    #[arg(long, help = "TOML configuration file")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Directory holding the record files (overrides the config file)")]
    pub data_dir: Option<String>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl CliConfig {
    /// Loads the configuration file and applies the command line on top of it.
    pub fn resolve(&self) -> Result<AppConfig> {
        let mut config = AppConfig::load(self.config.as_deref())?;
        if let Some(data_dir) = &self.data_dir {
            config.storage.data_dir = data_dir.clone();
        }
        if self.verbose {
            config.logging.level = "debug".to_string();
        }
        config.validate()?;
        Ok(config)
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        if let Some(data_dir) = &self.data_dir {
            validate_path("data_dir", data_dir)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_win() {
        let cli = CliConfig::parse_from(["uni-records", "--data-dir", "/tmp/records", "--verbose"]);
        assert!(cli.validate().is_ok());

        let config = cli.resolve().unwrap();
        assert_eq!(config.storage.data_dir, "/tmp/records");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_defaults_without_arguments() {
        let cli = CliConfig::parse_from(["uni-records"]);
        assert_eq!(cli.resolve().unwrap(), AppConfig::default());
    }

    #[test]
    fn test_empty_data_dir_is_rejected() {
        let cli = CliConfig::parse_from(["uni-records", "--data-dir", ""]);
        assert!(cli.validate().is_err());
    }
}
