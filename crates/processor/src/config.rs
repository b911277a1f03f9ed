use anyhow::{ensure, Context};
use domstake_mapping::MappingConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;


#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub mapping: MappingConfig,
    /// Seconds between progress reports
    #[serde(default = "default_report_interval")]
    pub report_interval: u64,
}


impl Default for Config {
    fn default() -> Self {
        Self {
            mapping: MappingConfig::default(),
            report_interval: default_report_interval()
        }
    }
}


impl Config {
    pub fn read(file: &Path) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_reader(
            std::io::BufReader::new(std::fs::File::open(file)?)
        ).with_context(|| format!("failed to parse {}", file.display()))?;
        config.validate().context("invalid config")?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.report_interval > 0, "report interval must be positive");
        self.mapping.validate()
    }

    pub fn report_interval(&self) -> Duration {
        Duration::from_secs(self.report_interval)
    }
}


fn default_report_interval() -> u64 {
    5
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;


    #[test]
    fn read_from_file() -> anyhow::Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        write!(file, r#"{{"mapping": {{"domains": [0], "trackBundles": false}}}}"#)?;

        let config = Config::read(file.path())?;
        assert_eq!(config.report_interval(), Duration::from_secs(5));
        assert!(config.mapping.tracks_domain(0));
        assert!(!config.mapping.tracks_domain(1));
        assert!(!config.mapping.track_bundles);
        Ok(())
    }

    #[test]
    fn invalid_config() -> anyhow::Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        write!(file, r#"{{"mapping": {{"domains": []}}}}"#)?;
        assert!(Config::read(file.path()).is_err());

        let config = Config {
            report_interval: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
        Ok(())
    }
}
