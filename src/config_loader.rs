use crate::config::Config;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::info;
use std::fs::File;
use std::path::Path;

/// Load, parse and validate a scenario from a YAML file
pub fn load_config(config_path: &Path) -> Result<Config> {
    info!("Loading scenario from: {:?}", config_path);

    let file = File::open(config_path)
        .wrap_err_with(|| format!("Failed to open scenario file '{}'", config_path.display()))?;

    let config: Config = serde_yaml::from_reader(file)
        .wrap_err_with(|| format!("Failed to parse scenario file '{}'", config_path.display()))?;

    info!(
        "Scenario has {} node(s) running {} app(s)",
        config.nodes.len(),
        config.app_count()
    );

    config.validate()?;

    Ok(config)
}

/// Parse and validate a scenario held in memory
pub fn load_config_str(yaml: &str) -> Result<Config> {
    let config: Config = serde_yaml::from_str(yaml).wrap_err("Failed to parse scenario")?;
    config.validate()?;
    Ok(config)
}

/// CLI arguments that override scenario settings
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub seed: Option<u64>,
    pub stop_time: Option<String>,
}

/// Apply CLI overrides to a scenario
///
/// The scenario is assumed to be validated already. Only a new stop time can
/// invalidate it, so that is the one override that triggers re-validation.
pub fn apply_overrides(config: &mut Config, overrides: &CliOverrides) -> Result<()> {
    if let Some(seed) = overrides.seed {
        info!("Overriding seed: {}", seed);
        config.general.seed = Some(seed);
    }

    if let Some(stop_time) = &overrides.stop_time {
        info!("Overriding stop_time: {}", stop_time);
        config.general.stop_time = stop_time.clone();
        config.validate()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const YAML: &str = r#"
general:
  stop_time: "20s"
nodes:
  - id: rsu0
    apps:
      - type: producer
        prefix: "/criticalData/test"
        is_rsu: true
"#;

    #[test]
    fn test_load_config() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", YAML).unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.nodes.len(), 1);
        assert_eq!(config.stop_time_seconds().unwrap(), 20);
    }

    #[test]
    fn test_load_missing_file() {
        assert!(load_config(Path::new("/nonexistent/scenario.yaml")).is_err());
    }

    #[test]
    fn test_load_invalid_yaml() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "general: [not, a, map]").unwrap();
        assert!(load_config(temp_file.path()).is_err());
    }

    #[test]
    fn test_apply_overrides() {
        let mut config = load_config_str(YAML).unwrap();

        let overrides = CliOverrides {
            seed: Some(99),
            stop_time: Some("2m".to_string()),
        };
        apply_overrides(&mut config, &overrides).unwrap();
        assert_eq!(config.general.seed, Some(99));
        assert_eq!(config.stop_time_seconds().unwrap(), 120);

        let bad = CliOverrides {
            seed: None,
            stop_time: Some("later".to_string()),
        };
        assert!(apply_overrides(&mut config, &bad).is_err());
    }

    #[test]
    fn test_stop_time_override_revalidates_consumer_rate() {
        let yaml = r#"
general:
  stop_time: "20s"
nodes:
  - id: bus
    apps:
      - type: consumer
        prefix: "/criticalData/test"
        frequency: 1000.0
"#;
        let mut config = load_config_str(yaml).unwrap();

        apply_overrides(&mut config, &CliOverrides { seed: Some(1), stop_time: None }).unwrap();
        assert_eq!(config.general.seed, Some(1));

        // At this length a millisecond period no longer advances the clock
        let long = CliOverrides {
            seed: None,
            stop_time: Some(format!("{}s", 1u64 << 60)),
        };
        assert!(apply_overrides(&mut config, &long).is_err());
    }
}
