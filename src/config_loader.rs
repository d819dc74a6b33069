use crate::config::ScenarioConfig;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::info;
use std::fs::File;
use std::path::Path;

/// Load and parse a scenario from a YAML file
pub fn load_config(config_path: &Path) -> Result<ScenarioConfig> {
    info!("Loading scenario from: {:?}", config_path);

    let file = File::open(config_path)
        .wrap_err_with(|| format!("Failed to open scenario file '{}'", config_path.display()))?;

    let config: ScenarioConfig = serde_yaml::from_reader(file)
        .wrap_err_with(|| format!("Failed to parse scenario file '{}'", config_path.display()))?;

    info!(
        "Scenario '{}': {} device(s), {} application(s), {} placement(s), {} population(s)",
        config.general.name,
        config.topology.devices.len(),
        config.applications.len(),
        config.placements.len(),
        config.populations.len()
    );

    config.validate()?;

    Ok(config)
}

/// Parse a scenario from an in-memory YAML document
pub fn parse_config(yaml: &str) -> Result<ScenarioConfig> {
    let config: ScenarioConfig = serde_yaml::from_str(yaml)?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SCENARIO: &str = r#"
general:
  name: loader
  stop_time: "30m"
topology:
  devices:
    - {id: 0, model: sensor-device, IPT: 100, RAM: 4000}
    - {id: 1, model: cloud, IPT: 5000, RAM: 40000, COST: 3, WATT: 20.0, attributes: {mytag: cloud1}}
  links:
    - {s: 0, d: 1, BW: 1, PR: 10}
applications:
  - name: app_1
    modules:
      - {name: Sensor, kind: source}
      - {name: Service, kind: processing, RAM: 10}
    messages:
      - {name: M.A, src: Sensor, dst: Service, instructions: 30, bytes: 1000, pop: true}
placements:
  - name: onCloud
    application: app_1
    tag: cloud1
    modules:
      - {module: Service}
"#;

    #[test]
    fn test_load_scenario() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", SCENARIO).unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.general.name, "loader");
        assert_eq!(config.horizon(), Some(1800.0));
        assert_eq!(config.topology.devices[1].attribute("mytag"), Some("cloud1"));
        assert_eq!(config.placements[0].modules[0].replicas, 1);
    }

    #[test]
    fn test_missing_file() {
        let result = load_config(Path::new("/nonexistent/scenario.yaml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_general_section_rejected() {
        let yaml = SCENARIO.replace("name: loader", "name: \"\"");
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", yaml).unwrap();

        let err = load_config(temp_file.path()).unwrap_err();
        assert!(err.to_string().contains("scenario name cannot be empty"));
    }

    #[test]
    fn test_parse_config_from_str() {
        let config = parse_config(SCENARIO).unwrap();
        assert_eq!(config.applications[0].modules.len(), 2);
        assert!(parse_config("general: [").is_err());
    }
}
