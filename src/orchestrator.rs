//! High-level orchestration: load a scenario file, compile it and write the
//! compiled artifact.

use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::{error, info};
use std::fs;
use std::path::{Path, PathBuf};

use crate::compiler::{compile_scenario, CompiledScenario};
use crate::config_loader::load_config;
use crate::error::CompileError;

/// File name used when the output path is a directory.
pub const COMPILED_FILE_NAME: &str = "compiled_scenario.json";

/// Load and compile a scenario file, logging every defect on rejection.
pub fn compile_file(config_path: &Path) -> Result<CompiledScenario> {
    let config = load_config(config_path)?;
    match compile_scenario(&config) {
        Ok(scenario) => Ok(scenario),
        Err(err) => {
            report_defects(&err);
            Err(err).wrap_err_with(|| format!("Failed to compile '{}'", config_path.display()))
        }
    }
}

fn report_defects(err: &CompileError) {
    for defect in err.defects() {
        error!("[{}] {}", defect.kind(), defect);
    }
}

/// Resolve the output path: a `.json` path is used as is, anything else is
/// treated as a directory that receives [`COMPILED_FILE_NAME`].
pub fn output_path(output: &Path) -> PathBuf {
    if output.extension().map_or(false, |ext| ext == "json") {
        output.to_path_buf()
    } else {
        output.join(COMPILED_FILE_NAME)
    }
}

/// Compile `config_path` and write the JSON artifact under `output`.
/// Returns the path written.
pub fn generate_compiled_scenario(config_path: &Path, output: &Path) -> Result<PathBuf> {
    let scenario = compile_file(config_path)?;
    let target = output_path(output);

    if let Some(parent) = target.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .wrap_err_with(|| format!("Failed to create output directory '{}'", parent.display()))?;
        }
    }

    let json = scenario.to_json()?;
    fs::write(&target, json).wrap_err_with(|| format!("Failed to write '{}'", target.display()))?;
    info!("Compiled scenario written to {:?}", target);
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    const SCENARIO: &str = r#"
general:
  name: orchestrated
topology:
  devices:
    - {id: 0, model: sensor}
    - {id: 1, model: cloud, attributes: {mytag: cloud1}}
  links:
    - {s: 0, d: 1, BW: 1, PR: 1}
applications:
  - name: app
    modules:
      - {name: Sensor, kind: source}
      - {name: Service, kind: processing, ram: 10}
    messages:
      - {name: M.A, src: Sensor, dst: Service, instructions: 10, bytes: 100, pop: true}
placements:
  - name: onCloud
    application: app
    tag: cloud1
    modules:
      - {module: Service}
populations:
  - application: app
    sources:
      - {model: sensor, message: M.A, distribution: {type: deterministic, period: 100}}
"#;

    fn scenario_file(yaml: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", yaml).unwrap();
        file
    }

    #[test]
    fn test_output_path() {
        assert_eq!(output_path(Path::new("out")), PathBuf::from("out/compiled_scenario.json"));
        assert_eq!(output_path(Path::new("out/run.json")), PathBuf::from("out/run.json"));
    }

    #[test]
    fn test_generate_writes_json() {
        let file = scenario_file(SCENARIO);
        let dir = tempdir().unwrap();

        let written = generate_compiled_scenario(file.path(), &dir.path().join("nested")).unwrap();
        let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&written).unwrap()).unwrap();
        assert_eq!(json["name"], "orchestrated");
        assert_eq!(json["instances"]["1"][0]["module"], "Service");
    }

    #[test]
    fn test_rejected_scenario_reports_defects() {
        let file = scenario_file(&SCENARIO.replace("tag: cloud1", "tag: cloud9"));
        let err = compile_file(file.path()).unwrap_err();
        let text = format!("{:?}", err);
        assert!(text.contains("cloud9"));
    }
}
