//! Worker definitions: which program runs for each logical worker name

use crate::error::ConfigResult;
use crate::validation::{validate_required_string, Validatable};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

/// The set of workers the supervisor may launch
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkersConfig {
    /// Directory relative worker program paths are resolved against
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,

    /// Static worker definitions, unique by name
    #[serde(default = "default_definitions")]
    pub definitions: Vec<WorkerDefinition>,
}

/// Static description of one logical worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerDefinition {
    /// Logical name, e.g. `color` or `gesture`
    pub name: String,

    /// Primary program path
    pub program: PathBuf,

    /// Alternate program used when a required capability is missing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<PathBuf>,

    /// Capabilities (importable modules) the primary program needs
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<String>,

    /// Non-optional packages that may be provisioned before launch
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub packages: Vec<PackageRequirement>,

    /// Interpreter override; `None` uses the supervisor default for `.py` programs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpreter: Option<String>,

    /// Extra arguments after the program path
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    /// Extra environment variables
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

/// A package as seen by the probe (`module`) and by the installer (`distribution`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRequirement {
    pub module: String,
    pub distribution: String,
}

impl WorkerDefinition {
    pub fn new(name: impl Into<String>, program: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            fallback: None,
            requires: Vec::new(),
            packages: Vec::new(),
            interpreter: None,
            args: Vec::new(),
            env: BTreeMap::new(),
        }
    }

    pub fn with_fallback(mut self, fallback: impl Into<PathBuf>) -> Self {
        self.fallback = Some(fallback.into());
        self
    }

    pub fn requires(mut self, capability: impl Into<String>) -> Self {
        self.requires.push(capability.into());
        self
    }

    pub fn with_package(mut self, module: impl Into<String>, distribution: impl Into<String>) -> Self {
        self.packages.push(PackageRequirement {
            module: module.into(),
            distribution: distribution.into(),
        });
        self
    }

    pub fn with_interpreter(mut self, interpreter: impl Into<String>) -> Self {
        self.interpreter = Some(interpreter.into());
        self
    }

    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            definitions: default_definitions(),
        }
    }
}

impl Validatable for WorkersConfig {
    fn validate(&self) -> ConfigResult<()> {
        let mut seen = HashSet::new();
        for definition in &self.definitions {
            definition.validate()?;
            if !seen.insert(definition.name.as_str()) {
                return Err(self.validation_error(format!(
                    "duplicate worker name '{}'",
                    definition.name
                )));
            }
        }
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "workers"
    }
}

impl Validatable for WorkerDefinition {
    fn validate(&self) -> ConfigResult<()> {
        validate_required_string(&self.name, "name", self.domain_name())?;
        if self.program.as_os_str().is_empty() {
            return Err(self.validation_error(format!("worker '{}' has an empty program", self.name)));
        }
        for capability in &self.requires {
            validate_required_string(capability, "requires", self.domain_name())?;
        }
        for package in &self.packages {
            validate_required_string(&package.module, "packages.module", self.domain_name())?;
            validate_required_string(&package.distribution, "packages.distribution", self.domain_name())?;
        }
        if let Some(interpreter) = &self.interpreter {
            validate_required_string(interpreter, "interpreter", self.domain_name())?;
        }
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "workers.definitions"
    }
}

fn default_base_dir() -> PathBuf {
    PathBuf::from("face")
}

fn default_definitions() -> Vec<WorkerDefinition> {
    let opencv = |def: WorkerDefinition| {
        def.with_package("cv2", "opencv-python")
            .with_package("numpy", "numpy")
    };

    vec![
        opencv(WorkerDefinition::new("color", "color_identifier.py")),
        opencv(
            WorkerDefinition::new("gesture", "gesture_recognition.py")
                .with_fallback("gesture_recognition_fallback.py")
                .requires("mediapipe"),
        ),
        opencv(WorkerDefinition::new("shape", "shape.py")),
        opencv(WorkerDefinition::new("emotion", "emotion_game.py")),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_definitions() {
        let config = WorkersConfig::default();
        let names: Vec<&str> = config.definitions.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["color", "gesture", "shape", "emotion"]);

        let gesture = &config.definitions[1];
        assert_eq!(gesture.requires, vec!["mediapipe".to_string()]);
        assert_eq!(gesture.fallback, Some(PathBuf::from("gesture_recognition_fallback.py")));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let config = WorkersConfig {
            base_dir: PathBuf::from("."),
            definitions: vec![
                WorkerDefinition::new("color", "a.py"),
                WorkerDefinition::new("color", "b.py"),
            ],
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate worker name 'color'"));
    }

    #[test]
    fn test_definition_from_yaml() {
        let yaml = r#"
name: gesture
program: gesture_recognition.py
fallback: gesture_recognition_fallback.py
requires: [mediapipe]
packages:
  - module: cv2
    distribution: opencv-python
env:
  CAMERA_INDEX: "1"
"#;
        let def: WorkerDefinition = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(def.name, "gesture");
        assert_eq!(def.packages[0].distribution, "opencv-python");
        assert_eq!(def.env.get("CAMERA_INDEX").map(String::as_str), Some("1"));
        assert!(def.interpreter.is_none());
        assert!(def.validate().is_ok());
    }

    #[test]
    fn test_empty_program_rejected() {
        let def = WorkerDefinition::new("color", "");
        assert!(def.validate().is_err());
    }
}
