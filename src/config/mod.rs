// src/config/mod.rs

//! YAML run configuration.

pub mod paths;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fs, path::Path};
use tracing::info;

use crate::{adjustment::model::ImputeMethod, error::AdjustError, tables::OutputFormat};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub user_settings: UserSettings,
    pub pipeline_settings: PipelineSettings,
    pub adjustment_profiles: BTreeMap<String, PathProfile>,
    #[serde(default)]
    pub mapping: Option<MappingSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSettings {
    /// Name of the entry in `adjustment_profiles` to use.
    pub local_or_shared: String,
    pub start_year: i32,
    pub end_year: i32,
    #[serde(default = "default_true")]
    pub output_data: bool,
    #[serde(default)]
    pub impute_method: ImputeMethod,
    #[serde(default)]
    pub output_format: OutputFormat,
    #[serde(default)]
    pub output_data_prefix: Option<String>,
    #[serde(default)]
    pub component: Option<ComponentFilter>,
}

/// Transaction codes the constrained table is narrowed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentFilter {
    pub sas_code: String,
    pub cord_code: String,
    pub credit_debit: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    pub schema_dir: String,
    pub input_adj_schema_name: String,
    pub input_constrained_schema_name: String,
    pub input_unconstrained_schema_name: String,
    pub output_interim_schema_name: String,
    pub output_adjustment_schema_name: String,
    #[serde(default = "default_history_dir")]
    pub history_dir: String,
}

/// Where the inputs live and where outputs go, for one environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathProfile {
    /// May contain `{user}`.
    pub root_dir: String,
    pub input_adj_file: String,
    pub input_constrained_file: String,
    pub input_unconstrained_file: String,
    pub output_dir: String,
    pub interim_filename: String,
    pub output_filename: String,
}

/// Settings for the `lau_to_lad` remapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingSettings {
    pub data_dir: String,
    pub data_file: String,
    pub mapper_dir: String,
    pub lau_lad_file: String,
    pub lau_lad_schema_name: String,
    pub data_lad_code: String,
    pub data_lad_name: String,
    #[serde(default)]
    pub aggregate_to_lad: bool,
    pub output_dir: String,
    pub output_file: String,
}

fn default_true() -> bool {
    true
}

fn default_history_dir() -> String {
    "history".to_string()
}

impl Config {
    /// Read and validate a `.yaml`/`.yml` config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(AdjustError::Config(format!(
                "config file does not exist: {}",
                path.display()
            ))
            .into());
        }
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => {}
            other => {
                return Err(AdjustError::Config(format!(
                    "expected a .yaml file, got {:?}",
                    other.unwrap_or("")
                ))
                .into())
            }
        }

        let text =
            fs::read_to_string(path).with_context(|| format!("reading config {:?}", path))?;
        let config = Self::from_yaml(&text).with_context(|| format!("parsing config {:?}", path))?;
        info!(path = %path.display(), profile = %config.user_settings.local_or_shared, "loaded config");
        Ok(config)
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AdjustError> {
        let u = &self.user_settings;
        if u.start_year > u.end_year {
            return Err(AdjustError::Config(format!(
                "start_year {} is after end_year {}",
                u.start_year, u.end_year
            )));
        }
        Ok(())
    }

    /// The path profile named by `local_or_shared`.
    pub fn profile(&self) -> Result<&PathProfile, AdjustError> {
        let name = &self.user_settings.local_or_shared;
        self.adjustment_profiles.get(name).ok_or_else(|| {
            AdjustError::Config(format!(
                "unknown profile '{}' (available: {})",
                name,
                self.adjustment_profiles
                    .keys()
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
        })
    }

    pub fn mapping(&self) -> Result<&MappingSettings, AdjustError> {
        self.mapping
            .as_ref()
            .ok_or_else(|| AdjustError::Config("missing `mapping` section".to_string()))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    pub(crate) const SAMPLE: &str = r#"
user_settings:
  local_or_shared: local
  start_year: 2002
  end_year: 2005
  output_data: true
  impute_method: interpolation
pipeline_settings:
  schema_dir: schemas
  input_adj_schema_name: input_adj_schema.yaml
  input_constrained_schema_name: input_constrained_schema.yaml
  input_unconstrained_schema_name: input_unconstrained_schema.yaml
  output_interim_schema_name: output_interim_schema.yaml
  output_adjustment_schema_name: output_adjustment_schema.yaml
adjustment_profiles:
  local:
    root_dir: "/home/{user}/gdhi"
    input_adj_file: in/analyst.csv
    input_constrained_file: in/constrained.csv
    input_unconstrained_file: in/unconstrained.csv
    output_dir: out
    interim_filename: interim.csv
    output_filename: adjusted.csv
"#;

    #[test]
    fn parses_sample_with_defaults() -> Result<()> {
        let config = Config::from_yaml(SAMPLE)?;
        assert_eq!(config.user_settings.impute_method, ImputeMethod::Interpolation);
        assert_eq!(config.user_settings.output_format, OutputFormat::Csv);
        assert_eq!(config.pipeline_settings.history_dir, "history");
        assert!(config.user_settings.component.is_none());
        assert!(config.mapping.is_none());
        assert_eq!(config.profile()?.output_dir, "out");
        Ok(())
    }

    #[test]
    fn rejects_inverted_year_range() {
        let text = SAMPLE.replace("end_year: 2005", "end_year: 2001");
        let err = Config::from_yaml(&text).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AdjustError>(),
            Some(AdjustError::Config(_))
        ));
    }

    #[test]
    fn unknown_profile_is_an_error() -> Result<()> {
        let text = SAMPLE.replace("local_or_shared: local", "local_or_shared: shared");
        let config = Config::from_yaml(&text)?;
        assert!(config.profile().is_err());
        Ok(())
    }

    #[test]
    fn load_checks_extension() -> Result<()> {
        let mut tmp = Builder::new().suffix(".toml").tempfile()?;
        tmp.write_all(SAMPLE.as_bytes())?;
        assert!(Config::load(tmp.path()).is_err());

        let mut tmp = Builder::new().suffix(".yaml").tempfile()?;
        tmp.write_all(SAMPLE.as_bytes())?;
        let config = Config::load(tmp.path())?;
        assert_eq!(config.user_settings.start_year, 2002);
        Ok(())
    }
}
