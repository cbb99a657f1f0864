// src/config/paths.rs

use anyhow::Result;
use std::{env, path::PathBuf};

use super::Config;

/// Every concrete file location for one adjustment run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdjustmentPaths {
    pub input_adj: PathBuf,
    pub input_constrained: PathBuf,
    pub input_unconstrained: PathBuf,
    pub input_adj_schema: PathBuf,
    pub input_constrained_schema: PathBuf,
    pub input_unconstrained_schema: PathBuf,
    pub output_interim_schema: PathBuf,
    pub output_adjustment_schema: PathBuf,
    pub interim_output: PathBuf,
    pub final_output: PathBuf,
    pub history_dir: PathBuf,
}

impl AdjustmentPaths {
    /// Resolve paths for the active profile, taking `{user}` from `USER`/`USERNAME`.
    pub fn resolve(config: &Config) -> Result<Self> {
        Self::resolve_for_user(config, &current_user())
    }

    /// `{user}` is replaced in every profile path field.
    pub fn resolve_for_user(config: &Config, user: &str) -> Result<Self> {
        let profile = config.profile()?;
        let ps = &config.pipeline_settings;
        let expand = |raw: &str| raw.replace("{user}", user);
        let root = PathBuf::from(expand(&profile.root_dir));
        let schema_dir = PathBuf::from(&ps.schema_dir);
        let out_dir = root.join(expand(&profile.output_dir));
        let prefix = config.user_settings.output_data_prefix.as_deref();

        Ok(Self {
            input_adj: root.join(expand(&profile.input_adj_file)),
            input_constrained: root.join(expand(&profile.input_constrained_file)),
            input_unconstrained: root.join(expand(&profile.input_unconstrained_file)),
            input_adj_schema: schema_dir.join(&ps.input_adj_schema_name),
            input_constrained_schema: schema_dir.join(&ps.input_constrained_schema_name),
            input_unconstrained_schema: schema_dir.join(&ps.input_unconstrained_schema_name),
            output_interim_schema: schema_dir.join(&ps.output_interim_schema_name),
            output_adjustment_schema: schema_dir.join(&ps.output_adjustment_schema_name),
            interim_output: out_dir.join(prefixed(prefix, &expand(&profile.interim_filename))),
            final_output: out_dir.join(prefixed(prefix, &expand(&profile.output_filename))),
            history_dir: PathBuf::from(&ps.history_dir),
        })
    }
}

fn prefixed(prefix: Option<&str>, filename: &str) -> String {
    match prefix {
        Some(p) if !p.is_empty() => format!("{}_{}", p, filename),
        _ => filename.to_string(),
    }
}

fn current_user() -> String {
    env::var("USER")
        .or_else(|_| env::var("USERNAME"))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::SAMPLE;
    use std::path::Path;

    #[test]
    fn expands_user_and_prefix() -> Result<()> {
        let text = SAMPLE.replace("output_data: true", "output_data: true\n  output_data_prefix: run1");
        let config = Config::from_yaml(&text)?;
        let paths = AdjustmentPaths::resolve_for_user(&config, "ana")?;

        assert_eq!(paths.input_adj, Path::new("/home/ana/gdhi/in/analyst.csv"));
        assert_eq!(paths.final_output, Path::new("/home/ana/gdhi/out/run1_adjusted.csv"));
        assert_eq!(paths.interim_output, Path::new("/home/ana/gdhi/out/run1_interim.csv"));
        assert_eq!(
            paths.output_interim_schema,
            Path::new("schemas/output_interim_schema.yaml")
        );
        Ok(())
    }

    #[test]
    fn no_prefix_keeps_filenames() -> Result<()> {
        let config = Config::from_yaml(SAMPLE)?;
        let paths = AdjustmentPaths::resolve_for_user(&config, "ana")?;
        assert_eq!(paths.final_output, Path::new("/home/ana/gdhi/out/adjusted.csv"));
        Ok(())
    }

    #[test]
    fn shared_profile_expands_user_in_output_dir() -> Result<()> {
        let text = include_str!("../../config/config.yaml")
            .replace("local_or_shared: local", "local_or_shared: shared");
        let config = Config::from_yaml(&text)?;
        let paths = AdjustmentPaths::resolve_for_user(&config, "ana")?;

        assert_eq!(
            paths.final_output,
            Path::new("/data/gdhi/output/ana/adjusted_gdhi.csv")
        );
        assert_eq!(
            paths.interim_output,
            Path::new("/data/gdhi/output/ana/adjustment_interim.csv")
        );
        assert_eq!(
            paths.input_constrained,
            Path::new("/data/gdhi/input/constrained_gdhi.csv")
        );
        Ok(())
    }

    #[test]
    fn user_placeholder_expands_in_input_files() -> Result<()> {
        let text = SAMPLE.replace("in/analyst.csv", "in/{user}/analyst.csv");
        let config = Config::from_yaml(&text)?;
        let paths = AdjustmentPaths::resolve_for_user(&config, "ana")?;
        assert_eq!(paths.input_adj, Path::new("/home/ana/gdhi/in/ana/analyst.csv"));
        Ok(())
    }
}
