use anyhow::Result;
use gdhi_adj::{
    adjustment::run_with_paths,
    config::{paths::AdjustmentPaths, Config},
    error::AdjustError,
    history::State,
    tables::read_raw_csv,
};
use std::{fs, path::Path};
use tempfile::{tempdir, TempDir};

fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init();
}

const ADJ_SCHEMA: &str = "\
lsoa_code:
  old_name: LSOA code
  data_type: str
lad_code:
  old_name: LAD code
  data_type: str
adjust:
  old_name: Adjust
  data_type: str
year_to_adjust:
  old_name: Year
  data_type: str
";

const AREA_SCHEMA: &str = "\
lsoa_code:
  old_name: LSOA code
  data_type: str
lsoa_name:
  old_name: LSOA name
  data_type: str
lad_code:
  old_name: LAD code
  data_type: str
lad_name:
  old_name: LAD name
  data_type: str
";

const INTERIM_SCHEMA: &str = "\
LSOA code:
  old_name: lsoa_code
  data_type: str
year:
  old_name: year
  data_type: int
Adjusted GDHI:
  old_name: adjusted_con_gdhi
  data_type: float
";

const OUTPUT_SCHEMA: &str = "\
LSOA code:
  old_name: lsoa_code
  data_type: str
LSOA name:
  old_name: lsoa_name
  data_type: str
LAD code:
  old_name: lad_code
  data_type: str
LAD name:
  old_name: lad_name
  data_type: str
";

const CONSTRAINED: &str = "\
LSOA code,LSOA name,LAD code,LAD name,2002,2003,2004
E1,One,E01,District,5,5,5
E2,Two,E01,District,8,20,8
E3,Three,E01,District,10,2,14
";

const UNCONSTRAINED: &str = "\
LSOA code,LSOA name,LAD code,LAD name,2002,2003,2004
E1,One,E01,District,4,4,4
E2,Two,E01,District,7,19,7
E3,Three,E01,District,9,1,13
";

struct Workspace {
    dir: TempDir,
    config: Config,
}

impl Workspace {
    fn new(analyst: &str, output_data: bool) -> Result<Self> {
        let dir = tempdir()?;
        let root = dir.path();
        fs::create_dir_all(root.join("schemas"))?;
        fs::create_dir_all(root.join("in"))?;

        for (name, text) in [
            ("input_adj_schema.yaml", ADJ_SCHEMA),
            ("input_constrained_schema.yaml", AREA_SCHEMA),
            ("input_unconstrained_schema.yaml", AREA_SCHEMA),
            ("output_interim_schema.yaml", INTERIM_SCHEMA),
            ("output_adjustment_schema.yaml", OUTPUT_SCHEMA),
        ] {
            fs::write(root.join("schemas").join(name), text)?;
        }
        fs::write(root.join("in/analyst.csv"), analyst)?;
        fs::write(root.join("in/constrained.csv"), CONSTRAINED)?;
        fs::write(root.join("in/unconstrained.csv"), UNCONSTRAINED)?;

        let yaml = format!(
            r#"
user_settings:
  local_or_shared: local
  start_year: 2002
  end_year: 2004
  output_data: {output_data}
  impute_method: interpolation
  output_data_prefix: test
pipeline_settings:
  schema_dir: "{root}/schemas"
  input_adj_schema_name: input_adj_schema.yaml
  input_constrained_schema_name: input_constrained_schema.yaml
  input_unconstrained_schema_name: input_unconstrained_schema.yaml
  output_interim_schema_name: output_interim_schema.yaml
  output_adjustment_schema_name: output_adjustment_schema.yaml
  history_dir: "{root}/history"
adjustment_profiles:
  local:
    root_dir: "{root}"
    input_adj_file: in/analyst.csv
    input_constrained_file: in/constrained.csv
    input_unconstrained_file: in/unconstrained.csv
    output_dir: out
    interim_filename: interim.csv
    output_filename: adjusted.csv
"#,
            root = root.display(),
            output_data = output_data,
        );
        let config = Config::from_yaml(&yaml)?;
        Ok(Self { dir, config })
    }

    fn paths(&self) -> Result<AdjustmentPaths> {
        AdjustmentPaths::resolve_for_user(&self.config, "tester")
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn states(&self) -> Result<Vec<State>> {
        let text = fs::read_to_string(self.root().join("history/run_log.jsonl"))?;
        text.lines()
            .map(|l| {
                let v: serde_json::Value = serde_json::from_str(l)?;
                let s = v["state"].as_str().unwrap_or_default().to_string();
                Ok(State::from_str(&s).expect("known state"))
            })
            .collect()
    }
}

const ANALYST: &str = "\
LSOA code,LAD code,Adjust,Year
E2,E01,TRUE,2003
E3,E01,TRUE,2003
E1,E01,FALSE,
";

fn as_f64(s: &str) -> f64 {
    s.parse().expect("numeric cell")
}

#[test]
fn adjusts_and_preserves_lad_totals() -> Result<()> {
    init_test_logging();
    let ws = Workspace::new(ANALYST, true)?;
    let outcome = run_with_paths(&ws.config, &ws.paths()?)?;

    assert_eq!(outcome.report.anomalies, 2);
    assert_eq!(outcome.report.missing_imputations, 0);
    assert_eq!(outcome.interim_path, ws.root().join("out/test_interim.csv"));

    // final wide table: one row per area, years as columns
    let final_path = outcome.final_path.clone().expect("final output written");
    let wide = read_raw_csv(&final_path)?;
    assert_eq!(
        wide.headers,
        vec!["LSOA code", "LSOA name", "LAD code", "LAD name", "2002", "2003", "2004"]
    );
    assert_eq!(wide.rows.len(), 3);

    let y2003: Vec<f64> = wide.rows.iter().map(|r| as_f64(&r[5])).collect();
    let shift = 2.0 / 3.0;
    let want = [5.0 + shift, 8.0 + shift, 12.0 + shift];
    for (got, want) in y2003.iter().zip(want) {
        assert!((got - want).abs() < 1e-9, "{} != {}", got, want);
    }
    assert!((y2003.iter().sum::<f64>() - 27.0).abs() < 1e-6);

    // untouched years keep their values
    let y2002: Vec<f64> = wide.rows.iter().map(|r| as_f64(&r[4])).collect();
    assert_eq!(y2002, vec![5.0, 8.0, 10.0]);

    // interim table carries the renamed calculation columns
    let interim = read_raw_csv(&outcome.interim_path)?;
    assert!(interim.headers.contains(&"Adjusted GDHI".to_string()));
    assert!(interim.headers.contains(&"imputed_gdhi".to_string()));
    assert_eq!(interim.rows.len(), 9);

    assert_eq!(ws.states()?, vec![State::Started, State::Completed]);
    let manifest = ws
        .root()
        .join("history")
        .join(format!("{}_manifest.json", outcome.run_id));
    assert!(manifest.exists());
    Ok(())
}

#[test]
fn final_output_is_optional() -> Result<()> {
    init_test_logging();
    let ws = Workspace::new(ANALYST, false)?;
    let outcome = run_with_paths(&ws.config, &ws.paths()?)?;

    assert!(outcome.final_path.is_none());
    assert!(outcome.interim_path.exists());
    assert!(!ws.root().join("out/test_adjusted.csv").exists());
    Ok(())
}

#[test]
fn duplicate_years_fail_the_run() -> Result<()> {
    init_test_logging();
    let analyst = "LSOA code,LAD code,Adjust,Year\nE2,E01,TRUE,\"2003, 2003\"\n";
    let ws = Workspace::new(analyst, true)?;

    let err = run_with_paths(&ws.config, &ws.paths()?).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<AdjustError>(),
        Some(AdjustError::DuplicateYears { .. })
    ));
    assert_eq!(ws.states()?, vec![State::Started, State::Failed]);
    assert!(!ws.root().join("out/test_interim.csv").exists());
    Ok(())
}

#[test]
fn unknown_area_in_analyst_file_fails_the_join() -> Result<()> {
    init_test_logging();
    let analyst = "LSOA code,LAD code,Adjust,Year\nE9,E01,TRUE,2003\n";
    let ws = Workspace::new(analyst, true)?;

    let err = run_with_paths(&ws.config, &ws.paths()?).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<AdjustError>(),
        Some(AdjustError::AdjustCountMismatch { .. })
    ));
    Ok(())
}
