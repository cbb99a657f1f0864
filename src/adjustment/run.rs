// src/adjustment/run.rs

use anyhow::{Context, Result};
use std::{collections::BTreeMap, path::PathBuf};
use tracing::{error, info, warn};

use super::{
    aggregate::aggregate,
    apportion::apportion,
    filter::{filter_component, filter_flagged, filter_year},
    impute::{impute_all, ImputePolicy},
    join::{join_analyst_constrained, join_analyst_unconstrained},
    model::{adjusted_to_frame, anomalies, rows_from_long, AdjustedRow, ImputeMethod, Lookup, YearRange},
    pivot::{pivot_adjustment_long, pivot_wide_final},
    reformat::{reformat_adjust_col, reformat_year_col},
};
use crate::{
    config::{paths::AdjustmentPaths, ComponentFilter, Config},
    error::AdjustResult,
    frame::Frame,
    history::{RunLog, RunManifest, State},
    schema::load_schema,
    tables::{read_with_schema, write_with_schema, OutputFormat},
};

/// The parts of the configuration the stages depend on.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub range: YearRange,
    pub method: ImputeMethod,
    pub component: Option<ComponentFilter>,
    pub output_data: bool,
    pub output_format: OutputFormat,
}

impl RunSettings {
    pub fn from_config(config: &Config) -> Self {
        let u = &config.user_settings;
        Self {
            range: YearRange::new(u.start_year, u.end_year),
            method: u.impute_method,
            component: u.component.clone(),
            output_data: u.output_data,
            output_format: u.output_format,
        }
    }
}

/// The three input tables after schema mapping.
#[derive(Debug, Clone)]
pub struct Inputs {
    pub analyst: Frame,
    pub constrained: Frame,
    pub unconstrained: Frame,
}

/// Row counts and imputation figures gathered while the stages run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageReport {
    pub stage_rows: Vec<(String, usize)>,
    pub anomalies: usize,
    pub missing_imputations: usize,
}

impl StageReport {
    fn stage(&mut self, name: &str, rows: usize) {
        info!(stage = name, rows, "stage finished");
        self.stage_rows.push((name.to_string(), rows));
    }
}

/// What a completed run produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run_id: String,
    pub interim_path: PathBuf,
    pub final_path: Option<PathBuf>,
    pub report: StageReport,
}

/// Reformat, filter, join and reshape the inputs into the long table.
pub fn prepare_long(inputs: Inputs, settings: &RunSettings, report: &mut StageReport) -> AdjustResult<Frame> {
    let Inputs {
        mut analyst,
        mut constrained,
        unconstrained,
    } = inputs;

    info!("reformatting analyst selections");
    reformat_adjust_col(&mut analyst)?;
    reformat_year_col(&mut analyst, settings.range)?;

    info!("filtering for data that requires adjustment");
    let analyst = filter_flagged(&analyst)?;
    report.stage("filter_flagged", analyst.len());

    if let Some(component) = &settings.component {
        info!(sas_code = %component.sas_code, cord_code = %component.cord_code, credit_debit = %component.credit_debit, "filtering constrained data by component");
        constrained = filter_component(constrained, component)?;
        report.stage("filter_component", constrained.len());
    }

    info!("joining analyst output and constrained data");
    let joined = join_analyst_constrained(&constrained, &analyst)?;
    report.stage("join_constrained", joined.len());

    info!("joining analyst output and unconstrained data");
    let joined = join_analyst_unconstrained(&unconstrained, &joined)?;
    report.stage("join_unconstrained", joined.len());

    info!("pivoting data long");
    let long = pivot_adjustment_long(&joined)?;
    report.stage("pivot_long", long.len());

    info!("filtering by year range");
    let long = filter_year(long, settings.range)?;
    report.stage("filter_year", long.len());
    Ok(long)
}

/// Locate, impute, aggregate and apportion over the long table.
pub fn adjust_long(long: &Frame, settings: &RunSettings, report: &mut StageReport) -> AdjustResult<Vec<AdjustedRow>> {
    let table = rows_from_long(long)?;

    info!(method = %settings.method, "imputing flagged values");
    let imputed = {
        let found = anomalies(&table);
        report.anomalies = found.len();
        let lookup = Lookup::build(&table);
        let policy = ImputePolicy {
            method: settings.method,
            range: settings.range,
        };
        impute_all(&found, &lookup, &policy)
    };
    report.missing_imputations = imputed.iter().filter(|r| r.imputed.is_none()).count();
    if report.missing_imputations > 0 {
        warn!(
            missing = report.missing_imputations,
            "some flagged values had no usable neighbours and were left unadjusted"
        );
    }

    info!("aggregating corrections");
    let rows = aggregate(table, imputed);

    info!("apportioning corrections");
    let rows = apportion(rows)?;
    report.stage("apportion", rows.len());
    Ok(rows)
}

/// Run the full adjustment for `config`, resolving paths from its profile.
pub fn run_adjustment(config: &Config) -> Result<RunOutcome> {
    let paths = AdjustmentPaths::resolve(config)?;
    run_with_paths(config, &paths)
}

/// Run the adjustment against explicit paths, recording the run's state in
/// the history directory.
#[tracing::instrument(level = "info", skip_all, fields(profile = %config.user_settings.local_or_shared))]
pub fn run_with_paths(config: &Config, paths: &AdjustmentPaths) -> Result<RunOutcome> {
    let log = RunLog::new(&paths.history_dir)?;
    info!(run_id = %log.run_id(), "adjustment started");
    log.record(State::Started)?;

    match execute(config, paths, &log) {
        Ok(outcome) => {
            log.record(State::Completed)?;
            info!(run_id = %outcome.run_id, "adjustment completed");
            Ok(outcome)
        }
        Err(err) => {
            error!(run_id = %log.run_id(), "adjustment failed: {:#}", err);
            if let Err(log_err) = log.record(State::Failed) {
                warn!("could not record failed run: {:#}", log_err);
            }
            Err(err)
        }
    }
}

fn execute(config: &Config, paths: &AdjustmentPaths, log: &RunLog) -> Result<RunOutcome> {
    let settings = RunSettings::from_config(config);
    let mut report = StageReport::default();

    // 1) load
    info!("reading in data with schemas");
    let inputs = Inputs {
        analyst: read_with_schema(&paths.input_adj, &load_schema(&paths.input_adj_schema)?)?,
        constrained: read_with_schema(&paths.input_constrained, &load_schema(&paths.input_constrained_schema)?)?,
        unconstrained: read_with_schema(
            &paths.input_unconstrained,
            &load_schema(&paths.input_unconstrained_schema)?,
        )?,
    };
    report.stage("load_constrained", inputs.constrained.len());

    // 2) prepare + adjust
    let long = prepare_long(inputs, &settings, &mut report)?;
    let rows = adjust_long(&long, &settings, &mut report)?;

    // 3) persist interim, always
    let interim = adjusted_to_frame(&rows)?;
    let interim_schema = load_schema(&paths.output_interim_schema)?;
    let wide = pivot_wide_final(&interim)?;
    write_with_schema(interim, &interim_schema, &paths.interim_output, settings.output_format)
        .with_context(|| format!("writing interim output {:?}", paths.interim_output))?;

    let mut outputs = BTreeMap::new();
    outputs.insert("interim".to_string(), paths.interim_output.clone());

    // 4) persist final, if asked
    let final_path = if settings.output_data {
        let schema = load_schema(&paths.output_adjustment_schema)?;
        report.stage("pivot_wide", wide.len());
        write_with_schema(wide, &schema, &paths.final_output, settings.output_format)
            .with_context(|| format!("writing adjusted output {:?}", paths.final_output))?;
        outputs.insert("final".to_string(), paths.final_output.clone());
        Some(paths.final_output.clone())
    } else {
        info!("output_data is false; adjusted table not written");
        None
    };

    let manifest = RunManifest {
        run_id: log.run_id().to_string(),
        settings: serde_json::to_value(&config.user_settings).context("serialising settings")?,
        stage_rows: report.stage_rows.clone(),
        anomalies: report.anomalies,
        missing_imputations: report.missing_imputations,
        outputs,
    };
    let manifest_path = log.write_manifest(&manifest)?;
    info!(path = %manifest_path.display(), "run manifest written");

    Ok(RunOutcome {
        run_id: log.run_id().to_string(),
        interim_path: paths.interim_output.clone(),
        final_path,
        report,
    })
}
