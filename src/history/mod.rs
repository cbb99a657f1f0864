// src/history/mod.rs

pub mod state;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs::{self, File, OpenOptions},
    io::{BufRead, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};
use tracing::debug;

pub use state::State;

const RUN_IDS_FILE: &str = "run_ids.txt";
const RUN_LOG_FILE: &str = "run_log.jsonl";

/// One line of `run_log.jsonl`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunEvent {
    pub run_id: String,
    pub state: State,
    pub event_time: DateTime<Utc>,
}

/// What a run consumed and produced, written once it completes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: String,
    pub settings: serde_json::Value,
    /// Row count after each stage, in stage order.
    pub stage_rows: Vec<(String, usize)>,
    pub anomalies: usize,
    pub missing_imputations: usize,
    pub outputs: BTreeMap<String, PathBuf>,
}

/// Append-only record of pipeline runs under `history_dir`.
///
/// - `run_ids.txt`: one run id per line;
/// - `run_log.jsonl`: one [`RunEvent`] per state change;
/// - `<run_id>_manifest.json`: the [`RunManifest`] of a finished run.
pub struct RunLog {
    history_dir: PathBuf,
    run_id: String,
}

impl RunLog {
    /// Create the directory if needed, mint a run id and append it to
    /// `run_ids.txt`.
    pub fn new(history_dir: impl Into<PathBuf>) -> Result<Self> {
        let history_dir = history_dir.into();
        fs::create_dir_all(&history_dir)
            .with_context(|| format!("creating history directory {:?}", &history_dir))?;

        let run_id = format!("{}_{}", Utc::now().format("%Y%m%d%H%M%S"), std::process::id());
        append_line(&history_dir.join(RUN_IDS_FILE), &run_id)?;
        debug!(run_id = %run_id, "registered run");
        Ok(Self { history_dir, run_id })
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn history_dir(&self) -> &Path {
        &self.history_dir
    }

    /// Append a state change for this run.
    pub fn record(&self, state: State) -> Result<()> {
        let event = RunEvent {
            run_id: self.run_id.clone(),
            state,
            event_time: Utc::now(),
        };
        let line = serde_json::to_string(&event).context("serialising run event")?;
        append_line(&self.history_dir.join(RUN_LOG_FILE), &line)?;
        debug!(run_id = %self.run_id, state = state.as_str(), "recorded run state");
        Ok(())
    }

    /// Every event in the log, oldest first.
    pub fn events(&self) -> Result<Vec<RunEvent>> {
        let path = self.history_dir.join(RUN_LOG_FILE);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(&path).with_context(|| format!("opening {:?}", path))?;
        let mut out = Vec::new();
        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line = line.with_context(|| format!("reading {:?}", path))?;
            if line.trim().is_empty() {
                continue;
            }
            let event: RunEvent = serde_json::from_str(&line)
                .with_context(|| format!("bad run event at {:?}:{}", path, idx + 1))?;
            out.push(event);
        }
        Ok(out)
    }

    /// Write `<run_id>_manifest.json` via a temporary file.
    pub fn write_manifest(&self, manifest: &RunManifest) -> Result<PathBuf> {
        let path = self.history_dir.join(format!("{}_manifest.json", self.run_id));
        let tmp_path = path.with_extension("json.tmp");

        let file = File::create(&tmp_path)
            .with_context(|| format!("could not create temporary file `{}`", tmp_path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, manifest).context("writing run manifest")?;
        writer.flush().context("flushing run manifest")?;
        drop(writer);

        fs::rename(&tmp_path, &path).with_context(|| {
            format!(
                "failed to rename `{}` to `{}`",
                tmp_path.display(),
                path.display()
            )
        })?;
        Ok(path)
    }
}

fn append_line(path: &Path, line: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening {:?} for append", path))?;
    writeln!(file, "{}", line).with_context(|| format!("appending to {:?}", path))?;
    Ok(())
}
