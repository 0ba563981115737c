//! Run artifacts: the structured results file, the mismatch log and the
//! console summary.
//!
//! Both files are rewritten in full on every snapshot. Writes go to
//! `<file>.tmp` and are renamed into place, so a reader never observes a
//! torn file. Artifacts carry no timestamps; the same result list always
//! renders to the same bytes.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::classify::{ClassifiedResult, KeyStatusAggregate, Status, Summary};
use crate::error::Result;
use crate::target::REFERENCE_NAME;

/// One entry of the results file.
#[derive(Debug, Serialize)]
struct ResultRecord<'a> {
    combo: String,
    key: &'a str,
    status: Status,
    reference_out: &'a str,
    target_out: &'a str,
}

impl<'a> From<&'a ClassifiedResult> for ResultRecord<'a> {
    fn from(result: &'a ClassifiedResult) -> Self {
        Self {
            combo: result.combo(),
            key: &result.case.key.name,
            status: result.status,
            reference_out: &result.reference_out,
            target_out: &result.target_out,
        }
    }
}

/// Pretty-printed JSON array, one record per case, in run order.
pub fn render_results(results: &[ClassifiedResult]) -> Result<String> {
    let records: Vec<ResultRecord<'_>> = results.iter().map(ResultRecord::from).collect();
    let mut json = serde_json::to_string_pretty(&records)?;
    json.push('\n');
    Ok(json)
}

/// Mismatch report with columns padded to the widest combo and reference
/// output.
#[must_use]
pub fn render_mismatch_log(target_name: &str, results: &[ClassifiedResult]) -> String {
    let mismatches: Vec<(String, &ClassifiedResult)> = results
        .iter()
        .filter(|r| r.status == Status::Mismatch)
        .map(|r| (r.combo(), r))
        .collect();

    let mut out = format!(
        "Found {} mismatches for target '{target_name}'.\n\n",
        mismatches.len()
    );

    let combo_width = mismatches
        .iter()
        .map(|(combo, _)| combo.chars().count())
        .max()
        .unwrap_or(0);
    let reference_width = mismatches
        .iter()
        .map(|(_, r)| r.reference_out.chars().count())
        .max()
        .unwrap_or(0);

    for (combo, result) in &mismatches {
        let _ = writeln!(
            out,
            "{combo:<combo_width$} -> {REFERENCE_NAME}: {:<reference_width$} | {target_name}: {}",
            result.reference_out, result.target_out
        );
    }
    out
}

/// Write `contents` to `<path>.tmp`, then rename over `path`.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp_path = PathBuf::from(tmp);
    std::fs::write(&tmp_path, contents)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Owns the two on-disk artifacts of a run.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    results_file: PathBuf,
    mismatch_log: PathBuf,
    target_name: String,
}

impl ArtifactWriter {
    #[must_use]
    pub fn new(
        results_file: impl Into<PathBuf>,
        mismatch_log: impl Into<PathBuf>,
        target_name: impl Into<String>,
    ) -> Self {
        Self {
            results_file: results_file.into(),
            mismatch_log: mismatch_log.into(),
            target_name: target_name.into(),
        }
    }

    #[must_use]
    pub fn results_file(&self) -> &Path {
        &self.results_file
    }

    #[must_use]
    pub fn mismatch_log(&self) -> &Path {
        &self.mismatch_log
    }

    /// Rewrite both artifacts from the full result list.
    pub fn snapshot(&self, results: &[ClassifiedResult]) -> Result<()> {
        write_atomic(&self.results_file, render_results(results)?.as_bytes())?;
        write_atomic(
            &self.mismatch_log,
            render_mismatch_log(&self.target_name, results).as_bytes(),
        )?;
        tracing::debug!(
            cases = results.len(),
            results_file = %self.results_file.display(),
            "Snapshot written"
        );
        Ok(())
    }
}

/// `Progress: <pct>% (<processed>/<total>)`
#[must_use]
pub fn render_progress(processed: usize, total: usize) -> String {
    let percent = if total == 0 {
        100
    } else {
        processed.saturating_mul(100) / total
    };
    format!("Progress: {percent}% ({processed}/{total})")
}

/// Final console block.
#[must_use]
pub fn render_summary(
    summary: &Summary,
    keys: &KeyStatusAggregate,
    artifacts: &ArtifactWriter,
) -> String {
    let mut out = String::from("--- Test Summary ---\n");
    let _ = writeln!(out, "Total tests run: {}", summary.total);
    let _ = writeln!(out, "  Matches: {}", summary.matches);
    let _ = writeln!(out, "  Mismatches: {}", summary.mismatches);
    let _ = writeln!(
        out,
        "  Skipped (reference empty): {}",
        summary.skipped_reference_empty
    );
    let _ = writeln!(
        out,
        "  Skipped (target fallback): {}",
        summary.skipped_target_fallback
    );
    let _ = writeln!(out, "  Errors: {}", summary.errors);
    let _ = writeln!(
        out,
        "Keys with failures: {} of {}",
        keys.failed_count(),
        keys.len()
    );
    if summary.mismatches > 0 {
        let _ = writeln!(
            out,
            "Mismatch details have been logged to '{}'",
            artifacts.mismatch_log.display()
        );
    }
    let _ = writeln!(
        out,
        "Full results are in '{}'",
        artifacts.results_file.display()
    );
    out
}
