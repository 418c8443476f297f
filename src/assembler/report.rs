//! Per-step outcomes and the terminal status of an assembly run.
//!
//! The report is written next to the staging directory as
//! `target/assembly-report.json`.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::Path;
use time::OffsetDateTime;

use crate::platform::HostPlatform;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Lock,
    Platform,
    Toolchain,
    DiskImage,
    InitBinary,
    Ramdisk,
    SourceDump,
    Archive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum StepOutcome {
    Done(String),
    Skipped(String),
    /// Completed with a problem worth a second look.
    Warned(String),
    /// Failed without stopping the run.
    Failed(String),
}

impl StepOutcome {
    pub fn is_clean(&self) -> bool {
        matches!(self, StepOutcome::Done(_) | StepOutcome::Skipped(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRecord {
    pub step: Step,
    #[serde(flatten)]
    pub outcome: StepOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Abort {
    pub step: Step,
    pub reason: String,
}

/// Aggregate verdict over every step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalStatus {
    Success,
    Degraded,
    Aborted,
}

impl TerminalStatus {
    pub fn exit_code(self) -> i32 {
        match self {
            TerminalStatus::Success => 0,
            TerminalStatus::Aborted => 1,
            TerminalStatus::Degraded => 3,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AssemblyReport {
    pub platform: String,
    pub started_at_utc: String,
    pub finished_at_utc: Option<String>,
    pub steps: Vec<StepRecord>,
    pub abort: Option<Abort>,
    pub archive_sha256: Option<String>,
    pub status: TerminalStatus,
}

impl AssemblyReport {
    pub fn begin(platform: &HostPlatform) -> Self {
        Self {
            platform: platform.to_string(),
            started_at_utc: now_utc_compact(),
            finished_at_utc: None,
            steps: Vec::new(),
            abort: None,
            archive_sha256: None,
            status: TerminalStatus::Success,
        }
    }

    pub fn record(&mut self, step: Step, outcome: StepOutcome) {
        self.steps.push(StepRecord { step, outcome });
        self.status = self.compute_status();
    }

    pub fn abort(&mut self, step: Step, error: &anyhow::Error) {
        self.abort = Some(Abort {
            step,
            reason: format!("{error:#}"),
        });
        self.status = TerminalStatus::Aborted;
    }

    pub fn finish(&mut self) {
        self.finished_at_utc = Some(now_utc_compact());
        self.status = self.compute_status();
    }

    pub fn status(&self) -> TerminalStatus {
        self.status
    }

    pub fn outcome(&self, step: Step) -> Option<&StepOutcome> {
        self.steps
            .iter()
            .find(|record| record.step == step)
            .map(|record| &record.outcome)
    }

    fn compute_status(&self) -> TerminalStatus {
        if self.abort.is_some() {
            TerminalStatus::Aborted
        } else if self.steps.iter().all(|record| record.outcome.is_clean()) {
            TerminalStatus::Success
        } else {
            TerminalStatus::Degraded
        }
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating report directory '{}'", parent.display()))?;
        }
        let json = serde_json::to_vec_pretty(self).context("serializing assembly report")?;
        fs::write(path, json)
            .with_context(|| format!("writing assembly report '{}'", path.display()))
    }
}

fn now_utc_compact() -> String {
    let now = OffsetDateTime::now_utc();
    format!(
        "{:04}{:02}{:02}T{:02}{:02}{:02}Z",
        now.year(),
        now.month() as u8,
        now.day(),
        now.hour(),
        now.minute(),
        now.second()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn clean_steps_are_success() {
        let mut report = AssemblyReport::begin(&HostPlatform::Linux);
        report.record(Step::DiskImage, StepOutcome::Skipped("exists".into()));
        report.record(Step::Archive, StepOutcome::Done("packed".into()));
        report.finish();
        assert_eq!(report.status(), TerminalStatus::Success);
        assert_eq!(report.status().exit_code(), 0);
    }

    #[test]
    fn non_fatal_failure_degrades() {
        let mut report = AssemblyReport::begin(&HostPlatform::Linux);
        report.record(Step::Toolchain, StepOutcome::Warned("rustup".into()));
        report.record(Step::Archive, StepOutcome::Done("packed".into()));
        report.finish();
        assert_eq!(report.status(), TerminalStatus::Degraded);
        assert_eq!(report.status().exit_code(), 3);
    }

    #[test]
    fn abort_wins() {
        let mut report = AssemblyReport::begin(&HostPlatform::Linux);
        report.record(Step::Toolchain, StepOutcome::Warned("rustup".into()));
        report.abort(Step::SourceDump, &anyhow::anyhow!("no sources"));
        report.finish();
        assert_eq!(report.status(), TerminalStatus::Aborted);
        assert_eq!(report.status().exit_code(), 1);
        assert_eq!(report.abort.as_ref().unwrap().step, Step::SourceDump);
    }

    #[test]
    fn json_names_steps_and_outcomes() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("target/assembly-report.json");

        let mut report = AssemblyReport::begin(&HostPlatform::MacOs);
        report.record(Step::InitBinary, StepOutcome::Failed("nasm missing".into()));
        report.finish();
        report.write_json(&path).unwrap();

        let parsed: serde_json::Value =
            serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(parsed["platform"], "MacOS");
        assert_eq!(parsed["status"], "degraded");
        assert_eq!(parsed["steps"][0]["step"], "init_binary");
        assert_eq!(parsed["steps"][0]["outcome"], "failed");
        assert_eq!(parsed["steps"][0]["detail"], "nasm missing");
        assert!(parsed["finished_at_utc"].as_str().unwrap().ends_with('Z'));
    }
}
