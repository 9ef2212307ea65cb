//! Reads a run's outcome back out of pan's console output.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::engine::{EngineError, EngineOutcome, StepStatus};

static FINISHED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:\d{4}/\d{2}/\d{2} \d{2}:\d{2}:\d{2} - )?(?P<step>.+)\.(?P<copy>\d+) - Finished processing \(I=(?P<i>\d+), O=(?P<o>\d+), R=(?P<r>\d+), W=(?P<w>\d+), U=(?P<u>\d+), E=(?P<e>\d+)\)",
    )
    .expect("valid")
});

static ERROR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\d{4}/\d{2}/\d{2} \d{2}:\d{2}:\d{2} - )?(?P<subject>.+?) - ERROR\b")
        .expect("valid")
});

/// An `ERROR` logged by a step copy (`<step>.<copy>`). The transformation's
/// own "Errors detected!" line has no copy number and is not a failing step.
static STEP_ERROR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\d{4}/\d{2}/\d{2} \d{2}:\d{2}:\d{2} - )?(?P<subject>.+?\.\d+) - ERROR\b")
        .expect("valid")
});

pub fn is_error_line(line: &str) -> bool {
    ERROR_RE.is_match(line)
}

pub fn parse_step_status(line: &str) -> Option<StepStatus> {
    let caps = FINISHED_RE.captures(line)?;
    let n = |name: &str| caps[name].parse::<u64>().ok();
    Some(StepStatus {
        step: caps["step"].to_string(),
        copy: caps["copy"].parse().ok()?,
        lines_input: n("i")?,
        lines_output: n("o")?,
        lines_read: n("r")?,
        lines_written: n("w")?,
        lines_updated: n("u")?,
        errors: n("e")?,
    })
}

/// Maps pan's exit code onto "ran to completion" or a rejection.
///
/// 0, 1 and 2 mean the transformation ran (possibly with errors); the other
/// documented codes mean it never got going.
pub fn check_exit_code(code: i32) -> Result<(), EngineError> {
    let reason = match code {
        3 => "unable to prepare and initialize the transformation",
        7 => "the transformation could not be loaded from XML or the repository",
        8 => "error loading steps or plugins",
        9 => "command line usage printing",
        _ => return Ok(()),
    };
    Err(EngineError::Rejected { code, reason })
}

/// Builds the outcome of a run from its exit code and captured lines.
///
/// Error count: the sum of the `E=` counters of finished steps when any were
/// logged, else the number of distinct step copies that logged an `ERROR`. A
/// non-zero exit code always counts as at least one error.
pub fn summarize<'a>(exit_code: i32, lines: impl IntoIterator<Item = &'a str>) -> EngineOutcome {
    let mut steps = Vec::new();
    let mut failing_subjects = BTreeSet::new();
    for line in lines {
        if let Some(status) = parse_step_status(line) {
            steps.push(status);
        } else if let Some(caps) = STEP_ERROR_RE.captures(line) {
            failing_subjects.insert(caps["subject"].to_string());
        }
    }

    let mut nr_errors = if steps.is_empty() {
        failing_subjects.len() as u64
    } else {
        steps.iter().map(|s| s.errors).sum()
    };
    if exit_code != 0 && nr_errors == 0 {
        nr_errors = 1;
    }

    EngineOutcome {
        exit_code: Some(exit_code),
        nr_errors,
        steps,
    }
}
