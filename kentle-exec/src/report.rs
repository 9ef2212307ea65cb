use std::io::{self, Write};

use crate::job::FinishedJob;
use crate::log::LogStore;

pub const LOG_BANNER_WIDTH: usize = 96;

/// The text printed after a run: the completion line, then the job's captured
/// log framed by banners.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct LogReport {
    pub source: String,
    pub log_text: String,
    pub nr_errors: u64,
}

impl LogReport {
    pub async fn collect(job: &FinishedJob, store: &LogStore, include_general: bool) -> Self {
        Self {
            source: job.source().to_string(),
            log_text: store.buffer(job.log_channel_id(), include_general).await,
            nr_errors: job.result().nr_errors,
        }
    }

    pub fn completion_line(&self) -> String {
        completion_line(&self.source, self.nr_errors)
    }

    pub fn write_to(&self, out: &mut impl Write) -> io::Result<()> {
        let banner = "*".repeat(LOG_BANNER_WIDTH);
        writeln!(out)?;
        writeln!(out, "{}", self.completion_line())?;
        writeln!(out, "{banner}")?;
        writeln!(
            out,
            "LOG REPORT: Transformation generated the following log lines:\n"
        )?;
        out.write_all(self.log_text.as_bytes())?;
        writeln!(out, "END OF LOG REPORT")?;
        writeln!(out, "{banner}")?;
        out.flush()
    }
}

pub fn completion_line(source: &str, nr_errors: u64) -> String {
    if nr_errors == 0 {
        format!("Trans {source} executed successfully")
    } else {
        format!("Trans {source} executed with {nr_errors} errors")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(nr_errors: u64) -> LogReport {
        LogReport {
            source: "etl/Madeira.ktr".to_string(),
            log_text: "2024/01/01 10:00:00 - Madeira - Dispatching started\n".to_string(),
            nr_errors,
        }
    }

    #[test]
    fn outcome_precedes_the_framed_log() {
        let mut out = Vec::new();
        report(0).write_to(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let banner = "*".repeat(LOG_BANNER_WIDTH);
        let expected = format!(
            "\nTrans etl/Madeira.ktr executed successfully\n\
             {banner}\nLOG REPORT: Transformation generated the following log lines:\n\n\
             2024/01/01 10:00:00 - Madeira - Dispatching started\n\
             END OF LOG REPORT\n{banner}\n"
        );
        assert_eq!(text, expected);
    }

    #[test]
    fn completion_line_counts_errors() {
        assert_eq!(
            report(3).completion_line(),
            "Trans etl/Madeira.ktr executed with 3 errors"
        );
        assert_eq!(completion_line("a.ktr", 0), "Trans a.ktr executed successfully");
    }
}
