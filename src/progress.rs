//! Training progress reporting.
//!
//! Text extraction over the whole corpus and per-label fitting are the two
//! slow phases of `doclabel train`. Reporters let an operator see that a run
//! is alive. Progress goes to **stderr** so stdout stays parseable.

use std::io::Write;

/// A single progress event for training.
#[derive(Clone, Debug, PartialEq)]
pub enum TrainProgressEvent {
    /// `n` of `total` corpus files have been read (successfully or not).
    Extracting { n: u64, total: u64 },
    /// Fitting the model for `label`, the `n`-th of `total` labels.
    Fitting {
        label: String,
        n: u64,
        total: u64,
        positives: u64,
        negatives: u64,
    },
}

/// Receives progress events from the training pipeline.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: TrainProgressEvent);
}

/// Human-friendly progress on stderr: "train  extracting  1,234 / 5,000 files".
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, event: TrainProgressEvent) {
        let line = match &event {
            TrainProgressEvent::Extracting { n, total } => format!(
                "train  extracting  {} / {} files\n",
                format_number(*n),
                format_number(*total)
            ),
            TrainProgressEvent::Fitting {
                label,
                n,
                total,
                positives,
                negatives,
            } => format!(
                "train  fitting {}  {} / {} labels  ({}/{})\n",
                label,
                format_number(*n),
                format_number(*total),
                format_number(*positives),
                format_number(*negatives)
            ),
        };
        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_all(line.as_bytes());
        let _ = stderr.flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl ProgressReporter for JsonProgress {
    fn report(&self, event: TrainProgressEvent) {
        let obj = match &event {
            TrainProgressEvent::Extracting { n, total } => serde_json::json!({
                "event": "progress",
                "phase": "extracting",
                "n": n,
                "total": total
            }),
            TrainProgressEvent::Fitting {
                label,
                n,
                total,
                positives,
                negatives,
            } => serde_json::json!({
                "event": "progress",
                "phase": "fitting",
                "label": label,
                "n": n,
                "total": total,
                "positives": positives,
                "negatives": negatives
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "{}", line);
            let _ = stderr.flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _event: TrainProgressEvent) {}
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    for (i, c) in s.chars().enumerate() {
        if i > 0 && (s.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Box<dyn ProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_number_comma() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234), "1,234");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }
}
