use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use circdd_core::NodeStats;
use serde::Serialize;

/// Stage of the driver a status line belongs to
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    Build,
    Reorder,
    Unify,
}

#[derive(Clone, Serialize, Debug)]
struct StatusRecord<'a> {
    model: &'a str,
    phase: Phase,
    iteration: usize,
    peak_nodes: usize,
    total_nodes: usize,
    seconds: f64,
}

/// Writes one CSV record per reported status, if a path was given
pub struct StatsWriter {
    writer: Option<csv::Writer<fs::File>>,
    start: Instant,
}

impl StatsWriter {
    pub fn new<P: AsRef<Path>>(csv_path: Option<P>) -> Self {
        let writer = csv_path.map(|path| {
            let path = path.as_ref();
            match csv::Writer::from_path(path) {
                Ok(w) => w,
                Err(err) => {
                    eprintln!("Could not open '{}': {err}", path.display());
                    std::process::exit(1);
                }
            }
        });
        Self {
            writer,
            start: Instant::now(),
        }
    }

    pub fn record(
        &mut self,
        model: &str,
        phase: Phase,
        iteration: usize,
        stats: NodeStats,
        time: Duration,
    ) {
        let Some(writer) = &mut self.writer else {
            return;
        };
        let record = StatusRecord {
            model,
            phase,
            iteration,
            peak_nodes: stats.peak_nodes,
            total_nodes: stats.total_nodes,
            seconds: time.as_secs_f64(),
        };
        if let Err(err) = writer.serialize(record) {
            eprintln!("Failed to write record to statistics CSV: {err}");
            std::process::exit(1);
        }
    }

    pub fn elapsed_time(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for StatsWriter {
    fn drop(&mut self) {
        if let Some(writer) = &mut self.writer {
            if let Err(err) = writer.flush() {
                eprintln!("Failed to flush statistics CSV: {err}");
            }
        }
    }
}
