//! Recorded gaze-log replay.
//!
//! Loads the 43-column CSV logs written during tracked sessions and turns
//! them back into `GazeSample`s, so detector changes can be scored against
//! hand-labelled recordings without a headset attached.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::info;

use crate::gaze::{EyeGaze, GazeSample};
use crate::math::{Ray, Vec3};

/// Columns per data row: timestamp, saccade truth, speed, acceleration,
/// saccade size, two openness values, then twelve xyz triples (combined,
/// left and right eye, each as local and world direction/origin).
pub const COLUMN_COUNT: usize = 43;

// ── Frame record ────────────────────────────────────────────

/// One row of a recorded log. Directions and origins are the head-local
/// values; the world-space columns of the log are ignored since the replay
/// pipeline re-derives them from the head pose.
#[derive(Debug, Clone, Copy)]
pub struct ReplayFrame {
    pub timestamp_ms: i64,
    /// Hand-labelled ground truth from the recording session.
    pub saccade_truth: bool,
    pub openness_left: f32,
    pub openness_right: f32,
    pub combined_direction: Vec3,
    pub combined_origin: Vec3,
    pub left_direction: Vec3,
    pub left_origin: Vec3,
    pub right_direction: Vec3,
    pub right_origin: Vec3,
}

impl ReplayFrame {
    /// The tracker sample this row reproduces.
    pub fn sample(&self) -> GazeSample {
        GazeSample {
            timestamp_ms: self.timestamp_ms,
            combined: Ray::new(self.combined_origin, self.combined_direction),
            left: EyeGaze::new(self.left_origin, self.left_direction, self.openness_left),
            right: EyeGaze::new(self.right_origin, self.right_direction, self.openness_right),
        }
    }
}

// ── Loader ──────────────────────────────────────────────────

/// Load a recorded gaze log from disk.
pub fn load_log(path: impl AsRef<Path>) -> Result<Vec<ReplayFrame>> {
    let path = path.as_ref();
    let file =
        File::open(path).with_context(|| format!("failed to open gaze log '{}'", path.display()))?;
    let frames = parse_log(BufReader::new(file))
        .with_context(|| format!("failed to parse gaze log '{}'", path.display()))?;
    info!(path = %path.display(), frames = frames.len(), "gaze log loaded");
    Ok(frames)
}

/// Parse a gaze log. The header row and any settings preamble are skipped;
/// a line counts as data once its first field contains a digit.
pub fn parse_log<R: BufRead>(reader: R) -> Result<Vec<ReplayFrame>> {
    let mut frames = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.context("failed to read log line")?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let first = trimmed.split(',').next().unwrap_or("");
        if !first.chars().any(|c| c.is_ascii_digit()) {
            continue;
        }
        frames.push(parse_row(trimmed, index + 1)?);
    }
    Ok(frames)
}

fn parse_row(line: &str, row: usize) -> Result<ReplayFrame> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() < COLUMN_COUNT {
        bail!(
            "row {row}: expected {COLUMN_COUNT} columns, got {}",
            fields.len()
        );
    }

    let float = |column: usize| -> Result<f32> {
        fields[column]
            .parse::<f32>()
            .with_context(|| format!("row {row}, column {column}: bad number '{}'", fields[column]))
    };
    let vector =
        |start: usize| -> Result<Vec3> { Ok(Vec3::new(float(start)?, float(start + 1)?, float(start + 2)?)) };

    let timestamp_ms = fields[0]
        .parse::<i64>()
        .with_context(|| format!("row {row}: bad timestamp '{}'", fields[0]))?;
    let saccade_truth = match fields[1].to_ascii_lowercase().as_str() {
        "true" | "1" => true,
        "false" | "0" => false,
        other => bail!("row {row}: bad saccade flag '{other}'"),
    };

    Ok(ReplayFrame {
        timestamp_ms,
        saccade_truth,
        openness_left: float(5)?,
        openness_right: float(6)?,
        combined_direction: vector(7)?,
        combined_origin: vector(10)?,
        left_direction: vector(19)?,
        left_origin: vector(22)?,
        right_direction: vector(25)?,
        right_origin: vector(28)?,
    })
}

// ── Tests ────────────────────────────────────────────────────
