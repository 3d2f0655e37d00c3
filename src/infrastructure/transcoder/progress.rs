/// Incremental reader of ffmpeg's stderr when run with `-progress pipe:2`.
///
/// The input duration comes from the banner (`Duration: 00:01:02.03, ...`),
/// the position from `out_time_us=` and each `progress=` line closes a block.
#[derive(Debug, Default)]
pub struct ProgressParser {
    duration_secs: Option<f64>,
    out_time_us: Option<i64>,
}

impl ProgressParser {
    /// Returns the completion percentage when `line` closes a progress block
    /// and both duration and position are known.
    pub fn feed(&mut self, line: &str) -> Option<f64> {
        let line = line.trim();

        if let Some(rest) = line.strip_prefix("Duration:") {
            if self.duration_secs.is_none() {
                self.duration_secs = rest.split(',').next().and_then(|t| parse_timestamp(t.trim()));
            }
            return None;
        }

        if let Some(val) = line.strip_prefix("out_time_us=") {
            self.out_time_us = val.trim().parse::<i64>().ok();
            return None;
        }

        if line.starts_with("progress=") {
            let total = self.duration_secs.filter(|d| *d > 0.0)?;
            let done = self.out_time_us? as f64 / 1_000_000.0;
            return Some((done / total * 100.0).clamp(0.0, 100.0));
        }

        None
    }

    pub fn duration_secs(&self) -> Option<f64> {
        self.duration_secs
    }
}

/// `HH:MM:SS(.frac)` to seconds. `N/A` and malformed input give `None`.
pub fn parse_timestamp(s: &str) -> Option<f64> {
    let mut parts = s.split(':');
    let hours = parts.next()?.parse::<f64>().ok()?;
    let minutes = parts.next()?.parse::<f64>().ok()?;
    let seconds = parts.next()?.parse::<f64>().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

/// Whether `line` is a `key=value` record of the progress stream rather
/// than diagnostic output.
pub fn is_progress_record(line: &str) -> bool {
    match line.trim().split_once('=') {
        Some((key, _)) => {
            !key.is_empty()
                && key
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        }
        None => false,
    }
}
