//! Incremental progress parsing of ffmpeg's diagnostic stream.
//!
//! ffmpeg rewrites its status line with `\r`, so both `\r` and `\n`
//! terminate a line. Each complete line is scanned for `time=HH:MM:SS`.

use once_cell::sync::Lazy;
use regex_lite::Regex;

use super::types::ProgressEvent;

/// Highest percentage reported while the process is still running.
/// 100 is reserved for confirmed success.
pub const RUNNING_CAP: u8 = 99;

static TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"time=(\d{2}):(\d{2}):(\d{2})").expect("valid regex"));

/// Extracts the elapsed `time=HH:MM:SS` marker of one line as seconds.
pub fn parse_elapsed(line: &str) -> Option<u64> {
    let caps = TIME_RE.captures(line)?;
    let field = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u64>().ok());
    Some(field(1)? * 3600 + field(2)? * 60 + field(3)?)
}

/// `min(floor(elapsed / total * 100), 99)`.
pub fn percent_of(elapsed: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = elapsed.saturating_mul(100) / total;
    pct.min(u64::from(RUNNING_CAP)) as u8
}

fn format_clock(secs: u64) -> String {
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

/// Turns raw diagnostic bytes into monotonic progress events.
#[derive(Debug)]
pub struct ProgressTracker {
    total_secs: Option<u64>,
    line: Vec<u8>,
    last_percent: u8,
}

impl ProgressTracker {
    /// `total_secs` of `None` or zero means the duration is unknown.
    pub fn new(total_secs: Option<u64>) -> Self {
        Self {
            total_secs: total_secs.filter(|t| *t > 0),
            line: Vec::with_capacity(256),
            last_percent: 0,
        }
    }

    /// Whether percentages can be computed.
    pub fn has_duration(&self) -> bool {
        self.total_secs.is_some()
    }

    /// Last reported percentage.
    pub fn last_percent(&self) -> u8 {
        self.last_percent
    }

    /// Consumes a chunk and returns one event per completed line that
    /// carried a progress marker.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<ProgressEvent> {
        let mut events = Vec::new();
        for &byte in chunk {
            if byte == b'\r' || byte == b'\n' {
                if let Some(event) = self.finish_line() {
                    events.push(event);
                }
                self.line.clear();
            } else {
                self.line.push(byte);
            }
        }
        events
    }

    fn finish_line(&mut self) -> Option<ProgressEvent> {
        if self.line.is_empty() {
            return None;
        }
        let line = String::from_utf8_lossy(&self.line);
        let elapsed = parse_elapsed(&line)?;

        match self.total_secs {
            Some(total) => {
                let pct = percent_of(elapsed, total).max(self.last_percent);
                self.last_percent = pct;
                Some(ProgressEvent::new(pct, format!("Converting... {}%", pct)))
            }
            None => Some(ProgressEvent::new(
                self.last_percent,
                format!("Converting... {} elapsed", format_clock(elapsed)),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_elapsed() {
        let line =
            "frame=  240 fps= 60 q=28.0 size=    512kB time=00:01:05.12 bitrate= 64.4kbits/s";
        assert_eq!(parse_elapsed(line), Some(65));
        assert_eq!(parse_elapsed("time=N/A"), None);
    }

    #[test]
    fn test_percent_floor_and_cap() {
        assert_eq!(percent_of(1, 3), 33);
        assert_eq!(percent_of(50, 100), 50);
        assert_eq!(percent_of(100, 100), 99);
        assert_eq!(percent_of(250, 100), 99);
        assert_eq!(percent_of(10, 0), 0);
    }

    #[test]
    fn test_feed_splits_on_carriage_return() {
        let mut tracker = ProgressTracker::new(Some(100));
        let events = tracker.feed(b"time=00:00:10.00 x\rtime=00:00:20.00 x\r");
        assert_eq!(
            events,
            vec![
                ProgressEvent::new(10, "Converting... 10%"),
                ProgressEvent::new(20, "Converting... 20%"),
            ]
        );
    }

    #[test]
    fn test_feed_across_chunk_boundaries() {
        let mut tracker = ProgressTracker::new(Some(60));
        assert!(tracker.feed(b"size=1kB time=00:0").is_empty());
        let events = tracker.feed(b"0:30.00 bitrate=1\n");
        assert_eq!(events, vec![ProgressEvent::new(50, "Converting... 50%")]);
    }

    #[test]
    fn test_lines_without_marker_are_ignored() {
        let mut tracker = ProgressTracker::new(Some(60));
        let events = tracker.feed(b"Stream mapping:\n  Stream #0:0 -> #0:0\n\r\n");
        assert!(events.is_empty());
    }

    #[test]
    fn test_percent_never_decreases_and_stays_below_100() {
        let mut tracker = ProgressTracker::new(Some(10));
        let mut input = Vec::new();
        for secs in [1u64, 5, 3, 9, 10, 12, 7] {
            input.extend_from_slice(format!("time=00:00:{:02}.00\r", secs).as_bytes());
        }

        let percents: Vec<u8> = tracker.feed(&input).into_iter().map(|e| e.percent).collect();

        assert_eq!(percents, vec![10, 50, 50, 90, 99, 99, 99]);
        assert!(percents.windows(2).all(|w| w[0] <= w[1]));
        assert!(percents.iter().all(|p| *p <= RUNNING_CAP));
    }

    #[test]
    fn test_unknown_duration_reports_elapsed_only() {
        let mut tracker = ProgressTracker::new(None);
        assert!(!tracker.has_duration());
        let events = tracker.feed(b"time=01:02:03.00\n");
        assert_eq!(
            events,
            vec![ProgressEvent::new(0, "Converting... 01:02:03 elapsed")]
        );
    }

    #[test]
    fn test_zero_duration_treated_as_unknown() {
        let tracker = ProgressTracker::new(Some(0));
        assert!(!tracker.has_duration());
    }
}
