//! Media duration probing.
//!
//! Runs `ffmpeg -i <input>` and scans its diagnostic output for
//! `Duration: HH:MM:SS`. ffmpeg exits non-zero here (no output file was
//! given), so the exit status is ignored.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Hard limit for one probe invocation.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

static DURATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Duration:\s*(\d{2}):(\d{2}):(\d{2})").expect("valid regex"));

/// Extracts the first `Duration: HH:MM:SS` marker as whole seconds.
pub fn parse_duration(text: &str) -> Option<u64> {
    let caps = DURATION_RE.captures(text)?;
    let field = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u64>().ok());
    Some(field(1)? * 3600 + field(2)? * 60 + field(3)?)
}

/// Probes the total duration of `input` in seconds.
///
/// Returns `None` on timeout, spawn failure, or when no marker is found.
/// Callers treat that as "no percentage available", never as an error.
pub async fn probe_duration(binary: &Path, input: &Path, limit: Duration) -> Option<u64> {
    let child = Command::new(binary)
        .arg("-i")
        .arg(input)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn();

    let child = match child {
        Ok(child) => child,
        Err(e) => {
            warn!("Duration probe could not start {:?}: {}", binary, e);
            return None;
        }
    };

    let output = match timeout(limit, child.wait_with_output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            warn!("Duration probe failed for {:?}: {}", input, e);
            return None;
        }
        Err(_) => {
            warn!(
                "Duration probe timed out after {}s for {:?}",
                limit.as_secs(),
                input
            );
            return None;
        }
    };

    let mut text = String::from_utf8_lossy(&output.stderr).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stdout));

    let duration = parse_duration(&text);
    debug!("Probed duration of {:?}: {:?}", input, duration);
    duration
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        let text = "Input #0, mov,mp4,m4a,3gp,3g2,mj2, from 'clip.mov':\n  \
                    Duration: 01:02:03.45, start: 0.000000, bitrate: 2000 kb/s\n";
        assert_eq!(parse_duration(text), Some(3723));
    }

    #[test]
    fn test_parse_duration_first_match_wins() {
        let text = "Duration: 00:00:10.00\nDuration: 00:05:00.00\n";
        assert_eq!(parse_duration(text), Some(10));
    }

    #[test]
    fn test_parse_duration_missing_marker() {
        assert_eq!(parse_duration("clip.mov: No such file or directory"), None);
        assert_eq!(parse_duration("Duration: N/A, bitrate: N/A"), None);
    }

    #[tokio::test]
    async fn test_probe_missing_binary_is_none() {
        let result = probe_duration(
            Path::new("/nonexistent/ffmpeg"),
            Path::new("clip.mov"),
            DEFAULT_PROBE_TIMEOUT,
        )
        .await;
        assert_eq!(result, None);
    }
}
