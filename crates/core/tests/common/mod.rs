//! Shared fixtures: a shell script that impersonates ffmpeg.

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::mpsc;

/// Prints three progress lines over a 10 second input and exits 0.
pub const SUCCEEDS: &str = r#"
printf 'size=       1kB time=00:00:02.00 bitrate=   4.1kbits/s\r' >&2
printf 'size=       2kB time=00:00:05.00 bitrate=   4.1kbits/s\r' >&2
printf 'size=       3kB time=00:00:10.00 bitrate=   4.1kbits/s\r' >&2
printf '\n' >&2
exit 0
"#;

/// Prints one progress line and exits 3.
pub const FAILS_WITH_3: &str = r#"
printf 'time=00:00:01.00\r' >&2
exit 3
"#;

/// Prints one progress line, then goes silent for a long time.
pub const HANGS: &str = r#"
printf 'time=00:00:01.00\r' >&2
exec sleep 30
"#;

/// Reports a 10 second duration the way `ffmpeg -i <input>` does.
pub const DURATION_10S: &str = r#"
echo "Input #0, wav, from '$2':" >&2
echo "  Duration: 00:00:10.00, bitrate: 1411 kb/s" >&2
echo "At least one output file must be specified" >&2
exit 1
"#;

/// Never answers the duration query.
pub const DURATION_HANGS: &str = "exec sleep 30";

/// A temp dir holding a fake `ffmpeg` executable.
///
/// Invoked with exactly two arguments (`-i <input>`) it runs the duration
/// branch, which by default reports 10 seconds. Any other invocation
/// records its pid and arguments, then runs `body`.
pub struct FakeFfmpeg {
    dir: TempDir,
    binary: PathBuf,
}

impl FakeFfmpeg {
    pub fn new(body: &str) -> Self {
        Self::with_duration_query(DURATION_10S, body)
    }

    pub fn with_duration_query(query: &str, body: &str) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let binary = dir.path().join("ffmpeg");
        let script = format!(
            r#"#!/bin/sh
if [ "$#" -eq 2 ]; then
{query}
fi
echo $$ > "{dir}/pid"
printf '%s\n' "$@" > "{dir}/args"
{body}
"#,
            dir = dir.path().display(),
            query = query,
            body = body,
        );
        fs::write(&binary, script).expect("Failed to write fake ffmpeg");
        fs::set_permissions(&binary, fs::Permissions::from_mode(0o755))
            .expect("Failed to chmod fake ffmpeg");
        Self { dir, binary }
    }

    pub fn binary(&self) -> PathBuf {
        self.binary.clone()
    }

    /// Directory for outputs; exists for the lifetime of the fixture.
    pub fn output_dir(&self) -> &Path {
        self.dir.path()
    }

    /// Arguments of the last conversion invocation.
    pub fn recorded_args(&self) -> Vec<String> {
        fs::read_to_string(self.dir.path().join("args"))
            .map(|s| s.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Arguments of the last conversion invocation, as raw bytes.
    pub fn recorded_raw_args(&self) -> Vec<Vec<u8>> {
        fs::read(self.dir.path().join("args"))
            .map(|bytes| {
                bytes
                    .split(|b| *b == b'\n')
                    .filter(|arg| !arg.is_empty())
                    .map(<[u8]>::to_vec)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether a conversion invocation ever started.
    pub fn conversion_started(&self) -> bool {
        self.dir.path().join("args").exists()
    }

    /// Pid of the last conversion invocation.
    pub fn recorded_pid(&self) -> Option<u32> {
        fs::read_to_string(self.dir.path().join("pid"))
            .ok()
            .and_then(|s| s.trim().parse().ok())
    }
}

/// Receives the next event or panics after five seconds.
pub async fn next_event<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> Option<T> {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("Timed out waiting for event")
}

/// Drains a channel until its senders are gone.
pub async fn drain<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> Vec<T> {
    let mut events = Vec::new();
    while let Some(event) = next_event(rx).await {
        events.push(event);
    }
    events
}
