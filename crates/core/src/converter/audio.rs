//! Argument synthesis for audio conversions.
//!
//! There is a single code path regardless of the target format: ffmpeg
//! selects the audio encoder from the output extension.

use std::ffi::OsString;
use std::path::Path;

use super::traits::ConversionPlan;
use super::types::AudioOptions;

impl ConversionPlan for AudioOptions {
    fn build_args(&self, input: &Path, output: &Path) -> Vec<OsString> {
        vec![
            "-i".into(),
            input.as_os_str().to_owned(),
            "-vn".into(),
            "-b:a".into(),
            self.bitrate.trim().into(),
            "-y".into(),
            output.as_os_str().to_owned(),
        ]
    }

    fn extension(&self) -> &'static str {
        self.format.extension()
    }

    fn probe_status(&self) -> &'static str {
        "Getting audio info..."
    }
}
