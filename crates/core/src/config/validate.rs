use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Probe timeout is not 0
/// - Stall timeout, when set, is not 0
/// - Advanced video mode names an encoder
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.converter.probe_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "converter.probe_timeout_secs cannot be 0".to_string(),
        ));
    }

    if config.converter.stall_timeout_secs == Some(0) {
        return Err(ConfigError::ValidationError(
            "converter.stall_timeout_secs cannot be 0, leave it unset to disable".to_string(),
        ));
    }

    let video = &config.defaults.video;
    if video.advanced && video.video_encoder.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "defaults.video.video_encoder cannot be empty in advanced mode".to_string(),
        ));
    }

    Ok(())
}
