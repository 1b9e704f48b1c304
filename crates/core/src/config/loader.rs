use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Environment prefix for overrides, e.g. `MACAN_CONVERTER__FFMPEG_PATH`.
pub const ENV_PREFIX: &str = "MACAN_";

/// Load configuration from file with environment variable overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::{AudioFormat, QualityTier};
    use figment::Jail;

    #[test]
    fn test_load_config_from_str_valid() {
        let toml = r#"
[converter]
probe_timeout_secs = 3
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.converter.probe_timeout_secs, 3);
    }

    #[test]
    fn test_load_config_from_str_bad_type() {
        let toml = r#"
[converter]
probe_timeout_secs = "soon"
"#;
        let result = load_config_from_str(toml);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/macan.toml"));
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_partial_audio_defaults() {
        let toml = r#"
[defaults.audio]
bitrate = "320k"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.defaults.audio.format, AudioFormat::Mp3);
        assert_eq!(config.defaults.audio.bitrate, "320k");
    }

    #[test]
    fn test_load_config_from_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "macan.toml",
                r#"
[converter]
stall_timeout_secs = 60

[defaults.video]
quality = "high"
"#,
            )?;

            let config = load_config(Path::new("macan.toml")).map_err(|e| e.to_string())?;
            assert_eq!(config.converter.stall_timeout_secs, Some(60));
            assert_eq!(config.converter.probe_timeout_secs, 10);
            assert_eq!(config.defaults.video.quality, QualityTier::High);
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "macan.toml",
                r#"
[converter]
probe_timeout_secs = 20

[defaults.audio]
format = "flac"
"#,
            )?;
            jail.set_env("MACAN_CONVERTER__PROBE_TIMEOUT_SECS", "3");
            jail.set_env("MACAN_DEFAULTS__AUDIO__BITRATE", "256k");

            let config = load_config(Path::new("macan.toml")).map_err(|e| e.to_string())?;
            assert_eq!(config.converter.probe_timeout_secs, 3);
            assert_eq!(config.defaults.audio.format, AudioFormat::Flac);
            assert_eq!(config.defaults.audio.bitrate, "256k");
            Ok(())
        });
    }

    #[test]
    fn test_env_override_with_bad_value() {
        Jail::expect_with(|jail| {
            jail.create_file("macan.toml", "")?;
            jail.set_env("MACAN_CONVERTER__PROBE_TIMEOUT_SECS", "soon");

            let err = load_config(Path::new("macan.toml")).unwrap_err();
            assert!(matches!(err, ConfigError::ParseError(_)));
            Ok(())
        });
    }
}
