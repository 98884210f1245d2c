//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use visit_agent_core::UploadMode;

use crate::constants::{audio, playback, realtime};
use crate::ConfigError;

/// Runtime environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    /// Development mode - relaxed validation
    #[default]
    Development,
    Staging,
    /// Production mode - all validations enforced
    Production,
}

impl RuntimeEnvironment {
    /// Check if strict validation should be applied
    pub fn is_strict(&self) -> bool {
        matches!(self, Self::Production | Self::Staging)
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    /// Realtime model connection
    #[serde(default)]
    pub realtime: RealtimeConfig,

    /// Microphone capture and end-pointing
    #[serde(default)]
    pub audio: AudioConfig,

    /// Response playback
    #[serde(default)]
    pub playback: PlaybackConfig,

    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Settings {
    /// Validate all sections
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_realtime()?;
        self.validate_audio()?;
        self.validate_playback()?;
        self.validate_agent()?;
        Ok(())
    }

    fn validate_realtime(&self) -> Result<(), ConfigError> {
        let rt = &self.realtime;

        if rt.deployment.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "realtime.deployment".to_string(),
                message: "Deployment/model name must not be empty".to_string(),
            });
        }

        if let Some(endpoint) = &rt.endpoint {
            let scheme_ok = ["wss://", "ws://", "https://", "http://"]
                .iter()
                .any(|scheme| endpoint.starts_with(scheme));
            if !scheme_ok {
                return Err(ConfigError::InvalidValue {
                    field: "realtime.endpoint".to_string(),
                    message: format!("Unsupported URL scheme in '{}'", endpoint),
                });
            }
        } else if rt.provider == RealtimeProvider::Azure && self.environment.is_strict() {
            return Err(ConfigError::MissingField("realtime.endpoint".to_string()));
        }

        if rt.connect_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "realtime.connect_timeout_ms".to_string(),
                message: "Must be greater than zero".to_string(),
            });
        }

        Ok(())
    }

    fn validate_audio(&self) -> Result<(), ConfigError> {
        let a = &self.audio;

        if !audio::SUPPORTED_SAMPLE_RATES.contains(&a.sample_rate) {
            return Err(ConfigError::InvalidValue {
                field: "audio.sample_rate".to_string(),
                message: format!(
                    "Must be one of {:?}, got {}",
                    audio::SUPPORTED_SAMPLE_RATES,
                    a.sample_rate
                ),
            });
        }

        if !audio::SUPPORTED_FRAME_DURATIONS_MS.contains(&a.frame_duration_ms) {
            return Err(ConfigError::InvalidValue {
                field: "audio.frame_duration_ms".to_string(),
                message: format!(
                    "Must be one of {:?}, got {}",
                    audio::SUPPORTED_FRAME_DURATIONS_MS,
                    a.frame_duration_ms
                ),
            });
        }

        if a.vad_aggressiveness > audio::MAX_VAD_AGGRESSIVENESS {
            return Err(ConfigError::InvalidValue {
                field: "audio.vad_aggressiveness".to_string(),
                message: format!("Must be between 0 and 3, got {}", a.vad_aggressiveness),
            });
        }

        if a.silence_timeout_ms < a.frame_duration_ms {
            return Err(ConfigError::InvalidValue {
                field: "audio.silence_timeout_ms".to_string(),
                message: "Must cover at least one frame".to_string(),
            });
        }

        if a.max_capture_ms < a.silence_timeout_ms {
            return Err(ConfigError::InvalidValue {
                field: "audio.max_capture_ms".to_string(),
                message: format!(
                    "Must not be shorter than the silence timeout ({}ms)",
                    a.silence_timeout_ms
                ),
            });
        }

        Ok(())
    }

    fn validate_playback(&self) -> Result<(), ConfigError> {
        let p = &self.playback;

        if p.sample_rate == 0 {
            return Err(ConfigError::InvalidValue {
                field: "playback.sample_rate".to_string(),
                message: "Must be greater than zero".to_string(),
            });
        }

        for (field, value) in [
            ("playback.lead_padding_ms", p.lead_padding_ms),
            ("playback.trail_padding_ms", p.trail_padding_ms),
        ] {
            if value > playback::MAX_PADDING_MS {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    message: format!("Padding too long (maximum {}ms)", playback::MAX_PADDING_MS),
                });
            }
        }

        Ok(())
    }

    fn validate_agent(&self) -> Result<(), ConfigError> {
        if self.agent.max_tool_rounds == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "agent.max_tool_rounds".to_string(),
                message: "Must be at least 1 when set".to_string(),
            });
        }
        Ok(())
    }
}

/// Which realtime API flavour to speak
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RealtimeProvider {
    #[default]
    Azure,
    OpenAi,
}

/// Realtime model connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    #[serde(default)]
    pub provider: RealtimeProvider,

    /// Resource endpoint; required for Azure, defaults to the public API otherwise
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Azure deployment or OpenAI model name
    #[serde(default = "default_deployment")]
    pub deployment: String,

    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Falls back to the provider's key environment variable
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    #[serde(default = "default_voice")]
    pub voice: String,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

fn default_deployment() -> String {
    realtime::DEFAULT_DEPLOYMENT.to_string()
}
fn default_api_version() -> String {
    realtime::DEFAULT_AZURE_API_VERSION.to_string()
}
fn default_voice() -> String {
    realtime::DEFAULT_VOICE.to_string()
}
fn default_connect_timeout_ms() -> u64 {
    realtime::DEFAULT_CONNECT_TIMEOUT_MS
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            provider: RealtimeProvider::default(),
            endpoint: None,
            deployment: default_deployment(),
            api_version: default_api_version(),
            api_key: None,
            voice: default_voice(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

impl RealtimeConfig {
    /// Configured key, or the provider's environment variable
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| {
                let var = match self.provider {
                    RealtimeProvider::Azure => realtime::AZURE_API_KEY_ENV,
                    RealtimeProvider::OpenAi => realtime::OPENAI_API_KEY_ENV,
                };
                std::env::var(var).ok().filter(|k| !k.trim().is_empty())
            })
    }
}

/// Microphone capture and end-pointing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    #[serde(default = "default_capture_rate")]
    pub sample_rate: u32,

    #[serde(default = "default_frame_duration_ms")]
    pub frame_duration_ms: u32,

    /// Trailing silence that ends an utterance
    #[serde(default = "default_silence_timeout_ms")]
    pub silence_timeout_ms: u32,

    /// WebRTC VAD mode, 0 (least) to 3 (most aggressive)
    #[serde(default = "default_vad_aggressiveness")]
    pub vad_aggressiveness: u8,

    /// Hard cap on one utterance; capture is truncated here
    #[serde(default = "default_max_capture_ms")]
    pub max_capture_ms: u32,
}

fn default_capture_rate() -> u32 {
    audio::DEFAULT_SAMPLE_RATE
}
fn default_frame_duration_ms() -> u32 {
    audio::DEFAULT_FRAME_DURATION_MS
}
fn default_silence_timeout_ms() -> u32 {
    audio::DEFAULT_SILENCE_TIMEOUT_MS
}
fn default_vad_aggressiveness() -> u8 {
    audio::DEFAULT_VAD_AGGRESSIVENESS
}
fn default_max_capture_ms() -> u32 {
    audio::DEFAULT_MAX_CAPTURE_MS
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_capture_rate(),
            frame_duration_ms: default_frame_duration_ms(),
            silence_timeout_ms: default_silence_timeout_ms(),
            vad_aggressiveness: default_vad_aggressiveness(),
            max_capture_ms: default_max_capture_ms(),
        }
    }
}

/// Response playback settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_playback_rate")]
    pub sample_rate: u32,

    #[serde(default = "default_lead_padding_ms")]
    pub lead_padding_ms: u32,

    #[serde(default = "default_trail_padding_ms")]
    pub trail_padding_ms: u32,
}

fn default_true() -> bool {
    true
}
fn default_playback_rate() -> u32 {
    playback::DEFAULT_SAMPLE_RATE
}
fn default_lead_padding_ms() -> u32 {
    playback::DEFAULT_LEAD_PADDING_MS
}
fn default_trail_padding_ms() -> u32 {
    playback::DEFAULT_TRAIL_PADDING_MS
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sample_rate: default_playback_rate(),
            lead_padding_ms: default_lead_padding_ms(),
            trail_padding_ms: default_trail_padding_ms(),
        }
    }
}

/// Session behaviour
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AgentConfig {
    /// Exposes `upload_visit_report` or `prepare_for_upload`
    #[serde(default)]
    pub upload_mode: UploadMode,

    /// Optional bound on tool rounds per turn; unbounded when absent
    #[serde(default)]
    pub max_tool_rounds: Option<u32>,
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub log_json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
        }
    }
}

fn env_source() -> Environment {
    Environment::with_prefix("VISIT_AGENT")
        .separator("__")
        .try_parsing(true)
}

/// Load settings from `config/default`, `config/{env}` and the environment
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name("config/default").required(false));

    if let Some(env_name) = env {
        builder =
            builder.add_source(File::with_name(&format!("config/{}", env_name)).required(false));
    }

    builder = builder.add_source(env_source());

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    Ok(settings)
}

/// Load settings from one explicit file, still honouring environment overrides
pub fn load_settings_from(path: impl AsRef<Path>) -> Result<Settings, ConfigError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config = Config::builder()
        .add_source(File::from(path))
        .add_source(env_source())
        .build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.audio.sample_rate, 16_000);
        assert_eq!(settings.playback.sample_rate, 24_000);
        assert_eq!(settings.agent.upload_mode, UploadMode::Upload);
        assert_eq!(settings.agent.max_tool_rounds, None);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_audio_validation() {
        let mut settings = Settings::default();
        settings.audio.frame_duration_ms = 25;
        assert!(settings.validate().is_err());

        settings.audio.frame_duration_ms = 20;
        settings.audio.vad_aggressiveness = 4;
        assert!(settings.validate().is_err());

        settings.audio.vad_aggressiveness = 3;
        settings.audio.sample_rate = 44_100;
        assert!(settings.validate().is_err());

        settings.audio.sample_rate = 48_000;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_max_capture_must_cover_silence_timeout() {
        let mut settings = Settings::default();
        settings.audio.max_capture_ms = 1_000;
        match settings.validate() {
            Err(ConfigError::InvalidValue { field, .. }) => {
                assert_eq!(field, "audio.max_capture_ms")
            },
            other => panic!("expected invalid max_capture_ms, got {:?}", other),
        }
    }

    #[test]
    fn test_strict_environment_requires_azure_endpoint() {
        let mut settings = Settings::default();
        assert!(settings.validate().is_ok());

        settings.environment = RuntimeEnvironment::Production;
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::MissingField(_))
        ));

        settings.realtime.endpoint = Some("https://example.openai.azure.com".into());
        assert!(settings.validate().is_ok());

        settings.realtime.endpoint = Some("ftp://example".into());
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_load_settings_from_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(
            file,
            r#"
[audio]
silence_timeout_ms = 900
vad_aggressiveness = 3

[agent]
upload_mode = "prepare"
max_tool_rounds = 8

[playback]
enabled = false
"#
        )
        .unwrap();

        let settings = load_settings_from(file.path()).unwrap();
        assert_eq!(settings.audio.silence_timeout_ms, 900);
        assert_eq!(settings.audio.vad_aggressiveness, 3);
        assert_eq!(settings.agent.upload_mode, UploadMode::Prepare);
        assert_eq!(settings.agent.max_tool_rounds, Some(8));
        assert!(!settings.playback.enabled);
        // untouched sections keep defaults
        assert_eq!(settings.audio.frame_duration_ms, 30);
    }

    #[test]
    fn test_load_settings_missing_file() {
        let err = load_settings_from("/nonexistent/visit-agent.toml").unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }
}
