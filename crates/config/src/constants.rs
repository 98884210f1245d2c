//! Default values shared by settings and their validation

/// Realtime model endpoint defaults
pub mod realtime {
    pub const DEFAULT_AZURE_API_VERSION: &str = "2025-04-01-preview";
    pub const DEFAULT_DEPLOYMENT: &str = "gpt-4o-mini-realtime-preview";
    pub const DEFAULT_OPENAI_ENDPOINT: &str = "wss://api.openai.com/v1/realtime";
    pub const DEFAULT_VOICE: &str = "alloy";
    pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;

    /// Key environment variables consulted when no key is configured
    pub const AZURE_API_KEY_ENV: &str = "AZURE_OPENAI_API_KEY";
    pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";
}

/// Microphone capture defaults
pub mod audio {
    pub const DEFAULT_SAMPLE_RATE: u32 = 16_000;
    pub const DEFAULT_FRAME_DURATION_MS: u32 = 30;
    pub const DEFAULT_SILENCE_TIMEOUT_MS: u32 = 1_500;
    pub const DEFAULT_VAD_AGGRESSIVENESS: u8 = 2;
    pub const DEFAULT_MAX_CAPTURE_MS: u32 = 60_000;

    /// Rates the WebRTC classifier accepts
    pub const SUPPORTED_SAMPLE_RATES: [u32; 4] = [8_000, 16_000, 32_000, 48_000];
    /// Frame lengths the WebRTC classifier accepts
    pub const SUPPORTED_FRAME_DURATIONS_MS: [u32; 3] = [10, 20, 30];
    pub const MAX_VAD_AGGRESSIVENESS: u8 = 3;
}

/// Response playback defaults
pub mod playback {
    pub const DEFAULT_SAMPLE_RATE: u32 = 24_000;
    pub const DEFAULT_LEAD_PADDING_MS: u32 = 100;
    pub const DEFAULT_TRAIL_PADDING_MS: u32 = 200;
    /// Longest pad accepted on either side
    pub const MAX_PADDING_MS: u32 = 5_000;
}
