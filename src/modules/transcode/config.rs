use std::collections::BTreeSet;
use std::convert::Infallible;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_ACCEPTED_EXTENSIONS: &str = "mp4,mov,avi,qt";
pub const DEFAULT_SIGNED_URL_EXPIRY_SECS: u64 = 600;

/// How the audio track is handled while the video is re-encoded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AudioMode {
    Passthrough,
    Reencode(String),
}

impl AudioMode {
    /// Value handed to the engine's audio codec flag.
    pub fn codec_arg(&self) -> &str {
        match self {
            AudioMode::Passthrough => "copy",
            AudioMode::Reencode(codec) => codec,
        }
    }
}

impl FromStr for AudioMode {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "copy" | "passthrough" => Ok(AudioMode::Passthrough),
            other => Ok(AudioMode::Reencode(other.to_string())),
        }
    }
}

impl fmt::Display for AudioMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.codec_arg())
    }
}

/// Engine settings, fixed per deployment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TranscodeConfig {
    pub video_codec: String,
    pub video_bitrate: String,
    pub audio: AudioMode,
    pub container: String,
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            video_bitrate: "320k".to_string(),
            audio: AudioMode::Passthrough,
            container: "mp4".to_string(),
        }
    }
}

/// Destination key = prefix + source key + suffix.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DestinationTemplate {
    pub prefix: String,
    pub suffix: String,
}

impl DestinationTemplate {
    pub fn render(&self, source_key: &str) -> String {
        format!("{}{}{}", self.prefix, source_key, self.suffix)
    }
}

impl Default for DestinationTemplate {
    fn default() -> Self {
        Self {
            prefix: "transcoded-".to_string(),
            suffix: ".mp4".to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub engine_path: PathBuf,
    pub transcode: TranscodeConfig,
    pub signed_url_expiry: Duration,
    pub destination: DestinationTemplate,
    pub accepted_extensions: BTreeSet<String>,
    pub scratch_root: PathBuf,
    pub notify_subject: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            engine_path: PathBuf::from("./bin/ffmpeg"),
            transcode: TranscodeConfig::default(),
            signed_url_expiry: Duration::from_secs(DEFAULT_SIGNED_URL_EXPIRY_SECS),
            destination: DestinationTemplate::default(),
            accepted_extensions: parse_extensions(DEFAULT_ACCEPTED_EXTENSIONS),
            scratch_root: std::env::temp_dir(),
            notify_subject: "Transcoded video available".to_string(),
        }
    }
}

/// Parses a comma separated extension list into a lowercase set, tolerating leading dots.
pub fn parse_extensions(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
        .collect()
}
