use std::path::PathBuf;
use std::time::Duration;

use crate::config::env::{self, ConfigError, EnvKey};
use crate::modules::transcode::config::{
    parse_extensions, AudioMode, DestinationTemplate, PipelineConfig, TranscodeConfig,
    DEFAULT_ACCEPTED_EXTENSIONS, DEFAULT_SIGNED_URL_EXPIRY_SECS,
};

/// Which duplicate-trigger guard to run with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GuardBackend {
    None,
    Memory,
    Redis,
}

impl std::str::FromStr for GuardBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "" | "none" | "off" => Ok(GuardBackend::None),
            "memory" => Ok(GuardBackend::Memory),
            "redis" => Ok(GuardBackend::Redis),
            other => Err(format!("unknown job guard backend: {}", other)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server_port: u16,
    pub s3_endpoint: Option<String>,
    pub s3_region: String,
    pub s3_force_path_style: bool,
    pub s3_access_key: String,
    pub s3_secret_key: String,
    pub amqp_url: Option<String>,
    pub event_queue: String,
    pub notify_queue: Option<String>,
    pub redis_url: Option<String>,
    pub job_guard: GuardBackend,
    pub job_guard_ttl: Duration,
    pub pipeline: PipelineConfig,
}

impl AppConfig {
    pub fn new() -> Result<Self, ConfigError> {
        let s3_endpoint = env::get_opt(EnvKey::S3Endpoint);
        let force_path_style = env::get_parsed(EnvKey::S3ForcePathStyle, s3_endpoint.is_some())?;

        let defaults = PipelineConfig::default();
        let pipeline = PipelineConfig {
            engine_path: PathBuf::from(env::get_or(EnvKey::FfmpegPath, "./bin/ffmpeg")),
            transcode: TranscodeConfig {
                video_codec: env::get_or(EnvKey::VideoCodec, "libx264"),
                video_bitrate: env::get_or(EnvKey::VideoBitrate, "320k"),
                audio: env::get_parsed(EnvKey::AudioMode, AudioMode::Passthrough)?,
                container: env::get_or(EnvKey::ContainerFormat, "mp4"),
            },
            signed_url_expiry: Duration::from_secs(env::get_parsed(
                EnvKey::SignedUrlExpirySecs,
                DEFAULT_SIGNED_URL_EXPIRY_SECS,
            )?),
            destination: DestinationTemplate {
                prefix: env::get_or(EnvKey::DestKeyPrefix, "transcoded-"),
                suffix: env::get_or(EnvKey::DestKeySuffix, ".mp4"),
            },
            accepted_extensions: parse_extensions(&env::get_or(
                EnvKey::AcceptedExtensions,
                DEFAULT_ACCEPTED_EXTENSIONS,
            )),
            scratch_root: env::get_opt(EnvKey::ScratchDir)
                .map(PathBuf::from)
                .unwrap_or(defaults.scratch_root),
            notify_subject: env::get_or(EnvKey::NotifySubject, &defaults.notify_subject),
        };

        Ok(Self {
            server_port: env::get_parsed(EnvKey::ServerPort, 3000)?,
            s3_endpoint,
            s3_region: env::get_or(EnvKey::S3Region, "us-east-1"),
            s3_force_path_style: force_path_style,
            s3_access_key: env::get(EnvKey::AwsAccessKey)?,
            s3_secret_key: env::get(EnvKey::AwsSecretKey)?,
            amqp_url: env::get_opt(EnvKey::AmqpUrl),
            event_queue: env::get_or(EnvKey::EventQueue, "s3_events"),
            notify_queue: env::get_opt(EnvKey::NotifyQueue),
            redis_url: env::get_opt(EnvKey::RedisUrl),
            job_guard: env::get_parsed(EnvKey::JobGuard, GuardBackend::None)?,
            job_guard_ttl: Duration::from_secs(env::get_parsed(EnvKey::JobGuardTtlSecs, 86_400)?),
            pipeline,
        })
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        self.pipeline.clone()
    }
}
