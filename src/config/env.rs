use std::env;
use std::fmt::Display;
use std::str::FromStr;

#[derive(Debug, Clone, Copy)]
pub enum EnvKey {
    ServerPort,
    S3Endpoint,
    S3Region,
    S3ForcePathStyle,
    AwsAccessKey,
    AwsSecretKey,
    AmqpUrl,
    EventQueue,
    NotifyQueue,
    NotifySubject,
    RedisUrl,
    JobGuard,
    JobGuardTtlSecs,
    FfmpegPath,
    VideoCodec,
    VideoBitrate,
    AudioMode,
    ContainerFormat,
    SignedUrlExpirySecs,
    DestKeyPrefix,
    DestKeySuffix,
    AcceptedExtensions,
    ScratchDir,
}

impl EnvKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvKey::ServerPort => "APP_PORT",
            EnvKey::S3Endpoint => "S3_ENDPOINT",
            EnvKey::S3Region => "S3_REGION",
            EnvKey::S3ForcePathStyle => "S3_FORCE_PATH_STYLE",
            EnvKey::AwsAccessKey => "AWS_ACCESS_KEY_ID",
            EnvKey::AwsSecretKey => "AWS_SECRET_ACCESS_KEY",
            EnvKey::AmqpUrl => "AMQP_URL",
            EnvKey::EventQueue => "EVENT_QUEUE",
            EnvKey::NotifyQueue => "NOTIFY_QUEUE",
            EnvKey::NotifySubject => "NOTIFY_SUBJECT",
            EnvKey::RedisUrl => "REDIS_URL",
            EnvKey::JobGuard => "JOB_GUARD",
            EnvKey::JobGuardTtlSecs => "JOB_GUARD_TTL_SECS",
            EnvKey::FfmpegPath => "FFMPEG_PATH",
            EnvKey::VideoCodec => "VIDEO_CODEC",
            EnvKey::VideoBitrate => "VIDEO_BITRATE",
            EnvKey::AudioMode => "AUDIO_MODE",
            EnvKey::ContainerFormat => "CONTAINER_FORMAT",
            EnvKey::SignedUrlExpirySecs => "SIGNED_URL_EXPIRY_SECS",
            EnvKey::DestKeyPrefix => "DEST_KEY_PREFIX",
            EnvKey::DestKeySuffix => "DEST_KEY_SUFFIX",
            EnvKey::AcceptedExtensions => "ACCEPTED_EXTENSIONS",
            EnvKey::ScratchDir => "SCRATCH_DIR",
        }
    }
}

/// A variable that is missing or holds a value the service cannot use.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} must be set")]
    Missing { key: &'static str },

    #[error("{key}={value:?} is invalid: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

pub fn get(key: EnvKey) -> Result<String, ConfigError> {
    get_opt(key).ok_or(ConfigError::Missing { key: key.as_str() })
}

/// Unset and blank variables both fall back to `default`.
pub fn get_or(key: EnvKey, default: &str) -> String {
    get_opt(key).unwrap_or_else(|| default.to_string())
}

/// Unset and blank variables are both treated as absent.
pub fn get_opt(key: EnvKey) -> Option<String> {
    non_blank(env::var(key.as_str()).ok())
}

/// Falls back to `default` only when the variable is absent; a present value must parse.
pub fn get_parsed<T>(key: EnvKey, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    let raw = get_opt(key);
    parse_or(&key, raw, default)
}

fn non_blank(raw: Option<String>) -> Option<String> {
    raw.map(|val| val.trim().to_string())
        .filter(|val| !val.is_empty())
}

fn parse_or<T>(key: &EnvKey, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value.parse::<T>().map_err(|e| ConfigError::Invalid {
            key: key.as_str(),
            reason: e.to_string(),
            value,
        }),
    }
}
