use std::sync::Arc;

use anyhow::Context;
use dotenvy::dotenv;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod app;
mod common;
mod config;
mod infrastructure;
mod modules;
mod routes;
mod state;
mod workers;

use config::settings::{AppConfig, GuardBackend};
use infrastructure::queue::rabbitmq::RabbitMqService;
use infrastructure::redis::client::RedisService;
use infrastructure::storage::s3::StorageService;
use modules::transcode::ffmpeg::FfmpegInvoker;
use modules::transcode::guard::{InMemoryJobGuard, RedisJobGuard};
use modules::transcode::notifier::AmqpNotifier;
use modules::transcode::pipeline::TranscodePipeline;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting transcoder...");

    let config = AppConfig::new().context("Invalid configuration")?;

    let storage = StorageService::new(
        config.s3_endpoint.as_deref(),
        &config.s3_region,
        &config.s3_access_key,
        &config.s3_secret_key,
        config.s3_force_path_style,
    );

    let engine = FfmpegInvoker::new(config.pipeline.engine_path.clone());
    if !engine.binary().exists() {
        warn!(
            "Transcoder binary not found at {}, jobs will fail until it is installed",
            engine.binary().display()
        );
    }

    let mut pipeline =
        TranscodePipeline::new(config.pipeline_config(), Arc::new(storage), Arc::new(engine));

    let queue = match &config.amqp_url {
        Some(url) => Some(RabbitMqService::new(url).await?),
        None => None,
    };

    match (&queue, &config.notify_queue) {
        (Some(queue), Some(notify_queue)) => {
            info!("Notifications go to queue '{}'", notify_queue);
            pipeline =
                pipeline.with_notifier(Arc::new(AmqpNotifier::new(queue.clone(), notify_queue)));
        }
        (None, Some(_)) => warn!("NOTIFY_QUEUE is set without AMQP_URL, notifications disabled"),
        _ => info!("Notifications disabled"),
    }

    match config.job_guard {
        GuardBackend::None => {}
        GuardBackend::Memory => {
            info!("Duplicate triggers guarded in memory");
            pipeline = pipeline.with_guard(Arc::new(InMemoryJobGuard::new(config.job_guard_ttl)));
        }
        GuardBackend::Redis => {
            let url = config
                .redis_url
                .as_deref()
                .context("JOB_GUARD=redis requires REDIS_URL")?;
            let redis = RedisService::new(url).await?;
            info!("Duplicate triggers guarded in Redis");
            pipeline = pipeline.with_guard(Arc::new(RedisJobGuard::new(redis, config.job_guard_ttl)));
        }
    }

    let pipeline = Arc::new(pipeline);

    if let Some(queue) = queue {
        let queue_name = config.event_queue.clone();
        let worker_pipeline = pipeline.clone();
        tokio::spawn(async move {
            if let Err(e) =
                workers::transcoder::start_transcoder_worker(queue, queue_name, worker_pipeline).await
            {
                error!("❌ Transcoder Worker stopped: {:#}", e);
            }
        });
    }

    let app = app::create_app(AppState::new(pipeline));

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.server_port)).await?;
    info!("Server running on http://0.0.0.0:{}", config.server_port);

    axum::serve(listener, app).await?;
    Ok(())
}
