use std::sync::Arc;

use anyhow::Result;
use futures_util::StreamExt;
use lapin::options::BasicAckOptions;
use tracing::{debug, error, info, warn};

use crate::infrastructure::queue::rabbitmq::RabbitMqService;
use crate::modules::transcode::events::TriggerEvent;
use crate::modules::transcode::outcome::PipelineOutcome;
use crate::modules::transcode::pipeline::TranscodePipeline;

/// Consumes bucket notifications from `queue_name` and runs them one at a time.
pub async fn start_transcoder_worker(
    queue: RabbitMqService,
    queue_name: String,
    pipeline: Arc<TranscodePipeline>,
) -> Result<()> {
    info!("🎥 Starting Transcoder Worker...");

    let mut consumer = queue.consume(&queue_name, "transcoder_worker").await?;

    info!("🎥 Transcoder Worker listening on '{}'", queue_name);

    while let Some(delivery) = consumer.next().await {
        let delivery = match delivery {
            Ok(delivery) => delivery,
            Err(e) => {
                error!("❌ Consumer error: {}", e);
                continue;
            }
        };

        info!("📦 Received bucket notification");
        handle_payload(&pipeline, &delivery.data).await;

        // Redelivery is the only retry mechanism, and a job that failed once will most
        // likely fail again; every delivery is acked after one attempt.
        if let Err(e) = delivery.ack(BasicAckOptions::default()).await {
            error!("Failed to ack message: {}", e);
        }
    }

    warn!("Transcoder Worker consumer stream ended");
    Ok(())
}

pub(crate) async fn handle_payload(pipeline: &TranscodePipeline, payload: &[u8]) -> Option<PipelineOutcome> {
    let event = match serde_json::from_slice::<TriggerEvent>(payload) {
        Ok(event) => event,
        Err(e) => {
            error!("❌ Failed to parse bucket notification: {}", e);
            return None;
        }
    };

    let outcome = pipeline.run(&event).await;
    match &outcome {
        PipelineOutcome::Failed(failure) => {
            error!("❌ Job failed ({:?}): {}", failure.kind, failure.detail)
        }
        PipelineOutcome::CompletedWithCleanupWarning { warning, .. } => {
            warn!("✅ Job completed with warning: {}", warning)
        }
        PipelineOutcome::Skipped { source_key, reason } => {
            info!("Job skipped for {}: {:?}", source_key, reason)
        }
        PipelineOutcome::Completed { destination_key, .. } => {
            info!("✅ Job completed successfully: {}", destination_key)
        }
    }
    if let Some(url) = outcome.url() {
        debug!("Signed URL: {}", url);
    }

    Some(outcome)
}
