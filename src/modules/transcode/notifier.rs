use async_trait::async_trait;
use tracing::{debug, info};

use super::error::NotifyError;
use super::ports::{Notification, Notifier};
use crate::infrastructure::queue::rabbitmq::RabbitMqService;

/// Default notifier: accepts every message and sends nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn publish(&self, notification: &Notification) -> Result<(), NotifyError> {
        debug!("Notifications disabled, dropping message for {}", notification.key);
        Ok(())
    }
}

/// Publishes notifications as JSON onto a durable RabbitMQ queue.
#[derive(Clone)]
pub struct AmqpNotifier {
    queue: RabbitMqService,
    queue_name: String,
}

impl AmqpNotifier {
    pub fn new(queue: RabbitMqService, queue_name: impl Into<String>) -> Self {
        Self {
            queue,
            queue_name: queue_name.into(),
        }
    }
}

#[async_trait]
impl Notifier for AmqpNotifier {
    async fn publish(&self, notification: &Notification) -> Result<(), NotifyError> {
        let payload = serde_json::to_vec(notification)?;

        self.queue
            .publish(&self.queue_name, &payload)
            .await
            .map_err(|e| NotifyError::Publish(format!("{:#}", e)))?;

        info!("📣 Notification published to '{}'", self.queue_name);
        Ok(())
    }
}
