use crate::domain::AnalysisTask;
use crate::ports::queue::{PublishError, TaskPublisherPort};
use async_trait::async_trait;
use lapin::options::{BasicPublishOptions, ConfirmSelectOptions, QueueDeclareOptions};
use lapin::types::{FieldTable, ShortString};
use lapin::{BasicProperties, Connection, ConnectionProperties};
use std::future::Future;
use std::time::Duration;

const CONTENT_TYPE_JSON: &str = "application/json";
/// AMQP delivery mode for messages that survive a broker restart.
const PERSISTENT: u8 = 2;
const REPLY_SUCCESS: u16 = 200;

/// Publishes tasks to RabbitMQ (or any AMQP 0-9-1 broker) over one shared connection.
///
/// Every publish runs on its own channel: a channel error closes only that
/// channel, so a failed publish cannot disturb concurrent ones.
pub struct AmqpPublisher {
    connection: Connection,
    publish_timeout: Duration,
}

impl AmqpPublisher {
    pub async fn connect(uri: &str, publish_timeout: Duration) -> Result<Self, PublishError> {
        let connection = Connection::connect(uri, ConnectionProperties::default())
            .await
            .map_err(broker)?;
        tracing::info!("Connected to AMQP broker");
        Ok(Self::new(connection, publish_timeout))
    }

    pub fn new(connection: Connection, publish_timeout: Duration) -> Self {
        Self {
            connection,
            publish_timeout,
        }
    }

    pub async fn close(&self) -> Result<(), PublishError> {
        self.connection
            .close(REPLY_SUCCESS, "shutting down")
            .await
            .map_err(broker)
    }

    async fn publish_once(&self, queue: &str, payload: &[u8]) -> Result<(), PublishError> {
        let channel = self.connection.create_channel().await.map_err(broker)?;
        channel
            .confirm_select(ConfirmSelectOptions::default())
            .await
            .map_err(broker)?;
        channel
            .queue_declare(queue, durable_queue(), FieldTable::default())
            .await
            .map_err(broker)?;

        let confirmation = channel
            .basic_publish(
                "",
                queue,
                BasicPublishOptions::default(),
                payload,
                task_properties(),
            )
            .await
            .map_err(broker)?
            .await
            .map_err(broker)?;

        if let Err(e) = channel.close(REPLY_SUCCESS, "published").await {
            tracing::debug!(error = %e, "Channel close failed after publish");
        }

        if confirmation.is_nack() {
            return Err(PublishError::Rejected(queue.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl TaskPublisherPort for AmqpPublisher {
    async fn publish(&self, queue: &str, task: &AnalysisTask) -> Result<(), PublishError> {
        let payload = task.to_json()?;
        within(self.publish_timeout, self.publish_once(queue, &payload)).await?;

        tracing::info!(queue = %queue, video_path = %task.video_path, "Task published");
        Ok(())
    }
}

/// Bound a broker round trip; an expired window becomes `PublishError::Timeout`.
async fn within<F>(limit: Duration, attempt: F) -> Result<(), PublishError>
where
    F: Future<Output = Result<(), PublishError>>,
{
    match tokio::time::timeout(limit, attempt).await {
        Ok(result) => result,
        Err(_) => Err(PublishError::Timeout(limit)),
    }
}

/// Durable and otherwise default: redeclaring an existing queue is a no-op.
fn durable_queue() -> QueueDeclareOptions {
    QueueDeclareOptions {
        durable: true,
        ..QueueDeclareOptions::default()
    }
}

fn task_properties() -> BasicProperties {
    BasicProperties::default()
        .with_content_type(ShortString::from(CONTENT_TYPE_JSON))
        .with_delivery_mode(PERSISTENT)
}

fn broker(err: lapin::Error) -> PublishError {
    PublishError::Broker(Box::new(err))
}
