use async_trait::async_trait;
use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication};
use rdkafka::client::DefaultClientContext;
use rdkafka::config::ClientConfig;
use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use std::time::Duration;

use super::errors::QueueError;
use super::QueueTransport;

#[derive(Debug, Clone)]
pub struct RedpandaConfig {
    pub brokers: String,
    /// SASL credential, when the cluster requires one
    pub username: Option<String>,
    pub password: Option<String>,
    pub send_timeout: Duration,
}

/// Queue transport over Redpanda. Each queue is a single-partition topic.
pub struct RedpandaQueue {
    producer: FutureProducer,
    admin: AdminClient<DefaultClientContext>,
    send_timeout: Duration,
}

impl RedpandaQueue {
    pub fn new(config: &RedpandaConfig) -> Result<Self, QueueError> {
        let mut client_config = ClientConfig::new();
        client_config
            .set("bootstrap.servers", &config.brokers)
            .set("message.timeout.ms", config.send_timeout.as_millis().to_string());

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            client_config
                .set("security.protocol", "SASL_SSL")
                .set("sasl.mechanisms", "SCRAM-SHA-256")
                .set("sasl.username", username)
                .set("sasl.password", password);
        }

        let producer: FutureProducer = client_config
            .create()
            .map_err(|e| QueueError::Setup(format!("failed to create producer: {e}")))?;

        let admin: AdminClient<DefaultClientContext> = client_config
            .create()
            .map_err(|e| QueueError::Setup(format!("failed to create admin client: {e}")))?;

        tracing::info!(brokers = %config.brokers, "Redpanda queue transport ready");

        Ok(Self {
            producer,
            admin,
            send_timeout: config.send_timeout,
        })
    }
}

#[async_trait]
impl QueueTransport for RedpandaQueue {
    async fn create_queue_if_not_exists(&self, queue: &str) -> Result<(), QueueError> {
        let topic = NewTopic::new(queue, 1, TopicReplication::Fixed(1));
        let options = AdminOptions::new().operation_timeout(Some(self.send_timeout));

        let results = self
            .admin
            .create_topics(&[topic], &options)
            .await
            .map_err(kafka_error)?;

        for result in results {
            match result {
                Ok(name) => tracing::info!(queue = %name, "Created queue"),
                Err((name, RDKafkaErrorCode::TopicAlreadyExists)) => {
                    tracing::debug!(queue = %name, "Queue already exists");
                }
                Err((name, code)) => {
                    return Err(QueueError::Transport {
                        message: format!("creating queue {name} failed: {code}"),
                        transient: is_transient_code(code),
                    });
                }
            }
        }

        Ok(())
    }

    async fn send(&self, queue: &str, key: &str, body: &str) -> Result<(), QueueError> {
        let record = FutureRecord::to(queue).key(key).payload(body);

        self.producer
            .send(record, Timeout::After(self.send_timeout))
            .await
            .map(|_| ())
            .map_err(|(e, _)| kafka_error(e))
    }
}

fn kafka_error(err: KafkaError) -> QueueError {
    let transient = err.rdkafka_error_code().map(is_transient_code).unwrap_or(false);
    QueueError::Transport {
        message: err.to_string(),
        transient,
    }
}

fn is_transient_code(code: RDKafkaErrorCode) -> bool {
    matches!(
        code,
        RDKafkaErrorCode::MessageTimedOut
            | RDKafkaErrorCode::QueueFull
            | RDKafkaErrorCode::BrokerTransportFailure
            | RDKafkaErrorCode::AllBrokersDown
            | RDKafkaErrorCode::RequestTimedOut
            | RDKafkaErrorCode::NetworkException
            | RDKafkaErrorCode::LeaderNotAvailable
            | RDKafkaErrorCode::NotLeaderForPartition
            | RDKafkaErrorCode::NotEnoughReplicas
            | RDKafkaErrorCode::OperationTimedOut
    )
}
