// region:    --- Imports
use crate::auction::events::AuctionEvent;
use async_trait::async_trait;
use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication};
use rdkafka::client::DefaultClientContext;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::ClientConfig;
use std::sync::Arc;
use tracing::{error, info};

// endregion: --- Imports

/// Topic carrying all auction notifications. Events are keyed by auction
/// id, so one auction's events land on one partition in commit order.
pub const EVENTS_TOPIC: &str = "auction-events";

// region:    --- Broadcaster

/// Delivery seam for real-time notifications. Publish failures never undo
/// a committed state change; callers log and move on.
#[async_trait]
pub trait Broadcaster: Send + Sync {
    async fn publish(&self, event: &AuctionEvent) -> Result<(), String>;
}

/// Kafka-backed broadcaster used in production.
pub struct KafkaBroadcaster {
    producer: Arc<KafkaProducer>,
}

impl KafkaBroadcaster {
    pub fn new(producer: Arc<KafkaProducer>) -> Self {
        Self { producer }
    }
}

#[async_trait]
impl Broadcaster for KafkaBroadcaster {
    async fn publish(&self, event: &AuctionEvent) -> Result<(), String> {
        let payload = serde_json::to_string(event).map_err(|e| e.to_string())?;
        self.producer
            .send_message(EVENTS_TOPIC, &event.auction_id().to_string(), &payload)
            .await
    }
}

// endregion: --- Broadcaster

// region:    --- Kafka Producer
#[derive(Clone)]
pub struct KafkaProducer {
    producer: Arc<FutureProducer>,
}

impl KafkaProducer {
    pub fn new(brokers: &str) -> Result<Self, String> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", "5000")
            .create()
            .map_err(|e| format!("Producer creation error: {:?}", e))?;

        Ok(KafkaProducer {
            producer: Arc::new(producer),
        })
    }

    pub async fn send_message(&self, topic: &str, key: &str, value: &str) -> Result<(), String> {
        info!(
            "{:<12} --> sending message: topic={}, key={}",
            "Producer", topic, key
        );
        let record = FutureRecord::to(topic).key(key).payload(value);

        self.producer
            .send(record, std::time::Duration::from_secs(0))
            .await
            .map_err(|(e, _)| format!("Error sending message: {:?}", e))?;

        Ok(())
    }
}

// endregion: --- Kafka Producer

// region:    --- Kafka Manager
pub struct KafkaManager {
    producer: Arc<KafkaProducer>,
    brokers: String,
}

impl KafkaManager {
    pub fn new(brokers: &str) -> Result<Self, String> {
        let producer = Arc::new(KafkaProducer::new(brokers)?);
        Ok(KafkaManager {
            producer,
            brokers: brokers.to_string(),
        })
    }

    pub fn get_producer(&self) -> Arc<KafkaProducer> {
        Arc::clone(&self.producer)
    }

    /// Create the notification topic if the broker does not auto-create it.
    pub async fn create_topic(
        &self,
        topic_name: &str,
        num_partitions: i32,
        replication_factor: i32,
    ) -> Result<(), String> {
        info!("{:<12} --> creating topic: {}", "Manager", topic_name);

        let admin_client: AdminClient<DefaultClientContext> = ClientConfig::new()
            .set("bootstrap.servers", &self.brokers)
            .create()
            .map_err(|e| format!("AdminClient creation failed: {:?}", e))?;

        let new_topic = NewTopic::new(
            topic_name,
            num_partitions,
            TopicReplication::Fixed(replication_factor),
        );

        match admin_client
            .create_topics(&[new_topic], &AdminOptions::new())
            .await
        {
            Ok(_) => {
                info!("{:<12} --> topic created: {}", "Manager", topic_name);
                Ok(())
            }
            Err(e) => {
                error!("{:<12} --> topic creation failed: {:?}", "Manager", e);
                Err(format!("Topic creation failed: {:?}", e))
            }
        }
    }
}

// endregion: --- Kafka Manager
