use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use rumqttc::{AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Packet, QoS};
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::{error::AppError, utils::config::AppConfig};

use super::{
    messages::encode_job, Delivery, DeliverySource, EnrichmentJob, MessageBroker, Polled,
    SIMPLIFY_TOPIC, TERMS_TOPIC,
};

const EVENT_CHANNEL_CAPACITY: usize = 64;
const SUBSCRIBED_TOPICS: [&str; 2] = [SIMPLIFY_TOPIC, TERMS_TOPIC];

/// MQTT client shared by the ingestion path and the reconciliation handlers.
#[derive(Clone)]
pub struct MqttBroker {
    client: AsyncClient,
    op_timeout: Duration,
    connected: Arc<AtomicBool>,
}

/// Receiving half of the MQTT connection. Must be polled for publishes to make progress.
pub struct MqttDeliveries {
    eventloop: EventLoop,
    client: AsyncClient,
    connected: Arc<AtomicBool>,
}

impl MqttBroker {
    /// Connects, waits for the broker's CONNACK within the configured deadline and
    /// subscribes to both enrichment topics.
    pub async fn connect(config: &AppConfig) -> Result<(Self, MqttDeliveries), AppError> {
        let mut options =
            MqttOptions::new(&config.mqtt_client_id, &config.mqtt_host, config.mqtt_port);
        options.set_keep_alive(Duration::from_secs(config.mqtt_keep_alive_secs.max(1)));

        let (client, mut eventloop) = AsyncClient::new(options, EVENT_CHANNEL_CAPACITY);

        timeout(config.broker_connect_timeout(), wait_for_connack(&mut eventloop))
            .await
            .map_err(|_| {
                AppError::Broker(format!(
                    "no CONNACK from {}:{} within {}s",
                    config.mqtt_host,
                    config.mqtt_port,
                    config.broker_connect_timeout_secs
                ))
            })??;

        info!(
            host = %config.mqtt_host,
            port = config.mqtt_port,
            client_id = %config.mqtt_client_id,
            "Connected to mqtt broker"
        );

        let connected = Arc::new(AtomicBool::new(true));
        let broker = Self {
            client: client.clone(),
            op_timeout: config.broker_timeout(),
            connected: Arc::clone(&connected),
        };

        for topic in SUBSCRIBED_TOPICS {
            timeout(
                broker.op_timeout,
                broker.client.subscribe(topic, QoS::AtLeastOnce),
            )
            .await
            .map_err(|_| AppError::Broker(format!("subscribe to {topic} timed out")))?
            .map_err(|e| AppError::Broker(format!("subscribe to {topic} failed: {e}")))?;
        }

        Ok((
            broker,
            MqttDeliveries {
                eventloop,
                client,
                connected,
            },
        ))
    }

    /// Whether the delivery side last saw the session up.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    async fn publish_retained(&self, topic: &str, payload: Vec<u8>) -> Result<(), AppError> {
        // The client only queues locally; without a session the message would be lost.
        if !self.is_connected() {
            error!(%topic, "Publish Error: MQTT client not connected");
            return Err(AppError::Broker("MQTT client not connected".to_string()));
        }

        timeout(
            self.op_timeout,
            self.client.publish(topic, QoS::AtLeastOnce, true, payload),
        )
        .await
        .map_err(|_| AppError::Broker(format!("publish to {topic} timed out")))?
        .map_err(|e| {
            error!(%topic, error = %e, "Publish Error");
            AppError::Broker(format!("Publish Error: {e}"))
        })
    }
}

async fn wait_for_connack(eventloop: &mut EventLoop) -> Result<(), AppError> {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                if ack.code == ConnectReturnCode::Success {
                    return Ok(());
                }
                return Err(AppError::Broker(format!(
                    "broker refused connection: {:?}",
                    ack.code
                )));
            }
            Ok(_) => {}
            Err(e) => return Err(AppError::Broker(format!("connection failed: {e}"))),
        }
    }
}

#[async_trait]
impl MessageBroker for MqttBroker {
    async fn publish_job(&self, job: &EnrichmentJob) -> Result<(), AppError> {
        let payload = encode_job(job)?;
        let topic = job.kind.topic();
        self.publish_retained(topic, payload).await?;
        info!(%topic, hash = %job.hash, "Published enrichment job");
        Ok(())
    }

    async fn clear_retained(&self, topic: &str) -> Result<(), AppError> {
        // A retained zero-length publish removes the broker's retained message.
        self.publish_retained(topic, Vec::new()).await
    }
}

#[async_trait]
impl DeliverySource for MqttDeliveries {
    async fn next_delivery(&mut self) -> Result<Polled, AppError> {
        match self.eventloop.poll().await {
            Ok(Event::Incoming(Packet::Publish(publish))) => Ok(Polled::Delivery(Delivery {
                topic: publish.topic,
                payload: publish.payload.to_vec(),
            })),
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                if ack.code != ConnectReturnCode::Success {
                    self.connected.store(false, Ordering::Release);
                    return Err(AppError::Broker(format!(
                        "broker refused reconnect: {:?}",
                        ack.code
                    )));
                }
                self.connected.store(true, Ordering::Release);
                // Subscriptions do not survive a clean-session reconnect.
                warn!("Reconnected to mqtt broker; resubscribing");
                for topic in SUBSCRIBED_TOPICS {
                    self.client
                        .try_subscribe(topic, QoS::AtLeastOnce)
                        .map_err(|e| AppError::Broker(format!("resubscribe to {topic}: {e}")))?;
                }
                Ok(Polled::Idle)
            }
            Ok(_) => Ok(Polled::Idle),
            Err(e) => {
                self.connected.store(false, Ordering::Release);
                Err(AppError::Broker(format!("Connection lost: {e}")))
            }
        }
    }
}
