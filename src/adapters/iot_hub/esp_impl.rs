//! ESP-IDF MQTT link (esp-mqtt over mbedTLS).
//!
//! The esp-mqtt task delivers events on its own thread; the callback only
//! converts them to [`LinkEvent`]s and pushes them onto a channel that the
//! control loop drains.

use core::time::Duration;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Instant;

use esp_idf_svc::mqtt::client::{
    Details, EspMqttClient, EventPayload, MqttClientConfiguration, MqttProtocolVersion, QoS,
};
use esp_idf_svc::tls::X509;
use log::{info, warn};

use crate::app::events::MessageId;
use crate::error::{ProvisioningError, TransportError};

use super::{LinkEvent, LinkParams, MQTT_TLS_PORT};

const KEEP_ALIVE: Duration = Duration::from_secs(240);

pub struct EspLink {
    client: EspMqttClient<'static>,
    events: Receiver<LinkEvent>,
}

impl EspLink {
    /// Open a session and block until the broker accepts it or `timeout`
    /// elapses.
    pub fn connect(params: &LinkParams<'_>, timeout: Duration) -> Result<Self, ProvisioningError> {
        let url = format!("mqtts://{}:{}", params.host, MQTT_TLS_PORT);
        let conf = MqttClientConfiguration {
            client_id: Some(params.client_id),
            username: Some(params.username),
            protocol_version: Some(MqttProtocolVersion::V3_1_1),
            keep_alive_interval: Some(KEEP_ALIVE),
            client_certificate: Some(X509::pem_until_nul(&params.credentials.cert_pem)),
            private_key: Some(X509::pem_until_nul(&params.credentials.key_pem)),
            crt_bundle_attach: Some(esp_idf_svc::sys::esp_crt_bundle_attach),
            ..Default::default()
        };

        let (tx, events) = mpsc::channel();
        let client = EspMqttClient::new_cb(&url, &conf, move |event| {
            let converted = match event.payload() {
                EventPayload::Connected(_) => LinkEvent::Connected,
                EventPayload::Disconnected => LinkEvent::Disconnected,
                EventPayload::Published(id) => LinkEvent::Published(id),
                EventPayload::Received {
                    topic: Some(topic),
                    data,
                    details: Details::Complete,
                    ..
                } => LinkEvent::Received {
                    topic: topic.to_owned(),
                    payload: data.to_vec(),
                },
                EventPayload::Error(e) => LinkEvent::Error(e.code()),
                _ => return,
            };
            let _ = tx.send(converted);
        })
        .map_err(|e| {
            warn!("MQTT: client init failed for {}: {}", url, e);
            ProvisioningError::Generic
        })?;

        let mut link = Self { client, events };
        link.wait_connected(timeout)?;
        info!("MQTT: session open to {}", url);
        Ok(link)
    }

    fn wait_connected(&mut self, timeout: Duration) -> Result<(), ProvisioningError> {
        let deadline = crate::hub::dps::deadline_after(timeout);
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.events.recv_timeout(remaining) {
                Ok(LinkEvent::Connected) => return Ok(()),
                Ok(LinkEvent::Error(code)) => warn!("MQTT: connect error {}", code),
                Ok(_) => {}
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => {
                    warn!("MQTT: broker did not accept the session within {:?}", timeout);
                    return Err(ProvisioningError::NetworkNotReady);
                }
            }
        }
    }

    pub fn subscribe(&mut self, filter: &str) -> Result<(), TransportError> {
        self.client
            .subscribe(filter, QoS::AtMostOnce)
            .map(|_| ())
            .map_err(|e| TransportError::SubscribeFailed(e.code()))
    }

    pub fn enqueue(&mut self, topic: &str, payload: &[u8]) -> Result<MessageId, TransportError> {
        self.client
            .enqueue(topic, QoS::AtLeastOnce, false, payload)
            .map_err(|e| TransportError::PublishFailed(e.code()))
    }

    pub fn try_next(&mut self) -> Option<LinkEvent> {
        self.events.try_recv().ok()
    }

    pub fn next_timeout(&mut self, timeout: Duration) -> Option<LinkEvent> {
        self.events.recv_timeout(timeout).ok()
    }
}
