//! In-process MQTT broker simulation for host builds.
//!
//! Connecting to the global DPS endpoint yields a provisioning service
//! that answers `iotdps-register` with `202 assigning` and the following
//! status poll with `200 assigned` to [`SIM_ASSIGNED_HUB`].  Any other
//! host behaves as an IoT hub that acknowledges every publish.
//!
//! Nothing arrives asynchronously: events are produced by publishes and
//! by the `inject_*` hooks.

use std::collections::VecDeque;

use core::time::Duration;

use log::info;

use crate::app::events::MessageId;
use crate::error::{ProvisioningError, TransportError};
use crate::hub::topics;

use super::{LinkEvent, LinkParams, MQTT_TLS_PORT};

/// Hub the simulated DPS assigns every device to.
pub const SIM_ASSIGNED_HUB: &str = "sim-hub.azure-devices.net";

/// Registration ID the simulated DPS does not know (answers 404).
pub const SIM_UNKNOWN_REGISTRATION: &str = "unregistered-device";

const SIM_OPERATION_ID: &str = "4.0000000000000000.sim";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Dps,
    Hub,
}

pub struct SimLink {
    role: Role,
    client_id: String,
    connected: bool,
    next_id: MessageId,
    subscriptions: Vec<String>,
    events: VecDeque<LinkEvent>,
    published: Vec<(String, Vec<u8>)>,
    acks_withheld: bool,
}

impl SimLink {
    pub fn connect(params: &LinkParams<'_>, _timeout: Duration) -> Result<Self, ProvisioningError> {
        if params.host.is_empty() || params.client_id.is_empty() {
            return Err(ProvisioningError::InvalidParameter);
        }
        let role = if params.host == topics::DPS_GLOBAL_ENDPOINT {
            Role::Dps
        } else {
            Role::Hub
        };
        info!(
            "MQTT(sim): connected to {}:{} as '{}' ({:?})",
            params.host, MQTT_TLS_PORT, params.client_id, role
        );
        Ok(Self {
            role,
            client_id: params.client_id.to_owned(),
            connected: true,
            next_id: 1,
            subscriptions: Vec::new(),
            events: VecDeque::new(),
            published: Vec::new(),
            acks_withheld: false,
        })
    }

    pub fn subscribe(&mut self, filter: &str) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        self.subscriptions.push(filter.to_owned());
        Ok(())
    }

    pub fn enqueue(&mut self, topic: &str, payload: &[u8]) -> Result<MessageId, TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1).max(1);
        self.published.push((topic.to_owned(), payload.to_vec()));
        if !self.acks_withheld {
            self.events.push_back(LinkEvent::Published(id));
        }
        if self.role == Role::Dps {
            self.answer_dps(topic);
        }
        Ok(id)
    }

    pub fn try_next(&mut self) -> Option<LinkEvent> {
        self.events.pop_front()
    }

    pub fn next_timeout(&mut self, _timeout: Duration) -> Option<LinkEvent> {
        self.events.pop_front()
    }

    // ── Test hooks ────────────────────────────────────────────

    /// Deliver a broker message, honouring subscriptions.
    pub fn inject_message(&mut self, topic: &str, payload: &[u8]) {
        if self.is_subscribed(topic) {
            self.events.push_back(LinkEvent::Received {
                topic: topic.to_owned(),
                payload: payload.to_vec(),
            });
        }
    }

    /// Stop acknowledging publishes, as a broker that never sends PUBACK.
    pub fn withhold_acks(&mut self) {
        self.acks_withheld = true;
    }

    pub fn inject_disconnect(&mut self) {
        self.connected = false;
        self.events.push_back(LinkEvent::Disconnected);
    }

    /// Every message published on this link, in order.
    pub fn published(&self) -> &[(String, Vec<u8>)] {
        &self.published
    }

    fn is_subscribed(&self, topic: &str) -> bool {
        self.subscriptions.iter().any(|filter| match filter.strip_suffix('#') {
            Some(prefix) => topic.starts_with(prefix),
            None => filter == topic,
        })
    }

    fn answer_dps(&mut self, request_topic: &str) {
        let Some(rid) = request_topic
            .split_once("$rid=")
            .map(|(_, rest)| rest.split('&').next().unwrap_or(rest))
        else {
            return;
        };

        let (topic, body) = if self.client_id == SIM_UNKNOWN_REGISTRATION {
            (
                format!("$dps/registrations/res/404/?$rid={}", rid),
                String::from(r#"{"errorCode":404201,"message":"Device not found"}"#),
            )
        } else if request_topic.contains("iotdps-register") {
            (
                format!("$dps/registrations/res/202/?$rid={}&retry-after=0", rid),
                format!(r#"{{"operationId":"{}","status":"assigning"}}"#, SIM_OPERATION_ID),
            )
        } else {
            (
                format!("$dps/registrations/res/200/?$rid={}", rid),
                format!(
                    r#"{{"operationId":"{}","status":"assigned","registrationState":{{"assignedHub":"{}","deviceId":"{}","status":"assigned"}}}}"#,
                    SIM_OPERATION_ID, SIM_ASSIGNED_HUB, self.client_id
                ),
            )
        };
        self.inject_message(&topic, body.as_bytes());
    }
}
