//! IoT hub adapter: MQTT over TLS with an X.509 device identity.
//!
//! Implements [`Provisioner`] and [`HubClient`] on top of a platform
//! MQTT link:
//!
//! - **`target_os = "espidf"`**: `EspMqttClient` (mbedTLS, certificate
//!   bundle for the server chain, device certificate from the
//!   [`CertStore`]).
//! - **all other targets**: an in-process broker simulation that answers
//!   DPS registrations and acknowledges every publish.
//!
//! ## Provisioning flow
//!
//! 1. Load the device identity from the certificate store.
//! 2. `Dps` targets: connect to the global DPS endpoint, subscribe to the
//!    registration responses, and run [`dps::register`] until a hub is
//!    assigned.  The DPS connection is closed afterwards.
//! 3. Connect to the assigned (or configured) hub.
//!
//! Everything happens inside one overall timeout.  The link delivers
//! events through a queue that is drained only by
//! [`HubClient::do_work`], so callbacks always run on the control-loop
//! thread.

use core::time::Duration;
use std::time::Instant;

use log::{debug, info, warn};

use crate::app::events::{ConfirmationResult, ConnectionStatus, MessageId, StatusReason};
use crate::app::ports::{HubCallbacks, HubClient, Provisioner};
use crate::config::ProvisioningTarget;
use crate::error::{ProvisioningError, TransportError};
use crate::hub::dps::{self, DpsLink, DpsRegistration, HubAssignment, deadline_after};
use crate::hub::topics::{self, Topic};

use super::cert_store::{CertStore, DeviceCredentials};

#[cfg(target_os = "espidf")]
mod esp_impl;
#[cfg(target_os = "espidf")]
use esp_impl::EspLink as Link;

#[cfg(not(target_os = "espidf"))]
pub mod sim;
#[cfg(not(target_os = "espidf"))]
use sim::SimLink as Link;

/// TLS MQTT port used by both the hub and DPS.
pub const MQTT_TLS_PORT: u16 = 8883;

/// A telemetry message not acknowledged within this window is reported
/// as [`ConfirmationResult::MessageTimeout`] and forgotten.
pub const MESSAGE_TIMEOUT: Duration = Duration::from_secs(60);

// ───────────────────────────────────────────────────────────────
// Link abstraction
// ───────────────────────────────────────────────────────────────

/// A transport event, queued by the platform link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    Connected,
    Disconnected,
    /// Broker acknowledged the message with this id.
    Published(MessageId),
    Received { topic: String, payload: Vec<u8> },
    /// Transport-level error code (esp-tls / socket errno).
    Error(i32),
}

/// Connection parameters for one MQTT session.
pub struct LinkParams<'a> {
    pub host: &'a str,
    pub client_id: &'a str,
    pub username: &'a str,
    pub credentials: &'static DeviceCredentials,
}

impl DpsLink for Link {
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), TransportError> {
        self.enqueue(topic, payload).map(|_| ())
    }

    fn recv(&mut self, timeout: Duration) -> Option<(String, Vec<u8>)> {
        let deadline = deadline_after(timeout);
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.next_timeout(remaining)? {
                LinkEvent::Received { topic, payload } => return Some((topic, payload)),
                LinkEvent::Disconnected => {
                    warn!("DPS: connection lost while waiting for a response");
                    return None;
                }
                other => debug!("DPS: {:?}", other),
            }
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Provisioner
// ───────────────────────────────────────────────────────────────

pub struct MqttProvisioner {
    certs: CertStore,
}

impl MqttProvisioner {
    pub fn new(certs: CertStore) -> Self {
        Self { certs }
    }

    fn assign_via_dps(
        &self,
        scope_id: &str,
        registration_id: &str,
        credentials: &'static DeviceCredentials,
        deadline: Instant,
    ) -> Result<HubAssignment, ProvisioningError> {
        let username = topics::dps_username(scope_id, registration_id);
        let params = LinkParams {
            host: topics::DPS_GLOBAL_ENDPOINT,
            client_id: registration_id,
            username: &username,
            credentials,
        };
        let mut link = Link::connect(&params, remaining(deadline)?)?;
        link.subscribe(topics::DPS_RESPONSE_SUBSCRIPTION)
            .map_err(|_| ProvisioningError::NetworkNotReady)?;

        info!("DPS: registering '{}' in scope {}", registration_id, scope_id);
        let mut registration = DpsRegistration::new(registration_id);
        dps::register(&mut link, &mut registration, remaining(deadline)?)
    }
}

fn remaining(deadline: Instant) -> Result<Duration, ProvisioningError> {
    let left = deadline.saturating_duration_since(Instant::now());
    if left.is_zero() {
        warn!("DPS: provisioning timed out");
        return Err(ProvisioningError::Generic);
    }
    Ok(left)
}

impl Provisioner for MqttProvisioner {
    type Client = MqttHubClient;

    fn provision(
        &mut self,
        target: &ProvisioningTarget,
        timeout: Duration,
    ) -> Result<MqttHubClient, ProvisioningError> {
        let deadline = deadline_after(timeout);
        let credentials = self.certs.load()?;

        let assignment = match target {
            ProvisioningTarget::Dps {
                scope_id,
                registration_id,
            } => self.assign_via_dps(scope_id, registration_id, credentials, deadline)?,
            ProvisioningTarget::Direct {
                hostname,
                device_id,
            } => HubAssignment {
                hostname: hostname.clone(),
                device_id: device_id.clone(),
            },
        };

        let telemetry_topic = topics::telemetry_topic(&assignment.device_id)
            .map_err(|_| ProvisioningError::InvalidParameter)?;
        let username = topics::hub_username(&assignment.hostname, &assignment.device_id);
        let params = LinkParams {
            host: &assignment.hostname,
            client_id: &assignment.device_id,
            username: &username,
            credentials,
        };
        let link = Link::connect(&params, remaining(deadline)?)?;

        info!(
            "IoTHub: connected to {} as {}",
            assignment.hostname, assignment.device_id
        );
        Ok(MqttHubClient {
            link,
            assignment,
            telemetry_topic,
            in_flight: Vec::new(),
            message_timeout: MESSAGE_TIMEOUT,
            methods_enabled: false,
        })
    }
}

// ───────────────────────────────────────────────────────────────
// Hub client
// ───────────────────────────────────────────────────────────────

pub struct MqttHubClient {
    link: Link,
    assignment: HubAssignment,
    telemetry_topic: Topic,
    /// Submitted messages awaiting PUBACK, with their submission time.
    in_flight: Vec<(MessageId, Instant)>,
    message_timeout: Duration,
    methods_enabled: bool,
}

impl MqttHubClient {
    pub fn assignment(&self) -> &HubAssignment {
        &self.assignment
    }

    /// Messages submitted but not yet acknowledged by the broker.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn set_message_timeout(&mut self, timeout: Duration) {
        self.message_timeout = timeout;
    }

    /// Report and forget every message older than the timeout.
    fn expire_in_flight(&mut self, callbacks: &mut dyn HubCallbacks) {
        let timeout = self.message_timeout;
        self.in_flight.retain(|&(id, sent_at)| {
            if sent_at.elapsed() < timeout {
                return true;
            }
            warn!("IoTHub: message {} not acknowledged within {:?}", id, timeout);
            callbacks.on_send_confirmation(id, ConfirmationResult::MessageTimeout);
            false
        });
    }

    /// Simulation hooks for injecting broker traffic.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim(&mut self) -> &mut sim::SimLink {
        &mut self.link
    }

    fn dispatch(&mut self, event: LinkEvent, callbacks: &mut dyn HubCallbacks) {
        match event {
            LinkEvent::Connected => {
                callbacks.on_connection_status(ConnectionStatus::Authenticated, StatusReason::Ok);
            }
            LinkEvent::Disconnected => {
                callbacks.on_connection_status(
                    ConnectionStatus::Unauthenticated,
                    StatusReason::NoNetwork,
                );
            }
            LinkEvent::Published(id) => {
                if let Some(pos) = self.in_flight.iter().position(|&(m, _)| m == id) {
                    self.in_flight.swap_remove(pos);
                    callbacks.on_send_confirmation(id, ConfirmationResult::Ok);
                }
            }
            LinkEvent::Received { topic, payload } => self.on_message(&topic, &payload, callbacks),
            LinkEvent::Error(code) => warn!("IoTHub: transport error {}", code),
        }
    }

    fn on_message(&mut self, topic: &str, payload: &[u8], callbacks: &mut dyn HubCallbacks) {
        if !self.methods_enabled {
            debug!("IoTHub: dropping message on {} (no callbacks)", topic);
            return;
        }
        let Some(request) = topics::parse_method_topic(topic) else {
            debug!("IoTHub: ignoring message on {}", topic);
            return;
        };

        info!("IoTHub: method '{}' (rid {})", request.name, request.request_id);
        let result = callbacks.on_method(request.name, payload);

        let response = match topics::method_response_topic(result.status, request.request_id) {
            Ok(t) => t,
            Err(e) => {
                warn!("IoTHub: cannot respond to '{}': {}", request.name, e);
                return;
            }
        };
        if let Err(e) = self.link.enqueue(&response, &result.body) {
            warn!("IoTHub: method response failed: {}", e);
        }
    }
}

impl HubClient for MqttHubClient {
    fn install_callbacks(&mut self) -> Result<(), TransportError> {
        self.link.subscribe(topics::METHODS_SUBSCRIPTION)?;
        self.methods_enabled = true;
        Ok(())
    }

    fn send_event_async(&mut self, payload: &[u8]) -> Result<MessageId, TransportError> {
        let id = self.link.enqueue(&self.telemetry_topic, payload)?;
        self.in_flight.push((id, Instant::now()));
        Ok(id)
    }

    fn do_work(&mut self, callbacks: &mut dyn HubCallbacks) {
        while let Some(event) = self.link.try_next() {
            self.dispatch(event, callbacks);
        }
        self.expire_in_flight(callbacks);
    }

    fn close(&mut self, callbacks: &mut dyn HubCallbacks) {
        for (id, _) in self.in_flight.drain(..) {
            callbacks.on_send_confirmation(id, ConfirmationResult::Destroyed);
        }
    }
}
