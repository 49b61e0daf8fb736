//! Device provisioning service (DPS) registration over MQTT.
//!
//! [`DpsRegistration`] is a sans-I/O state machine: it produces request
//! topics/payloads and interprets response topics/bodies.  [`register`]
//! drives it over any [`DpsLink`] with a single overall deadline.
//!
//! ```text
//!  Idle ──register──▶ Registering ──202 assigning──▶ Assigning ◀─┐
//!                          │                            │   poll │
//!                          │ 200 assigned               ├────────┘
//!                          ▼                            ▼ 200 assigned
//!                        Done ◀─────────────────────────┘
//! ```

use core::time::Duration;
use std::time::Instant;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{ProvisioningError, TransportError};

use super::topics::{self, Topic};

/// Poll interval when the service does not send `retry-after`.
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(3);

/// Ceiling applied when a timeout is too large to add to the clock.
const LONGEST_WAIT: Duration = Duration::from_secs(24 * 60 * 60);

/// The instant `timeout` from now, capped rather than overflowing.
pub fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout)
        .or_else(|| now.checked_add(LONGEST_WAIT))
        .unwrap_or(now)
}

// ── Wire types ────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest<'a> {
    registration_id: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegistrationResponse {
    operation_id: Option<String>,
    status: Option<String>,
    registration_state: Option<RegistrationState>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegistrationState {
    assigned_hub: Option<String>,
    device_id: Option<String>,
    error_code: Option<u32>,
    error_message: Option<String>,
}

// ── State machine ─────────────────────────────────────────────

/// The hub a device was assigned to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubAssignment {
    pub hostname: String,
    pub device_id: String,
}

/// A request to publish on the DPS connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DpsRequest {
    pub topic: Topic,
    pub payload: Vec<u8>,
}

/// What a response means for the registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DpsProgress {
    /// Not addressed to the outstanding request.
    Ignored,
    /// Ask again after the given delay.
    Poll { after: Duration },
    Assigned(HubAssignment),
    Failed(ProvisioningError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Phase {
    Idle,
    Registering,
    Assigning { operation_id: String },
    Done,
}

pub struct DpsRegistration {
    registration_id: String,
    next_request_id: u32,
    pending_request_id: Option<u32>,
    phase: Phase,
}

impl DpsRegistration {
    pub fn new(registration_id: &str) -> Self {
        Self {
            registration_id: registration_id.to_owned(),
            next_request_id: 1,
            pending_request_id: None,
            phase: Phase::Idle,
        }
    }

    pub fn registration_id(&self) -> &str {
        &self.registration_id
    }

    pub fn is_done(&self) -> bool {
        self.phase == Phase::Done
    }

    fn take_request_id(&mut self) -> u32 {
        let rid = self.next_request_id;
        self.next_request_id = self.next_request_id.wrapping_add(1);
        self.pending_request_id = Some(rid);
        rid
    }

    /// The initial `iotdps-register` request.
    pub fn register_request(&mut self) -> Result<DpsRequest, ProvisioningError> {
        let rid = self.take_request_id();
        let topic = topics::dps_register_topic(rid).map_err(|_| ProvisioningError::Generic)?;
        let payload = serde_json::to_vec(&RegisterRequest {
            registration_id: &self.registration_id,
        })
        .map_err(|_| ProvisioningError::Generic)?;
        self.phase = Phase::Registering;
        Ok(DpsRequest { topic, payload })
    }

    /// The next `iotdps-get-operationstatus` request.  Only valid after the
    /// service answered with an operation ID.
    pub fn poll_request(&mut self) -> Result<DpsRequest, ProvisioningError> {
        let Phase::Assigning { operation_id } = &self.phase else {
            return Err(ProvisioningError::Generic);
        };
        let operation_id = operation_id.clone();
        let rid = self.take_request_id();
        let topic =
            topics::dps_poll_topic(rid, &operation_id).map_err(|_| ProvisioningError::Generic)?;
        Ok(DpsRequest {
            topic,
            payload: Vec::new(),
        })
    }

    /// Interpret a message received on the DPS response subscription.
    pub fn on_response(&mut self, topic: &str, body: &[u8]) -> DpsProgress {
        let Some(status_line) = topics::parse_dps_response_topic(topic) else {
            debug!("DPS: ignoring message on '{}'", topic);
            return DpsProgress::Ignored;
        };
        if self.pending_request_id != Some(status_line.request_id) {
            debug!("DPS: ignoring stale response rid={}", status_line.request_id);
            return DpsProgress::Ignored;
        }
        self.pending_request_id = None;

        let retry_after = status_line
            .retry_after
            .map_or(DEFAULT_RETRY_AFTER, |s| Duration::from_secs(u64::from(s)));

        match status_line.status {
            200..=299 => self.on_success(status_line.status, body, retry_after),
            429 => DpsProgress::Poll { after: retry_after },
            400 | 404 => self.fail(status_line.status, ProvisioningError::InvalidParameter),
            _ => self.fail(status_line.status, ProvisioningError::ProvisioningService),
        }
    }

    fn on_success(&mut self, status: u16, body: &[u8], retry_after: Duration) -> DpsProgress {
        let response: RegistrationResponse = match serde_json::from_slice(body) {
            Ok(r) => r,
            Err(_) => {
                warn!("DPS: malformed response body (status {})", status);
                return self.fail(status, ProvisioningError::Generic);
            }
        };

        match response.status.as_deref() {
            Some("assigned") => {
                let assignment = response.registration_state.and_then(|s| {
                    Some(HubAssignment {
                        hostname: s.assigned_hub.filter(|h| !h.is_empty())?,
                        device_id: s.device_id.filter(|d| !d.is_empty())?,
                    })
                });
                match assignment {
                    Some(a) => {
                        info!("DPS: assigned to '{}' as '{}'", a.hostname, a.device_id);
                        self.phase = Phase::Done;
                        DpsProgress::Assigned(a)
                    }
                    None => self.fail(status, ProvisioningError::ProvisioningService),
                }
            }
            Some("assigning" | "unassigned") => {
                let operation_id = match response.operation_id {
                    Some(op) => op,
                    None => match &self.phase {
                        Phase::Assigning { operation_id } => operation_id.clone(),
                        _ => return self.fail(status, ProvisioningError::Generic),
                    },
                };
                debug!("DPS: assignment pending (operation {})", operation_id);
                self.phase = Phase::Assigning { operation_id };
                DpsProgress::Poll { after: retry_after }
            }
            other => {
                if let Some(state) = response.registration_state {
                    warn!(
                        "DPS: registration {} (error {:?}: {})",
                        other.unwrap_or("unknown"),
                        state.error_code,
                        state.error_message.as_deref().unwrap_or("")
                    );
                }
                self.fail(status, ProvisioningError::ProvisioningService)
            }
        }
    }

    fn fail(&mut self, status: u16, error: ProvisioningError) -> DpsProgress {
        warn!("DPS: registration failed with status {}: {}", status, error);
        self.phase = Phase::Done;
        DpsProgress::Failed(error)
    }
}

// ── Driver ────────────────────────────────────────────────────

/// A connected, subscribed DPS session.
pub trait DpsLink {
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), TransportError>;

    /// Next message on the response subscription, or `None` once `timeout`
    /// elapses.
    fn recv(&mut self, timeout: Duration) -> Option<(String, Vec<u8>)>;
}

/// Run one registration to completion within `timeout`.
pub fn register(
    link: &mut impl DpsLink,
    registration: &mut DpsRegistration,
    timeout: Duration,
) -> Result<HubAssignment, ProvisioningError> {
    let deadline = deadline_after(timeout);

    let request = registration.register_request()?;
    link.publish(&request.topic, &request.payload)
        .map_err(|_| ProvisioningError::NetworkNotReady)?;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            warn!("DPS: registration timed out after {:?}", timeout);
            return Err(ProvisioningError::Generic);
        }
        let Some((topic, body)) = link.recv(remaining) else {
            warn!("DPS: no response within {:?}", timeout);
            return Err(ProvisioningError::Generic);
        };

        match registration.on_response(&topic, &body) {
            DpsProgress::Ignored => {}
            DpsProgress::Assigned(assignment) => return Ok(assignment),
            DpsProgress::Failed(e) => return Err(e),
            DpsProgress::Poll { after } => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if after >= remaining {
                    warn!("DPS: retry-after {:?} exceeds the remaining budget", after);
                    return Err(ProvisioningError::Generic);
                }
                std::thread::sleep(after);
                let request = registration.poll_request()?;
                link.publish(&request.topic, &request.payload)
                    .map_err(|_| ProvisioningError::NetworkNotReady)?;
            }
        }
    }
}
