//! Best-effort telemetry delivery.
//!
//! Preconditions are checked in order and short-circuit:
//!
//! 1. the session is `Authenticated`;
//! 2. the network reports connected (a hard query failure is fatal);
//! 3. the payload fits the telemetry buffer.
//!
//! Only then is a message built, submitted asynchronously, dropped, and the
//! transport pumped once.  Nothing is queued for retry.

use log::{error, info, warn};

use crate::app::commands::MethodHandler;
use crate::app::events::MessageId;
use crate::app::ports::{ConnectivityPort, Provisioner};
use crate::error::{FatalError, TransportError};
use crate::fsm::session::HubSession;

use super::{PayloadError, TELEMETRY_BUFFER_SIZE};

/// What happened to one send request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Submitted(MessageId),
    NotAuthenticated,
    Offline,
    PayloadTooLarge,
    SubmitFailed(TransportError),
}

/// An owned device-to-cloud message.  Lives only for one submission.
pub struct TelemetryMessage {
    body: Vec<u8>,
}

impl TelemetryMessage {
    pub fn new(payload: &str) -> Result<Self, PayloadError> {
        if payload.len() >= TELEMETRY_BUFFER_SIZE {
            return Err(PayloadError::TooLarge { len: payload.len() });
        }
        Ok(Self {
            body: payload.as_bytes().to_vec(),
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.body
    }
}

/// Send one payload.  Every failure except a hard interface query failure
/// is logged and reported as a [`SendOutcome`].
pub fn send_telemetry<P: Provisioner>(
    session: &mut HubSession<P>,
    network: &mut impl ConnectivityPort,
    payload: &str,
    methods: &mut dyn MethodHandler,
) -> Result<SendOutcome, FatalError> {
    if !session.is_authenticated() {
        warn!("Telemetry: cannot send, not authenticated with the hub");
        return Ok(SendOutcome::NotAuthenticated);
    }

    info!("Telemetry: sending {}", payload);

    match network.is_connected() {
        Ok(true) => {}
        Ok(false) => {
            warn!("Telemetry: cannot send, network is not connected");
            return Ok(SendOutcome::Offline);
        }
        Err(e) => {
            if let Some(fatal) = e.fatal() {
                error!("Telemetry: {}", e);
                return Err(fatal);
            }
            warn!("Telemetry: cannot send, {}", e);
            return Ok(SendOutcome::Offline);
        }
    }

    let message = match TelemetryMessage::new(payload) {
        Ok(m) => m,
        Err(e) => {
            error!("Telemetry: {}", e);
            return Ok(SendOutcome::PayloadTooLarge);
        }
    };

    let outcome = match session.submit(message.as_bytes()) {
        Ok(id) => {
            info!("Telemetry: message {} queued", id);
            SendOutcome::Submitted(id)
        }
        Err(e) => {
            error!("Telemetry: failed to queue message: {}", e);
            SendOutcome::SubmitFailed(e)
        }
    };
    // The transport keeps its own copy.
    drop(message);

    session.pump(methods);
    Ok(outcome)
}
