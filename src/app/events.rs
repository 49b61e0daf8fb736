//! Notifications raised by the cloud transport.
//!
//! These are delivered synchronously from inside
//! [`HubClient::do_work`](super::ports::HubClient::do_work) on the control
//! thread, through a [`HubCallbacks`](super::ports::HubCallbacks) sink.

use core::fmt;

/// Authentication status reported by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Authenticated,
    Unauthenticated,
}

/// Reason attached to a [`ConnectionStatus`] notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusReason {
    Ok,
    /// The broker connection dropped.
    NoNetwork,
}

impl StatusReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::NoNetwork => "NO_NETWORK",
        }
    }
}

impl fmt::Display for StatusReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of an asynchronously submitted telemetry message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationResult {
    Ok,
    /// The client was torn down before the broker acknowledged.
    Destroyed,
    /// No acknowledgement arrived in time.
    MessageTimeout,
}

impl fmt::Display for ConfirmationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "OK"),
            Self::Destroyed => write!(f, "BECAUSE_DESTROY"),
            Self::MessageTimeout => write!(f, "MESSAGE_TIMEOUT"),
        }
    }
}

/// Transport-assigned identifier of a submitted message.
pub type MessageId = u32;
