//! Cloud connection state machine.
//!
//! ```text
//!                    ProvisioningStarted
//!  ┌──────────────────┐ ───────────────▶ ┌─────────────────────────┐
//!  │ NotAuthenticated │                  │ AuthenticationInitiated │
//!  └──────────────────┘ ◀─────────────── └─────────────────────────┘
//!        ▲             ProvisioningFailed            │
//!        │                                           │ ProvisioningSucceeded
//!        │ Status(Unauthenticated)                   ▼
//!        │ HandleReleased                 ┌─────────────────────────┐
//!        └─────────────────────────────── │      Authenticated      │ ◀─┐
//!                                         └─────────────────────────┘   │
//!                                                    └──────────────────┘
//!                                                  Status(Authenticated)
//! ```
//!
//! `AuthenticationInitiated` is only held while a blocking provisioning
//! attempt is in flight.  A status notification can lower the state but
//! never raise it: only a successful provisioning attempt does that.

pub mod session;

use crate::app::events::ConnectionStatus;

/// Authentication state of the cloud connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum AuthState {
    #[default]
    NotAuthenticated = 0,
    AuthenticationInitiated = 1,
    Authenticated = 2,
}

/// Inputs to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    ProvisioningStarted,
    ProvisioningSucceeded,
    ProvisioningFailed,
    /// The transport handle was destroyed.
    HandleReleased,
    Status(ConnectionStatus),
}

/// Pure transition function.
pub fn next_state(current: AuthState, event: AuthEvent) -> AuthState {
    match (current, event) {
        (_, AuthEvent::ProvisioningStarted) => AuthState::AuthenticationInitiated,
        (AuthState::AuthenticationInitiated, AuthEvent::ProvisioningSucceeded) => {
            AuthState::Authenticated
        }
        (_, AuthEvent::ProvisioningFailed | AuthEvent::HandleReleased) => {
            AuthState::NotAuthenticated
        }
        (_, AuthEvent::Status(ConnectionStatus::Unauthenticated)) => AuthState::NotAuthenticated,
        (state, AuthEvent::Status(ConnectionStatus::Authenticated) | AuthEvent::ProvisioningSucceeded) => {
            state
        }
    }
}
