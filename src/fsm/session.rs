//! Hub session: owns the authentication state and the transport handle.
//!
//! At most one [`HubClient`] is alive at a time: [`HubSession::provision`]
//! releases the previous handle before asking the provisioner for a new
//! one.  Notifications raised inside [`HubSession::pump`] are routed back
//! into the state machine through a borrow-split dispatcher, so no shared
//! mutable state is needed.

use core::time::Duration;

use log::{debug, info, warn};

use crate::app::commands::{CommandResult, MethodHandler};
use crate::app::events::{ConfirmationResult, ConnectionStatus, MessageId, StatusReason};
use crate::app::ports::{HubCallbacks, HubClient, Provisioner};
use crate::config::ProvisioningTarget;
use crate::error::{ProvisioningError, TransportError};

use super::{AuthEvent, AuthState, next_state};

pub struct HubSession<P: Provisioner> {
    provisioner: P,
    target: ProvisioningTarget,
    timeout: Duration,
    client: Option<P::Client>,
    state: AuthState,
    attempts: u32,
}

impl<P: Provisioner> HubSession<P> {
    pub fn new(provisioner: P, target: ProvisioningTarget, timeout: Duration) -> Self {
        Self {
            provisioner,
            target,
            timeout,
            client: None,
            state: AuthState::NotAuthenticated,
            attempts: 0,
        }
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    pub fn is_authenticated(&self) -> bool {
        self.state == AuthState::Authenticated
    }

    pub fn client(&self) -> Option<&P::Client> {
        self.client.as_ref()
    }

    pub fn provisioner(&self) -> &P {
        &self.provisioner
    }

    /// Provisioning attempts made so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    fn apply(&mut self, event: AuthEvent) {
        let next = next_state(self.state, event);
        if next != self.state {
            debug!("Hub: {:?} --{:?}--> {:?}", self.state, event, next);
            self.state = next;
        }
    }

    /// Release the current transport handle, if any.  Messages still
    /// awaiting acknowledgement are reported as destroyed first.
    pub fn release(&mut self) {
        let Some(mut client) = self.client.take() else {
            return;
        };
        let mut dispatch = Dispatch {
            state: &mut self.state,
            methods: &mut Closing,
        };
        client.close(&mut dispatch);
        drop(client);
        info!("Hub: released transport handle");
        self.apply(AuthEvent::HandleReleased);
    }

    /// Log prefix naming the service a provisioning attempt talks to.
    fn service(&self) -> &'static str {
        match self.target {
            ProvisioningTarget::Dps { .. } => "DPS",
            ProvisioningTarget::Direct { .. } => "Hub",
        }
    }

    /// One provisioning attempt.  Blocks for at most the configured timeout.
    pub fn provision(&mut self) -> Result<(), ProvisioningError> {
        self.release();
        self.attempts = self.attempts.wrapping_add(1);
        self.apply(AuthEvent::ProvisioningStarted);

        let mut client = match self.provisioner.provision(&self.target, self.timeout) {
            Ok(client) => client,
            Err(e) => {
                warn!("{}: provisioning failed: {}", self.service(), e);
                self.apply(AuthEvent::ProvisioningFailed);
                return Err(e);
            }
        };

        if let Err(e) = client.install_callbacks() {
            warn!("Hub: could not install callbacks: {}", e);
            self.apply(AuthEvent::ProvisioningFailed);
            return Err(ProvisioningError::Generic);
        }

        self.client = Some(client);
        self.apply(AuthEvent::ProvisioningSucceeded);
        info!("{}: provisioning succeeded, hub client authenticated", self.service());
        Ok(())
    }

    /// Queue a telemetry payload on the live handle.
    pub fn submit(&mut self, payload: &[u8]) -> Result<MessageId, TransportError> {
        match self.client.as_mut() {
            Some(client) => client.send_event_async(payload),
            None => Err(TransportError::NotConnected),
        }
    }

    /// Drive the transport once.  Status and method notifications run to
    /// completion before this returns.
    pub fn pump(&mut self, methods: &mut dyn MethodHandler) {
        let Some(client) = self.client.as_mut() else {
            return;
        };
        let mut dispatch = Dispatch {
            state: &mut self.state,
            methods,
        };
        client.do_work(&mut dispatch);
    }
}

// ───────────────────────────────────────────────────────────────
// Notification dispatch
// ───────────────────────────────────────────────────────────────

/// Stands in for the command handler while a client is being closed.
struct Closing;

impl MethodHandler for Closing {
    fn on_method(&mut self, _name: &str, _payload: &[u8]) -> CommandResult {
        CommandResult::unknown_method()
    }
}

struct Dispatch<'a> {
    state: &'a mut AuthState,
    methods: &'a mut dyn MethodHandler,
}

impl HubCallbacks for Dispatch<'_> {
    fn on_connection_status(&mut self, status: ConnectionStatus, reason: StatusReason) {
        info!("Hub: connection status {:?} (reason {})", status, reason);
        let next = next_state(*self.state, AuthEvent::Status(status));
        if next != *self.state {
            warn!("Hub: {:?} -> {:?}", *self.state, next);
            *self.state = next;
        }
    }

    fn on_method(&mut self, name: &str, payload: &[u8]) -> CommandResult {
        self.methods.on_method(name, payload)
    }

    fn on_send_confirmation(&mut self, id: MessageId, result: ConfirmationResult) {
        match result {
            ConfirmationResult::Ok => info!("Telemetry: message {} confirmed: {}", id, result),
            _ => warn!("Telemetry: message {} lost: {}", id, result),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoMethods;

    impl MethodHandler for NoMethods {
        fn on_method(&mut self, _name: &str, _payload: &[u8]) -> CommandResult {
            CommandResult::unknown_method()
        }
    }

    #[derive(Default)]
    struct FakeClient {
        sent: Vec<Vec<u8>>,
        pending_status: Vec<ConnectionStatus>,
    }

    impl HubClient for FakeClient {
        fn install_callbacks(&mut self) -> Result<(), TransportError> {
            Ok(())
        }

        fn send_event_async(&mut self, payload: &[u8]) -> Result<MessageId, TransportError> {
            self.sent.push(payload.to_vec());
            Ok(self.sent.len() as MessageId)
        }

        fn do_work(&mut self, callbacks: &mut dyn HubCallbacks) {
            for status in self.pending_status.drain(..) {
                callbacks.on_connection_status(status, StatusReason::NoNetwork);
            }
        }

        fn close(&mut self, _callbacks: &mut dyn HubCallbacks) {}
    }

    struct FakeProvisioner {
        outcomes: Vec<Result<(), ProvisioningError>>,
        status_on_connect: Vec<ConnectionStatus>,
    }

    impl Provisioner for FakeProvisioner {
        type Client = FakeClient;

        fn provision(
            &mut self,
            _target: &ProvisioningTarget,
            _timeout: Duration,
        ) -> Result<FakeClient, ProvisioningError> {
            self.outcomes.remove(0)?;
            Ok(FakeClient {
                sent: Vec::new(),
                pending_status: self.status_on_connect.clone(),
            })
        }
    }

    fn session(
        outcomes: Vec<Result<(), ProvisioningError>>,
        status_on_connect: Vec<ConnectionStatus>,
    ) -> HubSession<FakeProvisioner> {
        HubSession::new(
            FakeProvisioner {
                outcomes,
                status_on_connect,
            },
            ProvisioningTarget::Dps {
                scope_id: "0ne0001".into(),
                registration_id: "r".into(),
            },
            Duration::from_secs(10),
        )
    }

    #[test]
    fn successful_provisioning_authenticates() {
        let mut s = session(vec![Ok(())], vec![]);
        assert!(s.provision().is_ok());
        assert_eq!(s.state(), AuthState::Authenticated);
        assert!(s.client().is_some());
    }

    #[test]
    fn log_prefix_follows_the_target() {
        let s = session(vec![], vec![]);
        assert_eq!(s.service(), "DPS");

        let mut direct = HubSession::new(
            FakeProvisioner {
                outcomes: vec![Err(ProvisioningError::NetworkNotReady)],
                status_on_connect: vec![],
            },
            ProvisioningTarget::Direct {
                hostname: "hub.azure-devices.net".into(),
                device_id: "dev1".into(),
            },
            Duration::from_secs(10),
        );
        assert_eq!(direct.service(), "Hub");
        assert_eq!(direct.provision(), Err(ProvisioningError::NetworkNotReady));
    }

    #[test]
    fn failed_provisioning_leaves_not_authenticated() {
        let mut s = session(vec![Err(ProvisioningError::NetworkNotReady)], vec![]);
        assert_eq!(s.provision(), Err(ProvisioningError::NetworkNotReady));
        assert_eq!(s.state(), AuthState::NotAuthenticated);
        assert!(s.client().is_none());
    }

    #[test]
    fn reprovisioning_releases_the_old_handle_first() {
        let mut s = session(vec![Ok(()), Err(ProvisioningError::Generic)], vec![]);
        s.provision().unwrap();
        s.submit(b"a").unwrap();
        assert_eq!(s.provision(), Err(ProvisioningError::Generic));
        assert!(s.client().is_none());
        assert_eq!(s.submit(b"b"), Err(TransportError::NotConnected));
    }

    #[test]
    fn unauthenticated_status_during_pump_drops_state() {
        let mut s = session(vec![Ok(())], vec![ConnectionStatus::Unauthenticated]);
        s.provision().unwrap();
        s.pump(&mut NoMethods);
        assert_eq!(s.state(), AuthState::NotAuthenticated);
    }

    #[test]
    fn authenticated_status_during_pump_is_a_no_op() {
        let mut s = session(
            vec![Ok(())],
            vec![ConnectionStatus::Authenticated, ConnectionStatus::Authenticated],
        );
        s.provision().unwrap();
        s.pump(&mut NoMethods);
        assert_eq!(s.state(), AuthState::Authenticated);
    }

    #[test]
    fn pump_without_client_does_nothing() {
        let mut s = session(vec![], vec![]);
        s.pump(&mut NoMethods);
        assert_eq!(s.state(), AuthState::NotAuthenticated);
    }
}
