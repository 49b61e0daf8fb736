//! MQTT topic and credential strings for the IoT hub and the device
//! provisioning service.
//!
//! Builders write into fixed-capacity [`Topic`] buffers; parsers borrow from
//! the incoming topic and never allocate.

use core::fmt::Write;

use crate::error::TransportError;

/// Longest topic the agent builds or accepts.
pub const TOPIC_CAPACITY: usize = 256;

pub type Topic = heapless::String<TOPIC_CAPACITY>;

/// IoT hub MQTT API version.
pub const HUB_API_VERSION: &str = "2021-04-12";

/// DPS MQTT API version.
pub const DPS_API_VERSION: &str = "2019-03-31";

/// Global DPS device endpoint.
pub const DPS_GLOBAL_ENDPOINT: &str = "global.azure-devices-provisioning.net";

/// Subscribed once per hub connection to receive direct methods.
pub const METHODS_SUBSCRIPTION: &str = "$iothub/methods/POST/#";

/// Subscribed once per DPS connection to receive registration responses.
pub const DPS_RESPONSE_SUBSCRIPTION: &str = "$dps/registrations/res/#";

const METHODS_REQUEST_PREFIX: &str = "$iothub/methods/POST/";
const DPS_RESPONSE_PREFIX: &str = "$dps/registrations/res/";

fn build(args: core::fmt::Arguments<'_>) -> Result<Topic, TransportError> {
    let mut topic = Topic::new();
    topic.write_fmt(args).map_err(|_| TransportError::TopicTooLong)?;
    Ok(topic)
}

// ── IoT hub ───────────────────────────────────────────────────

/// `devices/{device_id}/messages/events/`
pub fn telemetry_topic(device_id: &str) -> Result<Topic, TransportError> {
    build(format_args!("devices/{}/messages/events/", device_id))
}

/// `$iothub/methods/res/{status}/?$rid={request_id}`
pub fn method_response_topic(status: i32, request_id: &str) -> Result<Topic, TransportError> {
    build(format_args!("$iothub/methods/res/{}/?$rid={}", status, request_id))
}

/// MQTT user name for an X.509-authenticated hub connection.
pub fn hub_username(hostname: &str, device_id: &str) -> String {
    format!("{}/{}/?api-version={}", hostname, device_id, HUB_API_VERSION)
}

/// A direct-method invocation addressed by its request topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodRequest<'a> {
    pub name: &'a str,
    pub request_id: &'a str,
}

/// Parse `$iothub/methods/POST/{name}/?$rid={request_id}`.
pub fn parse_method_topic(topic: &str) -> Option<MethodRequest<'_>> {
    let rest = topic.strip_prefix(METHODS_REQUEST_PREFIX)?;
    let (name, query) = rest.split_once("/?")?;
    if name.is_empty() || name.contains('/') {
        return None;
    }
    let request_id = query_param(query, "$rid").filter(|rid| !rid.is_empty())?;
    Some(MethodRequest { name, request_id })
}

// ── Provisioning service ──────────────────────────────────────

/// MQTT user name for a DPS registration session.
pub fn dps_username(scope_id: &str, registration_id: &str) -> String {
    format!(
        "{}/registrations/{}/api-version={}",
        scope_id, registration_id, DPS_API_VERSION
    )
}

/// `$dps/registrations/PUT/iotdps-register/?$rid={request_id}`
pub fn dps_register_topic(request_id: u32) -> Result<Topic, TransportError> {
    build(format_args!(
        "$dps/registrations/PUT/iotdps-register/?$rid={}",
        request_id
    ))
}

/// `$dps/registrations/GET/iotdps-get-operationstatus/?$rid={request_id}&operationId={op}`
pub fn dps_poll_topic(request_id: u32, operation_id: &str) -> Result<Topic, TransportError> {
    build(format_args!(
        "$dps/registrations/GET/iotdps-get-operationstatus/?$rid={}&operationId={}",
        request_id, operation_id
    ))
}

/// Status line of a DPS response, parsed from its topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DpsResponseTopic {
    pub status: u16,
    pub request_id: u32,
    /// Seconds the service asks us to wait before polling.
    pub retry_after: Option<u32>,
}

/// Parse `$dps/registrations/res/{status}/?$rid={rid}[&retry-after={secs}]`.
pub fn parse_dps_response_topic(topic: &str) -> Option<DpsResponseTopic> {
    let rest = topic.strip_prefix(DPS_RESPONSE_PREFIX)?;
    let (status, query) = rest.split_once("/?")?;
    let status = status.parse().ok()?;
    let request_id = query_param(query, "$rid")?.parse().ok()?;
    let retry_after = query_param(query, "retry-after").and_then(|s| s.parse().ok());
    Some(DpsResponseTopic {
        status,
        request_id,
        retry_after,
    })
}

fn query_param<'a>(query: &'a str, key: &str) -> Option<&'a str> {
    query.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        (k == key).then_some(v)
    })
}
