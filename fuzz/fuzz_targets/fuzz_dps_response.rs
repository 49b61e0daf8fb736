//! Fuzz target: `DpsRegistration::on_response`
//!
//! The first byte picks a status code; the rest is split into a retry
//! hint and a JSON body.  The state machine must never panic and must
//! only report an assignment with a non-empty hub and device ID.
//!
//! cargo fuzz run fuzz_dps_response

#![no_main]

use libfuzzer_sys::fuzz_target;
use telemon::hub::dps::{DpsProgress, DpsRegistration};

const STATUSES: [u16; 6] = [200, 202, 400, 401, 404, 500];

fuzz_target!(|data: &[u8]| {
    let Some((&selector, rest)) = data.split_first() else {
        return;
    };
    let status = STATUSES[usize::from(selector) % STATUSES.len()];
    let retry = rest.first().copied().unwrap_or(0) % 4;
    let body = rest.get(1..).unwrap_or_default();

    let mut reg = DpsRegistration::new("telemon-fuzz");
    if reg.register_request().is_err() {
        return;
    }
    let topic = format!("$dps/registrations/res/{}/?$rid=1&retry-after={}", status, retry);

    match reg.on_response(&topic, body) {
        DpsProgress::Assigned(hub) => {
            assert!(!hub.hostname.is_empty());
            assert!(!hub.device_id.is_empty());
            assert!(reg.is_done());
        }
        DpsProgress::Poll { .. } => {
            // A poll must be expressible as the next request.
            let _ = reg.poll_request();
        }
        DpsProgress::Ignored | DpsProgress::Failed(_) => {}
    }
});
