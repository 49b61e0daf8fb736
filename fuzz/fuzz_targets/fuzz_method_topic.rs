//! Fuzz target: `parse_method_topic`
//!
//! Feeds arbitrary UTF-8 into the direct-method topic parser and checks
//! that any accepted request can be answered on a well-formed response
//! topic.
//!
//! cargo fuzz run fuzz_method_topic

#![no_main]

use libfuzzer_sys::fuzz_target;
use telemon::hub::topics::{method_response_topic, parse_method_topic};

fuzz_target!(|data: &[u8]| {
    let Ok(topic) = core::str::from_utf8(data) else {
        return;
    };
    let Some(req) = parse_method_topic(topic) else {
        return;
    };

    assert!(!req.name.is_empty());
    assert!(!req.name.contains('/'));
    assert!(!req.request_id.is_empty());

    // Overlong request IDs are refused, never truncated.
    if let Ok(res) = method_response_topic(-1, req.request_id) {
        assert!(res.ends_with(req.request_id));
    }
});
