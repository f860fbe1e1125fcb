#![no_main]

use libfuzzer_sys::fuzz_target;
use login_link::protocol::message::OutboundMessage;

fuzz_target!(|data: &[u8]| {
    // Anything that parses must encode back to the same bytes
    if let Ok(msg) = OutboundMessage::from_bytes(data) {
        let encoded = msg.to_bytes();
        assert_eq!(&encoded[..], &data[..encoded.len()]);
    }
});
