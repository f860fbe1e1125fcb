#![no_main]

use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use login_link::core::codec::{decode_all, LoginCodec};
use login_link::{PacketLen, PacketLengthTable};

fuzz_target!(|data: &[u8]| {
    let mut table = PacketLengthTable::default();
    let _ = table.set(0x2813, PacketLen::Dynamic);
    let mut codec = LoginCodec::new(table);

    // Feed the input in two halves so partial messages are exercised
    let (head, tail) = data.split_at(data.len() / 2);
    let mut buf = BytesMut::from(head);
    if decode_all(&mut codec, &mut buf).is_err() {
        return;
    }
    buf.extend_from_slice(tail);
    let _ = decode_all(&mut codec, &mut buf);
});
