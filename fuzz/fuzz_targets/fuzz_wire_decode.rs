//! Fuzz target: `WireCodec::decode` and `InboundAssembler`
//!
//! Drives arbitrary bytes through both codec directions and the stream
//! assembler. Nothing may panic, every reported length must stay inside
//! the input, and a decoded command must re-encode on its own wire variant.
//!
//! cargo fuzz run fuzz_wire_decode

#![no_main]

use std::sync::Arc;

use libfuzzer_sys::fuzz_target;
use menulink::error::WireError;
use menulink::protocol::inbound::{Inbound, InboundAssembler};
use menulink::protocol::registry::MessageTypeRegistry;
use menulink::protocol::wire::WireCodec;

fuzz_target!(|data: &[u8]| {
    let Ok(registry) = MessageTypeRegistry::standard() else {
        return;
    };
    let registry = Arc::new(registry);

    for codec in [
        WireCodec::new(registry.clone()),
        WireCodec::device_side(registry.clone()),
    ] {
        match codec.decode(data) {
            Ok(decoded) => {
                assert!(decoded.consumed <= data.len());
                let mut out = Vec::new();
                let wire = decoded.header.protocol.wire();
                assert!(codec.encode_as(&mut out, &decoded.command, wire).is_ok());
            }
            Err(WireError::UnknownMessageType { consumed, .. }) => {
                assert!(consumed <= data.len());
            }
            Err(_) => {}
        }

        let mut asm = InboundAssembler::new(1024);
        for chunk in data.chunks(7) {
            asm.push(chunk);
            while let Some(inbound) = asm.next(&codec) {
                if let Inbound::Dropped(e) = inbound {
                    assert_ne!(e, WireError::Incomplete);
                }
            }
        }
        assert!(asm.buffered() <= 1024);
    }
});
