//! Wire codec integration: every catalog command crosses the link in both
//! directions, on every wire variant it is registered for.

use std::sync::Arc;

use menulink::correlation::CorrelationId;
use menulink::error::{EncodeError, RegistryError, WireError};
use menulink::protocol::catalog::STANDARD_BINDINGS;
use menulink::protocol::command::{
    AckStatus, Acknowledgement, ActionBoot, AnalogBoot, ApiPlatform, BooleanBoot, BooleanNaming,
    BootHeader, Bootstrap, BootstrapPhase, ChangeValue, Command, CommandKind, DialogButton,
    DialogMode, DialogUpdate, EnumBoot, FloatBoot, Heartbeat, HeartbeatMode, Join, ListBoot,
    PairingRequest, SubMenuBoot, TextBoot, ValueChange,
};
use menulink::protocol::inbound::{Inbound, InboundAssembler};
use menulink::protocol::registry::{Binding, MessageTypeRegistry};
use menulink::protocol::tag_value::{TagValueMap, TagValueWriter};
use menulink::protocol::wire::WireCodec;
use menulink::protocol::{MessageTypeCode, WireVariant};

use crate::mocks::registry;

fn header(id: u16, name: &str) -> BootHeader {
    BootHeader {
        id,
        parent_id: 0,
        name: name.into(),
        read_only: id % 2 == 0,
        visible: true,
    }
}

/// One sample of every command kind.
fn catalog_samples() -> Vec<Command> {
    vec![
        Command::Join(Join {
            name: "panel".into(),
            uuid: "1f0c7a52-0000-4000-8000-000000000001".into(),
            api_version: 100,
            platform: ApiPlatform::Desktop,
        }),
        Command::Heartbeat(Heartbeat {
            interval_ms: 1500,
            mode: HeartbeatMode::Start,
        }),
        Command::Bootstrap(Bootstrap {
            phase: BootstrapPhase::End,
        }),
        Command::AnalogBoot(AnalogBoot {
            header: header(1, "Volume"),
            max: 255,
            offset: -180,
            divisor: 2,
            unit: "dB".into(),
            current: 22,
        }),
        Command::EnumBoot(EnumBoot {
            header: header(2, "Input"),
            choices: vec!["Line".into(), "USB|A".into(), "A=B".into()],
            current: 2,
        }),
        Command::BooleanBoot(BooleanBoot {
            header: header(3, "Mute"),
            naming: BooleanNaming::YesNo,
            current: false,
        }),
        Command::SubMenuBoot(SubMenuBoot {
            header: header(4, "Settings"),
        }),
        Command::ActionBoot(ActionBoot {
            header: header(5, "Reset"),
        }),
        Command::FloatBoot(FloatBoot {
            header: header(6, "Voltage"),
            decimal_places: 2,
            current: 12.25,
        }),
        Command::TextBoot(TextBoot {
            header: header(7, "Name"),
            max_length: 10,
            edit_mode: 1,
            current: "a~b".into(),
        }),
        Command::ListBoot(ListBoot {
            header: header(8, "Log"),
            values: vec!["one".into(), "two".into()],
        }),
        Command::ValueChange(ValueChange {
            item_id: 1,
            correlation: CorrelationId::from_raw(0x0012_00ff),
            change: ChangeValue::Delta(-3),
        }),
        Command::Acknowledgement(Acknowledgement {
            correlation: CorrelationId::from_raw(0x0012_00ff),
            status: AckStatus::ValueRangeWarning,
            item_id: Some(1),
        }),
        Command::PairingRequest(PairingRequest {
            name: "panel".into(),
            uuid: "uuid-2".into(),
        }),
        Command::DialogUpdate(DialogUpdate {
            mode: DialogMode::Show,
            header: "Confirm".into(),
            buffer: "Erase all?".into(),
            button1: DialogButton::Accept,
            button2: DialogButton::Cancel,
            correlation: CorrelationId::EMPTY,
        }),
    ]
}

fn codecs() -> (WireCodec, WireCodec) {
    let r = registry();
    (WireCodec::new(r.clone()), WireCodec::device_side(r))
}

#[test]
fn samples_cover_every_kind() {
    let kinds: Vec<CommandKind> = catalog_samples().iter().map(Command::kind).collect();
    for kind in CommandKind::ALL {
        assert!(kinds.contains(&kind), "no sample for {kind}");
    }
}

#[test]
fn every_command_round_trips_controller_to_device() {
    let (controller, device) = codecs();
    for cmd in catalog_samples() {
        let bytes = controller.encode_to_vec(&cmd).unwrap();
        let decoded = device.decode(&bytes).unwrap();
        assert_eq!(decoded.command, cmd);
        assert_eq!(decoded.consumed, bytes.len());
    }
}

#[test]
fn every_command_round_trips_device_to_controller() {
    let (controller, device) = codecs();
    for cmd in catalog_samples() {
        let bytes = device.encode_to_vec(&cmd).unwrap();
        assert_eq!(controller.decode(&bytes).unwrap().command, cmd);
    }
}

#[test]
fn text_reencoding_differs_only_in_terminator() {
    let (controller, device) = codecs();
    for cmd in catalog_samples() {
        let sent = controller.encode_to_vec(&cmd).unwrap();
        let decoded = device.decode(&sent).unwrap().command;
        let echoed = device.encode_to_vec(&decoded).unwrap();

        assert_eq!(sent.len(), echoed.len(), "{}", cmd.kind());
        assert_eq!(sent[..sent.len() - 1], echoed[..echoed.len() - 1]);
        assert_eq!(sent.last(), Some(&0x02));
        assert_eq!(echoed.last(), Some(&b'~'));
    }
}

#[test]
fn binary_variants_round_trip() {
    let (controller, device) = codecs();
    let mut binary_kinds = 0;
    for cmd in catalog_samples() {
        if controller
            .registry()
            .lookup_encoder_for(cmd.kind(), WireVariant::Binary)
            .is_none()
        {
            continue;
        }
        binary_kinds += 1;
        let mut out = Vec::new();
        controller.encode_as(&mut out, &cmd, WireVariant::Binary).unwrap();
        assert_eq!(out[1], 0x02, "binary protocol id");
        let decoded = device.decode(&out).unwrap();
        assert_eq!(decoded.command, cmd);
        assert_eq!(decoded.header.protocol.wire(), WireVariant::Binary);
    }
    assert_eq!(binary_kinds, 4);
}

#[test]
fn binary_change_carries_text_and_lists() {
    let (controller, device) = codecs();
    for change in [
        ChangeValue::Absolute("19.5".into()),
        ChangeValue::List(vec!["a".into(), String::new(), "c|d".into()]),
    ] {
        let cmd = Command::ValueChange(ValueChange {
            item_id: 300,
            correlation: CorrelationId::EMPTY,
            change,
        });
        let mut out = Vec::new();
        controller.encode_as(&mut out, &cmd, WireVariant::Binary).unwrap();
        assert_eq!(device.decode(&out).unwrap().command, cmd);
    }
}

#[test]
fn reserved_characters_are_escaped_on_the_wire() {
    let (controller, device) = codecs();
    let cmd = Command::AnalogBoot(AnalogBoot {
        header: header(9, "example|5=x"),
        max: 10,
        offset: 0,
        divisor: 1,
        unit: String::new(),
        current: 0,
    });
    let bytes = controller.encode_to_vec(&cmd).unwrap();
    let needle = br"NM=example\|5\=x|";
    assert!(bytes.windows(needle.len()).any(|w| w == needle));
    assert_eq!(device.decode(&bytes).unwrap().command, cmd);
}

#[test]
fn unregistered_type_is_reported_with_its_length() {
    let (controller, _) = codecs();
    let bytes = [0x01, 0x01, b'N', b'M', b'=', b'V', b'o', b'l', b'~'];
    assert_eq!(
        controller.decode(&bytes),
        Err(WireError::UnknownMessageType {
            code: MessageTypeCode::new(b"NM"),
            wire: WireVariant::TagValue,
            consumed: bytes.len(),
        })
    );
}

#[test]
fn assembler_rebuilds_byte_at_a_time_stream() {
    let (controller, device) = codecs();
    let samples = catalog_samples();
    let stream: Vec<u8> = samples
        .iter()
        .flat_map(|c| device.encode_to_vec(c).unwrap())
        .collect();

    let mut asm = InboundAssembler::default();
    let mut out = Vec::new();
    for b in stream {
        asm.push(&[b]);
        while let Some(inbound) = asm.next(&controller) {
            match inbound {
                Inbound::Command(d) => out.push(d.command),
                Inbound::Dropped(e) => panic!("dropped {e}"),
            }
        }
    }
    assert_eq!(out, samples);
    assert_eq!(asm.buffered(), 0);
}

#[test]
fn assembler_resyncs_around_garbage_and_bad_messages() {
    let (controller, device) = codecs();
    let hb = Command::Heartbeat(Heartbeat {
        interval_ms: 1000,
        mode: HeartbeatMode::Normal,
    });
    let good = device.encode_to_vec(&hb).unwrap();

    let mut stream = b"noise".to_vec();
    stream.extend_from_slice(&good);
    stream.extend_from_slice(b"\x01\x01HBHI=abc|HR=0|~");
    stream.extend_from_slice(b"\x01\x01NM=Vol~");
    stream.extend_from_slice(&good);

    let mut asm = InboundAssembler::default();
    asm.push(&stream);
    let mut commands = 0;
    let mut malformed = 0;
    let mut unknown = 0;
    while let Some(inbound) = asm.next(&controller) {
        match inbound {
            Inbound::Command(d) => {
                assert_eq!(d.command, hb);
                commands += 1;
            }
            Inbound::Dropped(WireError::Malformed(_)) => malformed += 1,
            Inbound::Dropped(WireError::UnknownMessageType { .. }) => unknown += 1,
            Inbound::Dropped(WireError::Incomplete) => unreachable!(),
        }
    }
    assert_eq!((commands, malformed, unknown), (2, 1, 1));
}

#[test]
fn duplicate_row_aborts_table_loading() {
    let mut table = STANDARD_BINDINGS.to_vec();
    table.push(STANDARD_BINDINGS[1]);
    let err = MessageTypeRegistry::from_table(&table).unwrap_err();
    assert!(matches!(err, RegistryError::DuplicateRegistration { .. }));
}

fn refuse_encode(_: &Command, _: &mut TagValueWriter) -> Result<(), EncodeError> {
    Err(EncodeError::KindMismatch(CommandKind::PairingRequest))
}

fn refuse_decode(_: &TagValueMap) -> Result<Command, WireError> {
    Err(WireError::Incomplete)
}

#[test]
fn duplicate_registration_keeps_the_original() {
    let mut reg = MessageTypeRegistry::standard().unwrap();
    let before = reg.len();
    let clash = Binding::tag_value(b"NJ", CommandKind::PairingRequest, refuse_encode, refuse_decode);
    assert_eq!(
        reg.register(clash),
        Err(RegistryError::DuplicateRegistration {
            code: MessageTypeCode::new(b"NJ"),
            wire: WireVariant::TagValue,
        })
    );
    assert_eq!(reg.len(), before);

    let (controller, _) = codecs();
    let join = &catalog_samples()[0];
    let bytes = controller.encode_to_vec(join).unwrap();
    let device = WireCodec::device_side(Arc::new(reg));
    assert_eq!(&device.decode(&bytes).unwrap().command, join);
}
