//! Standard message catalog: per-type field schemas and the registration
//! table that wires them into a [`MessageTypeRegistry`].
//!
//! | Code | Command         | Wire          |
//! |------|-----------------|---------------|
//! | `NJ` | Join            | text          |
//! | `HB` | Heartbeat       | text, binary  |
//! | `BS` | Bootstrap       | text, binary  |
//! | `BA` | AnalogBoot      | text          |
//! | `BE` | EnumBoot        | text          |
//! | `BB` | BooleanBoot     | text          |
//! | `BM` | SubMenuBoot     | text          |
//! | `BC` | ActionBoot      | text          |
//! | `BF` | FloatBoot       | text          |
//! | `BT` | TextBoot        | text          |
//! | `BL` | ListBoot        | text          |
//! | `VC` | ValueChange     | text, binary  |
//! | `AK` | Acknowledgement | text, binary  |
//! | `PR` | PairingRequest  | text          |
//! | `DM` | DialogUpdate    | text          |
//!
//! Text bindings come first so the text variant is every kind's primary
//! encoder.
//!
//! [`MessageTypeRegistry`]: super::registry::MessageTypeRegistry

use crate::correlation::CorrelationId;
use crate::error::{EncodeError, MalformedReason, WireError};

use super::binary::{BinaryReader, BinaryWriter};
use super::command::{
    AckStatus, Acknowledgement, ActionBoot, AnalogBoot, ApiPlatform, BooleanBoot, BooleanNaming,
    BootHeader, Bootstrap, BootstrapPhase, ChangeValue, Command, CommandKind, DialogButton,
    DialogMode, DialogUpdate, EnumBoot, FloatBoot, Heartbeat, HeartbeatMode, Join, ListBoot,
    PairingRequest, SubMenuBoot, TextBoot, ValueChange,
};
use super::registry::Binding;
use super::tag_value::{TagValueMap, TagValueWriter};

pub const STANDARD_BINDINGS: [Binding; 19] = [
    Binding::tag_value(b"NJ", CommandKind::Join, encode_join, decode_join),
    Binding::tag_value(b"HB", CommandKind::Heartbeat, encode_heartbeat, decode_heartbeat),
    Binding::tag_value(b"BS", CommandKind::Bootstrap, encode_bootstrap, decode_bootstrap),
    Binding::tag_value(b"BA", CommandKind::AnalogBoot, encode_analog, decode_analog),
    Binding::tag_value(b"BE", CommandKind::EnumBoot, encode_enum, decode_enum),
    Binding::tag_value(b"BB", CommandKind::BooleanBoot, encode_boolean, decode_boolean),
    Binding::tag_value(b"BM", CommandKind::SubMenuBoot, encode_submenu, decode_submenu),
    Binding::tag_value(b"BC", CommandKind::ActionBoot, encode_action, decode_action),
    Binding::tag_value(b"BF", CommandKind::FloatBoot, encode_float, decode_float),
    Binding::tag_value(b"BT", CommandKind::TextBoot, encode_text, decode_text),
    Binding::tag_value(b"BL", CommandKind::ListBoot, encode_list, decode_list),
    Binding::tag_value(b"VC", CommandKind::ValueChange, encode_change, decode_change),
    Binding::tag_value(b"AK", CommandKind::Acknowledgement, encode_ack, decode_ack),
    Binding::tag_value(b"PR", CommandKind::PairingRequest, encode_pairing, decode_pairing),
    Binding::tag_value(b"DM", CommandKind::DialogUpdate, encode_dialog, decode_dialog),
    // Binary variants
    Binding::binary(b"HB", CommandKind::Heartbeat, encode_heartbeat_bin, decode_heartbeat_bin),
    Binding::binary(b"BS", CommandKind::Bootstrap, encode_bootstrap_bin, decode_bootstrap_bin),
    Binding::binary(b"VC", CommandKind::ValueChange, encode_change_bin, decode_change_bin),
    Binding::binary(b"AK", CommandKind::Acknowledgement, encode_ack_bin, decode_ack_bin),
];

/// Keys for list rows and enum choices: `CA`..`CZ`, then `Ca`..`Cz`.
pub const CHOICE_KEYS: [&str; 52] = [
    "CA", "CB", "CC", "CD", "CE", "CF", "CG", "CH", "CI", "CJ", "CK", "CL", "CM", "CN", "CO",
    "CP", "CQ", "CR", "CS", "CT", "CU", "CV", "CW", "CX", "CY", "CZ", "Ca", "Cb", "Cc", "Cd",
    "Ce", "Cf", "Cg", "Ch", "Ci", "Cj", "Ck", "Cl", "Cm", "Cn", "Co", "Cp", "Cq", "Cr", "Cs",
    "Ct", "Cu", "Cv", "Cw", "Cx", "Cy", "Cz",
];

fn bad(key: &'static str) -> WireError {
    WireError::Malformed(MalformedReason::BadFieldValue(key))
}

macro_rules! expect_variant {
    ($cmd:expr, $variant:ident) => {
        match $cmd {
            Command::$variant(inner) => inner,
            other => return Err(EncodeError::KindMismatch(other.kind())),
        }
    };
}

// ── Shared text fields ───────────────────────────────────────

fn write_header(w: &mut TagValueWriter, h: &BootHeader) {
    w.field("ID", h.id)
        .field("PI", h.parent_id)
        .field("NM", &h.name)
        .flag("RO", h.read_only)
        .flag("VI", h.visible);
}

fn read_header(m: &TagValueMap) -> Result<BootHeader, WireError> {
    Ok(BootHeader {
        id: m.parse("ID")?,
        parent_id: m.parse("PI")?,
        name: m.text("NM")?.to_owned(),
        read_only: m.flag("RO")?,
        visible: m.flag("VI")?,
    })
}

fn write_choices(w: &mut TagValueWriter, items: &[String]) -> Result<(), EncodeError> {
    if items.len() > CHOICE_KEYS.len() {
        return Err(EncodeError::FieldOverflow("NC"));
    }
    w.field("NC", items.len());
    for (key, item) in CHOICE_KEYS.iter().zip(items) {
        w.field(key, item);
    }
    Ok(())
}

fn read_choices(m: &TagValueMap) -> Result<Vec<String>, WireError> {
    let count: usize = m.parse("NC")?;
    let keys = CHOICE_KEYS.get(..count).ok_or_else(|| bad("NC"))?;
    keys.iter()
        .map(|&key| m.text(key).map(str::to_owned))
        .collect()
}

// ── Connection ───────────────────────────────────────────────

fn encode_join(cmd: &Command, w: &mut TagValueWriter) -> Result<(), EncodeError> {
    let j = expect_variant!(cmd, Join);
    w.field("NM", &j.name)
        .field("UU", &j.uuid)
        .field("VE", j.api_version)
        .field("PF", j.platform.code());
    Ok(())
}

fn decode_join(m: &TagValueMap) -> Result<Command, WireError> {
    Ok(Command::Join(Join {
        name: m.text("NM")?.to_owned(),
        uuid: m.text("UU")?.to_owned(),
        api_version: m.parse("VE")?,
        platform: ApiPlatform::from_code(m.parse("PF")?),
    }))
}

fn encode_heartbeat(cmd: &Command, w: &mut TagValueWriter) -> Result<(), EncodeError> {
    let hb = expect_variant!(cmd, Heartbeat);
    w.field("HI", hb.interval_ms).field("HR", hb.mode.code());
    Ok(())
}

fn decode_heartbeat(m: &TagValueMap) -> Result<Command, WireError> {
    Ok(Command::Heartbeat(Heartbeat {
        interval_ms: m.parse("HI")?,
        mode: HeartbeatMode::from_code(m.parse("HR")?).ok_or_else(|| bad("HR"))?,
    }))
}

fn encode_bootstrap(cmd: &Command, w: &mut TagValueWriter) -> Result<(), EncodeError> {
    let bs = expect_variant!(cmd, Bootstrap);
    w.field("BT", bs.phase.as_str());
    Ok(())
}

fn decode_bootstrap(m: &TagValueMap) -> Result<Command, WireError> {
    let phase = BootstrapPhase::parse(m.text("BT")?).ok_or_else(|| bad("BT"))?;
    Ok(Command::Bootstrap(Bootstrap { phase }))
}

// ── Boot commands ────────────────────────────────────────────

fn encode_analog(cmd: &Command, w: &mut TagValueWriter) -> Result<(), EncodeError> {
    let a = expect_variant!(cmd, AnalogBoot);
    write_header(w, &a.header);
    w.field("AM", a.max)
        .field("AO", a.offset)
        .field("AD", a.divisor)
        .field("AU", &a.unit)
        .field("VC", a.current);
    Ok(())
}

fn decode_analog(m: &TagValueMap) -> Result<Command, WireError> {
    Ok(Command::AnalogBoot(AnalogBoot {
        header: read_header(m)?,
        max: m.parse("AM")?,
        offset: m.parse("AO")?,
        divisor: m.parse("AD")?,
        unit: m.text("AU")?.to_owned(),
        current: m.parse("VC")?,
    }))
}

fn encode_enum(cmd: &Command, w: &mut TagValueWriter) -> Result<(), EncodeError> {
    let e = expect_variant!(cmd, EnumBoot);
    write_header(w, &e.header);
    write_choices(w, &e.choices)?;
    w.field("VC", e.current);
    Ok(())
}

fn decode_enum(m: &TagValueMap) -> Result<Command, WireError> {
    Ok(Command::EnumBoot(EnumBoot {
        header: read_header(m)?,
        choices: read_choices(m)?,
        current: m.parse("VC")?,
    }))
}

fn encode_boolean(cmd: &Command, w: &mut TagValueWriter) -> Result<(), EncodeError> {
    let b = expect_variant!(cmd, BooleanBoot);
    write_header(w, &b.header);
    w.field("BN", b.naming.code()).flag("VC", b.current);
    Ok(())
}

fn decode_boolean(m: &TagValueMap) -> Result<Command, WireError> {
    Ok(Command::BooleanBoot(BooleanBoot {
        header: read_header(m)?,
        naming: BooleanNaming::from_code(m.parse("BN")?).ok_or_else(|| bad("BN"))?,
        current: m.flag("VC")?,
    }))
}

fn encode_submenu(cmd: &Command, w: &mut TagValueWriter) -> Result<(), EncodeError> {
    write_header(w, &expect_variant!(cmd, SubMenuBoot).header);
    Ok(())
}

fn decode_submenu(m: &TagValueMap) -> Result<Command, WireError> {
    Ok(Command::SubMenuBoot(SubMenuBoot {
        header: read_header(m)?,
    }))
}

fn encode_action(cmd: &Command, w: &mut TagValueWriter) -> Result<(), EncodeError> {
    write_header(w, &expect_variant!(cmd, ActionBoot).header);
    Ok(())
}

fn decode_action(m: &TagValueMap) -> Result<Command, WireError> {
    Ok(Command::ActionBoot(ActionBoot {
        header: read_header(m)?,
    }))
}

fn encode_float(cmd: &Command, w: &mut TagValueWriter) -> Result<(), EncodeError> {
    let f = expect_variant!(cmd, FloatBoot);
    write_header(w, &f.header);
    w.field("FD", f.decimal_places).field("VC", f.current);
    Ok(())
}

fn decode_float(m: &TagValueMap) -> Result<Command, WireError> {
    Ok(Command::FloatBoot(FloatBoot {
        header: read_header(m)?,
        decimal_places: m.parse("FD")?,
        current: m.parse("VC")?,
    }))
}

fn encode_text(cmd: &Command, w: &mut TagValueWriter) -> Result<(), EncodeError> {
    let t = expect_variant!(cmd, TextBoot);
    write_header(w, &t.header);
    w.field("ML", t.max_length)
        .field("EM", t.edit_mode)
        .field("VC", &t.current);
    Ok(())
}

fn decode_text(m: &TagValueMap) -> Result<Command, WireError> {
    Ok(Command::TextBoot(TextBoot {
        header: read_header(m)?,
        max_length: m.parse("ML")?,
        edit_mode: m.parse("EM")?,
        current: m.text("VC")?.to_owned(),
    }))
}

fn encode_list(cmd: &Command, w: &mut TagValueWriter) -> Result<(), EncodeError> {
    let l = expect_variant!(cmd, ListBoot);
    write_header(w, &l.header);
    write_choices(w, &l.values)
}

fn decode_list(m: &TagValueMap) -> Result<Command, WireError> {
    Ok(Command::ListBoot(ListBoot {
        header: read_header(m)?,
        values: read_choices(m)?,
    }))
}

// ── Value change / acknowledgement ───────────────────────────

fn encode_change(cmd: &Command, w: &mut TagValueWriter) -> Result<(), EncodeError> {
    let vc = expect_variant!(cmd, ValueChange);
    w.field("ID", vc.item_id)
        .field("IC", vc.correlation)
        .field("TC", vc.change.type_code());
    match &vc.change {
        ChangeValue::Delta(delta) => {
            w.field("VC", delta);
        }
        ChangeValue::Absolute(value) => {
            w.field("VC", value);
        }
        ChangeValue::List(rows) => write_choices(w, rows)?,
    }
    Ok(())
}

fn decode_change(m: &TagValueMap) -> Result<Command, WireError> {
    let change = match m.parse::<u8>("TC")? {
        0 => ChangeValue::Delta(m.parse("VC")?),
        1 => ChangeValue::Absolute(m.text("VC")?.to_owned()),
        2 => ChangeValue::List(read_choices(m)?),
        _ => return Err(bad("TC")),
    };
    Ok(Command::ValueChange(ValueChange {
        item_id: m.parse("ID")?,
        correlation: m.parse("IC")?,
        change,
    }))
}

fn encode_ack(cmd: &Command, w: &mut TagValueWriter) -> Result<(), EncodeError> {
    let ak = expect_variant!(cmd, Acknowledgement);
    w.field("IC", ak.correlation).field("ST", ak.status.code());
    if let Some(id) = ak.item_id {
        w.field("ID", id);
    }
    Ok(())
}

fn decode_ack(m: &TagValueMap) -> Result<Command, WireError> {
    Ok(Command::Acknowledgement(Acknowledgement {
        correlation: m.parse("IC")?,
        status: AckStatus::from_code(m.parse("ST")?),
        item_id: m.parse_opt("ID")?,
    }))
}

// ── Pairing / dialogs ────────────────────────────────────────

fn encode_pairing(cmd: &Command, w: &mut TagValueWriter) -> Result<(), EncodeError> {
    let p = expect_variant!(cmd, PairingRequest);
    w.field("NM", &p.name).field("UU", &p.uuid);
    Ok(())
}

fn decode_pairing(m: &TagValueMap) -> Result<Command, WireError> {
    Ok(Command::PairingRequest(PairingRequest {
        name: m.text("NM")?.to_owned(),
        uuid: m.text("UU")?.to_owned(),
    }))
}

fn encode_dialog(cmd: &Command, w: &mut TagValueWriter) -> Result<(), EncodeError> {
    let d = expect_variant!(cmd, DialogUpdate);
    w.field("MO", d.mode.as_char())
        .field("HF", &d.header)
        .field("BU", &d.buffer)
        .field("B1", d.button1.code())
        .field("B2", d.button2.code())
        .field("IC", d.correlation);
    Ok(())
}

fn decode_dialog(m: &TagValueMap) -> Result<Command, WireError> {
    let button = |key: &'static str| -> Result<DialogButton, WireError> {
        DialogButton::from_code(m.parse(key)?).ok_or_else(|| bad(key))
    };
    Ok(Command::DialogUpdate(DialogUpdate {
        mode: DialogMode::parse(m.text("MO")?).ok_or_else(|| bad("MO"))?,
        header: m.text("HF")?.to_owned(),
        buffer: m.text("BU")?.to_owned(),
        button1: button("B1")?,
        button2: button("B2")?,
        correlation: m.parse_opt("IC")?.unwrap_or(CorrelationId::EMPTY),
    }))
}

// ── Binary schemas ───────────────────────────────────────────

fn encode_heartbeat_bin(cmd: &Command, w: &mut BinaryWriter) -> Result<(), EncodeError> {
    let hb = expect_variant!(cmd, Heartbeat);
    w.u32(hb.interval_ms).u8(hb.mode.code());
    Ok(())
}

fn decode_heartbeat_bin(r: &mut BinaryReader<'_>) -> Result<Command, WireError> {
    let interval_ms = r.u32()?;
    let mode = HeartbeatMode::from_code(r.u8()?).ok_or_else(|| bad("HR"))?;
    Ok(Command::Heartbeat(Heartbeat { interval_ms, mode }))
}

fn encode_bootstrap_bin(cmd: &Command, w: &mut BinaryWriter) -> Result<(), EncodeError> {
    let bs = expect_variant!(cmd, Bootstrap);
    w.u8(match bs.phase {
        BootstrapPhase::Start => 0,
        BootstrapPhase::End => 1,
    });
    Ok(())
}

fn decode_bootstrap_bin(r: &mut BinaryReader<'_>) -> Result<Command, WireError> {
    let phase = match r.u8()? {
        0 => BootstrapPhase::Start,
        1 => BootstrapPhase::End,
        _ => return Err(bad("BT")),
    };
    Ok(Command::Bootstrap(Bootstrap { phase }))
}

fn encode_change_bin(cmd: &Command, w: &mut BinaryWriter) -> Result<(), EncodeError> {
    let vc = expect_variant!(cmd, ValueChange);
    w.u16(vc.item_id)
        .u32(vc.correlation.raw())
        .u8(vc.change.type_code());
    match &vc.change {
        ChangeValue::Delta(delta) => {
            w.i32(*delta);
        }
        ChangeValue::Absolute(value) => {
            w.str("VC", value)?;
        }
        ChangeValue::List(rows) => {
            let count = u8::try_from(rows.len()).map_err(|_| EncodeError::FieldOverflow("NC"))?;
            w.u8(count);
            for row in rows {
                w.str("VC", row)?;
            }
        }
    }
    Ok(())
}

fn decode_change_bin(r: &mut BinaryReader<'_>) -> Result<Command, WireError> {
    let item_id = r.u16()?;
    let correlation = CorrelationId::from_raw(r.u32()?);
    let change = match r.u8()? {
        0 => ChangeValue::Delta(r.i32()?),
        1 => ChangeValue::Absolute(r.str()?),
        2 => {
            let count = r.u8()?;
            let rows = (0..count).map(|_| r.str()).collect::<Result<_, _>>()?;
            ChangeValue::List(rows)
        }
        _ => return Err(bad("TC")),
    };
    Ok(Command::ValueChange(ValueChange {
        item_id,
        correlation,
        change,
    }))
}

fn encode_ack_bin(cmd: &Command, w: &mut BinaryWriter) -> Result<(), EncodeError> {
    let ak = expect_variant!(cmd, Acknowledgement);
    w.u32(ak.correlation.raw()).i32(ak.status.code());
    match ak.item_id {
        Some(id) => w.u8(1).u16(id),
        None => w.u8(0),
    };
    Ok(())
}

fn decode_ack_bin(r: &mut BinaryReader<'_>) -> Result<Command, WireError> {
    let correlation = CorrelationId::from_raw(r.u32()?);
    let status = AckStatus::from_code(r.i32()?);
    let item_id = match r.u8()? {
        0 => None,
        1 => Some(r.u16()?),
        _ => return Err(bad("ID")),
    };
    Ok(Command::Acknowledgement(Acknowledgement {
        correlation,
        status,
        item_id,
    }))
}
