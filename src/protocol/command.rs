//! The closed set of commands exchanged with a remote menu device.
//!
//! Every variant has a fixed field schema (see [`super::catalog`]).
//! Dispatch over commands is an exhaustive `match`, so adding a variant
//! forces every encoder table and handler to be revisited.

use core::fmt;

use crate::correlation::CorrelationId;

/// Identifier of a menu item on the remote device.
pub type MenuItemId = u16;

/// A decoded (or to-be-encoded) protocol command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Join(Join),
    Heartbeat(Heartbeat),
    Bootstrap(Bootstrap),
    AnalogBoot(AnalogBoot),
    EnumBoot(EnumBoot),
    BooleanBoot(BooleanBoot),
    SubMenuBoot(SubMenuBoot),
    ActionBoot(ActionBoot),
    FloatBoot(FloatBoot),
    TextBoot(TextBoot),
    ListBoot(ListBoot),
    ValueChange(ValueChange),
    Acknowledgement(Acknowledgement),
    PairingRequest(PairingRequest),
    DialogUpdate(DialogUpdate),
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Self::Join(_) => CommandKind::Join,
            Self::Heartbeat(_) => CommandKind::Heartbeat,
            Self::Bootstrap(_) => CommandKind::Bootstrap,
            Self::AnalogBoot(_) => CommandKind::AnalogBoot,
            Self::EnumBoot(_) => CommandKind::EnumBoot,
            Self::BooleanBoot(_) => CommandKind::BooleanBoot,
            Self::SubMenuBoot(_) => CommandKind::SubMenuBoot,
            Self::ActionBoot(_) => CommandKind::ActionBoot,
            Self::FloatBoot(_) => CommandKind::FloatBoot,
            Self::TextBoot(_) => CommandKind::TextBoot,
            Self::ListBoot(_) => CommandKind::ListBoot,
            Self::ValueChange(_) => CommandKind::ValueChange,
            Self::Acknowledgement(_) => CommandKind::Acknowledgement,
            Self::PairingRequest(_) => CommandKind::PairingRequest,
            Self::DialogUpdate(_) => CommandKind::DialogUpdate,
        }
    }

    /// Header of a per-item boot command, `None` for everything else.
    pub fn boot_header(&self) -> Option<&BootHeader> {
        match self {
            Self::AnalogBoot(b) => Some(&b.header),
            Self::EnumBoot(b) => Some(&b.header),
            Self::BooleanBoot(b) => Some(&b.header),
            Self::SubMenuBoot(b) => Some(&b.header),
            Self::ActionBoot(b) => Some(&b.header),
            Self::FloatBoot(b) => Some(&b.header),
            Self::TextBoot(b) => Some(&b.header),
            Self::ListBoot(b) => Some(&b.header),
            _ => None,
        }
    }
}

/// Field-less mirror of [`Command`], used as the registry's encoder key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Join,
    Heartbeat,
    Bootstrap,
    AnalogBoot,
    EnumBoot,
    BooleanBoot,
    SubMenuBoot,
    ActionBoot,
    FloatBoot,
    TextBoot,
    ListBoot,
    ValueChange,
    Acknowledgement,
    PairingRequest,
    DialogUpdate,
}

impl CommandKind {
    /// Every kind; the registry's completeness check walks this list.
    pub const ALL: [Self; 15] = [
        Self::Join,
        Self::Heartbeat,
        Self::Bootstrap,
        Self::AnalogBoot,
        Self::EnumBoot,
        Self::BooleanBoot,
        Self::SubMenuBoot,
        Self::ActionBoot,
        Self::FloatBoot,
        Self::TextBoot,
        Self::ListBoot,
        Self::ValueChange,
        Self::Acknowledgement,
        Self::PairingRequest,
        Self::DialogUpdate,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Join => "Join",
            Self::Heartbeat => "Heartbeat",
            Self::Bootstrap => "Bootstrap",
            Self::AnalogBoot => "AnalogBoot",
            Self::EnumBoot => "EnumBoot",
            Self::BooleanBoot => "BooleanBoot",
            Self::SubMenuBoot => "SubMenuBoot",
            Self::ActionBoot => "ActionBoot",
            Self::FloatBoot => "FloatBoot",
            Self::TextBoot => "TextBoot",
            Self::ListBoot => "ListBoot",
            Self::ValueChange => "ValueChange",
            Self::Acknowledgement => "Acknowledgement",
            Self::PairingRequest => "PairingRequest",
            Self::DialogUpdate => "DialogUpdate",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── Connection ───────────────────────────────────────────────

/// Sent by each side when a connection opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    pub name: String,
    pub uuid: String,
    pub api_version: u16,
    pub platform: ApiPlatform,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiPlatform {
    Arduino8,
    Arduino32,
    Desktop,
    Mbed,
    Other(u16),
}

impl ApiPlatform {
    pub const fn code(self) -> u16 {
        match self {
            Self::Arduino8 => 0,
            Self::Desktop => 1,
            Self::Arduino32 => 2,
            Self::Mbed => 3,
            Self::Other(code) => code,
        }
    }

    pub const fn from_code(code: u16) -> Self {
        match code {
            0 => Self::Arduino8,
            1 => Self::Desktop,
            2 => Self::Arduino32,
            3 => Self::Mbed,
            other => Self::Other(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Heartbeat {
    pub interval_ms: u32,
    pub mode: HeartbeatMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatMode {
    Normal,
    /// First heartbeat after the link comes up.
    Start,
    /// Graceful close.
    End,
}

impl HeartbeatMode {
    pub const fn code(self) -> u8 {
        match self {
            Self::Normal => 0,
            Self::Start => 1,
            Self::End => 2,
        }
    }

    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Normal),
            1 => Some(Self::Start),
            2 => Some(Self::End),
            _ => None,
        }
    }
}

/// Brackets the stream of boot commands describing the menu tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bootstrap {
    pub phase: BootstrapPhase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapPhase {
    Start,
    End,
}

impl BootstrapPhase {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "START",
            Self::End => "END",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "START" => Some(Self::Start),
            "END" => Some(Self::End),
            _ => None,
        }
    }
}

// ── Menu item boot ───────────────────────────────────────────

/// Fields shared by every per-item boot command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootHeader {
    pub id: MenuItemId,
    pub parent_id: MenuItemId,
    pub name: String,
    pub read_only: bool,
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalogBoot {
    pub header: BootHeader,
    pub max: u16,
    pub offset: i32,
    pub divisor: u16,
    pub unit: String,
    pub current: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumBoot {
    pub header: BootHeader,
    pub choices: Vec<String>,
    pub current: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BooleanBoot {
    pub header: BootHeader,
    pub naming: BooleanNaming,
    pub current: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanNaming {
    TrueFalse,
    OnOff,
    YesNo,
}

impl BooleanNaming {
    pub const fn code(self) -> u8 {
        match self {
            Self::TrueFalse => 0,
            Self::OnOff => 1,
            Self::YesNo => 2,
        }
    }

    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::TrueFalse),
            1 => Some(Self::OnOff),
            2 => Some(Self::YesNo),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubMenuBoot {
    pub header: BootHeader,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionBoot {
    pub header: BootHeader,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FloatBoot {
    pub header: BootHeader,
    pub decimal_places: u8,
    pub current: f32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextBoot {
    pub header: BootHeader,
    pub max_length: u16,
    /// Device-defined edit mode (plain text, IP address, time, ...).
    pub edit_mode: u8,
    pub current: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListBoot {
    pub header: BootHeader,
    pub values: Vec<String>,
}

// ── Value change / acknowledgement ───────────────────────────

/// Request (or notification) that an item's value changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueChange {
    pub item_id: MenuItemId,
    /// [`CorrelationId::EMPTY`] for fire-and-forget or device-originated.
    pub correlation: CorrelationId,
    pub change: ChangeValue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeValue {
    /// Relative step, e.g. an encoder turned by `n` clicks.
    Delta(i32),
    /// New value in its textual form.
    Absolute(String),
    /// Full replacement of a list item's rows.
    List(Vec<String>),
}

impl ChangeValue {
    /// Wire discriminant (`TC` field).
    pub const fn type_code(&self) -> u8 {
        match self {
            Self::Delta(_) => 0,
            Self::Absolute(_) => 1,
            Self::List(_) => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Acknowledgement {
    pub correlation: CorrelationId,
    pub status: AckStatus,
    pub item_id: Option<MenuItemId>,
}

/// Outcome of processing a command on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckStatus {
    ValueRangeWarning,
    Success,
    IdNotFound,
    InvalidCredentials,
    UnknownError,
}

impl AckStatus {
    pub const fn code(self) -> i32 {
        match self {
            Self::ValueRangeWarning => -1,
            Self::Success => 0,
            Self::IdNotFound => 1,
            Self::InvalidCredentials => 2,
            Self::UnknownError => 10_000,
        }
    }

    /// Codes outside the defined set collapse to `UnknownError`.
    pub const fn from_code(code: i32) -> Self {
        match code {
            -1 => Self::ValueRangeWarning,
            0 => Self::Success,
            1 => Self::IdNotFound,
            2 => Self::InvalidCredentials,
            _ => Self::UnknownError,
        }
    }

    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for AckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValueRangeWarning => write!(f, "value out of range"),
            Self::Success => write!(f, "ok"),
            Self::IdNotFound => write!(f, "id not found"),
            Self::InvalidCredentials => write!(f, "invalid credentials"),
            Self::UnknownError => write!(f, "unknown error"),
        }
    }
}

// ── Pairing / dialogs ────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairingRequest {
    pub name: String,
    pub uuid: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogUpdate {
    pub mode: DialogMode,
    pub header: String,
    pub buffer: String,
    pub button1: DialogButton,
    pub button2: DialogButton,
    pub correlation: CorrelationId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogMode {
    Show,
    Hide,
    /// A button was pressed.
    Action,
}

impl DialogMode {
    pub const fn as_char(self) -> char {
        match self {
            Self::Show => 'S',
            Self::Hide => 'H',
            Self::Action => 'A',
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "S" => Some(Self::Show),
            "H" => Some(Self::Hide),
            "A" => Some(Self::Action),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogButton {
    Ok,
    Accept,
    Cancel,
    Close,
    None,
}

impl DialogButton {
    pub const fn code(self) -> u8 {
        match self {
            Self::Ok => 0,
            Self::Accept => 1,
            Self::Cancel => 2,
            Self::Close => 3,
            Self::None => 4,
        }
    }

    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Ok),
            1 => Some(Self::Accept),
            2 => Some(Self::Cancel),
            3 => Some(Self::Close),
            4 => Some(Self::None),
            _ => None,
        }
    }
}
