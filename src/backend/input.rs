//! Common types for touch input, independent of the device they are read from.
//!
//! Event kinds and codes follow `linux/input-event-codes.h`.

/// Kind of a [`TouchEvent`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Marks the end of a consistent batch of updates (`EV_SYN`)
    Synchronization,
    /// Key or button state change (`EV_KEY`)
    Key,
    /// Absolute axis value change (`EV_ABS`)
    AbsoluteAxis,
    /// Any other event type, carried through undecoded
    Other(u16),
}

impl EventKind {
    /// Raw `EV_*` value of this kind
    pub fn raw(self) -> u16 {
        match self {
            EventKind::Synchronization => EV_SYN,
            EventKind::Key => EV_KEY,
            EventKind::AbsoluteAxis => EV_ABS,
            EventKind::Other(raw) => raw,
        }
    }
}

impl From<u16> for EventKind {
    fn from(raw: u16) -> Self {
        match raw {
            EV_SYN => EventKind::Synchronization,
            EV_KEY => EventKind::Key,
            EV_ABS => EventKind::AbsoluteAxis,
            other => EventKind::Other(other),
        }
    }
}

/// `EV_SYN`
pub const EV_SYN: u16 = 0x00;
/// `EV_KEY`
pub const EV_KEY: u16 = 0x01;
/// `EV_ABS`
pub const EV_ABS: u16 = 0x03;

/// `SYN_REPORT`
pub const SYN_REPORT: u16 = 0x00;
/// `SYN_DROPPED`
pub const SYN_DROPPED: u16 = 0x03;

/// `BTN_TOUCH`
pub const BTN_TOUCH: u16 = 0x14a;

/// `ABS_X`
pub const ABS_X: u16 = 0x00;
/// `ABS_Y`
pub const ABS_Y: u16 = 0x01;
/// `ABS_MT_SLOT`
pub const ABS_MT_SLOT: u16 = 0x2f;
/// `ABS_MT_POSITION_X`
pub const ABS_MT_POSITION_X: u16 = 0x35;
/// `ABS_MT_POSITION_Y`
pub const ABS_MT_POSITION_Y: u16 = 0x36;
/// `ABS_MT_TRACKING_ID`
pub const ABS_MT_TRACKING_ID: u16 = 0x39;

/// A single decoded input event
///
/// Events are produced by the decoder and consumed exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TouchEvent {
    /// Kind of the event
    pub kind: EventKind,
    /// Kind specific code, e.g. the axis of an [`EventKind::AbsoluteAxis`] event
    pub code: u16,
    /// Kind specific value
    pub value: i32,
    /// Kernel timestamp in microseconds.
    ///
    /// Useful for event ordering only, the tracker does not look at it.
    pub time: u64,
}

impl TouchEvent {
    /// Construct a new event without a timestamp
    pub fn new(kind: EventKind, code: u16, value: i32) -> Self {
        TouchEvent {
            kind,
            code,
            value,
            time: 0,
        }
    }

    /// A `SYN_REPORT` event
    pub fn sync() -> Self {
        TouchEvent::new(EventKind::Synchronization, SYN_REPORT, 0)
    }

    /// An absolute axis event
    pub fn abs(code: u16, value: i32) -> Self {
        TouchEvent::new(EventKind::AbsoluteAxis, code, value)
    }

    /// A key event
    pub fn key(code: u16, value: i32) -> Self {
        TouchEvent::new(EventKind::Key, code, value)
    }
}

/// Absolute axis that can be queried from an input device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// `ABS_X`
    X,
    /// `ABS_Y`
    Y,
    /// `ABS_MT_SLOT`
    Slot,
}

impl Axis {
    /// The `ABS_*` code of this axis
    pub fn code(self) -> u16 {
        match self {
            Axis::X => ABS_X,
            Axis::Y => ABS_Y,
            Axis::Slot => ABS_MT_SLOT,
        }
    }
}

/// Raw device reported bounds of an axis, both ends inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AxisRange {
    /// Smallest value the device reports
    pub minimum: i32,
    /// Largest value the device reports
    pub maximum: i32,
}

impl AxisRange {
    /// Create a new range
    pub fn new(minimum: i32, maximum: i32) -> Self {
        AxisRange { minimum, maximum }
    }

    /// Check if a raw value lies inside this range
    pub fn contains(&self, value: i32) -> bool {
        self.minimum <= value && value <= self.maximum
    }
}

/// Full axis information as reported by `EVIOCGABS`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AbsInfo {
    /// Current value of the axis
    pub value: i32,
    /// Reported bounds
    pub range: AxisRange,
    /// Noise filter threshold
    pub fuzz: i32,
    /// Dead zone
    pub flat: i32,
    /// Resolution in units per millimeter
    pub resolution: i32,
}
