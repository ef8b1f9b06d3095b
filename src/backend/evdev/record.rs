//! Byte layouts of the kernel's evdev records.
//!
//! Both `struct input_event` and `struct input_absinfo` are decoded from raw bytes
//! through the functions in this module and nowhere else.

use std::ffi::c_long;
use std::mem::size_of;

use crate::backend::input::{AbsInfo, AxisRange, EventKind, TouchEvent};

/// Width of one `struct timeval` field.
const TIMEVAL_FIELD: usize = size_of::<c_long>();

/// Size of `struct input_event`: a `struct timeval`, two `u16` and one `i32`.
pub const INPUT_EVENT_SIZE: usize = 2 * TIMEVAL_FIELD + 8;

/// Size of `struct input_absinfo`: six `i32`.
pub const ABS_INFO_SIZE: usize = 24;

fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

fn read_i32(bytes: &[u8], offset: usize) -> i32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&bytes[offset..offset + 4]);
    i32::from_le_bytes(raw)
}

fn read_long(bytes: &[u8], offset: usize) -> i64 {
    if TIMEVAL_FIELD == 8 {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&bytes[offset..offset + 8]);
        i64::from_le_bytes(raw)
    } else {
        read_i32(bytes, offset) as i64
    }
}

/// Decode one `struct input_event`.
///
/// `record` must be exactly [`INPUT_EVENT_SIZE`] bytes long.
pub fn decode_event(record: &[u8]) -> TouchEvent {
    debug_assert_eq!(record.len(), INPUT_EVENT_SIZE);

    let sec = read_long(record, 0);
    let usec = read_long(record, TIMEVAL_FIELD);
    let fields = 2 * TIMEVAL_FIELD;

    TouchEvent {
        kind: EventKind::from(read_u16(record, fields)),
        code: read_u16(record, fields + 2),
        value: read_i32(record, fields + 4),
        time: (sec.max(0) as u64)
            .saturating_mul(1_000_000)
            .saturating_add(usec.max(0) as u64),
    }
}

/// Encode one `struct input_event`, the inverse of [`decode_event`].
///
/// Used to synthesize event streams.
pub fn encode_event(event: &TouchEvent) -> [u8; INPUT_EVENT_SIZE] {
    let mut record = [0u8; INPUT_EVENT_SIZE];
    let sec = (event.time / 1_000_000) as i64;
    let usec = (event.time % 1_000_000) as i64;
    record[..TIMEVAL_FIELD].copy_from_slice(&sec.to_le_bytes()[..TIMEVAL_FIELD]);
    record[TIMEVAL_FIELD..2 * TIMEVAL_FIELD].copy_from_slice(&usec.to_le_bytes()[..TIMEVAL_FIELD]);
    let fields = 2 * TIMEVAL_FIELD;
    record[fields..fields + 2].copy_from_slice(&event.kind.raw().to_le_bytes());
    record[fields + 2..fields + 4].copy_from_slice(&event.code.to_le_bytes());
    record[fields + 4..fields + 8].copy_from_slice(&event.value.to_le_bytes());
    record
}

/// Decode one `struct input_absinfo`.
///
/// Field order is value, minimum, maximum, fuzz, flat, resolution.
pub fn decode_abs_info(record: &[u8; ABS_INFO_SIZE]) -> AbsInfo {
    AbsInfo {
        value: read_i32(record, 0),
        range: AxisRange::new(read_i32(record, 4), read_i32(record, 8)),
        fuzz: read_i32(record, 12),
        flat: read_i32(record, 16),
        resolution: read_i32(record, 20),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::input::{ABS_MT_TRACKING_ID, EV_ABS};

    #[test]
    fn event_fields_little_endian() {
        let mut record = [0u8; INPUT_EVENT_SIZE];
        record[0] = 2;
        record[TIMEVAL_FIELD] = 5;
        let fields = 2 * TIMEVAL_FIELD;
        record[fields] = EV_ABS as u8;
        record[fields + 2] = ABS_MT_TRACKING_ID as u8;
        record[fields + 4..fields + 8].copy_from_slice(&(-1i32).to_le_bytes());

        let event = decode_event(&record);
        assert_eq!(event.kind, EventKind::AbsoluteAxis);
        assert_eq!(event.code, ABS_MT_TRACKING_ID);
        assert_eq!(event.value, -1);
        assert_eq!(event.time, 2_000_005);
    }

    #[test]
    fn unknown_kind_is_preserved() {
        let event = TouchEvent::new(EventKind::Other(0x04), 0x05, 1234);
        let decoded = decode_event(&encode_event(&event));
        assert_eq!(decoded.kind, EventKind::Other(0x04));
        assert_eq!(decoded.value, 1234);
    }

    #[test]
    fn abs_info_field_order() {
        let mut record = [0u8; ABS_INFO_SIZE];
        for (i, value) in [3i32, -10, 4095, 8, 0, 12].iter().enumerate() {
            record[i * 4..i * 4 + 4].copy_from_slice(&value.to_le_bytes());
        }
        let info = decode_abs_info(&record);
        assert_eq!(info.value, 3);
        assert_eq!(info.range, AxisRange::new(-10, 4095));
        assert_eq!(info.fuzz, 8);
        assert_eq!(info.resolution, 12);
    }
}
