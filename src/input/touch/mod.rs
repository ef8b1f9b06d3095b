//! Touch contact tracking
//!
//! [`TouchTracker`] folds a stream of [`TouchEvent`]s into a table of [`Contact`]s, one per
//! device slot, and hands out a [`RenderFrame`] at every synchronization boundary.
//!
//! Two protocol variants are understood:
//!
//! - the *single-touch* protocol (`ABS_X`, `ABS_Y` and `BTN_TOUCH`), with one implicit slot,
//! - the *slot based multi-touch* protocol (`ABS_MT_SLOT`, `ABS_MT_TRACKING_ID`,
//!   `ABS_MT_POSITION_X` and `ABS_MT_POSITION_Y`).
//!
//! Positions are kept in raw device units until a frame is committed, at which point they
//! are scaled into the surface rectangle with [`scale_axis`].

use tracing::{debug, trace};

use crate::{
    backend::input::{
        AbsInfo, AxisRange, EventKind, TouchEvent, ABS_MT_POSITION_X, ABS_MT_POSITION_Y, ABS_MT_SLOT,
        ABS_MT_TRACKING_ID, ABS_X, ABS_Y, BTN_TOUCH, SYN_DROPPED,
    },
    utils::{Physical, Point, Raw, Rectangle},
};

/// State of one touch slot in a committed frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Contact {
    /// Position on the surface
    pub position: Point<Physical>,
    /// Whether a finger is down in this slot
    pub active: bool,
}

/// The two most recently committed contact tables
///
/// Both tables have one entry per slot, in slot order.
#[derive(Debug, Clone, Copy)]
pub struct RenderFrame<'a> {
    /// Contacts of the frame before
    pub previous: &'a [Contact],
    /// Contacts of the frame just committed
    pub current: &'a [Contact],
}

impl<'a> RenderFrame<'a> {
    /// Iterate over the slots whose contact differs between both frames
    pub fn changed(&self) -> impl Iterator<Item = (usize, &'a Contact, &'a Contact)> {
        self.previous
            .iter()
            .zip(self.current)
            .enumerate()
            .filter(|(_, (previous, current))| previous != current)
            .map(|(slot, (previous, current))| (slot, previous, current))
    }
}

/// Linearly map a raw axis value into `extent` pixels starting at `origin`.
///
/// Computes `origin + extent * (raw - min) / (max - min)` with floor division. The result
/// is clamped to `origin..=origin + extent - 1`, so `raw == max` lands on the last pixel and
/// values outside of the reported range never leave the surface. An axis with an empty
/// range maps everything to `origin`.
pub fn scale_axis(raw: i32, range: AxisRange, origin: i32, extent: i32) -> i32 {
    let span = i64::from(range.maximum) - i64::from(range.minimum);
    if span <= 0 || extent <= 0 {
        return origin;
    }
    let offset = (i64::from(extent) * (i64::from(raw) - i64::from(range.minimum))).div_euclid(span);
    // in 0..extent after clamping, so it fits
    origin.saturating_add(offset.clamp(0, i64::from(extent) - 1) as i32)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Protocol {
    Single,
    Multi { slots: AxisRange },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingContact {
    position: Point<Raw>,
    active: bool,
}

/// Per slot contact state machine
///
/// Feed every decoded event to [`TouchTracker::process`]. Updates accumulate in a pending
/// table and only become visible when a synchronization event commits them.
#[derive(Debug)]
pub struct TouchTracker {
    protocol: Protocol,
    x: AxisRange,
    y: AxisRange,
    surface: Rectangle<Physical>,
    cursor: usize,
    pending: Vec<PendingContact>,
    previous: Vec<Contact>,
    current: Vec<Contact>,
}

impl TouchTracker {
    /// Track a device speaking the single-touch protocol
    ///
    /// The contact starts inactive at the position currently reported by the device.
    pub fn single(x: AbsInfo, y: AbsInfo, surface: Rectangle<Physical>) -> TouchTracker {
        TouchTracker::new(Protocol::Single, x, y, 1, 0, surface)
    }

    /// Track a device speaking the slot based multi-touch protocol
    ///
    /// One slot is allocated per value up to `slot.range.maximum`, and the slot cursor
    /// starts at the slot the device currently reports.
    pub fn multi(x: AbsInfo, y: AbsInfo, slot: AbsInfo, surface: Rectangle<Physical>) -> TouchTracker {
        let count = usize::try_from(i64::from(slot.range.maximum) + 1).unwrap_or(0);
        let cursor = slot_index(slot.range, count, slot.value).unwrap_or(0);
        TouchTracker::new(
            Protocol::Multi { slots: slot.range },
            x,
            y,
            count,
            cursor,
            surface,
        )
    }

    fn new(
        protocol: Protocol,
        x: AbsInfo,
        y: AbsInfo,
        count: usize,
        cursor: usize,
        surface: Rectangle<Physical>,
    ) -> TouchTracker {
        let pending = vec![
            PendingContact {
                position: Point::new(x.value, y.value),
                active: false,
            };
            count
        ];
        let mut tracker = TouchTracker {
            protocol,
            x: x.range,
            y: y.range,
            surface,
            cursor,
            pending,
            previous: Vec::with_capacity(count),
            current: Vec::with_capacity(count),
        };
        tracker.commit();
        tracker.previous.clone_from(&tracker.current);
        tracker
    }

    /// Whether this tracker follows the multi-touch protocol
    pub fn is_multi_touch(&self) -> bool {
        matches!(self.protocol, Protocol::Multi { .. })
    }

    /// Number of slots tracked
    pub fn slot_count(&self) -> usize {
        self.pending.len()
    }

    /// The slot the next multi-touch update applies to
    pub fn current_slot(&self) -> usize {
        self.cursor
    }

    /// The most recently committed contacts
    pub fn contacts(&self) -> &[Contact] {
        &self.current
    }

    /// Apply an event
    ///
    /// Returns the frame to render if the event committed one.
    #[profiling::function]
    pub fn process(&mut self, event: &TouchEvent) -> Option<RenderFrame<'_>> {
        match (event.kind, self.protocol) {
            (EventKind::Synchronization, _) => {
                if event.code == SYN_DROPPED {
                    debug!("kernel dropped touch events, committing what was received");
                }
                std::mem::swap(&mut self.previous, &mut self.current);
                self.commit();
                trace!(contacts = ?self.current, "committed touch frame");
                return Some(RenderFrame {
                    previous: &self.previous,
                    current: &self.current,
                });
            }
            (EventKind::Key, Protocol::Single) if event.code == BTN_TOUCH => {
                self.pending[0].active = event.value != 0;
            }
            (EventKind::AbsoluteAxis, Protocol::Single) => match event.code {
                ABS_X => self.pending[0].position.x = event.value,
                ABS_Y => self.pending[0].position.y = event.value,
                _ => {}
            },
            (EventKind::AbsoluteAxis, Protocol::Multi { slots }) => match event.code {
                ABS_MT_SLOT => {
                    if let Some(slot) = slot_index(slots, self.pending.len(), event.value) {
                        self.cursor = slot;
                    } else {
                        trace!(slot = event.value, "ignoring slot outside of the reported range");
                    }
                }
                ABS_MT_TRACKING_ID => {
                    if let Some(contact) = self.pending.get_mut(self.cursor) {
                        contact.active = event.value != -1;
                    }
                }
                ABS_MT_POSITION_X => {
                    if let Some(contact) = self.pending.get_mut(self.cursor) {
                        contact.position.x = event.value;
                    }
                }
                ABS_MT_POSITION_Y => {
                    if let Some(contact) = self.pending.get_mut(self.cursor) {
                        contact.position.y = event.value;
                    }
                }
                _ => {}
            },
            _ => {}
        }
        None
    }

    fn commit(&mut self) {
        let TouchTracker {
            x,
            y,
            surface,
            pending,
            current,
            ..
        } = self;
        current.clear();
        current.extend(pending.iter().map(|contact| Contact {
            position: Point::new(
                scale_axis(contact.position.x, *x, surface.loc.x, surface.size.w),
                scale_axis(contact.position.y, *y, surface.loc.y, surface.size.h),
            ),
            active: contact.active,
        }));
    }
}

fn slot_index(range: AxisRange, count: usize, value: i32) -> Option<usize> {
    if !range.contains(value) {
        return None;
    }
    usize::try_from(value).ok().filter(|slot| *slot < count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axis(minimum: i32, maximum: i32) -> AbsInfo {
        AbsInfo {
            range: AxisRange::new(minimum, maximum),
            ..Default::default()
        }
    }

    fn surface() -> Rectangle<Physical> {
        Rectangle::from_size((100, 100))
    }

    fn feed<'a>(tracker: &'a mut TouchTracker, events: &[TouchEvent]) -> Option<RenderFrame<'a>> {
        let (last, rest) = events.split_last()?;
        for event in rest {
            assert!(tracker.process(event).is_none(), "{:?} committed a frame", event);
        }
        tracker.process(last)
    }

    #[test]
    fn scaling_boundaries() {
        let range = AxisRange::new(0, 1000);
        assert_eq!(scale_axis(0, range, 0, 100), 0);
        assert_eq!(scale_axis(1000, range, 0, 100), 99);
        assert_eq!(scale_axis(500, range, 0, 100), 50);
        assert_eq!(scale_axis(9, range, 0, 100), 0);
        assert_eq!(scale_axis(10, range, 0, 100), 1);
        assert_eq!(scale_axis(500, range, 20, 100), 70);
    }

    #[test]
    fn scaling_negative_minimum_floors() {
        let range = AxisRange::new(-100, 100);
        assert_eq!(scale_axis(-100, range, 0, 10), 0);
        assert_eq!(scale_axis(0, range, 0, 10), 5);
        assert_eq!(scale_axis(-81, range, 0, 10), 0);
        assert_eq!(scale_axis(-80, range, 0, 10), 1);
        assert_eq!(scale_axis(100, range, 0, 10), 9);
    }

    #[test]
    fn scaling_is_monotonic_and_bounded() {
        for (range, extent) in [
            (AxisRange::new(0, 4095), 800),
            (AxisRange::new(-32768, 32767), 1920),
            (AxisRange::new(10, 17), 1080),
            (AxisRange::new(0, 1), 3),
        ] {
            let mut last = i32::MIN;
            for raw in (range.minimum - 5)..=(range.maximum + 5) {
                let scaled = scale_axis(raw, range, 7, extent);
                assert!(scaled >= last, "{:?} not monotonic at {}", range, raw);
                assert!((7..7 + extent).contains(&scaled));
                last = scaled;
            }
            assert_eq!(scale_axis(range.minimum, range, 7, extent), 7);
            assert_eq!(scale_axis(range.maximum, range, 7, extent), 7 + extent - 1);
        }
    }

    #[test]
    fn scaling_degenerate_axis() {
        assert_eq!(scale_axis(5, AxisRange::new(5, 5), 3, 100), 3);
        assert_eq!(scale_axis(5, AxisRange::new(10, 0), 3, 100), 3);
        assert_eq!(scale_axis(5, AxisRange::new(0, 10), 3, 0), 3);
        assert_eq!(scale_axis(i32::MAX, AxisRange::new(i32::MIN, i32::MAX), 0, i32::MAX), i32::MAX - 1);
    }

    #[test]
    fn multi_touch_press_and_release() {
        let mut tracker = TouchTracker::multi(axis(0, 1000), axis(0, 1000), axis(0, 1), surface());
        assert_eq!(tracker.slot_count(), 2);

        let frame = feed(
            &mut tracker,
            &[
                TouchEvent::abs(ABS_MT_SLOT, 0),
                TouchEvent::abs(ABS_MT_TRACKING_ID, 5),
                TouchEvent::abs(ABS_MT_POSITION_X, 500),
                TouchEvent::abs(ABS_MT_POSITION_Y, 500),
                TouchEvent::sync(),
            ],
        )
        .unwrap();
        assert_eq!(
            frame.current[0],
            Contact {
                position: Point::new(50, 50),
                active: true
            }
        );
        assert!(!frame.current[1].active);
        assert_eq!(frame.changed().map(|(slot, _, _)| slot).collect::<Vec<_>>(), vec![0]);

        let frame = feed(
            &mut tracker,
            &[TouchEvent::abs(ABS_MT_TRACKING_ID, -1), TouchEvent::sync()],
        )
        .unwrap();
        assert!(frame.previous[0].active);
        assert_eq!(
            frame.current[0],
            Contact {
                position: Point::new(50, 50),
                active: false
            }
        );
    }

    #[test]
    fn single_touch_scenario() {
        let mut tracker = TouchTracker::single(axis(0, 1000), axis(0, 1000), surface());
        assert!(!tracker.is_multi_touch());
        let frame = feed(
            &mut tracker,
            &[
                TouchEvent::abs(ABS_X, 250),
                TouchEvent::abs(ABS_Y, 750),
                TouchEvent::key(BTN_TOUCH, 1),
                TouchEvent::sync(),
            ],
        )
        .unwrap();
        assert_eq!(
            frame.current,
            &[Contact {
                position: Point::new(25, 75),
                active: true
            }]
        );

        feed(&mut tracker, &[TouchEvent::key(BTN_TOUCH, 0), TouchEvent::sync()]).unwrap();
        assert!(!tracker.contacts()[0].active);
        assert_eq!(tracker.contacts()[0].position, Point::new(25, 75));
    }

    #[test]
    fn single_touch_starts_at_reported_position() {
        let mut x = axis(0, 1000);
        x.value = 100;
        let mut y = axis(0, 1000);
        y.value = 200;
        let tracker = TouchTracker::single(x, y, surface());
        assert_eq!(
            tracker.contacts(),
            &[Contact {
                position: Point::new(10, 20),
                active: false
            }]
        );
    }

    #[test]
    fn slot_cursor_stays_in_range() {
        let mut slot = axis(0, 3);
        slot.value = 2;
        let mut tracker = TouchTracker::multi(axis(0, 1000), axis(0, 1000), slot, surface());
        assert_eq!(tracker.current_slot(), 2);

        for value in [-1, 4, 100] {
            tracker.process(&TouchEvent::abs(ABS_MT_SLOT, value));
            assert_eq!(tracker.current_slot(), 2);
        }
        tracker.process(&TouchEvent::abs(ABS_MT_SLOT, 3));
        assert_eq!(tracker.current_slot(), 3);

        slot.value = 9;
        let tracker = TouchTracker::multi(axis(0, 1000), axis(0, 1000), slot, surface());
        assert_eq!(tracker.current_slot(), 0);
    }

    #[test]
    fn updates_are_invisible_until_sync() {
        let mut tracker = TouchTracker::multi(axis(0, 1000), axis(0, 1000), axis(0, 1), surface());
        tracker.process(&TouchEvent::abs(ABS_MT_SLOT, 1));
        tracker.process(&TouchEvent::abs(ABS_MT_TRACKING_ID, 7));
        tracker.process(&TouchEvent::abs(ABS_MT_POSITION_X, 1000));
        assert!(tracker.contacts().iter().all(|contact| !contact.active));

        let frame = tracker.process(&TouchEvent::sync()).unwrap();
        assert_eq!(frame.current[1].position, Point::new(99, 0));
        assert!(frame.current[1].active);
        assert!(!frame.current[0].active);
    }

    #[test]
    fn foreign_events_are_ignored() {
        let mut tracker = TouchTracker::multi(axis(0, 1000), axis(0, 1000), axis(0, 1), surface());
        for event in [
            TouchEvent::new(EventKind::Other(0x04), 0x05, 1),
            TouchEvent::key(BTN_TOUCH, 1),
            TouchEvent::abs(ABS_X, 1000),
            TouchEvent::abs(0x3a, 255),
        ] {
            assert!(tracker.process(&event).is_none());
        }
        let frame = tracker.process(&TouchEvent::sync()).unwrap();
        assert_eq!(frame.changed().count(), 0);
    }

    #[test]
    fn surface_origin_is_honored() {
        let surface = Rectangle::from_loc_and_size((40, 30), (100, 100));
        let mut tracker = TouchTracker::single(axis(0, 1000), axis(0, 1000), surface);
        feed(
            &mut tracker,
            &[TouchEvent::abs(ABS_X, 1000), TouchEvent::abs(ABS_Y, 0), TouchEvent::sync()],
        );
        assert_eq!(tracker.contacts()[0].position, Point::new(139, 30));
    }

    #[test]
    fn dropped_events_still_commit() {
        let mut tracker = TouchTracker::single(axis(0, 1000), axis(0, 1000), surface());
        let frame = feed(
            &mut tracker,
            &[
                TouchEvent::key(BTN_TOUCH, 1),
                TouchEvent::abs(ABS_X, 500),
                TouchEvent::new(EventKind::Synchronization, SYN_DROPPED, 0),
            ],
        )
        .unwrap();
        assert_eq!(
            frame.current[0],
            Contact {
                position: Point::new(50, 0),
                active: true
            }
        );
        assert_eq!(frame.changed().count(), 1);
    }
}
