//! Input state tracking
//!
//! Backends in [`crate::backend`] produce raw [`TouchEvent`](crate::backend::input::TouchEvent)s,
//! this module turns them into per contact state that can be rendered.

pub mod touch;
