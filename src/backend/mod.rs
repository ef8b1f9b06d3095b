//! Backend helpers
//!
//! Access to the kernel devices this crate draws on and reads from.
//!
//! Supported output backends:
//!
//! - fbdev (`/dev/fbN`, 32 bit packed true-color modes)
//!
//! Supported input backends:
//!
//! - evdev (`/dev/input/eventN`, single-touch and slot based multi-touch devices)
//!
//! The [`renderer`] module provides the drawing seam shared by all of them.

pub mod evdev;
pub mod fbdev;
pub mod input;
pub mod renderer;
