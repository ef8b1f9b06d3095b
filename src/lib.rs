#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]

//! # fbtools: drawing on the Linux framebuffer without a display server
//!
//! This crate gives a process direct access to a `/dev/fbN` display device and to raw
//! `/dev/input/eventN` touch devices, and ties them together to visualise multi-touch
//! input live on screen.
//!
//! ## Structure of the crate
//!
//! - [`backend`] contains everything that talks to the kernel: the framebuffer
//!   ([`backend::fbdev`]), raw evdev input ([`backend::evdev`]) and the software
//!   drawing helpers built on top of them ([`backend::renderer`]).
//! - [`input`] turns decoded input events into per contact state.
//! - [`utils`] holds the geometry types shared by everything else.
//!
//! The crate is strictly single threaded and blocking: a tool reads a batch of input
//! events, updates its tracker and draws, then reads again.
//!
//! ### Logging
//!
//! fbtools uses [`tracing`] for its internal logging. Device handles carry their own span,
//! so a subscriber sees which device a message originates from. The binaries shipped with
//! this crate honor `RUST_LOG`.

pub mod backend;
pub mod input;
pub mod utils;
