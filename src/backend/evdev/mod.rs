//! Raw evdev input backend
//!
//! Reads `struct input_event` records straight from a `/dev/input/eventN` node, without
//! going through libinput. The stream is exposed as a lazy, never ending sequence of
//! decoded batches through [`EventBatches`]: every item corresponds to one blocking
//! `read(2)` on the device.
//!
//! ```no_run
//! use fbtools::backend::evdev::EvdevDevice;
//!
//! let device = EvdevDevice::open("/dev/input/event0")?;
//! for batch in device.batches() {
//!     for event in batch? {
//!         println!("{:?}", event);
//!     }
//! }
//! # Ok::<(), fbtools::backend::evdev::Error>(())
//! ```

use std::{
    fs::File,
    io::{self, Read},
    os::unix::io::{AsFd, BorrowedFd},
    path::{Path, PathBuf},
};

use rustix::ioctl::{ioctl, Getter, IntegerSetter, ReadOpcode, WriteOpcode};
use tracing::{debug, debug_span, info, trace};

use crate::backend::input::{AbsInfo, Axis, TouchEvent};

mod record;

pub use self::record::{decode_abs_info, decode_event, encode_event, ABS_INFO_SIZE, INPUT_EVENT_SIZE};

/// Maximum number of records fetched by a single read.
pub const MAX_EVENTS_PER_READ: usize = 64;

/// Errors of the evdev backend
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The device node could not be opened
    #[error("Failed to open input device `{path}`")]
    Io {
        /// Path of the device
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },
    /// Reading from the device failed
    #[error("Failed to read from input device")]
    Read(#[source] io::Error),
    /// The device rejected a control request
    #[error("Input device rejected {request}")]
    DeviceQuery {
        /// Name of the rejected request
        request: &'static str,
        /// Errno returned by the kernel
        #[source]
        source: rustix::io::Errno,
    },
    /// A read returned a byte count that is not a multiple of the record size
    #[error("Torn read of {len} bytes, expected a multiple of {record_size}")]
    MalformedStream {
        /// Number of bytes read
        len: usize,
        /// Size of one record
        record_size: usize,
    },
}

/// Decode a buffer of raw `struct input_event` records.
///
/// An empty buffer is a valid idle read and decodes to no events. A buffer holding a
/// partial record cannot be re-synchronized and results in [`Error::MalformedStream`].
pub fn decode(bytes: &[u8]) -> Result<Vec<TouchEvent>, Error> {
    if bytes.len() % INPUT_EVENT_SIZE != 0 {
        return Err(Error::MalformedStream {
            len: bytes.len(),
            record_size: INPUT_EVENT_SIZE,
        });
    }
    Ok(bytes.chunks_exact(INPUT_EVENT_SIZE).map(decode_event).collect())
}

/// Lazy sequence of decoded event batches read from any byte source.
///
/// Each call to [`Iterator::next`] performs exactly one read. The sequence never ends on
/// its own; after the first error it is exhausted and cannot be restarted.
#[derive(Debug)]
pub struct EventBatches<R> {
    reader: R,
    buffer: Vec<u8>,
    failed: bool,
}

impl<R: Read> EventBatches<R> {
    /// Wrap a byte source
    pub fn new(reader: R) -> Self {
        EventBatches {
            reader,
            buffer: vec![0; MAX_EVENTS_PER_READ * INPUT_EVENT_SIZE],
            failed: false,
        }
    }

    fn read_batch(&mut self) -> Result<Vec<TouchEvent>, Error> {
        let len = loop {
            match self.reader.read(&mut self.buffer) {
                Ok(len) => break len,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(Error::Read(err)),
            }
        };
        let events = decode(&self.buffer[..len])?;
        trace!(count = events.len(), "read input batch");
        Ok(events)
    }
}

impl<R: Read> Iterator for EventBatches<R> {
    type Item = Result<Vec<TouchEvent>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let batch = self.read_batch();
        self.failed = batch.is_err();
        Some(batch)
    }
}

const EVIOCGRAB: u8 = 0x90;
// EVIOCGBIT(EV_ABS, len) is `_IOC(_IOC_READ, 'E', 0x20 + EV_ABS, len)`
const EVIOCGBIT_ABS: u8 = 0x23;
// (ABS_MAX + 1) bits
const ABS_BITS_SIZE: usize = 8;

/// An opened evdev node
#[derive(Debug)]
pub struct EvdevDevice {
    file: File,
    path: PathBuf,
    span: tracing::Span,
}

impl EvdevDevice {
    /// Open an input device node for reading.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<EvdevDevice, Error> {
        let path = path.as_ref().to_path_buf();
        let span = debug_span!("backend_evdev", device = %path.display());
        let _guard = span.enter();

        let file = File::open(&path).map_err(|source| Error::Io {
            path: path.clone(),
            source,
        })?;
        info!("Opened input device");

        drop(_guard);
        Ok(EvdevDevice { file, path, span })
    }

    /// Path this device was opened from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Request exclusive access to the device's events (`EVIOCGRAB`).
    ///
    /// Failing to grab does not prevent reading, other listeners will just see the
    /// same events.
    pub fn grab(&self) -> Result<(), Error> {
        let _guard = self.span.enter();
        // SAFETY: EVIOCGRAB takes its argument by value and does not touch memory.
        unsafe { ioctl(&self.file, IntegerSetter::<WriteOpcode<b'E', EVIOCGRAB, i32>>::new(1)) }.map_err(
            |source| Error::DeviceQuery {
                request: "EVIOCGRAB",
                source,
            },
        )?;
        debug!("Grabbed input device");
        Ok(())
    }

    /// Query the range and current value of an absolute axis (`EVIOCGABS`).
    ///
    /// Fails if the device does not report the axis at all.
    pub fn abs_info(&self, axis: Axis) -> Result<AbsInfo, Error> {
        let _guard = self.span.enter();
        // SAFETY: every opcode is `EVIOCGABS(code)` whose payload is exactly one
        // `struct input_absinfo` of `ABS_INFO_SIZE` bytes.
        let raw = unsafe {
            match axis {
                Axis::X => query_abs::<0x40>(&self.file),
                Axis::Y => query_abs::<0x41>(&self.file),
                Axis::Slot => query_abs::<0x6f>(&self.file),
            }
        }
        .map_err(|source| Error::DeviceQuery {
            request: "EVIOCGABS",
            source,
        })?;
        let info = decode_abs_info(&raw);
        debug!(?axis, ?info, "queried axis");
        Ok(info)
    }

    /// Whether the device advertises an absolute axis in its `EV_ABS` capabilities
    /// (`EVIOCGBIT`).
    pub fn has_axis(&self, axis: Axis) -> Result<bool, Error> {
        let _guard = self.span.enter();
        // SAFETY: the opcode encodes a payload of `ABS_BITS_SIZE` bytes, which the
        // kernel fills with at most that many bytes of the capability bitmap.
        let bits = unsafe {
            ioctl(
                &self.file,
                Getter::<ReadOpcode<b'E', EVIOCGBIT_ABS, [u8; ABS_BITS_SIZE]>, [u8; ABS_BITS_SIZE]>::new(),
            )
        }
        .map_err(|source| Error::DeviceQuery {
            request: "EVIOCGBIT",
            source,
        })?;
        let supported = bit_is_set(&bits, axis.code());
        debug!(?axis, supported, "queried axis capability");
        Ok(supported)
    }

    /// Blocking sequence of event batches read from this device
    pub fn batches(&self) -> EventBatches<&File> {
        EventBatches::new(&self.file)
    }
}

/// `EVIOCGABS(abs)` is `_IOR('E', 0x40 + abs, struct input_absinfo)`.
unsafe fn query_abs<const NUMBER: u8>(file: &File) -> rustix::io::Result<[u8; ABS_INFO_SIZE]> {
    ioctl(
        file,
        Getter::<ReadOpcode<b'E', NUMBER, [u8; ABS_INFO_SIZE]>, [u8; ABS_INFO_SIZE]>::new(),
    )
}

fn bit_is_set(bits: &[u8], code: u16) -> bool {
    let code = usize::from(code);
    bits.get(code / 8).map_or(false, |byte| byte & (1 << (code % 8)) != 0)
}

impl AsFd for EvdevDevice {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.file.as_fd()
    }
}
