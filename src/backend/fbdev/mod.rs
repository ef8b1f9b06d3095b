//! Linux fbdev backend
//!
//! This module gives direct access to a `/dev/fbN` device, without any display server
//! involved:
//!
//! - [`FbDevice`] opens the device node and queries its screen information through the
//!   control interface (`FBIOGET_FSCREENINFO`/`FBIOGET_VSCREENINFO`).
//! - [`PixelLayout`] validates that the mode is one we can address (32-bit packed
//!   true-color) and holds everything needed to compute pixel addresses.
//! - [`FbMapping`] is the memory mapped pixel store of the device. Whether it can be
//!   written to is encoded in its [`Access`] type parameter.
//! - [`PixelSurface`] exposes a mapping as a [`Canvas`](crate::backend::renderer::Canvas).
//!
//! Writes through a read-write mapping show up on screen as soon as the hardware scans
//! out the memory, there is no flushing, double buffering or vsync. The device is
//! assumed to be owned exclusively by this process.
//!
//! ```no_run
//! use fbtools::backend::fbdev::{FbDevice, PixelSurface, ReadWrite};
//! use fbtools::backend::renderer::{Canvas, Color};
//!
//! let device = FbDevice::<ReadWrite>::open("/dev/fb0")?;
//! let layout = device.pixel_layout()?;
//! let mut surface = PixelSurface::new(device.map(&layout)?, layout);
//! surface.fill(Color::BLACK);
//! # Ok::<(), fbtools::backend::fbdev::Error>(())
//! ```

use std::{
    ffi::c_void,
    fmt,
    fs::{File, OpenOptions},
    io,
    marker::PhantomData,
    os::unix::io::{AsFd, BorrowedFd},
    path::{Path, PathBuf},
    ptr::{self, NonNull},
    slice,
};

use rustix::{
    ioctl::{ioctl, BadOpcode, Getter, RawOpcode},
    mm::{mmap, munmap, MapFlags, ProtFlags},
};
use tracing::{debug, debug_span, info, trace, warn};

mod info;
mod surface;

pub use self::info::{
    Channel, ChannelDescriptor, PixelLayout, ScreenFixedInfo, ScreenVariableInfo, FB_TYPE_PACKED_PIXELS,
    FB_VISUAL_TRUECOLOR, FIX_SCREENINFO_SIZE, VAR_SCREENINFO_SIZE,
};
pub use self::surface::PixelSurface;

const FBIOGET_VSCREENINFO: RawOpcode = 0x4600;
const FBIOGET_FSCREENINFO: RawOpcode = 0x4602;

/// Errors of the fbdev backend
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The device node could not be opened
    #[error("Failed to open framebuffer device `{path}`")]
    Io {
        /// Path of the device
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },
    /// The control interface rejected a query
    #[error("Framebuffer device rejected {request}")]
    DeviceQuery {
        /// Name of the rejected request
        request: &'static str,
        /// Errno returned by the kernel
        #[source]
        source: rustix::io::Errno,
    },
    /// The current mode is outside of what can be addressed
    #[error("Unsupported framebuffer format")]
    UnsupportedFormat(#[from] FormatError),
    /// The pixel memory could not be mapped
    #[error("Failed to map framebuffer memory")]
    Mapping(#[source] rustix::io::Errno),
    /// The layout addresses more memory than the device currently provides
    #[error("Layout needs {layout} bytes but the device only provides {device}")]
    StaleLayout {
        /// Length of the pixel memory described by the layout
        layout: usize,
        /// Length of the pixel memory reported by the driver
        device: usize,
    },
}

/// Reasons a framebuffer mode is rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    /// Pixels are not packed
    #[error("pixel type {0} is not FB_TYPE_PACKED_PIXELS")]
    PixelType(u32),
    /// Visual is not true-color
    #[error("visual {0} is not FB_VISUAL_TRUECOLOR")]
    Visual(u32),
    /// Pixels are not 32 bits wide
    #[error("{0} bits per pixel, only 32 are supported")]
    BitsPerPixel(u32),
    /// A color channel is not a whole byte inside the pixel
    #[error("{channel:?} channel at bit {offset} with {length} bits is not byte addressable")]
    Channel {
        /// The offending channel
        channel: Channel,
        /// Bit offset reported by the driver
        offset: u32,
        /// Bit length reported by the driver
        length: u32,
    },
    /// The visible window does not fit into the pixel memory
    #[error("visible window {visible:?} does not fit into {memory_length} bytes with a stride of {stride}")]
    Geometry {
        /// x offset, y offset, width and height of the visible window
        visible: (u32, u32, u32, u32),
        /// Length of a line in bytes
        stride: u32,
        /// Length of the pixel memory in bytes
        memory_length: u32,
    },
}

mod sealed {
    pub trait Sealed {}
}

/// Access mode of a framebuffer device and its mappings
pub trait Access: sealed::Sealed + fmt::Debug {
    #[doc(hidden)]
    const WRITABLE: bool;
}

/// The device is opened and mapped for reading only
#[derive(Debug)]
pub struct ReadOnly;

/// The device is opened and mapped for reading and writing
#[derive(Debug)]
pub struct ReadWrite;

impl sealed::Sealed for ReadOnly {}
impl sealed::Sealed for ReadWrite {}

impl Access for ReadOnly {
    const WRITABLE: bool = false;
}

impl Access for ReadWrite {
    const WRITABLE: bool = true;
}

/// An opened framebuffer device node
#[derive(Debug)]
pub struct FbDevice<A: Access> {
    file: File,
    path: PathBuf,
    span: tracing::Span,
    _access: PhantomData<A>,
}

impl<A: Access> FbDevice<A> {
    /// Open a framebuffer device node, e.g. `/dev/fb0`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<FbDevice<A>, Error> {
        let path = path.as_ref().to_path_buf();
        let span = debug_span!("backend_fbdev", device = %path.display());
        let _guard = span.enter();

        let file = OpenOptions::new()
            .read(true)
            .write(A::WRITABLE)
            .open(&path)
            .map_err(|source| Error::Io {
                path: path.clone(),
                source,
            })?;
        info!(writable = A::WRITABLE, "Opened framebuffer device");

        drop(_guard);
        Ok(FbDevice {
            file,
            path,
            span,
            _access: PhantomData,
        })
    }

    /// Path this device was opened from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Query the fixed screen information (`FBIOGET_FSCREENINFO`)
    pub fn fixed_info(&self) -> Result<ScreenFixedInfo, Error> {
        let _guard = self.span.enter();
        // SAFETY: FBIOGET_FSCREENINFO fills exactly one `struct fb_fix_screeninfo`.
        let raw = unsafe {
            ioctl(
                &self.file,
                Getter::<BadOpcode<FBIOGET_FSCREENINFO>, [u8; FIX_SCREENINFO_SIZE]>::new(),
            )
        }
        .map_err(|source| Error::DeviceQuery {
            request: "FBIOGET_FSCREENINFO",
            source,
        })?;
        let info = ScreenFixedInfo::from_bytes(&raw);
        debug!(?info, "queried fixed screen info");
        Ok(info)
    }

    /// Query the variable screen information (`FBIOGET_VSCREENINFO`)
    pub fn variable_info(&self) -> Result<ScreenVariableInfo, Error> {
        let _guard = self.span.enter();
        // SAFETY: FBIOGET_VSCREENINFO fills exactly one `struct fb_var_screeninfo`.
        let raw = unsafe {
            ioctl(
                &self.file,
                Getter::<BadOpcode<FBIOGET_VSCREENINFO>, [u8; VAR_SCREENINFO_SIZE]>::new(),
            )
        }
        .map_err(|source| Error::DeviceQuery {
            request: "FBIOGET_VSCREENINFO",
            source,
        })?;
        let info = ScreenVariableInfo::from_bytes(&raw);
        debug!(?info, "queried variable screen info");
        Ok(info)
    }

    /// Query both screen information records and validate the current mode.
    pub fn pixel_layout(&self) -> Result<PixelLayout, Error> {
        let fixed = self.fixed_info()?;
        let var = self.variable_info()?;

        let _guard = self.span.enter();
        let layout = PixelLayout::new(&fixed, &var).map_err(|err| {
            warn!(%err, "framebuffer mode is not supported");
            err
        })?;
        info!(
            id = %fixed.id,
            width = var.xres,
            height = var.yres,
            stride = layout.stride(),
            "Framebuffer mode"
        );
        Ok(layout)
    }

    /// Map the pixel memory described by a validated layout.
    ///
    /// The fixed screen information is queried again, so a layout obtained from another
    /// device or an earlier mode can never map past the end of the pixel memory.
    pub fn map(&self, layout: &PixelLayout) -> Result<FbMapping<A>, Error> {
        let fixed = self.fixed_info()?;
        let _guard = self.span.enter();
        let len = mapping_length(layout, &fixed)?;
        // SAFETY: the kernel keeps the framebuffer memory alive for as long as it is
        // mapped and `len` is no larger than what the driver just reported.
        unsafe { FbMapping::from_fd(&self.file, len) }
    }
}

fn mapping_length(layout: &PixelLayout, fixed: &ScreenFixedInfo) -> Result<usize, Error> {
    let device = fixed.memory_length as usize;
    let len = layout.memory_length();
    if len > device {
        warn!(layout = len, device, "pixel layout does not match the device");
        return Err(Error::StaleLayout { layout: len, device });
    }
    Ok(len)
}

impl<A: Access> AsFd for FbDevice<A> {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.file.as_fd()
    }
}

/// Memory mapped pixel store of a framebuffer
///
/// The mapping stays valid independently of the [`FbDevice`] it was created from and
/// is unmapped on drop.
pub struct FbMapping<A: Access> {
    ptr: NonNull<u8>,
    len: usize,
    _access: PhantomData<A>,
}

impl<A: Access> fmt::Debug for FbMapping<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FbMapping")
            .field("ptr", &self.ptr)
            .field("len", &self.len)
            .field("writable", &A::WRITABLE)
            .finish()
    }
}

impl<A: Access> FbMapping<A> {
    /// Map `len` bytes of a file descriptor as shared memory.
    ///
    /// # Safety
    ///
    /// The object behind `fd` must provide at least `len` bytes for the whole lifetime of
    /// the mapping, otherwise accesses fault. A [`ReadWrite`] mapping requires `fd` to be
    /// opened for writing.
    pub unsafe fn from_fd<F: AsFd>(fd: F, len: usize) -> Result<FbMapping<A>, Error> {
        let prot = if A::WRITABLE {
            ProtFlags::READ | ProtFlags::WRITE
        } else {
            ProtFlags::READ
        };
        let ptr = mmap(ptr::null_mut(), len, prot, MapFlags::SHARED, fd, 0).map_err(Error::Mapping)?;
        trace!(len, "mapped framebuffer memory");
        Ok(FbMapping {
            ptr: NonNull::new(ptr as *mut u8).ok_or(Error::Mapping(rustix::io::Errno::FAULT))?,
            len,
            _access: PhantomData,
        })
    }

    /// Length of the mapping in bytes
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the mapping is empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<A: Access> AsRef<[u8]> for FbMapping<A> {
    fn as_ref(&self) -> &[u8] {
        // SAFETY: the mapping is valid and readable for `len` bytes until dropped.
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl AsMut<[u8]> for FbMapping<ReadWrite> {
    fn as_mut(&mut self) -> &mut [u8] {
        // SAFETY: read-write mappings are created with PROT_WRITE and `&mut self`
        // guarantees exclusive access from this process.
        unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl<A: Access> Drop for FbMapping<A> {
    fn drop(&mut self) {
        // SAFETY: `ptr` and `len` describe a mapping created by `from_fd` and no
        // borrow of it can outlive `self`.
        if let Err(err) = unsafe { munmap(self.ptr.as_ptr() as *mut c_void, self.len) } {
            warn!(?err, "failed to unmap framebuffer memory");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::info::tests::{fixed, variable};
    use super::*;

    #[test]
    fn mapping_writes_reach_the_file() {
        let mut file = tempfile::tempfile().unwrap();
        file.write_all(&[0u8; 64]).unwrap();

        {
            let mut mapping = unsafe { FbMapping::<ReadWrite>::from_fd(&file, 64) }.unwrap();
            assert_eq!(mapping.len(), 64);
            mapping.as_mut()[10] = 0xab;
        }

        let mapping = unsafe { FbMapping::<ReadOnly>::from_fd(&file, 64) }.unwrap();
        assert_eq!(mapping.as_ref()[10], 0xab);
        assert!(mapping.as_ref().iter().enumerate().all(|(i, &b)| i == 10 || b == 0));
    }

    #[test]
    fn mapping_zero_bytes_fails() {
        let file = tempfile::tempfile().unwrap();
        assert!(matches!(
            unsafe { FbMapping::<ReadOnly>::from_fd(&file, 0) },
            Err(Error::Mapping(_))
        ));
    }

    #[test]
    fn open_missing_device() {
        assert!(matches!(
            FbDevice::<ReadOnly>::open("/nonexistent/fb0"),
            Err(Error::Io { .. })
        ));
    }

    #[test]
    fn regular_file_rejects_screen_queries() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let device = FbDevice::<ReadOnly>::open(file.path()).unwrap();
        assert!(matches!(
            device.pixel_layout(),
            Err(Error::DeviceQuery {
                request: "FBIOGET_FSCREENINFO",
                ..
            })
        ));
    }

    #[test]
    fn layout_longer_than_device_is_not_mapped() {
        let layout = PixelLayout::new(&fixed(64 * 64, 64), &variable(16, 64, [16, 8, 0])).unwrap();
        assert!(matches!(
            mapping_length(&layout, &fixed(64, 64)),
            Err(Error::StaleLayout {
                layout: 4096,
                device: 64
            })
        ));
        assert_eq!(mapping_length(&layout, &fixed(64 * 64, 64)).unwrap(), 4096);
        assert_eq!(mapping_length(&layout, &fixed(64 * 128, 64)).unwrap(), 4096);
    }

    #[test]
    fn map_requeries_the_device() {
        // a layout for 4096 bytes must not reach mmap on an empty file
        let layout = PixelLayout::new(&fixed(64 * 64, 64), &variable(16, 64, [16, 8, 0])).unwrap();
        let file = tempfile::NamedTempFile::new().unwrap();
        let device = FbDevice::<ReadWrite>::open(file.path()).unwrap();
        assert!(matches!(
            device.map(&layout),
            Err(Error::DeviceQuery {
                request: "FBIOGET_FSCREENINFO",
                ..
            })
        ));
    }
}
