//! Screen information records of the fbdev control interface.
//!
//! `FBIOGET_FSCREENINFO` and `FBIOGET_VSCREENINFO` fill kernel structures whose layout
//! is fixed by `linux/fb.h`. They are fetched as raw bytes and decoded here field by
//! field, then validated into a [`PixelLayout`] describing how to address pixels.

use std::ffi::c_ulong;
use std::mem::size_of;

use crate::utils::{Physical, Rectangle};

use super::FormatError;

const ULONG: usize = size_of::<c_ulong>();

const fn align(offset: usize, to: usize) -> usize {
    (offset + to - 1) / to * to
}

// struct fb_fix_screeninfo
const FIX_SMEM_LEN: usize = 16 + ULONG;
const FIX_TYPE: usize = FIX_SMEM_LEN + 4;
const FIX_TYPE_AUX: usize = FIX_TYPE + 4;
const FIX_VISUAL: usize = FIX_TYPE_AUX + 4;
// xpanstep, ypanstep and ywrapstep are u16, line_length is 4-byte aligned after them
const FIX_LINE_LENGTH: usize = align(FIX_VISUAL + 4 + 6, 4);
const FIX_MMIO_START: usize = align(FIX_LINE_LENGTH + 4, ULONG);
// mmio_len, accel, capabilities and reserved[2]
const FIX_END: usize = FIX_MMIO_START + ULONG + 4 + 4 + 2 + 4;

/// Size of `struct fb_fix_screeninfo`
pub const FIX_SCREENINFO_SIZE: usize = align(FIX_END, ULONG);

/// Size of `struct fb_var_screeninfo`, which is made of `u32` only
pub const VAR_SCREENINFO_SIZE: usize = 160;

// struct fb_var_screeninfo, in u32 words
const VAR_XRES: usize = 0;
const VAR_YRES: usize = 1;
const VAR_XRES_VIRTUAL: usize = 2;
const VAR_YRES_VIRTUAL: usize = 3;
const VAR_XOFFSET: usize = 4;
const VAR_YOFFSET: usize = 5;
const VAR_BITS_PER_PIXEL: usize = 6;
const VAR_GRAYSCALE: usize = 7;
const VAR_RED: usize = 8;
const VAR_GREEN: usize = 11;
const VAR_BLUE: usize = 14;
const VAR_TRANSP: usize = 17;

/// `FB_TYPE_PACKED_PIXELS`
pub const FB_TYPE_PACKED_PIXELS: u32 = 0;
/// `FB_VISUAL_TRUECOLOR`
pub const FB_VISUAL_TRUECOLOR: u32 = 2;

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_ne_bytes(raw)
}

/// Immutable facts about the framebuffer, fetched once per session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenFixedInfo {
    /// Driver identification string
    pub id: String,
    /// Length of the mappable frame buffer memory in bytes
    pub memory_length: u32,
    /// Length of one line in bytes
    pub stride: u32,
    /// One of the `FB_TYPE_*` values
    pub pixel_type: u32,
    /// One of the `FB_VISUAL_*` values
    pub visual: u32,
}

impl ScreenFixedInfo {
    /// Decode a raw `struct fb_fix_screeninfo`
    pub fn from_bytes(bytes: &[u8; FIX_SCREENINFO_SIZE]) -> Self {
        let id = &bytes[..16];
        let id_len = id.iter().position(|&b| b == 0).unwrap_or(id.len());
        ScreenFixedInfo {
            id: String::from_utf8_lossy(&id[..id_len]).into_owned(),
            memory_length: read_u32(bytes, FIX_SMEM_LEN),
            stride: read_u32(bytes, FIX_LINE_LENGTH),
            pixel_type: read_u32(bytes, FIX_TYPE),
            visual: read_u32(bytes, FIX_VISUAL),
        }
    }
}

/// Position of one color channel inside a pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelDescriptor {
    /// Offset of the channel's least significant bit
    pub offset: u32,
    /// Number of bits of the channel
    pub length: u32,
}

/// Mode dependent geometry and format of the framebuffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScreenVariableInfo {
    /// Visible horizontal resolution
    pub xres: u32,
    /// Visible vertical resolution
    pub yres: u32,
    /// Horizontal resolution of the virtual canvas
    pub xres_virtual: u32,
    /// Vertical resolution of the virtual canvas
    pub yres_virtual: u32,
    /// Horizontal offset of the visible window into the virtual canvas
    pub xoffset: u32,
    /// Vertical offset of the visible window into the virtual canvas
    pub yoffset: u32,
    /// Bits per pixel
    pub bits_per_pixel: u32,
    /// Non-zero for grayscale modes
    pub grayscale: u32,
    /// Red channel
    pub red: ChannelDescriptor,
    /// Green channel
    pub green: ChannelDescriptor,
    /// Blue channel
    pub blue: ChannelDescriptor,
    /// Transparency channel
    pub transp: ChannelDescriptor,
}

impl ScreenVariableInfo {
    /// Decode a raw `struct fb_var_screeninfo`
    pub fn from_bytes(bytes: &[u8; VAR_SCREENINFO_SIZE]) -> Self {
        let word = |index: usize| read_u32(bytes, index * 4);
        // struct fb_bitfield { offset, length, msb_right }
        let channel = |index: usize| ChannelDescriptor {
            offset: word(index),
            length: word(index + 1),
        };
        ScreenVariableInfo {
            xres: word(VAR_XRES),
            yres: word(VAR_YRES),
            xres_virtual: word(VAR_XRES_VIRTUAL),
            yres_virtual: word(VAR_YRES_VIRTUAL),
            xoffset: word(VAR_XOFFSET),
            yoffset: word(VAR_YOFFSET),
            bits_per_pixel: word(VAR_BITS_PER_PIXEL),
            grayscale: word(VAR_GRAYSCALE),
            red: channel(VAR_RED),
            green: channel(VAR_GREEN),
            blue: channel(VAR_BLUE),
            transp: channel(VAR_TRANSP),
        }
    }
}

/// Color channel addressed by a [`PixelLayout`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Red
    Red,
    /// Green
    Green,
    /// Blue
    Blue,
}

/// Validated addressing parameters of a 32-bit packed true-color framebuffer
///
/// Can only be obtained through [`PixelLayout::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelLayout {
    memory_length: usize,
    stride: usize,
    visible: Rectangle<Physical>,
    channels: [usize; 3],
}

impl PixelLayout {
    /// Bytes per pixel of every supported layout
    pub const BYTES_PER_PIXEL: usize = 4;

    /// Validate the screen information and derive the pixel addressing from it.
    ///
    /// Only 32 bits per pixel, packed pixel, true-color modes with byte aligned color
    /// channels are supported. The visible window must lie inside the mapped memory.
    pub fn new(fixed: &ScreenFixedInfo, var: &ScreenVariableInfo) -> Result<PixelLayout, FormatError> {
        if fixed.pixel_type != FB_TYPE_PACKED_PIXELS {
            return Err(FormatError::PixelType(fixed.pixel_type));
        }
        if fixed.visual != FB_VISUAL_TRUECOLOR {
            return Err(FormatError::Visual(fixed.visual));
        }
        if var.bits_per_pixel != 32 {
            return Err(FormatError::BitsPerPixel(var.bits_per_pixel));
        }

        let byte_of = |channel: Channel, desc: ChannelDescriptor| {
            if desc.offset % 8 != 0 || desc.length != 8 || desc.offset + desc.length > 32 {
                Err(FormatError::Channel {
                    channel,
                    offset: desc.offset,
                    length: desc.length,
                })
            } else {
                Ok((desc.offset / 8) as usize)
            }
        };
        let channels = [
            byte_of(Channel::Red, var.red)?,
            byte_of(Channel::Green, var.green)?,
            byte_of(Channel::Blue, var.blue)?,
        ];

        let memory_length = fixed.memory_length as usize;
        let stride = fixed.stride as usize;
        let right = (var.xoffset as usize + var.xres as usize) * Self::BYTES_PER_PIXEL;
        let bottom = var.yoffset as usize + var.yres as usize;
        if right > stride || bottom * stride > memory_length || var.xres == 0 || var.yres == 0 {
            return Err(FormatError::Geometry {
                visible: (var.xoffset, var.yoffset, var.xres, var.yres),
                stride: fixed.stride,
                memory_length: fixed.memory_length,
            });
        }
        let to_i32 = |v: u32| i32::try_from(v).map_err(|_| FormatError::Geometry {
            visible: (var.xoffset, var.yoffset, var.xres, var.yres),
            stride: fixed.stride,
            memory_length: fixed.memory_length,
        });

        Ok(PixelLayout {
            memory_length,
            stride,
            visible: Rectangle::from_loc_and_size(
                (to_i32(var.xoffset)?, to_i32(var.yoffset)?),
                (to_i32(var.xres)?, to_i32(var.yres)?),
            ),
            channels,
        })
    }

    /// Length of the pixel memory in bytes
    pub fn memory_length(&self) -> usize {
        self.memory_length
    }

    /// Length of one line in bytes
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Visible window, positioned at the viewport offset
    pub fn visible(&self) -> Rectangle<Physical> {
        self.visible
    }

    /// Byte offset of a channel inside a pixel
    pub fn channel_offset(&self, channel: Channel) -> usize {
        match channel {
            Channel::Red => self.channels[0],
            Channel::Green => self.channels[1],
            Channel::Blue => self.channels[2],
        }
    }
}
