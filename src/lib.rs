#![deny(unsafe_code)]
//! Module for decoding GIF87a/89a animations into composited RGBA frames.
//!
//! Parsing produces an immutable [`GifDocument`]; a [`FrameCompositor`]
//! borrows the document and replays it frame by frame, applying
//! transparency, interlacing and the disposal methods.
//!
//! ```no_run
//! use gifanim::{read_gif, ChannelOrder, FrameCompositor};
//!
//! let bytes = std::fs::read("animation.gif")?;
//! let document = read_gif(&bytes, ChannelOrder::Rgba)?;
//! let mut player = FrameCompositor::new(&document)?;
//! let rgba = player.render_current_frame()?;
//! println!("{} bytes, shown for {} ms", rgba.len(), player.current_delay_ms());
//! player.advance();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! This crate is written entirely in safe Rust code.

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use arrayvec::ArrayVec;
use fallible_collections::TryReserveError;
use log::{debug, warn};

use std::io::Read;
use std::num::NonZeroU16;

mod compositor;
mod cursor;
pub mod lzw;

use crate::cursor::ByteCursor;

pub use crate::compositor::{FrameCompositor, interlaced_row_order};

/// A trait to indicate a type can be infallibly converted to `u64`.
/// This should only be implemented for infallible conversions, so only unsigned types are valid.
trait ToU64 {
    fn to_u64(self) -> u64;
}

/// Statically verify that the platform `usize` can fit within a `u64`.
/// If the size won't fit on the given platform, this will fail at compile time, but if a type
/// which can fail `TryInto<usize>` is used, it may panic.
impl ToU64 for usize {
    fn to_u64(self) -> u64 {
        const _: () = assert!(std::mem::size_of::<usize>() <= std::mem::size_of::<u64>());
        self.try_into().ok().unwrap()
    }
}

/// A trait to indicate a type can be infallibly converted to `usize`.
/// This should only be implemented for infallible conversions, so only unsigned types are valid.
pub(crate) trait ToUsize {
    fn to_usize(self) -> usize;
}

/// Statically verify that the given type can fit within a `usize`.
/// If the size won't fit on the given platform, this will fail at compile time, but if a type
/// which can fail `TryInto<usize>` is used, it may panic.
macro_rules! impl_to_usize_from {
    ( $from_type:ty ) => {
        impl ToUsize for $from_type {
            fn to_usize(self) -> usize {
                const _: () = assert!(std::mem::size_of::<$from_type>() <= std::mem::size_of::<usize>());
                self.try_into().ok().unwrap()
            }
        }
    };
}

impl_to_usize_from!(u8);
impl_to_usize_from!(u16);

#[doc(hidden)]
pub type TryVec<T> = fallible_collections::TryVec<T>;

// To ensure we don't use stdlib allocating types by accident
#[allow(dead_code)]
struct Vec;
#[allow(dead_code)]
struct Box;
#[allow(dead_code)]
struct String;

/// Describes decoder failures.
#[derive(Debug)]
pub enum Error {
    /// Corrupt or malformed data: a bad signature, a wrong fixed block size or
    /// terminator, an unknown block introducer, or an LZW code that refers to
    /// a dictionary entry which does not exist yet.
    InvalidFormat(&'static str),
    /// The input ended in the middle of a structure.
    UnexpectedEndOfStream,
    /// Propagate underlying errors from `std::io` when reading from a stream.
    Io(std::io::Error),
    /// Out of memory
    OutOfMemory,
    /// Resource limit exceeded during parsing
    ResourceLimitExceeded(&'static str),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            Self::InvalidFormat(s) | Self::ResourceLimitExceeded(s) => *s,
            Self::UnexpectedEndOfStream => "EOF",
            Self::Io(err) => return err.fmt(f),
            Self::OutOfMemory => "OOM",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::UnexpectedEof => Self::UnexpectedEndOfStream,
            _ => Self::Io(err),
        }
    }
}

impl From<Error> for std::io::Error {
    fn from(err: Error) -> Self {
        let kind = match err {
            Error::InvalidFormat(_) => std::io::ErrorKind::InvalidData,
            Error::UnexpectedEndOfStream => std::io::ErrorKind::UnexpectedEof,
            Error::Io(io_err) => return io_err,
            _ => std::io::ErrorKind::Other,
        };
        Self::new(kind, err)
    }
}

impl From<TryReserveError> for Error {
    fn from(_: TryReserveError) -> Self {
        Self::OutOfMemory
    }
}

/// Result shorthand using our Error enum.
pub type Result<T, E = Error> = std::result::Result<T, E>;

const SIGNATURE_LEN: usize = 6;
const BLOCK_IMAGE: u8 = 0x2c;
const BLOCK_EXTENSION: u8 = 0x21;
const BLOCK_TRAILER: u8 = 0x3b;
const EXTENSION_GRAPHIC_CONTROL: u8 = 0xf9;
const EXTENSION_COMMENT: u8 = 0xfe;
const EXTENSION_APPLICATION: u8 = 0xff;
const GRAPHIC_CONTROL_LEN: u8 = 4;

/// Byte layout of each pixel in color tables and rendered canvases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelOrder {
    /// `[r, g, b, a]`
    #[default]
    Rgba,
    /// `[b, g, r, a]`
    Bgra,
}

impl ChannelOrder {
    /// Lay out an opaque color.
    pub const fn opaque(self, r: u8, g: u8, b: u8) -> [u8; 4] {
        match self {
            Self::Rgba => [r, g, b, 0xff],
            Self::Bgra => [b, g, r, 0xff],
        }
    }
}

/// Configuration for parsing GIF files with resource limits
///
/// Resource limits are checked **before** allocations occur, so a file that
/// claims a huge logical screen or thousands of frames is rejected up front.
///
/// # Examples
///
/// ```rust
/// use gifanim::{ChannelOrder, DecodeConfig};
///
/// // Default limits (suitable for most apps)
/// let config = DecodeConfig::default();
///
/// // Strict limits for untrusted input, blue-first pixels
/// let config = DecodeConfig::default()
///     .with_peak_memory_limit(16_000_000)
///     .with_total_megapixels_limit(16)
///     .with_max_animation_frames(500)
///     .with_channel_order(ChannelOrder::Bgra);
///
/// // No limits
/// let config = DecodeConfig::unlimited();
/// ```
#[derive(Debug, Clone)]
pub struct DecodeConfig {
    /// Maximum bytes of compressed image data and comments kept by the document.
    /// Default: 1GB (1,000,000,000 bytes)
    pub peak_memory_limit: Option<u64>,

    /// Maximum megapixels of the logical screen or of any single frame.
    /// Default: 512 megapixels
    pub total_megapixels_limit: Option<u32>,

    /// Maximum number of image descriptors.
    /// Default: 10,000 frames
    pub max_animation_frames: Option<u32>,

    /// Layout of color table entries and therefore of rendered pixels.
    /// Default: [`ChannelOrder::Rgba`]
    pub channel_order: ChannelOrder,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            peak_memory_limit: Some(1_000_000_000),
            total_megapixels_limit: Some(512),
            max_animation_frames: Some(10_000),
            channel_order: ChannelOrder::Rgba,
        }
    }
}

impl DecodeConfig {
    /// Create a configuration with no resource limits.
    pub fn unlimited() -> Self {
        Self {
            peak_memory_limit: None,
            total_megapixels_limit: None,
            max_animation_frames: None,
            channel_order: ChannelOrder::Rgba,
        }
    }

    /// Set the peak memory limit in bytes
    pub fn with_peak_memory_limit(mut self, bytes: u64) -> Self {
        self.peak_memory_limit = Some(bytes);
        self
    }

    /// Set the megapixel limit for the logical screen and each frame
    pub fn with_total_megapixels_limit(mut self, megapixels: u32) -> Self {
        self.total_megapixels_limit = Some(megapixels);
        self
    }

    /// Set the maximum animation frame count
    pub fn with_max_animation_frames(mut self, frames: u32) -> Self {
        self.max_animation_frames = Some(frames);
        self
    }

    /// Set the pixel channel order
    pub fn with_channel_order(mut self, channel_order: ChannelOrder) -> Self {
        self.channel_order = channel_order;
        self
    }
}

/// The signature tag at the start of the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    Gif87a,
    Gif89a,
}

/// Palette of opaque colors, already laid out in the requested
/// [`ChannelOrder`].
///
/// The length is always a power of two between 2 and 256, so any index can
/// be masked into range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorTable {
    colors: ArrayVec<[u8; 4], 256>,
}

impl ColorTable {
    /// Entry count for a packed size exponent: `2^(exponent + 1)`.
    pub const fn len_for_exponent(exponent: u8) -> usize {
        2 << (exponent & 0b111)
    }

    /// Increasing gray ramp used when a frame has no palette at all.
    pub fn grayscale(exponent: u8) -> Self {
        let len = Self::len_for_exponent(exponent);
        let step = 255 / (len - 1);
        let colors = (0..len)
            .map(|i| {
                let level = (i * step) as u8;
                [level, level, level, 0xff]
            })
            .collect();
        Self { colors }
    }

    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    /// Color for `index`, masked to the table size.
    pub fn get(&self, index: u8) -> [u8; 4] {
        self.colors[index.to_usize() & (self.colors.len() - 1)]
    }

    pub fn colors(&self) -> &[[u8; 4]] {
        &self.colors
    }
}

/// Fixed-size header describing the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogicalScreenDescriptor {
    pub width: u16,
    pub height: u16,
    pub has_global_color_table: bool,
    /// Size exponent of the global table (entries = `2^(n+1)`).
    pub global_table_exponent: u8,
    /// Only meaningful when a global color table exists.
    pub background_index: Option<u8>,
    pub aspect_ratio: u8,
}

impl LogicalScreenDescriptor {
    /// Pixel width divided by pixel height, if the file declares one.
    pub fn pixel_aspect_ratio(&self) -> Option<f32> {
        (self.aspect_ratio != 0).then(|| (f32::from(self.aspect_ratio) + 15.0) / 64.0)
    }
}

/// How the canvas is prepared after a frame has been shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisposalMethod {
    #[default]
    NotSpecified,
    DoNotDispose,
    RestoreToBackground,
    RestoreToPrevious,
}

impl From<u8> for DisposalMethod {
    fn from(raw: u8) -> Self {
        match raw {
            1 => Self::DoNotDispose,
            2 => Self::RestoreToBackground,
            3 => Self::RestoreToPrevious,
            _ => Self::NotSpecified,
        }
    }
}

/// Graphic control extension (`0x21 0xF9`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GraphicControl {
    pub disposal: DisposalMethod,
    /// Delay in hundredths of a second.
    pub delay_centis: u16,
    pub transparent_index: Option<u8>,
}

/// One image descriptor and its compressed data.
#[derive(Debug)]
pub struct ImageDescriptor {
    pub left: u16,
    pub top: u16,
    pub width: u16,
    pub height: u16,
    pub interlaced: bool,
    /// Declared local table exponent, kept even when no local table is present.
    pub local_table_exponent: u8,
    pub local_color_table: Option<ColorTable>,
    pub control: Option<GraphicControl>,
    /// LZW minimum code size byte followed by the de-framed sub-block data.
    payload: TryVec<u8>,
}

impl ImageDescriptor {
    /// The raw payload: minimum code size, then the compressed stream.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn min_code_size(&self) -> u8 {
        self.payload[0]
    }

    pub fn compressed_data(&self) -> &[u8] {
        &self.payload[1..]
    }

    pub fn disposal(&self) -> DisposalMethod {
        self.control.map(|c| c.disposal).unwrap_or_default()
    }

    pub fn transparent_index(&self) -> Option<u8> {
        self.control.and_then(|c| c.transparent_index)
    }

    /// Declared delay in hundredths of a second, 0 without a control block.
    pub fn delay_centis(&self) -> u16 {
        self.control.map_or(0, |c| c.delay_centis)
    }

    /// Number of palette indices in the decoded plane.
    pub fn pixel_count(&self) -> usize {
        self.width.to_usize() * self.height.to_usize()
    }
}

/// Repetition directive from a `NETSCAPE2.0` / `ANIMEXTS1.0` extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopCount {
    /// Stored as 0 in the file.
    Infinite,
    /// Number of additional plays after the first.
    Finite(NonZeroU16),
}

impl From<u16> for LoopCount {
    fn from(raw: u16) -> Self {
        NonZeroU16::new(raw).map_or(Self::Infinite, Self::Finite)
    }
}

impl LoopCount {
    /// Total number of times the animation is shown, `None` for forever.
    pub fn total_plays(self) -> Option<u32> {
        match self {
            Self::Infinite => None,
            Self::Finite(n) => Some(u32::from(n.get()) + 1),
        }
    }
}

/// A fully parsed GIF stream.
#[derive(Debug)]
pub struct GifDocument {
    version: Version,
    screen: LogicalScreenDescriptor,
    global_color_table: Option<ColorTable>,
    channel_order: ChannelOrder,
    loop_count: Option<LoopCount>,
    frames: TryVec<ImageDescriptor>,
    comments: TryVec<TryVec<u8>>,
}

impl GifDocument {
    /// Parse a complete in-memory GIF without resource limits.
    pub fn from_bytes(data: &[u8], channel_order: ChannelOrder) -> Result<Self> {
        read_gif(data, channel_order)
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn screen(&self) -> &LogicalScreenDescriptor {
        &self.screen
    }

    pub fn global_color_table(&self) -> Option<&ColorTable> {
        self.global_color_table.as_ref()
    }

    pub fn channel_order(&self) -> ChannelOrder {
        self.channel_order
    }

    /// Always `None` unless the document holds more than one frame.
    pub fn loop_count(&self) -> Option<LoopCount> {
        self.loop_count
    }

    pub fn frames(&self) -> &[ImageDescriptor] {
        &self.frames
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn is_animated(&self) -> bool {
        self.frames.len() > 1
    }

    /// Contents of comment extensions, in file order.
    pub fn comments(&self) -> impl Iterator<Item = &[u8]> {
        self.comments.iter().map(|c| &c[..])
    }
}

struct ResourceTracker<'a> {
    config: &'a DecodeConfig,
    retained: u64,
}

impl<'a> ResourceTracker<'a> {
    fn new(config: &'a DecodeConfig) -> Self {
        Self { config, retained: 0 }
    }

    fn reserve(&mut self, bytes: u64) -> Result<()> {
        self.retained = self.retained.saturating_add(bytes);

        if let Some(limit) = self.config.peak_memory_limit {
            if self.retained > limit {
                return Err(Error::ResourceLimitExceeded("peak memory limit exceeded"));
            }
        }

        Ok(())
    }

    fn validate_total_megapixels(&self, width: u16, height: u16) -> Result<()> {
        if let Some(limit) = self.config.total_megapixels_limit {
            let megapixels = u64::from(width) * u64::from(height) / 1_000_000;

            if megapixels > u64::from(limit) {
                return Err(Error::ResourceLimitExceeded("total megapixels limit exceeded"));
            }
        }

        Ok(())
    }

    fn validate_animation_frames(&self, count: usize) -> Result<()> {
        if let Some(limit) = self.config.max_animation_frames {
            if count.to_u64() > u64::from(limit) {
                return Err(Error::ResourceLimitExceeded("animation frame count limit exceeded"));
            }
        }

        Ok(())
    }
}

/// Parse a complete in-memory GIF stream without resource limits.
///
/// Color tables are laid out in `channel_order`.
pub fn read_gif(data: &[u8], channel_order: ChannelOrder) -> Result<GifDocument> {
    read_gif_with_config(data, &DecodeConfig::unlimited().with_channel_order(channel_order))
}

/// Read a whole stream into memory, then parse it.
///
/// No partial parsing happens: the reader is drained first.
pub fn read_gif_from_reader<R: Read>(reader: &mut R, config: &DecodeConfig) -> Result<GifDocument> {
    let mut data = std::vec::Vec::new();
    reader.read_to_end(&mut data)?;
    read_gif_with_config(&data, config)
}

/// Parse a complete in-memory GIF stream with resource limits.
pub fn read_gif_with_config(data: &[u8], config: &DecodeConfig) -> Result<GifDocument> {
    let mut tracker = ResourceTracker::new(config);
    let mut src = ByteCursor::new(data);
    let order = config.channel_order;

    let version = read_signature(&mut src)?;
    let screen = read_screen_descriptor(&mut src)?;
    tracker.validate_total_megapixels(screen.width, screen.height)?;
    debug!("{version:?} {}x{} global table: {}", screen.width, screen.height, screen.has_global_color_table);

    let global_color_table = if screen.has_global_color_table {
        Some(read_color_table(&mut src, screen.global_table_exponent, order)?)
    } else {
        None
    };

    let mut frames = TryVec::new();
    let mut comments = TryVec::new();
    let mut loop_count = None;
    let mut pending: Option<GraphicControl> = None;

    loop {
        let offset = src.offset();
        match src.read_byte()? {
            BLOCK_IMAGE => {
                tracker.validate_animation_frames(frames.len() + 1)?;
                let frame = read_image(&mut src, pending.take(), order, &mut tracker)?;
                debug!(
                    "image {} at {offset}: {}x{}+{}+{} interlaced: {}",
                    frames.len(),
                    frame.width,
                    frame.height,
                    frame.left,
                    frame.top,
                    frame.interlaced
                );
                frames.push(frame)?;
            },
            BLOCK_EXTENSION => match src.read_byte()? {
                EXTENSION_GRAPHIC_CONTROL => {
                    let control = read_graphic_control(&mut src)?;
                    if pending.is_some() {
                        warn!("graphic control at {offset} replaces one that no image consumed");
                    }
                    pending = Some(control);
                },
                EXTENSION_APPLICATION => {
                    if let Some(count) = read_application(&mut src)? {
                        debug!("loop count {count:?} at {offset}");
                        loop_count = Some(count);
                    }
                },
                EXTENSION_COMMENT => {
                    comments.push(read_comment(&mut src, &mut tracker)?)?;
                },
                label => {
                    debug!("extension 0x{label:02x} at {offset} (skipped)");
                    src.skip_sub_blocks()?;
                },
            },
            BLOCK_TRAILER => break,
            _ => return Err(Error::InvalidFormat("unknown block introducer")),
        }
    }

    if frames.len() <= 1 {
        loop_count = None;
    }

    Ok(GifDocument {
        version,
        screen,
        global_color_table,
        channel_order: order,
        loop_count,
        frames,
        comments,
    })
}

fn read_signature(src: &mut ByteCursor<'_>) -> Result<Version> {
    let signature = src
        .read_ascii::<SIGNATURE_LEN>()
        .map_err(|e| match e {
            Error::InvalidFormat(_) => Error::InvalidFormat("not a GIF signature"),
            e => e,
        })?;
    match signature.as_str() {
        "GIF87a" => Ok(Version::Gif87a),
        "GIF89a" => Ok(Version::Gif89a),
        _ => Err(Error::InvalidFormat("not a GIF signature")),
    }
}

fn read_screen_descriptor(src: &mut ByteCursor<'_>) -> Result<LogicalScreenDescriptor> {
    let width = src.read_u16_le()?;
    let height = src.read_u16_le()?;
    let packed = src.read_byte()?;
    let background = src.read_byte()?;
    let aspect_ratio = src.read_byte()?;
    let has_global_color_table = packed & 0x80 != 0;
    Ok(LogicalScreenDescriptor {
        width,
        height,
        has_global_color_table,
        global_table_exponent: packed & 0b111,
        background_index: has_global_color_table.then_some(background),
        aspect_ratio,
    })
}

fn read_color_table(src: &mut ByteCursor<'_>, exponent: u8, order: ChannelOrder) -> Result<ColorTable> {
    let len = ColorTable::len_for_exponent(exponent);
    let raw = src.take(len * 3)?;
    let colors = raw
        .chunks_exact(3)
        .map(|rgb| order.opaque(rgb[0], rgb[1], rgb[2]))
        .collect();
    Ok(ColorTable { colors })
}

fn read_image(
    src: &mut ByteCursor<'_>,
    control: Option<GraphicControl>,
    order: ChannelOrder,
    tracker: &mut ResourceTracker<'_>,
) -> Result<ImageDescriptor> {
    let left = src.read_u16_le()?;
    let top = src.read_u16_le()?;
    let width = src.read_u16_le()?;
    let height = src.read_u16_le()?;
    let packed = src.read_byte()?;
    tracker.validate_total_megapixels(width, height)?;

    let local_table_exponent = packed & 0b111;
    let local_color_table = if packed & 0x80 != 0 {
        Some(read_color_table(src, local_table_exponent, order)?)
    } else {
        None
    };

    let mut payload = TryVec::new();
    tracker.reserve(1)?;
    payload.push(src.read_byte()?)?;
    src.for_each_sub_block(|block| {
        tracker.reserve(block.len().to_u64())?;
        payload.extend_from_slice(block)?;
        Ok(())
    })?;

    Ok(ImageDescriptor {
        left,
        top,
        width,
        height,
        interlaced: packed & 0x40 != 0,
        local_table_exponent,
        local_color_table,
        control,
        payload,
    })
}

fn read_graphic_control(src: &mut ByteCursor<'_>) -> Result<GraphicControl> {
    if src.read_byte()? != GRAPHIC_CONTROL_LEN {
        return Err(Error::InvalidFormat("graphic control block size must be 4"));
    }
    let packed = src.read_byte()?;
    let delay_centis = src.read_u16_le()?;
    let transparent = src.read_byte()?;
    if src.read_byte()? != 0 {
        return Err(Error::InvalidFormat("graphic control block not terminated"));
    }
    Ok(GraphicControl {
        disposal: DisposalMethod::from((packed >> 2) & 0b111),
        delay_centis,
        transparent_index: (packed & 1 != 0).then_some(transparent),
    })
}

/// Returns the loop count for the two looping extensions and skips any
/// other application block.
fn read_application(src: &mut ByteCursor<'_>) -> Result<Option<LoopCount>> {
    src.skip(1)?;
    let identifier: [u8; 11] = src.read_array()?;
    match &identifier {
        b"NETSCAPE2.0" | b"ANIMEXTS1.0" => {
            src.skip(2)?;
            let count = src.read_u16_le()?;
            src.skip(1)?;
            Ok(Some(LoopCount::from(count)))
        },
        _ => {
            debug!("application extension {} (skipped)", identifier.escape_ascii());
            src.skip_sub_blocks()?;
            Ok(None)
        },
    }
}

fn read_comment(src: &mut ByteCursor<'_>, tracker: &mut ResourceTracker<'_>) -> Result<TryVec<u8>> {
    let mut text = TryVec::new();
    src.for_each_sub_block(|block| {
        tracker.reserve(block.len().to_u64())?;
        text.extend_from_slice(block)?;
        Ok(())
    })?;
    Ok(text)
}

#[test]
fn rejects_unknown_signature_after_six_bytes() {
    let data = b"GIF88a\x0a\x00\x0a\x00\x00\x00\x00;";
    let mut src = ByteCursor::new(data);
    assert!(matches!(read_signature(&mut src), Err(Error::InvalidFormat(_))));
    assert_eq!(src.offset(), SIGNATURE_LEN);
    assert!(matches!(read_gif(data, ChannelOrder::Rgba), Err(Error::InvalidFormat(_))));
}

#[test]
fn disposal_values_past_three_are_unspecified() {
    assert_eq!(DisposalMethod::from(0), DisposalMethod::NotSpecified);
    assert_eq!(DisposalMethod::from(1), DisposalMethod::DoNotDispose);
    assert_eq!(DisposalMethod::from(2), DisposalMethod::RestoreToBackground);
    assert_eq!(DisposalMethod::from(3), DisposalMethod::RestoreToPrevious);
    for raw in 4..8 {
        assert_eq!(DisposalMethod::from(raw), DisposalMethod::NotSpecified);
    }
}

#[test]
fn graphic_control_fields() {
    // disposal 2, transparency flag, 25cs, index 7
    let mut src = ByteCursor::new(&[4, 0b0000_1001, 25, 0, 7, 0]);
    let control = read_graphic_control(&mut src).unwrap();
    assert_eq!(control.disposal, DisposalMethod::RestoreToBackground);
    assert_eq!(control.delay_centis, 25);
    assert_eq!(control.transparent_index, Some(7));

    // disposal field 7 degrades, index ignored without the flag
    let mut src = ByteCursor::new(&[4, 0b0001_1100, 0, 1, 7, 0]);
    let control = read_graphic_control(&mut src).unwrap();
    assert_eq!(control.disposal, DisposalMethod::NotSpecified);
    assert_eq!(control.delay_centis, 256);
    assert_eq!(control.transparent_index, None);
}

#[test]
fn graphic_control_fixed_fields_are_checked() {
    let mut src = ByteCursor::new(&[5, 0, 0, 0, 0, 0, 0]);
    assert!(matches!(read_graphic_control(&mut src), Err(Error::InvalidFormat(_))));
    let mut src = ByteCursor::new(&[4, 0, 0, 0, 0, 1]);
    assert!(matches!(read_graphic_control(&mut src), Err(Error::InvalidFormat(_))));
}

#[test]
fn color_table_sizes_and_masking() {
    for exponent in 0..8u8 {
        let len = ColorTable::len_for_exponent(exponent);
        assert_eq!(len, 1 << (exponent + 1));
        let mut raw = std::vec::Vec::new();
        for i in 0..len {
            raw.extend_from_slice(&[i as u8, 0, 0]);
        }
        let table = read_color_table(&mut ByteCursor::new(&raw), exponent, ChannelOrder::Rgba).unwrap();
        assert_eq!(table.len(), len);
        for index in 0..=255u8 {
            assert_eq!(table.get(index)[0], (index.to_usize() % len) as u8);
        }
    }
}

#[test]
fn color_table_channel_order() {
    let raw = [1, 2, 3, 4, 5, 6];
    let rgba = read_color_table(&mut ByteCursor::new(&raw), 0, ChannelOrder::Rgba).unwrap();
    let bgra = read_color_table(&mut ByteCursor::new(&raw), 0, ChannelOrder::Bgra).unwrap();
    assert_eq!(rgba.colors(), &[[1, 2, 3, 255], [4, 5, 6, 255]]);
    assert_eq!(bgra.colors(), &[[3, 2, 1, 255], [6, 5, 4, 255]]);
}

#[test]
fn grayscale_is_increasing() {
    for exponent in 0..8u8 {
        let table = ColorTable::grayscale(exponent);
        assert_eq!(table.len(), ColorTable::len_for_exponent(exponent));
        assert!(table.colors().windows(2).all(|w| w[0][0] < w[1][0]));
        assert!(table.colors().iter().all(|c| c[3] == 0xff));
    }
}

#[test]
fn loop_count_plays() {
    assert_eq!(LoopCount::from(0), LoopCount::Infinite);
    assert_eq!(LoopCount::from(0).total_plays(), None);
    assert_eq!(LoopCount::from(3).total_plays(), Some(4));
}

#[test]
fn unrelated_application_block_is_skipped() {
    let mut data = std::vec::Vec::new();
    data.push(11);
    data.extend_from_slice(b"XMP DataXMP");
    data.extend_from_slice(&[3, 1, 2, 3, 0, 0x3b]);
    let mut src = ByteCursor::new(&data);
    assert_eq!(read_application(&mut src).unwrap(), None);
    assert_eq!(src.read_byte().unwrap(), 0x3b);
}
