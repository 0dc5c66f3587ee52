// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use log::{debug, warn};

use crate::{ColorTable, DisposalMethod, Error, GifDocument, ImageDescriptor, LoopCount, Result, ToUsize, lzw};

/// Delay used for frames that declare none. Zero-length frames are not shown.
pub const DEFAULT_FRAME_DELAY_MS: u32 = 320;

const BYTES_PER_PIXEL: usize = 4;
const TRANSPARENT: [u8; 4] = [0; 4];

/// Interlaced images store their rows in four passes of `(first row, stride)`.
static INTERLACE_PASSES: [(usize, usize); 4] = [(0, 8), (4, 8), (2, 4), (1, 2)];
static SEQUENTIAL: [(usize, usize); 1] = [(0, 1)];

/// True row for each stored row of an interlaced image of `height` rows,
/// in storage order.
///
/// ```
/// let rows: Vec<usize> = gifanim::interlaced_row_order(10).collect();
/// assert_eq!(rows, [0, 8, 4, 2, 6, 1, 3, 5, 7, 9]);
/// ```
pub fn interlaced_row_order(height: usize) -> impl Iterator<Item = usize> {
    row_order(height, true)
}

fn row_order(height: usize, interlaced: bool) -> impl Iterator<Item = usize> {
    let passes: &'static [(usize, usize)] = if interlaced { &INTERLACE_PASSES } else { &SEQUENTIAL };
    passes
        .iter()
        .flat_map(move |&(start, stride)| (start..height).step_by(stride))
}

/// Playback state for one viewer of a [`GifDocument`].
///
/// The compositor owns the canvas; rendering hands out copies, never the
/// canvas itself. Several compositors may share one document.
#[derive(Debug)]
pub struct FrameCompositor<'a> {
    document: &'a GifDocument,
    canvas: Vec<u8>,
    /// Canvas as it was before a `RestoreToPrevious` frame painted.
    saved: Vec<u8>,
    background: [u8; 4],
    current: usize,
    last_rendered: Option<usize>,
}

impl<'a> FrameCompositor<'a> {
    /// Start a session with the canvas cleared to the background color.
    pub fn new(document: &'a GifDocument) -> Result<Self> {
        let background = resolve_background(document);
        let screen = document.screen();
        let len = screen.width.to_usize() * screen.height.to_usize() * BYTES_PER_PIXEL;
        let mut canvas = try_zeroed(len)?;
        fill(&mut canvas, background);
        debug!("canvas {}x{} background {background:?}", screen.width, screen.height);
        Ok(Self {
            document,
            canvas,
            saved: Vec::new(),
            background,
            current: 0,
            last_rendered: None,
        })
    }

    pub fn document(&self) -> &'a GifDocument {
        self.document
    }

    /// Background resolved when the session started, `[0, 0, 0, 0]` when transparent.
    pub fn background(&self) -> [u8; 4] {
        self.background
    }

    pub fn canvas_dimensions(&self) -> (u16, u16) {
        let screen = self.document.screen();
        (screen.width, screen.height)
    }

    pub fn frame_count(&self) -> usize {
        self.document.frame_count()
    }

    pub fn is_animated(&self) -> bool {
        self.document.is_animated()
    }

    pub fn loop_count(&self) -> Option<LoopCount> {
        self.document.loop_count()
    }

    pub fn current_frame_index(&self) -> usize {
        self.current
    }

    /// Move to the next frame, wrapping at the end. No-op for still images.
    pub fn advance(&mut self) {
        let count = self.frame_count();
        if count > 1 {
            self.current = (self.current + 1) % count;
        }
    }

    /// How long the current frame stays up, in milliseconds. 0 for still images.
    pub fn current_delay_ms(&self) -> u32 {
        if !self.is_animated() {
            return 0;
        }
        match self.document.frames()[self.current].delay_centis() {
            0 => DEFAULT_FRAME_DELAY_MS,
            centis => u32::from(centis) * 10,
        }
    }

    pub fn render_current_frame(&mut self) -> Result<Vec<u8>> {
        self.render_frame(self.current)
    }

    /// Composite frame `index` onto the canvas and return a copy of the result.
    ///
    /// Rendering the same index twice in a row returns the current canvas,
    /// with the frame's disposal already applied, without decoding again.
    /// On error the canvas is left untouched.
    pub fn render_frame(&mut self, index: usize) -> Result<Vec<u8>> {
        let document = self.document;
        let frame = document
            .frames()
            .get(index)
            .ok_or(Error::InvalidFormat("frame index out of bounds"))?;

        if self.last_rendered == Some(index) {
            return copy_of(&self.canvas);
        }

        let indices = lzw::decode(frame.compressed_data(), frame.min_code_size(), frame.pixel_count())?;
        let len = self.canvas.len();
        let mut output = try_zeroed(len)?;
        let disposal = frame.disposal();
        if disposal == DisposalMethod::RestoreToPrevious {
            reserve_total(&mut self.saved, len)?;
            self.saved.clear();
            self.saved.extend_from_slice(&self.canvas);
        }

        let fallback;
        let palette = match frame.local_color_table.as_ref().or(document.global_color_table()) {
            Some(table) => table,
            None => {
                warn!("frame {index} has no color table, using a gray ramp");
                fallback = ColorTable::grayscale(frame.local_table_exponent);
                &fallback
            },
        };

        debug!("frame {index}: {disposal:?} transparent {:?}", frame.transparent_index());
        self.paint(frame, &indices, palette);
        output.copy_from_slice(&self.canvas);

        match disposal {
            DisposalMethod::RestoreToPrevious => self.canvas.copy_from_slice(&self.saved),
            DisposalMethod::RestoreToBackground => self.clear_rect(frame),
            DisposalMethod::DoNotDispose | DisposalMethod::NotSpecified => {},
        }

        self.last_rendered = Some(index);
        Ok(output)
    }

    /// Return to the state right after construction.
    pub fn reset(&mut self) {
        fill(&mut self.canvas, self.background);
        self.saved.clear();
        self.current = 0;
        self.last_rendered = None;
    }

    fn paint(&mut self, frame: &ImageDescriptor, indices: &[u8], palette: &ColorTable) {
        let width = frame.width.to_usize();
        if width == 0 {
            return;
        }
        let screen = self.document.screen();
        let (screen_width, screen_height) = (screen.width.to_usize(), screen.height.to_usize());
        let (left, top) = (frame.left.to_usize(), frame.top.to_usize());
        let transparent = frame.transparent_index();

        let rows = row_order(frame.height.to_usize(), frame.interlaced);
        for (stored, row) in indices.chunks_exact(width).zip(rows) {
            let y = top + row;
            if y >= screen_height {
                continue;
            }
            for (dx, &index) in stored.iter().enumerate() {
                let x = left + dx;
                if x >= screen_width {
                    break;
                }
                if Some(index) == transparent {
                    continue;
                }
                let offset = (y * screen_width + x) * BYTES_PER_PIXEL;
                self.canvas[offset..offset + BYTES_PER_PIXEL].copy_from_slice(&palette.get(index));
            }
        }
    }

    fn clear_rect(&mut self, frame: &ImageDescriptor) {
        let screen = self.document.screen();
        let screen_width = screen.width.to_usize();
        let x_end = (frame.left.to_usize() + frame.width.to_usize()).min(screen_width);
        let y_end = (frame.top.to_usize() + frame.height.to_usize()).min(screen.height.to_usize());
        let x_start = frame.left.to_usize().min(x_end);
        for y in frame.top.to_usize()..y_end {
            let row = y * screen_width;
            let span = (row + x_start) * BYTES_PER_PIXEL..(row + x_end) * BYTES_PER_PIXEL;
            fill(&mut self.canvas[span], self.background);
        }
    }
}

fn resolve_background(document: &GifDocument) -> [u8; 4] {
    if document.frames().iter().any(|f| f.transparent_index().is_some()) {
        return TRANSPARENT;
    }
    match (document.global_color_table(), document.screen().background_index) {
        (Some(table), Some(index)) => table.get(index),
        _ => TRANSPARENT,
    }
}

fn fill(pixels: &mut [u8], color: [u8; 4]) {
    for px in pixels.chunks_exact_mut(BYTES_PER_PIXEL) {
        px.copy_from_slice(&color);
    }
}

fn try_zeroed(len: usize) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len).map_err(|_| Error::OutOfMemory)?;
    buf.resize(len, 0);
    Ok(buf)
}

fn reserve_total(buf: &mut Vec<u8>, total: usize) -> Result<()> {
    buf.try_reserve_exact(total.saturating_sub(buf.len()))
        .map_err(|_| Error::OutOfMemory)
}

fn copy_of(pixels: &[u8]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(pixels.len()).map_err(|_| Error::OutOfMemory)?;
    buf.extend_from_slice(pixels);
    Ok(buf)
}

#[test]
fn interlace_passes_cover_every_row_once() {
    for height in 0..40 {
        let mut rows: Vec<usize> = interlaced_row_order(height).collect();
        assert_eq!(rows.len(), height);
        rows.sort_unstable();
        assert!(rows.iter().copied().eq(0..height));
    }
}

#[test]
fn interlace_pass_order() {
    let rows: Vec<usize> = interlaced_row_order(16).collect();
    assert_eq!(rows, [0, 8, 4, 12, 2, 6, 10, 14, 1, 3, 5, 7, 9, 11, 13, 15]);
    let rows: Vec<usize> = interlaced_row_order(3).collect();
    assert_eq!(rows, [0, 2, 1]);
}

#[test]
fn sequential_rows_are_identity() {
    assert!(row_order(7, false).eq(0..7));
}
