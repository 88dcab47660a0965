//! ZRLE encoding decoder - zlib-compressed RLE in 64x64 tiles.
//!
//! ZRLE (type 16) wraps its payload in a single zlib stream that lives for
//! the whole connection: every rectangle contributes a compressed block to
//! the same stream, and only the first block carries the zlib header.
//! Resetting the inflater between messages corrupts the stream, so the
//! [`ZrleStream`] is owned per connection and never reset.
//!
//! # Wire Format
//!
//! ```text
//! +------------------+
//! | length           |  4 bytes (u32)
//! | zlib data        |  'length' bytes, appended to the connection stream
//! +------------------+
//! ```
//!
//! The decompressed byte sequence holds 64x64 tiles (clipped at the right
//! and bottom edges) in row-major order. Each tile starts with a
//! subencoding byte: bit 7 is the RLE flag, bits 0-6 the palette size.
//!
//! - `palette 0, no RLE`: `tw * th` raw cpixels
//! - `palette 1`: one cpixel fills the tile
//! - `palette 2..=16, no RLE`: palette, then packed indices - 1 bit for two
//!   colours (packed across the whole tile), 2 bits for 3-4 and 4 bits for
//!   5-16 (rows padded to a byte boundary), MSB first within each byte
//! - `palette 0, RLE`: runs of one cpixel each; the run length is a chain
//!   of 0xFF bytes plus a terminator, summed, plus one
//! - `palette >= 2, RLE`: palette, then index bytes - top bit set means a
//!   run length follows, clear means a single pixel
//!
//! A "cpixel" is 3 bytes interpreted as RGB; the decoder completes it with
//! an opaque alpha to form RGBX. Palette sizes above 16, and RLE with a
//! one-entry palette, are illegal and fail the connection - the zlib stream
//! cannot be resynchronized after a malformed tile.

use crate::{DecodeState, Step};
use anyhow::{anyhow, bail, Context, Result};
use flate2::{Decompress, FlushDecompress, Status};
use rfb_common::Rect;
use rfb_pixelbuffer::Surface;
use rfb_protocol::{PixelFormat, Rectangle};

/// Tile edge length; edge tiles are clipped.
const TILE_SIZE: u32 = 64;

/// Largest legal palette.
const MAX_PALETTE: u8 = 16;

/// The connection-lifetime ZRLE zlib stream.
///
/// Holds the inflater and any decompressed bytes not yet consumed by a
/// tile. Created once per connection; never reset while the connection
/// lives.
pub struct ZrleStream {
    inflater: Decompress,
    pending: Vec<u8>,
}

impl std::fmt::Debug for ZrleStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZrleStream")
            .field("total_in", &self.inflater.total_in())
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl Default for ZrleStream {
    fn default() -> Self {
        Self::new()
    }
}

impl ZrleStream {
    /// Create a fresh stream for a new connection.
    pub fn new() -> Self {
        Self {
            inflater: Decompress::new(true),
            pending: Vec::new(),
        }
    }

    /// Decompress a block from the wire and append the output to the
    /// pending buffer.
    fn feed(&mut self, compressed: &[u8]) -> Result<()> {
        let mut out_buf = vec![0u8; 64 * 1024];
        let mut in_pos = 0;

        while in_pos < compressed.len() {
            let before_in = self.inflater.total_in();
            let before_out = self.inflater.total_out();

            let status = self
                .inflater
                .decompress(&compressed[in_pos..], &mut out_buf, FlushDecompress::Sync)
                .context("ZRLE zlib decompression failed")?;

            let consumed = (self.inflater.total_in() - before_in) as usize;
            let produced = (self.inflater.total_out() - before_out) as usize;
            in_pos += consumed;
            self.pending.extend_from_slice(&out_buf[..produced]);

            match status {
                Status::Ok | Status::BufError => {
                    if consumed == 0 && produced == 0 {
                        bail!("ZRLE zlib stream stalled with {} bytes left", compressed.len() - in_pos);
                    }
                }
                Status::StreamEnd => {
                    if in_pos < compressed.len() {
                        tracing::warn!(
                            "ZRLE zlib stream ended early, {} trailing bytes",
                            compressed.len() - in_pos
                        );
                    }
                    break;
                }
            }
        }
        Ok(())
    }
}

/// ZRLE decode in progress.
#[derive(Debug)]
pub struct ZrleState {
    rect: Rectangle,
    phase: Phase,
}

#[derive(Debug)]
enum Phase {
    /// Waiting for the 4-byte compressed length.
    Length,
    /// Waiting for the compressed block itself.
    Body,
}

/// Start decoding a ZRLE rectangle.
pub fn begin(rect: Rectangle) -> Step {
    Step::Read(
        4,
        DecodeState::Zrle(ZrleState {
            rect,
            phase: Phase::Length,
        }),
    )
}

pub(crate) fn step(
    state: ZrleState,
    block: &[u8],
    zlib: &mut ZrleStream,
    surface: &mut dyn Surface,
) -> Result<Step> {
    match state.phase {
        Phase::Length => {
            let compressed_len = u32::from_be_bytes([block[0], block[1], block[2], block[3]]);
            if compressed_len == 0 {
                decode_tiles(&state.rect, zlib, surface)?;
                return Ok(Step::Done);
            }
            Ok(Step::Read(
                compressed_len as usize,
                DecodeState::Zrle(ZrleState {
                    rect: state.rect,
                    phase: Phase::Body,
                }),
            ))
        }
        Phase::Body => {
            zlib.feed(block)?;
            decode_tiles(&state.rect, zlib, surface)?;
            Ok(Step::Done)
        }
    }
}

/// Decode all tiles of the rectangle from the stream's pending bytes.
///
/// Consumed bytes are drained; bytes left over at a tile boundary stay
/// pending for the next rectangle. Running out of data in the middle of a
/// tile is fatal.
fn decode_tiles(rect: &Rectangle, zlib: &mut ZrleStream, surface: &mut dyn Surface) -> Result<()> {
    let mut cursor = TileCursor::new(&zlib.pending);

    let right = rect.x as u32 + rect.width as u32;
    let bottom = rect.y as u32 + rect.height as u32;

    let mut ty = rect.y as u32;
    'tiles: while ty < bottom {
        let th = TILE_SIZE.min(bottom - ty);
        let mut tx = rect.x as u32;
        while tx < right {
            let tw = TILE_SIZE.min(right - tx);
            if cursor.remaining() == 0 {
                break 'tiles;
            }
            decode_tile(&mut cursor, tx, ty, tw, th, surface).with_context(|| {
                format!("failed to decode ZRLE tile at ({}, {})", tx, ty)
            })?;
            tx += TILE_SIZE;
        }
        ty += TILE_SIZE;
    }

    let consumed = cursor.pos;
    zlib.pending.drain(..consumed);
    Ok(())
}

/// Decode one tile and emit it to the surface.
fn decode_tile(
    cursor: &mut TileCursor<'_>,
    tx: u32,
    ty: u32,
    tw: u32,
    th: u32,
    surface: &mut dyn Surface,
) -> Result<()> {
    let subencoding = cursor.read_u8()?;
    let rle = subencoding & 0x80 != 0;
    let palette_size = subencoding & 0x7F;

    if palette_size > MAX_PALETTE {
        bail!("palette of size {} is not allowed", palette_size);
    }
    if rle && palette_size == 1 {
        bail!("RLE with a single-entry palette is not allowed");
    }

    let tile_rect = Rect::new(tx as i32, ty as i32, tw, th);
    let pixels_in_tile = (tw * th) as usize;
    let rgbx = PixelFormat::rgbx();

    match (rle, palette_size) {
        (false, 0) => {
            // Raw cpixels.
            let mut pixels = Vec::with_capacity(pixels_in_tile * 4);
            for _ in 0..pixels_in_tile {
                pixels.extend_from_slice(&read_cpixel(cursor)?);
            }
            surface.update_rect(tile_rect, &pixels, &rgbx)
        }
        (false, 1) => {
            // Solid colour.
            let colour = read_cpixel(cursor)?;
            surface.fill_rect(tile_rect, &colour, &rgbx)
        }
        (false, _) => {
            // Packed palette indices.
            let palette = read_palette(cursor, palette_size)?;
            let indices = read_packed_indices(cursor, palette_size, tw, th)?;
            let mut pixels = Vec::with_capacity(pixels_in_tile * 4);
            for index in indices {
                let colour = palette.get(index as usize).ok_or_else(|| {
                    anyhow!("palette index {} out of range ({})", index, palette_size)
                })?;
                pixels.extend_from_slice(colour);
            }
            surface.update_rect(tile_rect, &pixels, &rgbx)
        }
        (true, 0) => {
            // Plain RLE.
            let mut pixels = Vec::with_capacity(pixels_in_tile * 4);
            let mut count = 0usize;
            while count < pixels_in_tile {
                let colour = read_cpixel(cursor)?;
                let run = read_run_length(cursor)?;
                count += run;
                if count > pixels_in_tile {
                    bail!("RLE run overflows the tile ({} > {})", count, pixels_in_tile);
                }
                for _ in 0..run {
                    pixels.extend_from_slice(&colour);
                }
            }
            surface.update_rect(tile_rect, &pixels, &rgbx)
        }
        (true, _) => {
            // Palette RLE.
            let palette = read_palette(cursor, palette_size)?;
            let mut pixels = Vec::with_capacity(pixels_in_tile * 4);
            let mut count = 0usize;
            while count < pixels_in_tile {
                let index_byte = cursor.read_u8()?;
                let index = (index_byte & 0x7F) as usize;
                let colour = palette.get(index).ok_or_else(|| {
                    anyhow!("palette index {} out of range ({})", index, palette_size)
                })?;
                let run = if index_byte & 0x80 != 0 {
                    read_run_length(cursor)?
                } else {
                    1
                };
                count += run;
                if count > pixels_in_tile {
                    bail!("RLE run overflows the tile ({} > {})", count, pixels_in_tile);
                }
                for _ in 0..run {
                    pixels.extend_from_slice(colour);
                }
            }
            surface.update_rect(tile_rect, &pixels, &rgbx)
        }
    }
}

/// Read one cpixel (3 RGB bytes) and complete it to RGBX.
fn read_cpixel(cursor: &mut TileCursor<'_>) -> Result<[u8; 4]> {
    let raw = cursor.read_exact(3)?;
    Ok([raw[0], raw[1], raw[2], 0xFF])
}

/// Read a palette of `size` cpixels.
fn read_palette(cursor: &mut TileCursor<'_>, size: u8) -> Result<Vec<[u8; 4]>> {
    (0..size).map(|_| read_cpixel(cursor)).collect()
}

/// Read an RLE run length: a chain of 0xFF bytes plus a terminating byte,
/// summed, plus one.
fn read_run_length(cursor: &mut TileCursor<'_>) -> Result<usize> {
    let mut run = 1usize;
    loop {
        let byte = cursor.read_u8()?;
        run += byte as usize;
        if byte != 0xFF {
            return Ok(run);
        }
    }
}

/// Read the packed index stream for a palette tile.
///
/// Two-colour palettes use 1 bit per pixel packed across the whole tile;
/// larger palettes use 2 or 4 bits with each row padded to a byte boundary.
/// Bits are MSB-first within each byte.
fn read_packed_indices(
    cursor: &mut TileCursor<'_>,
    palette_size: u8,
    tw: u32,
    th: u32,
) -> Result<Vec<u8>> {
    let total = (tw * th) as usize;
    let mut indices = Vec::with_capacity(total);

    if palette_size == 2 {
        let nbytes = total.div_ceil(8);
        let data = cursor.read_exact(nbytes)?;
        for i in 0..total {
            indices.push((data[i / 8] >> (7 - i % 8)) & 1);
        }
        return Ok(indices);
    }

    let bits: usize = if palette_size <= 4 { 2 } else { 4 };
    let mask = (1u8 << bits) - 1;
    let row_bytes = (tw as usize * bits).div_ceil(8);
    for _ in 0..th {
        let data = cursor.read_exact(row_bytes)?;
        let mut bit = 0usize;
        for _ in 0..tw {
            let shift = 8 - bits - (bit % 8);
            indices.push((data[bit / 8] >> shift) & mask);
            bit += bits;
        }
    }
    Ok(indices)
}

/// Byte cursor over the decompressed pending buffer.
struct TileCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> TileCursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn read_u8(&mut self) -> Result<u8> {
        let byte = *self
            .data
            .get(self.pos)
            .ok_or_else(|| anyhow!("unexpected end of ZRLE tile data"))?;
        self.pos += 1;
        Ok(byte)
    }

    fn read_exact(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            bail!(
                "unexpected end of ZRLE tile data ({} of {} bytes)",
                self.remaining(),
                n
            );
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{bgrx, run_to_completion, CanvasSurface};
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn rect(x: u16, y: u16, w: u16, h: u16) -> Rectangle {
        Rectangle {
            x,
            y,
            width: w,
            height: h,
            encoding: crate::ENCODING_ZRLE,
        }
    }

    /// Compress `data` as the start of a zlib stream, sync-flushed so every
    /// byte is recoverable without closing the stream.
    fn compress(data: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.flush().unwrap();
        encoder.get_ref().clone()
    }

    /// Wire payload for one ZRLE rectangle: length prefix + compressed data.
    fn wire(compressed: &[u8]) -> Vec<u8> {
        let mut payload = (compressed.len() as u32).to_be_bytes().to_vec();
        payload.extend_from_slice(compressed);
        payload
    }

    fn decode(
        r: Rectangle,
        tile_data: &[u8],
        surface: &mut CanvasSurface,
        zlib: &mut ZrleStream,
    ) -> Result<()> {
        let payload = wire(&compress(tile_data));
        run_to_completion(begin(r), &payload, &bgrx(), zlib, surface)
    }

    #[test]
    fn test_raw_tile() {
        // 2x2 tile of raw cpixels.
        let mut data = vec![0u8]; // subencoding: no RLE, no palette
        for rgb in [[255, 0, 0], [0, 255, 0], [0, 0, 255], [7, 8, 9]] {
            data.extend_from_slice(&rgb);
        }

        let mut surface = CanvasSurface::new(4, 4);
        let mut zlib = ZrleStream::new();
        decode(rect(0, 0, 2, 2), &data, &mut surface, &mut zlib).unwrap();

        assert_eq!(surface.canvas.pixel(0, 0), [255, 0, 0]);
        assert_eq!(surface.canvas.pixel(1, 0), [0, 255, 0]);
        assert_eq!(surface.canvas.pixel(0, 1), [0, 0, 255]);
        assert_eq!(surface.canvas.pixel(1, 1), [7, 8, 9]);
    }

    #[test]
    fn test_solid_tile() {
        let data = [1u8, 200, 100, 50]; // palette size 1 + one cpixel

        let mut surface = CanvasSurface::new(4, 4);
        let mut zlib = ZrleStream::new();
        decode(rect(0, 0, 4, 4), &data, &mut surface, &mut zlib).unwrap();

        assert_eq!(surface.canvas.pixel(0, 0), [200, 100, 50]);
        assert_eq!(surface.canvas.pixel(3, 3), [200, 100, 50]);
    }

    #[test]
    fn test_packed_palette_two_colours() {
        // 2x2 tile, palette {red, green}, indices 0,1 / 1,0 packed as
        // continuous bits: 0110 xxxx.
        let mut data = vec![2u8];
        data.extend_from_slice(&[255, 0, 0]);
        data.extend_from_slice(&[0, 255, 0]);
        data.push(0b0110_0000);

        let mut surface = CanvasSurface::new(2, 2);
        let mut zlib = ZrleStream::new();
        decode(rect(0, 0, 2, 2), &data, &mut surface, &mut zlib).unwrap();

        assert_eq!(surface.canvas.pixel(0, 0), [255, 0, 0]);
        assert_eq!(surface.canvas.pixel(1, 0), [0, 255, 0]);
        assert_eq!(surface.canvas.pixel(0, 1), [0, 255, 0]);
        assert_eq!(surface.canvas.pixel(1, 1), [255, 0, 0]);
    }

    #[test]
    fn test_packed_palette_one_bit_crosses_rows() {
        // 3x3 tile with a two-colour palette: 9 one-bit indices occupy two
        // bytes with no per-row padding. Alternating pattern starting red.
        let mut data = vec![2u8];
        data.extend_from_slice(&[255, 0, 0]);
        data.extend_from_slice(&[0, 255, 0]);
        data.push(0b0101_0101);
        data.push(0b0000_0000); // ninth index = 0, rest padding

        let mut surface = CanvasSurface::new(3, 3);
        let mut zlib = ZrleStream::new();
        decode(rect(0, 0, 3, 3), &data, &mut surface, &mut zlib).unwrap();

        // Row-major alternation continues across row boundaries.
        assert_eq!(surface.canvas.pixel(0, 0), [255, 0, 0]);
        assert_eq!(surface.canvas.pixel(1, 0), [0, 255, 0]);
        assert_eq!(surface.canvas.pixel(2, 0), [255, 0, 0]);
        assert_eq!(surface.canvas.pixel(0, 1), [0, 255, 0]);
        assert_eq!(surface.canvas.pixel(2, 2), [255, 0, 0]);
    }

    #[test]
    fn test_packed_palette_dibits_pad_per_row() {
        // 3x2 tile, three-colour palette: 2-bit indices, each row padded to
        // a byte. Row 0 = 0,1,2; row 1 = 2,1,0.
        let mut data = vec![3u8];
        data.extend_from_slice(&[255, 0, 0]);
        data.extend_from_slice(&[0, 255, 0]);
        data.extend_from_slice(&[0, 0, 255]);
        data.push(0b00_01_10_00);
        data.push(0b10_01_00_00);

        let mut surface = CanvasSurface::new(3, 2);
        let mut zlib = ZrleStream::new();
        decode(rect(0, 0, 3, 2), &data, &mut surface, &mut zlib).unwrap();

        assert_eq!(surface.canvas.pixel(0, 0), [255, 0, 0]);
        assert_eq!(surface.canvas.pixel(1, 0), [0, 255, 0]);
        assert_eq!(surface.canvas.pixel(2, 0), [0, 0, 255]);
        assert_eq!(surface.canvas.pixel(0, 1), [0, 0, 255]);
        assert_eq!(surface.canvas.pixel(2, 1), [255, 0, 0]);
    }

    #[test]
    fn test_packed_palette_nibbles() {
        // 2x1 tile, five-colour palette: 4-bit indices, one byte per row.
        let mut data = vec![5u8];
        for i in 0..5u8 {
            data.extend_from_slice(&[i * 10, i * 10, i * 10]);
        }
        data.push(0x40); // indices 4, 0

        let mut surface = CanvasSurface::new(2, 1);
        let mut zlib = ZrleStream::new();
        decode(rect(0, 0, 2, 1), &data, &mut surface, &mut zlib).unwrap();

        assert_eq!(surface.canvas.pixel(0, 0), [40, 40, 40]);
        assert_eq!(surface.canvas.pixel(1, 0), [0, 0, 0]);
    }

    #[test]
    fn test_plain_rle() {
        // 2x2 tile: run of 3 red, run of 1 green.
        let mut data = vec![0x80u8];
        data.extend_from_slice(&[255, 0, 0]);
        data.push(2); // run length 3
        data.extend_from_slice(&[0, 255, 0]);
        data.push(0); // run length 1

        let mut surface = CanvasSurface::new(2, 2);
        let mut zlib = ZrleStream::new();
        decode(rect(0, 0, 2, 2), &data, &mut surface, &mut zlib).unwrap();

        assert_eq!(surface.canvas.pixel(0, 0), [255, 0, 0]);
        assert_eq!(surface.canvas.pixel(0, 1), [255, 0, 0]);
        assert_eq!(surface.canvas.pixel(1, 1), [0, 255, 0]);
    }

    #[test]
    fn test_rle_run_length_continuation() {
        // 20x16 tile = 320 pixels in one run: 1 + 255 + 64.
        let mut data = vec![0x80u8];
        data.extend_from_slice(&[9, 9, 9]);
        data.push(255);
        data.push(64);

        let mut surface = CanvasSurface::new(20, 16);
        let mut zlib = ZrleStream::new();
        decode(rect(0, 0, 20, 16), &data, &mut surface, &mut zlib).unwrap();

        assert_eq!(surface.canvas.pixel(0, 0), [9, 9, 9]);
        assert_eq!(surface.canvas.pixel(19, 15), [9, 9, 9]);
    }

    #[test]
    fn test_palette_rle() {
        // 2x2 tile, palette {red, green}: index 0 run of 3, index 1 single.
        let mut data = vec![0x80u8 | 2];
        data.extend_from_slice(&[255, 0, 0]);
        data.extend_from_slice(&[0, 255, 0]);
        data.push(0x80); // index 0 with run bit
        data.push(2); // run length 3
        data.push(0x01); // index 1, single pixel

        let mut surface = CanvasSurface::new(2, 2);
        let mut zlib = ZrleStream::new();
        decode(rect(0, 0, 2, 2), &data, &mut surface, &mut zlib).unwrap();

        assert_eq!(surface.canvas.pixel(1, 0), [255, 0, 0]);
        assert_eq!(surface.canvas.pixel(1, 1), [0, 255, 0]);
    }

    #[test]
    fn test_multiple_tiles_per_rect() {
        // 65x1 rectangle: a 64-wide solid tile then a 1-wide solid tile.
        let mut data = vec![1u8, 255, 0, 0];
        data.extend_from_slice(&[1u8, 0, 255, 0]);

        let mut surface = CanvasSurface::new(65, 1);
        let mut zlib = ZrleStream::new();
        decode(rect(0, 0, 65, 1), &data, &mut surface, &mut zlib).unwrap();

        assert_eq!(surface.canvas.pixel(63, 0), [255, 0, 0]);
        assert_eq!(surface.canvas.pixel(64, 0), [0, 255, 0]);
    }

    #[test]
    fn test_zlib_stream_spans_rectangles() {
        // One zlib stream carrying two rectangles' tile data, sync-flushed
        // at the rectangle boundary. The second rectangle decodes only if
        // the inflater state survived the first.
        let tile_a = [1u8, 255, 0, 0];
        let tile_b = [1u8, 0, 0, 255];

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&tile_a).unwrap();
        encoder.flush().unwrap();
        let split = encoder.get_ref().len();
        encoder.write_all(&tile_b).unwrap();
        encoder.flush().unwrap();
        let stream = encoder.get_ref().clone();

        let mut surface = CanvasSurface::new(8, 8);
        let mut zlib = ZrleStream::new();

        run_to_completion(
            begin(rect(0, 0, 4, 4)),
            &wire(&stream[..split]),
            &bgrx(),
            &mut zlib,
            &mut surface,
        )
        .unwrap();
        run_to_completion(
            begin(rect(4, 0, 4, 4)),
            &wire(&stream[split..]),
            &bgrx(),
            &mut zlib,
            &mut surface,
        )
        .unwrap();

        assert_eq!(surface.canvas.pixel(0, 0), [255, 0, 0]);
        assert_eq!(surface.canvas.pixel(4, 0), [0, 0, 255]);
    }

    #[test]
    fn test_oversized_palette_fails() {
        let mut data = vec![17u8];
        for _ in 0..17 {
            data.extend_from_slice(&[0, 0, 0]);
        }

        let mut surface = CanvasSurface::new(4, 4);
        let mut zlib = ZrleStream::new();
        assert!(decode(rect(0, 0, 4, 4), &data, &mut surface, &mut zlib).is_err());
    }

    #[test]
    fn test_rle_single_entry_palette_fails() {
        let data = [0x80u8 | 1, 0, 0, 0];
        let mut surface = CanvasSurface::new(4, 4);
        let mut zlib = ZrleStream::new();
        assert!(decode(rect(0, 0, 4, 4), &data, &mut surface, &mut zlib).is_err());
    }

    #[test]
    fn test_run_overflowing_tile_fails() {
        // 2x2 tile but a run of 6.
        let mut data = vec![0x80u8];
        data.extend_from_slice(&[1, 2, 3]);
        data.push(5);

        let mut surface = CanvasSurface::new(2, 2);
        let mut zlib = ZrleStream::new();
        assert!(decode(rect(0, 0, 2, 2), &data, &mut surface, &mut zlib).is_err());
    }

    #[test]
    fn test_truncated_tile_fails() {
        // Raw 2x2 tile with only two of four cpixels.
        let mut data = vec![0u8];
        data.extend_from_slice(&[1, 2, 3, 4, 5, 6]);

        let mut surface = CanvasSurface::new(2, 2);
        let mut zlib = ZrleStream::new();
        assert!(decode(rect(0, 0, 2, 2), &data, &mut surface, &mut zlib).is_err());
    }

    #[test]
    fn test_exhaustion_at_tile_boundary_tolerated() {
        // Data for one solid tile of a two-tile rectangle: the second tile
        // is simply not painted yet.
        let data = [1u8, 50, 60, 70];

        let mut surface = CanvasSurface::new(65, 1);
        let mut zlib = ZrleStream::new();
        decode(rect(0, 0, 65, 1), &data, &mut surface, &mut zlib).unwrap();

        assert_eq!(surface.canvas.pixel(0, 0), [50, 60, 70]);
        assert_eq!(surface.canvas.pixel(64, 0), [0, 0, 0]);
    }
}
