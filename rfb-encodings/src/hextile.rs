//! Hextile encoding decoder - 16x16 tiles with per-tile sub-encodings.
//!
//! Hextile (type 5) splits the rectangle into 16x16 tiles, left-to-right
//! then top-to-bottom, clipped at the right and bottom edges. Each tile
//! starts with one sub-encoding byte of bit flags:
//!
//! - bit 0 `RAW`: the tile is `tw * th * bypp` raw pixels; other bits are
//!   ignored
//! - bit 1 `BACKGROUND_SPECIFIED`: a new background colour follows
//! - bit 2 `FOREGROUND_SPECIFIED`: a new foreground colour follows
//! - bit 3 `ANY_SUBRECTS`: a 1-byte sub-rectangle count follows the colours
//! - bit 4 `SUBRECTS_COLOURED`: each sub-rectangle carries its own colour
//!
//! Background and foreground are *rolling*: once specified they stay in
//! force for subsequent tiles until a later tile's flag replaces them. Every
//! non-raw tile is first filled with the current background; sub-rectangles
//! are packed as `(x << 4 | y)` and `((w-1) << 4 | (h-1))` bytes.
//!
//! The decoder demands one byte for the tile header, then exactly the bytes
//! that header implies, so a tile never stalls the stream for more than it
//! needs.

use crate::{DecodeState, Step};
use anyhow::{anyhow, Context, Result};
use rfb_common::Rect;
use rfb_pixelbuffer::Surface;
use rfb_protocol::{PixelFormat, Rectangle};

// Tile header bit flags.
const TILE_RAW: u8 = 1 << 0;
const TILE_BACKGROUND_SPECIFIED: u8 = 1 << 1;
const TILE_FOREGROUND_SPECIFIED: u8 = 1 << 2;
const TILE_ANY_SUBRECTS: u8 = 1 << 3;
const TILE_SUBRECTS_COLOURED: u8 = 1 << 4;

/// Tile edge length; edge tiles are clipped.
const TILE_SIZE: u16 = 16;

/// Hextile decode in progress.
#[derive(Debug)]
pub struct HextileState {
    rect: Rectangle,
    /// Absolute position of the current tile.
    tx: u16,
    ty: u16,
    /// Rolling colours, persisting across tiles until overridden.
    background: Option<Vec<u8>>,
    foreground: Option<Vec<u8>>,
    phase: Phase,
}

#[derive(Debug)]
enum Phase {
    /// Waiting for the 1-byte tile header.
    TileHeader,
    /// Waiting for a raw tile's pixels.
    RawTile { tw: u16, th: u16 },
    /// Waiting for the colours/count implied by the header.
    TileBody { subencoding: u8 },
    /// Waiting for the packed sub-rectangle list.
    Subrects { coloured: bool, tw: u16, th: u16 },
}

/// Start decoding a Hextile rectangle. The rectangle must be non-empty.
pub fn begin(rect: Rectangle) -> Step {
    Step::Read(
        1,
        DecodeState::Hextile(HextileState {
            rect,
            tx: rect.x,
            ty: rect.y,
            background: None,
            foreground: None,
            phase: Phase::TileHeader,
        }),
    )
}

impl HextileState {
    /// Width of the current tile, clipped at the rectangle edge.
    fn tile_w(&self) -> u16 {
        (self.rect.x as u32 + self.rect.width as u32 - self.tx as u32).min(TILE_SIZE as u32) as u16
    }

    /// Height of the current tile, clipped at the rectangle edge.
    fn tile_h(&self) -> u16 {
        (self.rect.y as u32 + self.rect.height as u32 - self.ty as u32).min(TILE_SIZE as u32)
            as u16
    }

    /// Advance to the next tile, or finish the rectangle.
    fn advance(mut self) -> Step {
        if self.tx as u32 + TILE_SIZE as u32 >= self.rect.x as u32 + self.rect.width as u32 {
            self.tx = self.rect.x;
            if self.ty as u32 + TILE_SIZE as u32 >= self.rect.y as u32 + self.rect.height as u32 {
                return Step::Done;
            }
            self.ty += TILE_SIZE;
        } else {
            self.tx += TILE_SIZE;
        }
        self.phase = Phase::TileHeader;
        Step::Read(1, DecodeState::Hextile(self))
    }

    /// Fill the current tile with the rolling background.
    fn fill_background(&self, surface: &mut dyn Surface, format: &PixelFormat) -> Result<()> {
        let background = self.background.as_ref().ok_or_else(|| {
            anyhow!(
                "hextile tile at ({}, {}) needs a background but none has been specified",
                self.tx,
                self.ty
            )
        })?;
        surface
            .fill_rect(
                Rect::new(
                    self.tx as i32,
                    self.ty as i32,
                    self.tile_w() as u32,
                    self.tile_h() as u32,
                ),
                background,
                format,
            )
            .context("failed to fill hextile tile background")
    }
}

pub(crate) fn step(
    mut state: HextileState,
    block: &[u8],
    format: &PixelFormat,
    surface: &mut dyn Surface,
) -> Result<Step> {
    let bypp = format.bytes_per_pixel();

    match state.phase {
        Phase::TileHeader => {
            let subencoding = block[0];
            let (tw, th) = (state.tile_w(), state.tile_h());

            if subencoding & TILE_RAW != 0 {
                state.phase = Phase::RawTile { tw, th };
                return Ok(Step::Read(
                    tw as usize * th as usize * bypp,
                    DecodeState::Hextile(state),
                ));
            }

            let mut body_len = 0;
            if subencoding & TILE_BACKGROUND_SPECIFIED != 0 {
                body_len += bypp;
            }
            if subencoding & TILE_FOREGROUND_SPECIFIED != 0 {
                body_len += bypp;
            }
            if subencoding & TILE_ANY_SUBRECTS != 0 {
                body_len += 1;
            }

            if body_len == 0 {
                // Plain tile: rolling background fills it, nothing to read.
                state.fill_background(surface, format)?;
                return Ok(state.advance());
            }

            state.phase = Phase::TileBody { subencoding };
            Ok(Step::Read(body_len, DecodeState::Hextile(state)))
        }

        Phase::RawTile { tw, th } => {
            surface
                .update_rect(
                    Rect::new(state.tx as i32, state.ty as i32, tw as u32, th as u32),
                    block,
                    format,
                )
                .context("failed to apply raw hextile tile")?;
            Ok(state.advance())
        }

        Phase::TileBody { subencoding } => {
            let mut pos = 0;
            if subencoding & TILE_BACKGROUND_SPECIFIED != 0 {
                state.background = Some(block[pos..pos + bypp].to_vec());
                pos += bypp;
            }
            state.fill_background(surface, format)?;
            if subencoding & TILE_FOREGROUND_SPECIFIED != 0 {
                state.foreground = Some(block[pos..pos + bypp].to_vec());
                pos += bypp;
            }

            if subencoding & TILE_ANY_SUBRECTS == 0 {
                return Ok(state.advance());
            }

            let count = block[pos];
            if count == 0 {
                return Ok(state.advance());
            }

            let coloured = subencoding & TILE_SUBRECTS_COLOURED != 0;
            if !coloured && state.foreground.is_none() {
                return Err(anyhow!(
                    "hextile tile at ({}, {}) has foreground subrects but no foreground colour",
                    state.tx,
                    state.ty
                ));
            }

            let per_subrect = if coloured { bypp + 2 } else { 2 };
            let (tw, th) = (state.tile_w(), state.tile_h());
            state.phase = Phase::Subrects { coloured, tw, th };
            Ok(Step::Read(
                count as usize * per_subrect,
                DecodeState::Hextile(state),
            ))
        }

        Phase::Subrects { coloured, tw, th } => {
            let per_subrect = if coloured { bypp + 2 } else { 2 };
            for (i, chunk) in block.chunks_exact(per_subrect).enumerate() {
                let (colour, xy, wh) = if coloured {
                    (&chunk[..bypp], chunk[bypp], chunk[bypp + 1])
                } else {
                    (
                        state.foreground.as_deref().unwrap(),
                        chunk[0],
                        chunk[1],
                    )
                };

                let sx = (xy >> 4) as u16;
                let sy = (xy & 0x0F) as u16;
                let sw = ((wh >> 4) + 1) as u16;
                let sh = ((wh & 0x0F) + 1) as u16;

                if sx + sw > tw || sy + sh > th {
                    return Err(anyhow!(
                        "hextile subrect {} [{},{} {}x{}] exceeds {}x{} tile at ({}, {})",
                        i,
                        sx,
                        sy,
                        sw,
                        sh,
                        tw,
                        th,
                        state.tx,
                        state.ty
                    ));
                }

                surface
                    .fill_rect(
                        Rect::new(
                            state.tx as i32 + sx as i32,
                            state.ty as i32 + sy as i32,
                            sw as u32,
                            sh as u32,
                        ),
                        colour,
                        format,
                    )
                    .with_context(|| format!("failed to fill hextile subrect {}", i))?;
            }
            Ok(state.advance())
        }
    }
}
