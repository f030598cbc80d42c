//! 15-bit BGR palettes.
//!
//! On the cartridge a palette is a table of 16 or 256 half-words:
//!
//! ```text
//! ┌ ignored on read, written as 0
//! | ┌ blue           ┌ red
//! 0 BBBBB GGGGG RRRRR
//! ```
//!
//! Each channel is five bits wide, scaled to eight bits by a shift of
//! three. The reverse conversion floors, so anything below the top five
//! bits of a channel is lost on a write.

use byteorder::{ByteOrder, LittleEndian};
use log::debug;

use crate::errors::PaletteError;
use crate::lz77;
use crate::rom::RomBuffer;

/// The two palette sizes the hardware knows: one row of 16 colors for
/// 4bpp graphics, or the full 256-color table for 8bpp.
const COUNTS: [usize; 2] = [16, 256];

/// One palette entry, widened to RGBA8.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    /// An opaque color.
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// The color as normalized floats, ready for a GL uniform or
    /// texture upload.
    pub fn to_gl(self) -> [f32; 4] {
        [
            f32::from(self.r) / 255.0,
            f32::from(self.g) / 255.0,
            f32::from(self.b) / 255.0,
            f32::from(self.a) / 255.0,
        ]
    }
}

impl From<u16> for Rgba {
    fn from(raw: u16) -> Self {
        Self {
            r: ((raw & 0x001F) << 3) as u8,
            g: ((raw & 0x03E0) >> 2) as u8,
            b: ((raw & 0x7C00) >> 7) as u8,
            a: 255,
        }
    }
}

impl From<Rgba> for u16 {
    fn from(color: Rgba) -> Self {
        u16::from(color.b >> 3) << 10 | u16::from(color.g >> 3) << 5 | u16::from(color.r >> 3)
    }
}

/// A decoded color table.
pub struct Palette {
    colors: Vec<Rgba>,
    /// Bytes the table occupied in ROM when it was read (compressed
    /// footprint for compressed tables). What a rewrite has to fit in.
    rom_len: usize,
}

impl Palette {
    /// Build a palette from colors already in memory.
    pub fn from_colors(colors: Vec<Rgba>) -> Result<Self, PaletteError> {
        if !COUNTS.contains(&colors.len()) {
            return Err(PaletteError::BadCount(colors.len()));
        }
        let rom_len = colors.len() * 2;
        Ok(Self { colors, rom_len })
    }

    /// Read an uncompressed table of `count` colors at `offset`.
    ///
    /// `count` is validated before the ROM is touched.
    pub fn read_uncompressed(
        rom: &mut RomBuffer,
        offset: usize,
        count: usize,
    ) -> Result<Self, PaletteError> {
        if !COUNTS.contains(&count) {
            return Err(PaletteError::BadCount(count));
        }

        rom.seek(offset)?;
        let colors = rom
            .read_u16_table(count)?
            .into_iter()
            .map(Rgba::from)
            .collect();
        Ok(Self {
            colors,
            rom_len: count * 2,
        })
    }

    /// Read an LZ77-compressed table at `offset`.
    ///
    /// The decompressed payload must be exactly 16 or 256 half-words.
    pub fn read_compressed(rom: &RomBuffer, offset: usize) -> Result<Self, PaletteError> {
        let stream = lz77::decompress(rom.slice_from(offset)?)?;
        if !COUNTS.contains(&(stream.data.len() / 2)) || stream.data.len() % 2 != 0 {
            return Err(PaletteError::BadCount(stream.data.len() / 2));
        }

        let colors = stream
            .data
            .chunks_exact(2)
            .map(|pair| Rgba::from(LittleEndian::read_u16(pair)))
            .collect();
        Ok(Self {
            colors,
            // The stream on disk is padded to a word boundary; that is
            // the footprint a rewrite has to fit.
            rom_len: stream.read.next_multiple_of(4),
        })
    }

    /// Number of colors, 16 or 256.
    pub fn count(&self) -> usize {
        self.colors.len()
    }

    pub fn colors(&self) -> &[Rgba] {
        &self.colors
    }

    pub fn color(&self, index: usize) -> Option<Rgba> {
        self.colors.get(index).copied()
    }

    /// Replace one entry. Returns false when `index` is out of range.
    pub fn set_color(&mut self, index: usize, color: Rgba) -> bool {
        match self.colors.get_mut(index) {
            Some(slot) => {
                *slot = color;
                true
            }
            None => false,
        }
    }

    /// The whole table as normalized floats.
    pub fn gl_colors(&self) -> Vec<[f32; 4]> {
        self.colors.iter().map(|c| c.to_gl()).collect()
    }

    /// Encode the table back to its on-disk half-word form.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = vec![0u8; self.colors.len() * 2];
        for (pair, &color) in out.chunks_exact_mut(2).zip(&self.colors) {
            LittleEndian::write_u16(pair, color.into());
        }
        out
    }

    /// Whether writing the table back (compressed or not) needs more
    /// bytes than it occupied when read.
    pub fn requires_repoint(&self, compressed: bool) -> Result<bool, PaletteError> {
        Ok(self.encoded_len(compressed)? > self.rom_len)
    }

    /// Write the table at `offset`, compressing it first if asked.
    pub fn write(
        &self,
        rom: &mut RomBuffer,
        offset: usize,
        compressed: bool,
    ) -> Result<(), PaletteError> {
        let mut bytes = self.encode();
        if compressed {
            bytes = lz77::compress(&bytes)?;
        }
        debug!("palette: writing {} bytes at {offset:#x}", bytes.len());

        rom.seek(offset)?;
        rom.write_bytes(&bytes)?;
        Ok(())
    }

    fn encoded_len(&self, compressed: bool) -> Result<usize, PaletteError> {
        let bytes = self.encode();
        if compressed {
            Ok(lz77::compress(&bytes)?.len())
        } else {
            Ok(bytes.len())
        }
    }
}
