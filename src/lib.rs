//! Codecs for Game Boy Advance cartridge assets.
//!
//! The crate reads and writes the binary forms game data takes on a
//! GBA cartridge, working over an image already loaded into memory:
//!
//! | Module      | Description                                          |
//! | ----------- | ---------------------------------------------------- |
//! | [`rom`]     | The cartridge image: bounded little-endian access, pointer translation, free-space search |
//! | [`lz77`]    | The BIOS `SWI 0x11` LZ77 scheme (compression type `0x10`) |
//! | [`palette`] | 15-bit BGR color tables of 16 or 256 entries         |
//! | [`image`]   | 4bpp and 8bpp tiled graphics as linear rasters       |
//!
//! ## Quick start
//!
//! ```no_run
//! use agbrom::{BitDepth, Image, Palette, RomBuffer};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let rom = RomBuffer::load(std::fs::read("game.gba")?)?;
//!
//! let palette = Palette::read_compressed(&rom, 0x1234_56)?;
//! let sprite = Image::read_compressed(&rom, 0x1250_00, 64, BitDepth::for_palette(&palette))?;
//! assert_eq!(sprite.width(), 64);
//! # Ok(())
//! # }
//! ```
//!
//! Everything decoded can be edited and written back; the
//! `requires_repoint` methods report whether the re-encoded asset still
//! fits where it was read from or has to move to free space
//! (see [`RomBuffer::find_free`]).

pub mod errors;
pub mod image;
pub mod lz77;
pub mod palette;
pub mod rom;

pub use errors::{ImageError, Lz77Error, PaletteError, RomError};
pub use image::{BitDepth, Image, TILE_SIZE};
pub use lz77::{Decompressed, Lz77Header};
pub use palette::{Palette, Rgba};
pub use rom::{align, Game, PointerTracker, RomBuffer, FREE_SPACE_FILL, POINTER_BASE};

/// Compress `raw` into a BIOS LZ77 stream.
///
/// Convenience re-export of [`lz77::compress`].
pub fn compress(raw: &[u8]) -> Result<Vec<u8>, Lz77Error> {
    lz77::compress(raw)
}

/// Decompress the BIOS LZ77 stream at the start of `input`.
///
/// Convenience re-export of [`lz77::decompress`].
pub fn decompress(input: &[u8]) -> Result<Decompressed, Lz77Error> {
    lz77::decompress(input)
}
