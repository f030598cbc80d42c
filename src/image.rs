//! Tiled indexed graphics.
//!
//! On the cartridge an image is a row-major grid of 8×8 tiles. Inside a
//! tile, pixels run left to right, top to bottom. At 8bpp every byte is
//! one palette index; at 4bpp every byte packs two indices with the even
//! pixel in the low nibble:
//!
//! ```text
//! ┌ index at odd x    ┌ index at even x
//! HHHH                LLLL
//! ```
//!
//! In memory the image is kept as a plain linear raster of one byte per
//! pixel, whatever the depth, which makes pixel access and re-encoding
//! independent of the on-disk packing.

use log::debug;

use crate::errors::ImageError;
use crate::lz77;
use crate::palette::Palette;
use crate::rom::RomBuffer;

/// Tile edge length in pixels.
pub const TILE_SIZE: usize = 8;

/// How many bits one pixel occupies on the cartridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitDepth {
    /// 16-color graphics, two pixels per byte.
    Four,
    /// 256-color graphics, one pixel per byte.
    Eight,
}

impl BitDepth {
    /// On-disk size of one 8×8 tile.
    pub fn bytes_per_tile(self) -> usize {
        match self {
            Self::Four => 32,
            Self::Eight => 64,
        }
    }

    /// The depth matching a palette: one 16-color row renders 4bpp
    /// graphics, the full table renders 8bpp.
    pub fn for_palette(palette: &Palette) -> Self {
        if palette.count() == 16 {
            Self::Four
        } else {
            Self::Eight
        }
    }
}

/// A decoded image: a linear 8bpp raster plus its tile geometry.
pub struct Image {
    data: Vec<u8>,
    width: usize,
    height: usize,
    depth: BitDepth,
    /// Bytes the image occupied in ROM when it was read.
    rom_len: usize,
}

impl Image {
    /// Build an image from a raster already in memory.
    ///
    /// `data` must hold exactly `width * height` indices and both edges
    /// must be multiples of the tile size.
    pub fn from_raster(
        data: Vec<u8>,
        width: usize,
        height: usize,
        depth: BitDepth,
    ) -> Result<Self, ImageError> {
        if width == 0
            || height == 0
            || width % TILE_SIZE != 0
            || height % TILE_SIZE != 0
            || data.len() != width * height
        {
            return Err(ImageError::BadGeometry {
                width,
                length: data.len(),
            });
        }
        let rom_len = width * height * bits(depth) / 8;
        Ok(Self {
            data,
            width,
            height,
            depth,
            rom_len,
        })
    }

    /// Read `length` bytes of uncompressed tiles at `offset`.
    ///
    /// The height is derived from how many tile rows the data fills at
    /// the given width; a partial final tile row leaves the rest of the
    /// raster at index zero.
    pub fn read_uncompressed(
        rom: &mut RomBuffer,
        offset: usize,
        length: usize,
        width: usize,
        depth: BitDepth,
    ) -> Result<Self, ImageError> {
        check_geometry(width, length)?;
        rom.seek(offset)?;
        let bytes = rom.read_bytes(length)?;
        Ok(Self::from_tiles(&bytes, width, depth, length))
    }

    /// Read LZ77-compressed tiles at `offset`.
    ///
    /// Geometry is checked against the decompressed length. As with
    /// [`read_uncompressed`](Self::read_uncompressed), data that stops
    /// short of a tile row boundary is zero-extended.
    pub fn read_compressed(
        rom: &RomBuffer,
        offset: usize,
        width: usize,
        depth: BitDepth,
    ) -> Result<Self, ImageError> {
        let stream = lz77::decompress(rom.slice_from(offset)?)?;
        check_geometry(width, stream.data.len())?;
        Ok(Self::from_tiles(
            &stream.data,
            width,
            depth,
            stream.read.next_multiple_of(4),
        ))
    }

    fn from_tiles(bytes: &[u8], width: usize, depth: BitDepth, rom_len: usize) -> Self {
        let tiles_per_row = width / TILE_SIZE;
        let tiles = bytes.len().div_ceil(depth.bytes_per_tile());
        let height = tiles.div_ceil(tiles_per_row) * TILE_SIZE;
        debug!(
            "image: {}x{height} raster from {} bytes of {depth:?} tiles",
            width,
            bytes.len(),
        );

        let mut data = vec![0u8; width * height];
        for (t, tile) in bytes.chunks(depth.bytes_per_tile()).enumerate() {
            let ty = t / tiles_per_row * TILE_SIZE;
            let tx = t % tiles_per_row * TILE_SIZE;
            for (i, &byte) in tile.iter().enumerate() {
                match depth {
                    BitDepth::Four => {
                        let at = (ty + i / 4) * width + tx + i % 4 * 2;
                        data[at] = byte & 0x0F;
                        data[at + 1] = byte >> 4;
                    }
                    BitDepth::Eight => {
                        data[(ty + i / 8) * width + tx + i % 8] = byte;
                    }
                }
            }
        }

        Self {
            data,
            width,
            height,
            depth,
            rom_len,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn depth(&self) -> BitDepth {
        self.depth
    }

    /// The linear raster, one index per pixel, row-major.
    pub fn raster(&self) -> &[u8] {
        &self.data
    }

    /// The index at `(x, y)`, if inside the image.
    pub fn pixel(&self, x: usize, y: usize) -> Option<u8> {
        if x < self.width && y < self.height {
            Some(self.data[y * self.width + x])
        } else {
            None
        }
    }

    /// Replace the index at `(x, y)`. Returns false when the position
    /// is outside the image or the index does not fit the depth.
    pub fn set_pixel(&mut self, x: usize, y: usize, index: u8) -> bool {
        let fits = match self.depth {
            BitDepth::Four => index < 16,
            BitDepth::Eight => true,
        };
        if !fits || x >= self.width || y >= self.height {
            return false;
        }
        self.data[y * self.width + x] = index;
        true
    }

    /// Encode the raster back into tiles.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.width * self.height * bits(self.depth) / 8);
        for ty in (0..self.height).step_by(TILE_SIZE) {
            for tx in (0..self.width).step_by(TILE_SIZE) {
                for y in ty..ty + TILE_SIZE {
                    let row = &self.data[y * self.width + tx..y * self.width + tx + TILE_SIZE];
                    match self.depth {
                        BitDepth::Four => {
                            for pair in row.chunks_exact(2) {
                                out.push((pair[1] & 0x0F) << 4 | (pair[0] & 0x0F));
                            }
                        }
                        BitDepth::Eight => out.extend_from_slice(row),
                    }
                }
            }
        }
        out
    }

    /// Whether writing the image back (compressed or not) needs more
    /// bytes than it occupied when read.
    pub fn requires_repoint(&self, compressed: bool) -> Result<bool, ImageError> {
        Ok(self.encoded_len(compressed)? > self.rom_len)
    }

    /// Write the image at `offset`, compressing it first if asked.
    pub fn write(
        &self,
        rom: &mut RomBuffer,
        offset: usize,
        compressed: bool,
    ) -> Result<(), ImageError> {
        let mut bytes = self.encode();
        if compressed {
            bytes = lz77::compress(&bytes)?;
        }
        debug!("image: writing {} bytes at {offset:#x}", bytes.len());

        rom.seek(offset)?;
        rom.write_bytes(&bytes)?;
        Ok(())
    }

    fn encoded_len(&self, compressed: bool) -> Result<usize, ImageError> {
        let bytes = self.encode();
        if compressed {
            Ok(lz77::compress(&bytes)?.len())
        } else {
            Ok(bytes.len())
        }
    }
}

fn bits(depth: BitDepth) -> usize {
    match depth {
        BitDepth::Four => 4,
        BitDepth::Eight => 8,
    }
}

fn check_geometry(width: usize, length: usize) -> Result<(), ImageError> {
    if width == 0 || width % TILE_SIZE != 0 || length == 0 || length % 2 != 0 {
        return Err(ImageError::BadGeometry { width, length });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::{Palette, Rgba};

    fn rom() -> RomBuffer {
        let mut bytes = vec![0xFFu8; 16 * 1024 * 1024];
        bytes[0xA0..0xB0].copy_from_slice(b"POKEMON RUBYAXVE");
        RomBuffer::load(bytes).unwrap()
    }

    #[test]
    fn depth_follows_the_palette_size() {
        let small = Palette::from_colors(vec![Rgba::new(0, 0, 0); 16]).unwrap();
        let large = Palette::from_colors(vec![Rgba::new(0, 0, 0); 256]).unwrap();
        assert_eq!(BitDepth::for_palette(&small), BitDepth::Four);
        assert_eq!(BitDepth::for_palette(&large), BitDepth::Eight);
    }

    #[test]
    fn one_4bpp_tile_unpacks_low_nibble_first() {
        let mut rom = rom();
        rom.seek(0x1000).unwrap();
        rom.write_bytes(&[0x21; 32]).unwrap();

        let image = Image::read_uncompressed(&mut rom, 0x1000, 32, 8, BitDepth::Four).unwrap();
        assert_eq!(image.height(), 8);
        for y in 0..8 {
            for x in 0..8 {
                let expected = if x % 2 == 0 { 1 } else { 2 };
                assert_eq!(image.pixel(x, y), Some(expected));
            }
        }
        assert_eq!(image.encode(), vec![0x21; 32]);
    }

    #[test]
    fn tiles_are_laid_out_row_major() {
        // Two 4bpp tiles side by side, every pixel of tile t set to t+1.
        let mut rom = rom();
        rom.seek(0x1000).unwrap();
        rom.write_bytes(&[0x11; 32]).unwrap();
        rom.write_bytes(&[0x22; 32]).unwrap();

        let image = Image::read_uncompressed(&mut rom, 0x1000, 64, 16, BitDepth::Four).unwrap();
        assert_eq!((image.width(), image.height()), (16, 8));
        assert_eq!(image.pixel(0, 0), Some(1));
        assert_eq!(image.pixel(7, 7), Some(1));
        assert_eq!(image.pixel(8, 0), Some(2));
        assert_eq!(image.pixel(15, 7), Some(2));
    }

    #[test]
    fn raster_round_trips_at_8bpp() {
        let raster: Vec<u8> = (0..16 * 16).map(|i| (i * 7) as u8).collect();
        let image = Image::from_raster(raster.clone(), 16, 16, BitDepth::Eight).unwrap();
        let encoded = image.encode();
        assert_eq!(encoded.len(), 4 * 64);

        let mut rom = rom();
        rom.seek(0x2000).unwrap();
        rom.write_bytes(&encoded).unwrap();
        let reread =
            Image::read_uncompressed(&mut rom, 0x2000, encoded.len(), 16, BitDepth::Eight).unwrap();
        assert_eq!(reread.raster(), raster.as_slice());
    }

    #[test]
    fn raster_round_trips_at_4bpp() {
        let raster: Vec<u8> = (0..24 * 8).map(|i| (i % 16) as u8).collect();
        let image = Image::from_raster(raster.clone(), 24, 8, BitDepth::Four).unwrap();

        let mut rom = rom();
        image.write(&mut rom, 0x2000, false).unwrap();
        let reread =
            Image::read_uncompressed(&mut rom, 0x2000, 24 * 8 / 2, 24, BitDepth::Four).unwrap();
        assert_eq!(reread.raster(), raster.as_slice());
    }

    #[test]
    fn height_is_derived_from_the_data_length() {
        let mut rom = rom();
        rom.seek(0x1000).unwrap();
        rom.write_bytes(&[0x33; 5 * 32]).unwrap();

        // Five 4bpp tiles at two tiles per row: three tile rows.
        let image = Image::read_uncompressed(&mut rom, 0x1000, 5 * 32, 16, BitDepth::Four).unwrap();
        assert_eq!(image.height(), 24);
    }

    #[test]
    fn short_data_zero_extends_the_last_tile_row() {
        let mut rom = rom();
        rom.seek(0x1000).unwrap();
        rom.write_bytes(&[0x11; 40]).unwrap();

        // 40 bytes is a tile and a quarter: the raster still spans two
        // whole tiles, and everything past the data reads as index 0.
        let image = Image::read_uncompressed(&mut rom, 0x1000, 40, 8, BitDepth::Four).unwrap();
        assert_eq!(image.height(), 16);
        assert_eq!(image.pixel(0, 9), Some(1));
        assert_eq!(image.pixel(0, 10), Some(0));
        assert_eq!(image.pixel(7, 15), Some(0));
    }

    #[test]
    fn geometry_is_gated() {
        let mut rom = rom();
        for (width, length) in [(12, 32), (0, 32), (8, 31)] {
            assert_eq!(
                Image::read_uncompressed(&mut rom, 0x1000, length, width, BitDepth::Four).err(),
                Some(ImageError::BadGeometry { width, length })
            );
        }
    }

    #[test]
    fn compressed_images_round_trip() {
        let raster: Vec<u8> = (0..32 * 16).map(|i| (i / 5 % 16) as u8).collect();
        let image = Image::from_raster(raster.clone(), 32, 16, BitDepth::Four).unwrap();

        let mut rom = rom();
        image.write(&mut rom, 0x3000, true).unwrap();
        let reread = Image::read_compressed(&rom, 0x3000, 32, BitDepth::Four).unwrap();
        assert_eq!(reread.raster(), raster.as_slice());
        assert_eq!((reread.width(), reread.height()), (32, 16));
    }

    #[test]
    fn bad_stream_surfaces_as_an_lz77_error() {
        let rom = rom();
        // 0xFF free space is not a valid stream.
        assert!(matches!(
            Image::read_compressed(&rom, 0x1000, 8, BitDepth::Four),
            Err(ImageError::Lz77(_))
        ));
    }

    #[test]
    fn repoint_follows_the_encoded_size() {
        let mut rom = rom();
        let flat = Image::from_raster(vec![5; 8 * 8], 8, 8, BitDepth::Four).unwrap();
        flat.write(&mut rom, 0x4000, true).unwrap();

        let mut reread = Image::read_compressed(&rom, 0x4000, 8, BitDepth::Four).unwrap();
        assert_eq!(reread.requires_repoint(true), Ok(false));

        for y in 0..8 {
            for x in 0..8 {
                reread.set_pixel(x, y, ((x * 3 + y * 7) % 16) as u8);
            }
        }
        assert_eq!(reread.requires_repoint(true), Ok(true));
    }

    #[test]
    fn in_memory_4bpp_images_report_repoint_against_their_encoded_size() {
        // One 4bpp tile packs to 32 bytes; the nibbles below encode to
        // the distinct bytes 0x00..0x20, which no stream of tokens can
        // beat, so a compressed rewrite cannot fit the 32-byte slot.
        let mut raster = vec![0u8; 64];
        for i in 0..32 {
            let y = i / 4;
            let x = i % 4 * 2;
            raster[y * 8 + x] = (i % 16) as u8;
            raster[y * 8 + x + 1] = (i / 16) as u8;
        }
        let image = Image::from_raster(raster, 8, 8, BitDepth::Four).unwrap();

        assert_eq!(image.encode().len(), 32);
        assert_eq!(image.requires_repoint(false), Ok(false));
        assert_eq!(image.requires_repoint(true), Ok(true));
    }

    #[test]
    fn set_pixel_rejects_wide_indices_at_4bpp() {
        let mut image = Image::from_raster(vec![0; 64], 8, 8, BitDepth::Four).unwrap();
        assert!(!image.set_pixel(0, 0, 16));
        assert!(image.set_pixel(0, 0, 15));
        assert!(!image.set_pixel(8, 0, 1));
        assert_eq!(image.pixel(0, 0), Some(15));
    }
}
