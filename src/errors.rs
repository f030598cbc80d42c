use thiserror::Error;

/// Errors raised by [`RomBuffer`](crate::RomBuffer) operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RomError {
    #[error("{0} bytes is not a valid cartridge size (expected 16 MiB or 32 MiB)")]
    Size(usize),
    #[error("access of {len} bytes at offset {offset:#x} crosses the end of the ROM")]
    OutOfRange { offset: usize, len: usize },
    #[error("word {word:#010x} at offset {offset:#x} is not a ROM pointer")]
    BadPointer { offset: usize, word: u32 },
}

/// Errors raised while encoding or decoding a BIOS LZ77 stream.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Lz77Error {
    #[error("stream starts with {0:#04x}, expected the 0x10 type byte")]
    BadMagic(u8),
    #[error("back-reference displacement {disp} at output position {pos} reaches before the stream start")]
    BadDisplacement { disp: usize, pos: usize },
    #[error("input ended before the declared uncompressed length was produced")]
    Truncated,
    #[error("{0} bytes cannot be encoded: the header length field is 24 bits")]
    TooBig(usize),
}

/// Errors raised by the [`Palette`](crate::Palette) codec.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PaletteError {
    #[error("a palette holds 16 or 256 colors, not {0}")]
    BadCount(usize),
    #[error(transparent)]
    Rom(#[from] RomError),
    #[error("palette data could not be decompressed: {0}")]
    Lz77(#[from] Lz77Error),
}

/// Errors raised by the [`Image`](crate::Image) codec.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ImageError {
    #[error("bad tile geometry: width {width} (must be a positive multiple of 8), data length {length} (must be even)")]
    BadGeometry { width: usize, length: usize },
    #[error(transparent)]
    Rom(#[from] RomError),
    #[error("image data could not be decompressed: {0}")]
    Lz77(#[from] Lz77Error),
}
