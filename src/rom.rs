//! Access to a loaded cartridge image.
//!
//! A [`RomBuffer`] owns the full 16 or 32 MiB image and hands out
//! little-endian values through a bounded cursor. Pointers on the
//! cartridge are 32-bit words offset by `0x0800_0000` (the address the
//! cartridge is mapped at); the buffer translates them to and from plain
//! file offsets, treating the zero word as a null pointer in both
//! directions.

use std::collections::VecDeque;

use byteorder::{ByteOrder, LittleEndian};
use log::info;

use crate::errors::RomError;

/// Physical address the cartridge is mapped at.
pub const POINTER_BASE: u32 = 0x0800_0000;

/// Byte the toolchains leave in unused ROM space.
pub const FREE_SPACE_FILL: u8 = 0xFF;

const SIZE_16MB: usize = 16 * 1024 * 1024;
const SIZE_32MB: usize = 32 * 1024 * 1024;

/// Offset of the 16-character game identifier (12-character title, then
/// the 4-character game code).
const IDENT_OFFSET: usize = 0xA0;
const TITLE_LEN: usize = 12;
const IDENT_LEN: usize = 16;

/// Which game family a cartridge belongs to, judged by its code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Game {
    /// Codes starting `BPR` or `BPG`.
    FireRedLeafGreen,
    /// Codes starting `AXV` or `AXP`.
    RubySapphire,
    /// Codes starting `BPE`.
    Emerald,
    Unknown,
}

/// Caller-owned record of where pointers were read from.
///
/// Repointing tools need to revisit the word a pointer came from to
/// patch it after moving its data. Reading through
/// [`RomBuffer::read_ptr_tracked`] queues each pointer's own offset
/// here; [`take`](PointerTracker::take) hands them back in read order.
#[derive(Debug, Default)]
pub struct PointerTracker {
    offsets: VecDeque<usize>,
}

impl PointerTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next recorded offset, oldest first.
    pub fn take(&mut self) -> Option<usize> {
        self.offsets.pop_front()
    }

    pub fn clear(&mut self) {
        self.offsets.clear();
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    fn push(&mut self, offset: usize) {
        self.offsets.push_back(offset);
    }
}

/// An in-memory cartridge image with a read/write cursor.
pub struct RomBuffer {
    data: Vec<u8>,
    cursor: usize,
    ident: [u8; IDENT_LEN],
}

impl RomBuffer {
    /// Take ownership of a full cartridge image.
    ///
    /// Only exact 16 MiB and 32 MiB images are accepted. The cursor
    /// starts at offset zero.
    pub fn load(bytes: Vec<u8>) -> Result<Self, RomError> {
        if bytes.len() != SIZE_16MB && bytes.len() != SIZE_32MB {
            return Err(RomError::Size(bytes.len()));
        }

        let mut ident = [0u8; IDENT_LEN];
        ident.copy_from_slice(&bytes[IDENT_OFFSET..IDENT_OFFSET + IDENT_LEN]);

        let rom = Self {
            data: bytes,
            cursor: 0,
            ident,
        };
        info!(
            "loaded {} MiB ROM, title {:?}, code {:?}",
            rom.len() / (1024 * 1024),
            rom.title(),
            rom.code(),
        );
        Ok(rom)
    }

    /// Total image size in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether the image has already grown to 32 MiB.
    pub fn is_expanded(&self) -> bool {
        self.data.len() == SIZE_32MB
    }

    /// The 12-character game title from the header.
    pub fn title(&self) -> String {
        String::from_utf8_lossy(&self.ident[..TITLE_LEN])
            .trim_end_matches('\0')
            .to_string()
    }

    /// The 4-character game code from the header.
    pub fn code(&self) -> String {
        String::from_utf8_lossy(&self.ident[TITLE_LEN..])
            .trim_end_matches('\0')
            .to_string()
    }

    /// Game family, decided by the code prefix.
    pub fn game(&self) -> Game {
        match &self.ident[TITLE_LEN..TITLE_LEN + 3] {
            b"BPR" | b"BPG" => Game::FireRedLeafGreen,
            b"AXV" | b"AXP" => Game::RubySapphire,
            b"BPE" => Game::Emerald,
            _ => Game::Unknown,
        }
    }

    /// Current cursor offset.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Move the cursor. The cursor is untouched when `offset` lies
    /// outside the image.
    pub fn seek(&mut self, offset: usize) -> Result<(), RomError> {
        if offset >= self.data.len() {
            return Err(RomError::OutOfRange { offset, len: 1 });
        }
        self.cursor = offset;
        Ok(())
    }

    /// Whether `count` bytes can be read at the cursor.
    pub fn can_read(&self, count: usize) -> bool {
        self.check(self.cursor, count).is_ok()
    }

    /// Whether `count` bytes can be written at the cursor.
    pub fn can_write(&self, count: usize) -> bool {
        self.can_read(count)
    }

    fn check(&self, offset: usize, len: usize) -> Result<(), RomError> {
        match offset.checked_add(len) {
            Some(end) if end <= self.data.len() => Ok(()),
            _ => Err(RomError::OutOfRange { offset, len }),
        }
    }

    /// Borrow `len` bytes at `offset`.
    pub fn slice(&self, offset: usize, len: usize) -> Result<&[u8], RomError> {
        self.check(offset, len)?;
        Ok(&self.data[offset..offset + len])
    }

    /// Borrow everything from `offset` to the end of the image.
    pub fn slice_from(&self, offset: usize) -> Result<&[u8], RomError> {
        self.check(offset, 1)?;
        Ok(&self.data[offset..])
    }

    pub fn read_u8(&mut self) -> Result<u8, RomError> {
        self.check(self.cursor, 1)?;
        let value = self.data[self.cursor];
        self.cursor += 1;
        Ok(value)
    }

    pub fn read_u16(&mut self) -> Result<u16, RomError> {
        self.check(self.cursor, 2)?;
        let value = LittleEndian::read_u16(&self.data[self.cursor..]);
        self.cursor += 2;
        Ok(value)
    }

    pub fn read_u32(&mut self) -> Result<u32, RomError> {
        self.check(self.cursor, 4)?;
        let value = LittleEndian::read_u32(&self.data[self.cursor..]);
        self.cursor += 4;
        Ok(value)
    }

    /// Read a pointer word and translate it to a file offset.
    ///
    /// The zero word stays zero (null). Any other word must point into
    /// the image; the cursor is untouched when it does not.
    pub fn read_ptr(&mut self) -> Result<usize, RomError> {
        let offset = self.cursor;
        let word = self.read_u32()?;
        match self.translate(word) {
            Some(target) => Ok(target),
            None => {
                self.cursor = offset;
                Err(RomError::BadPointer { offset, word })
            }
        }
    }

    /// Read a pointer word without range validation.
    ///
    /// The zero word stays zero; everything else has the base wrapped
    /// off, whatever it was. For tables known to hold junk entries.
    pub fn read_ptr_unchecked(&mut self) -> Result<usize, RomError> {
        let word = self.read_u32()?;
        if word == 0 {
            Ok(0)
        } else {
            Ok(word.wrapping_sub(POINTER_BASE) as usize)
        }
    }

    /// Like [`read_ptr`](Self::read_ptr), also queueing the offset the
    /// pointer itself lives at into `tracker`.
    pub fn read_ptr_tracked(&mut self, tracker: &mut PointerTracker) -> Result<usize, RomError> {
        let offset = self.cursor;
        let target = self.read_ptr()?;
        tracker.push(offset);
        Ok(target)
    }

    fn translate(&self, word: u32) -> Option<usize> {
        if word == 0 {
            return Some(0);
        }
        let target = word.wrapping_sub(POINTER_BASE) as usize;
        (word >= POINTER_BASE && target < self.data.len()).then_some(target)
    }

    /// Copy `count` bytes out at the cursor.
    pub fn read_bytes(&mut self, count: usize) -> Result<Vec<u8>, RomError> {
        self.check(self.cursor, count)?;
        let bytes = self.data[self.cursor..self.cursor + count].to_vec();
        self.cursor += count;
        Ok(bytes)
    }

    pub fn read_u16_table(&mut self, count: usize) -> Result<Vec<u16>, RomError> {
        self.check(self.cursor, count * 2)?;
        (0..count).map(|_| self.read_u16()).collect()
    }

    pub fn read_u32_table(&mut self, count: usize) -> Result<Vec<u32>, RomError> {
        self.check(self.cursor, count * 4)?;
        (0..count).map(|_| self.read_u32()).collect()
    }

    pub fn read_ptr_table(&mut self, count: usize) -> Result<Vec<usize>, RomError> {
        self.check(self.cursor, count * 4)?;
        (0..count).map(|_| self.read_ptr()).collect()
    }

    pub fn write_u8(&mut self, value: u8) -> Result<(), RomError> {
        self.check(self.cursor, 1)?;
        self.data[self.cursor] = value;
        self.cursor += 1;
        Ok(())
    }

    pub fn write_u16(&mut self, value: u16) -> Result<(), RomError> {
        self.check(self.cursor, 2)?;
        LittleEndian::write_u16(&mut self.data[self.cursor..], value);
        self.cursor += 2;
        Ok(())
    }

    pub fn write_u32(&mut self, value: u32) -> Result<(), RomError> {
        self.check(self.cursor, 4)?;
        LittleEndian::write_u32(&mut self.data[self.cursor..], value);
        self.cursor += 4;
        Ok(())
    }

    /// Write a file offset as a pointer word. Offset zero is written as
    /// the null word.
    pub fn write_ptr(&mut self, offset: usize) -> Result<(), RomError> {
        if offset == 0 {
            return self.write_u32(0);
        }
        if offset >= self.data.len() {
            return Err(RomError::BadPointer {
                offset: self.cursor,
                word: POINTER_BASE.wrapping_add(offset as u32),
            });
        }
        self.write_u32(POINTER_BASE + offset as u32)
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), RomError> {
        self.check(self.cursor, bytes.len())?;
        self.data[self.cursor..self.cursor + bytes.len()].copy_from_slice(bytes);
        self.cursor += bytes.len();
        Ok(())
    }

    pub fn write_u16_table(&mut self, values: &[u16]) -> Result<(), RomError> {
        self.check(self.cursor, values.len() * 2)?;
        values.iter().try_for_each(|&v| self.write_u16(v))
    }

    pub fn write_u32_table(&mut self, values: &[u32]) -> Result<(), RomError> {
        self.check(self.cursor, values.len() * 4)?;
        values.iter().try_for_each(|&v| self.write_u32(v))
    }

    pub fn write_ptr_table(&mut self, offsets: &[usize]) -> Result<(), RomError> {
        self.check(self.cursor, offsets.len() * 4)?;
        offsets.iter().try_for_each(|&o| self.write_ptr(o))
    }

    /// Reset `count` bytes at `offset` to free-space fill, giving the
    /// run back to [`find_free`](Self::find_free). Used after moving an
    /// asset out of its old footprint.
    pub fn clear_bytes(&mut self, offset: usize, count: usize) -> Result<(), RomError> {
        self.check(offset, count)?;
        self.data[offset..offset + count].fill(FREE_SPACE_FILL);
        Ok(())
    }

    /// Smallest offset at or after `start` where `count` consecutive
    /// bytes all equal `fill`, if any run exists before the end of the
    /// image.
    pub fn find_free(&self, start: usize, count: usize, fill: u8) -> Option<usize> {
        let mut offset = start;
        while offset.checked_add(count)? <= self.data.len() {
            match self.data[offset..offset + count]
                .iter()
                .rposition(|&b| b != fill)
            {
                None => return Some(offset),
                // No window starting at or before the mismatch can be
                // free, so resume just past it.
                Some(i) => offset += i + 1,
            }
        }
        None
    }

    /// Grow a 16 MiB image to 32 MiB by appending free-space fill.
    /// Does nothing when the image is already expanded.
    pub fn expand(&mut self) {
        if self.is_expanded() {
            return;
        }
        self.data.resize(SIZE_32MB, FREE_SPACE_FILL);
        info!("expanded ROM to 32 MiB");
    }

    /// The whole image, for saving.
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }
}

/// Smallest offset at or after `offset` that is a multiple of
/// `alignment`.
pub fn align(offset: usize, alignment: usize) -> usize {
    offset.next_multiple_of(alignment)
}
