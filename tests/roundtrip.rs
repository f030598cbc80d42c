//! Whole-stream scenarios across the public API.

use agbrom::{align, BitDepth, Game, Image, Palette, PointerTracker, Rgba, RomBuffer};

const MIB: usize = 1024 * 1024;

fn load_rom(code: &[u8; 4]) -> RomBuffer {
    let mut bytes = vec![0xFFu8; 16 * MIB];
    bytes[0xA0..0xAC].copy_from_slice(b"INTEGRATION ");
    bytes[0xAC..0xB0].copy_from_slice(code);
    RomBuffer::load(bytes).unwrap()
}

#[test]
fn lz77_reference_streams() {
    // The three canonical streams: empty, one literal, one rolling copy.
    assert_eq!(agbrom::compress(&[]).unwrap(), [0x10, 0x00, 0x00, 0x00]);

    let one = agbrom::compress(&[0x41]).unwrap();
    assert_eq!(one, [0x10, 0x01, 0x00, 0x00, 0x00, 0x41, 0x00, 0x00]);
    let decoded = agbrom::decompress(&one).unwrap();
    assert_eq!(decoded.data, [0x41]);
    assert_eq!(decoded.read, 6);

    let run = agbrom::decompress(&[0x10, 0x05, 0x00, 0x00, 0x40, 0x41, 0x10, 0x00]).unwrap();
    assert_eq!(run.data, [0x41; 5]);
}

#[test]
fn lz77_round_trips_assorted_payloads() {
    let payloads: Vec<Vec<u8>> = vec![
        Vec::new(),
        vec![0x00],
        vec![0xAB; 3],
        (0..=255u8).collect(),
        (0..20_000u32).map(|i| (i % 7) as u8).collect(),
        (0..8_192u32)
            .map(|i| (i.wrapping_mul(2_654_435_761) >> 24) as u8)
            .collect(),
        b"the quick brown fox jumps over the lazy dog ".repeat(40),
    ];

    for payload in payloads {
        let stream = agbrom::compress(&payload).unwrap();
        assert_eq!(stream.len() % 4, 0);
        let decoded = agbrom::decompress(&stream).unwrap();
        assert_eq!(decoded.data, payload);
        assert!(decoded.read <= stream.len());
    }
}

#[test]
fn decoder_ignores_bytes_past_the_stream() {
    // Streams inside a ROM are followed by unrelated data; the decoder
    // must stop at the declared length and report where it stopped.
    let mut stream = agbrom::compress(b"payload payload payload").unwrap();
    let read_limit = stream.len();
    stream.extend_from_slice(&[0xFF; 64]);

    let decoded = agbrom::decompress(&stream).unwrap();
    assert_eq!(decoded.data, b"payload payload payload");
    assert!(decoded.read <= read_limit);
}

#[test]
fn sprite_edit_and_repoint_flow() {
    let mut rom = load_rom(b"BPRE");
    assert_eq!(rom.game(), Game::FireRedLeafGreen);

    // A 16-color palette and a 16x16 sprite, both compressed, with a
    // pointer to the sprite at 0x100.
    let palette =
        Palette::from_colors((0..16).map(|i| Rgba::new(i * 16, 255 - i * 16, 8)).collect())
            .unwrap();
    palette.write(&mut rom, 0x40_0000, true).unwrap();

    let raster = vec![3u8; 16 * 16];
    let sprite = Image::from_raster(raster.clone(), 16, 16, BitDepth::Four).unwrap();
    sprite.write(&mut rom, 0x41_0000, true).unwrap();

    rom.seek(0x100).unwrap();
    rom.write_ptr(0x41_0000).unwrap();

    // Reread everything through the pointer.
    let mut tracker = PointerTracker::new();
    rom.seek(0x100).unwrap();
    let sprite_offset = rom.read_ptr_tracked(&mut tracker).unwrap();
    assert_eq!(sprite_offset, 0x41_0000);

    let palette = Palette::read_compressed(&rom, 0x40_0000).unwrap();
    let depth = BitDepth::for_palette(&palette);
    assert_eq!(depth, BitDepth::Four);
    let mut sprite = Image::read_compressed(&rom, sprite_offset, 16, depth).unwrap();
    assert_eq!(sprite.raster(), raster.as_slice());

    // Scribble over the sprite until it stops fitting its old spot.
    for y in 0..16 {
        for x in 0..16 {
            sprite.set_pixel(x, y, ((x * 5 + y * 11 + x * y) % 16) as u8);
        }
    }
    assert_eq!(sprite.requires_repoint(true), Ok(true));

    // Move it to free space and patch the pointer we tracked.
    let stream_len = agbrom::compress(&sprite.encode()).unwrap().len();
    let new_offset = align(rom.find_free(0x42_0000, stream_len, 0xFF).unwrap(), 4);
    sprite.write(&mut rom, new_offset, true).unwrap();

    let patch_at = tracker.take().unwrap();
    assert_eq!(patch_at, 0x100);
    rom.seek(patch_at).unwrap();
    rom.write_ptr(new_offset).unwrap();

    // The repointed sprite reads back intact.
    rom.seek(0x100).unwrap();
    let moved = rom.read_ptr().unwrap();
    let reread = Image::read_compressed(&rom, moved, 16, depth).unwrap();
    assert_eq!(reread.raster(), sprite.raster());
}

#[test]
fn palette_survives_an_uncompressed_rewrite() {
    let mut rom = load_rom(b"BPEE");
    let colors: Vec<Rgba> = (0..256).map(|i| Rgba::new((i & 0xF8) as u8, 160, 88)).collect();

    let palette = Palette::from_colors(colors.clone()).unwrap();
    assert_eq!(palette.requires_repoint(false), Ok(false));
    palette.write(&mut rom, 0x70_0000, false).unwrap();

    let reread = Palette::read_uncompressed(&mut rom, 0x70_0000, 256).unwrap();
    assert_eq!(reread.colors(), colors.as_slice());

    let gl = reread.gl_colors();
    assert_eq!(gl.len(), 256);
    assert_eq!(gl[0][3], 1.0);
}

#[test]
fn expansion_opens_new_free_space() {
    let mut rom = load_rom(b"AXVE");
    let old_len = rom.len();

    rom.expand();
    assert!(rom.is_expanded());
    assert_eq!(rom.find_free(old_len, 0x1000, 0xFF), Some(old_len));

    // Data written into the new half reads back.
    let image = Image::from_raster(vec![9; 64], 8, 8, BitDepth::Eight).unwrap();
    image.write(&mut rom, old_len + 0x40, false).unwrap();
    let reread =
        Image::read_uncompressed(&mut rom, old_len + 0x40, 64, 8, BitDepth::Eight).unwrap();
    assert_eq!(reread.raster(), &[9u8; 64][..]);
}
