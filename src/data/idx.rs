// ============================================================
// Layer 4 — IDX File Parser
// ============================================================
// MNIST is distributed as four IDX files. Two layouts matter:
//
// IDX3 (images)
//   bytes  0-1   0x00 0x00        reserved
//   byte   2     0x08             dtype = uint8
//   byte   3     0x03             three dimensions
//   bytes  4-7   N                big-endian u32
//   bytes  8-11  rows             big-endian u32
//   bytes 12-15  cols             big-endian u32
//   bytes 16..   N * rows * cols  pixels, row-major
//
// IDX1 (labels)
//   bytes  0-1   0x00 0x00        reserved
//   byte   2     0x08             dtype = uint8
//   byte   3     0x01             one dimension
//   bytes  4-7   N                big-endian u32
//   bytes  8..   N                class ids

use anyhow::{bail, Result};

use crate::domain::image::RawImages;

const IDX_UBYTE: u8 = 0x08;

fn header_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

fn check_magic(bytes: &[u8], dims: u8, what: &str) -> Result<()> {
    if bytes[0] != 0x00 || bytes[1] != 0x00 {
        bail!(
            "{what}: bytes 0-1 must be 0x00 0x00, got 0x{:02X} 0x{:02X}",
            bytes[0],
            bytes[1]
        );
    }
    if bytes[2] != IDX_UBYTE {
        bail!("{what}: dtype byte must be 0x08 (uint8), got 0x{:02X}", bytes[2]);
    }
    if bytes[3] != dims {
        bail!("{what}: expected {dims} dimensions, got {}", bytes[3]);
    }
    Ok(())
}

/// Parse an IDX3 image file.
pub fn parse_images(bytes: &[u8]) -> Result<RawImages> {
    if bytes.len() < 16 {
        bail!("IDX image file too short: {} bytes, need a 16-byte header", bytes.len());
    }
    check_magic(bytes, 3, "IDX image file")?;

    let count = header_u32(bytes, 4) as usize;
    let rows  = header_u32(bytes, 8) as usize;
    let cols  = header_u32(bytes, 12) as usize;

    let needed = count
        .checked_mul(rows)
        .and_then(|v| v.checked_mul(cols))
        .ok_or_else(|| anyhow::anyhow!("IDX image header overflows: {count}x{rows}x{cols}"))?;

    let body = &bytes[16..];
    if body.len() < needed {
        bail!(
            "IDX image file declares {count} images of {rows}x{cols} \
             ({needed} bytes) but holds only {}",
            body.len()
        );
    }

    RawImages::new(rows, cols, body[..needed].to_vec())
}

/// Parse an IDX1 label file.
pub fn parse_labels(bytes: &[u8]) -> Result<Vec<u8>> {
    if bytes.len() < 8 {
        bail!("IDX label file too short: {} bytes, need an 8-byte header", bytes.len());
    }
    check_magic(bytes, 1, "IDX label file")?;

    let count = header_u32(bytes, 4) as usize;
    let body  = &bytes[8..];
    if body.len() < count {
        bail!(
            "IDX label file declares {count} labels but holds only {}",
            body.len()
        );
    }
    Ok(body[..count].to_vec())
}
