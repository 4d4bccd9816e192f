//! Pixel dimension probe.
//!
//! Best effort: dimensions enrich the asset row but a body that decodes as
//! none of the supported formats still uploads fine (the type policy already
//! ran, and some valid files carry exotic headers).

use std::io::Cursor;

use image::ImageReader;

/// Read `(width, height)` from an image header, or None if unreadable.
pub fn image_dimensions(data: &[u8]) -> Option<(i32, i32)> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .ok()?;
    let (width, height) = reader.into_dimensions().ok()?;
    Some((width as i32, height as i32))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_gif_dimensions() {
        // GIF89a header plus a 2x3 logical screen descriptor, no color table.
        let mut data = b"GIF89a".to_vec();
        data.extend_from_slice(&[2, 0, 3, 0, 0x00, 0, 0]);
        assert_eq!(image_dimensions(&data), Some((2, 3)));
    }

    #[test]
    fn test_unreadable_body_yields_none() {
        assert_eq!(image_dimensions(b"not an image"), None);
        assert_eq!(image_dimensions(&[]), None);
    }
}
