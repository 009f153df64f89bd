//! Single-page PDF documents holding one raster image.
//!
//! The image data of a PNG file is a zlib stream of filtered scanlines,
//! which PDF can decode directly with `/FlateDecode` and the PNG predictor.
//! The IDAT chunks are therefore copied without recompression.

use std::io::{Cursor, Write};

use image::error::{ParameterError, ParameterErrorKind};
use image::{ImageError, ImageFormat, RgbImage};
use thiserror::Error;

use super::PIXELS_PER_INCH;

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
const PNG_COLOR_TYPE_RGB: u8 = 2;
const POINTS_PER_INCH: f64 = 72.0;

#[derive(Error, Debug)]
pub enum PdfError {
    #[error("Input is not a PNG image")]
    NotPng,
    #[error("PNG image is truncated")]
    Truncated,
    #[error("Unsupported PNG image: {0}")]
    Unsupported(&'static str),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Encodes a packed RGB pixel buffer as PNG.
pub fn encode_png(pixels: Vec<u8>, width: u32, height: u32) -> Result<Vec<u8>, ImageError> {
    let image = RgbImage::from_raw(width, height, pixels).ok_or_else(|| {
        ImageError::Parameter(ParameterError::from_kind(
            ParameterErrorKind::DimensionMismatch,
        ))
    })?;

    let mut png = Vec::new();
    image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    Ok(png)
}

#[derive(Debug)]
struct PngImage {
    width: u32,
    height: u32,
    /// Concatenated IDAT payloads.
    data: Vec<u8>,
}

fn read_u32(bytes: &[u8], offset: usize) -> Result<u32, PdfError> {
    let bytes = bytes.get(offset..offset + 4).ok_or(PdfError::Truncated)?;
    Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn read_png(png: &[u8]) -> Result<PngImage, PdfError> {
    let mut rest = png.strip_prefix(&PNG_SIGNATURE).ok_or(PdfError::NotPng)?;
    let mut header = None;
    let mut data = Vec::new();

    loop {
        let length = read_u32(rest, 0)? as usize;
        let kind = rest.get(4..8).ok_or(PdfError::Truncated)?;
        let body = rest.get(8..8 + length).ok_or(PdfError::Truncated)?;

        match kind {
            b"IHDR" => {
                let bit_depth = *body.get(8).ok_or(PdfError::Truncated)?;
                let color_type = *body.get(9).ok_or(PdfError::Truncated)?;
                let interlace = *body.get(12).ok_or(PdfError::Truncated)?;
                if bit_depth != 8 {
                    return Err(PdfError::Unsupported("bit depth other than 8"));
                }
                if color_type != PNG_COLOR_TYPE_RGB {
                    return Err(PdfError::Unsupported("color type other than RGB"));
                }
                if interlace != 0 {
                    return Err(PdfError::Unsupported("interlaced image"));
                }
                header = Some((read_u32(body, 0)?, read_u32(body, 4)?));
            }
            b"IDAT" => data.extend_from_slice(body),
            b"IEND" => break,
            _ => {}
        }

        // Skip length, type, body and CRC.
        rest = rest.get(12 + length..).ok_or(PdfError::Truncated)?;
    }

    let (width, height) = header.ok_or(PdfError::Truncated)?;
    Ok(PngImage {
        width,
        height,
        data,
    })
}

fn to_points(pixels: u32) -> f64 {
    f64::from(pixels) * POINTS_PER_INCH / f64::from(PIXELS_PER_INCH)
}

/// Wraps a PNG image into a PDF page sized to the image at [`PIXELS_PER_INCH`].
pub fn png_to_pdf(png: &[u8]) -> Result<Vec<u8>, PdfError> {
    let image = read_png(png)?;
    let page_width = to_points(image.width);
    let page_height = to_points(image.height);

    let mut out = Vec::new();
    let mut offsets = Vec::new();
    out.write_all(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n")?;

    offsets.push(out.len());
    write!(out, "1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n")?;

    offsets.push(out.len());
    write!(out, "2 0 obj\n<< /Type /Pages /Kids [3 0 R] /Count 1 >>\nendobj\n")?;

    offsets.push(out.len());
    write!(
        out,
        "3 0 obj\n<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {page_width:.2} {page_height:.2}] \
         /Resources << /XObject << /Im0 4 0 R >> >> /Contents 5 0 R >>\nendobj\n"
    )?;

    offsets.push(out.len());
    write!(
        out,
        "4 0 obj\n<< /Type /XObject /Subtype /Image /Width {} /Height {} \
         /ColorSpace /DeviceRGB /BitsPerComponent 8 /Filter /FlateDecode \
         /DecodeParms << /Predictor 15 /Colors 3 /BitsPerComponent 8 /Columns {} >> \
         /Length {} >>\nstream\n",
        image.width,
        image.height,
        image.width,
        image.data.len()
    )?;
    out.write_all(&image.data)?;
    write!(out, "\nendstream\nendobj\n")?;

    let content = format!("q {page_width:.2} 0 0 {page_height:.2} 0 0 cm /Im0 Do Q\n");
    offsets.push(out.len());
    write!(
        out,
        "5 0 obj\n<< /Length {} >>\nstream\n{content}endstream\nendobj\n",
        content.len()
    )?;

    let xref_offset = out.len();
    write!(out, "xref\n0 {}\n0000000000 65535 f \n", offsets.len() + 1)?;
    for offset in &offsets {
        write!(out, "{offset:010} 00000 n \n")?;
    }
    write!(
        out,
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_offset}\n%%EOF\n",
        offsets.len() + 1
    )?;

    Ok(out)
}

#[cfg(test)]
mod test {
    use super::*;

    fn test_png(width: u32, height: u32) -> Vec<u8> {
        let pixels = (0..width * height * 3).map(|i| (i % 251) as u8).collect();
        encode_png(pixels, width, height).unwrap()
    }

    #[test]
    fn test_encode_png_checks_buffer_size() {
        assert!(encode_png(vec![0; 5], 2, 2).is_err());
        assert!(test_png(2, 2).starts_with(&PNG_SIGNATURE));
    }

    #[test]
    fn test_read_png() {
        let image = read_png(&test_png(4, 3)).unwrap();
        assert_eq!((image.width, image.height), (4, 3));
        assert!(!image.data.is_empty());

        assert!(matches!(read_png(b"GIF89a"), Err(PdfError::NotPng)));
        let png = test_png(4, 3);
        assert!(matches!(
            read_png(&png[..png.len() / 2]),
            Err(PdfError::Truncated)
        ));
    }

    #[test]
    fn test_pdf_structure() {
        let pdf = png_to_pdf(&test_png(300, 150)).unwrap();
        let text = String::from_utf8_lossy(&pdf);

        assert!(pdf.starts_with(b"%PDF-1.4\n"));
        assert!(pdf.ends_with(b"%%EOF\n"));
        assert!(text.contains("/Width 300 /Height 150"));
        assert!(text.contains("/MediaBox [0 0 144.00 72.00]"));

        let startxref = pdf
            .windows(b"startxref\n".len())
            .rposition(|window| window == b"startxref\n")
            .unwrap();
        let trailer = std::str::from_utf8(&pdf[startxref..]).unwrap();
        let xref_offset: usize = trailer.lines().nth(1).unwrap().parse().unwrap();
        assert!(pdf[xref_offset..].starts_with(b"xref\n"));

        let xref = std::str::from_utf8(&pdf[xref_offset..]).unwrap();
        let entries: Vec<usize> = xref
            .lines()
            .skip(3)
            .take(5)
            .map(|line| line[..10].parse().unwrap())
            .collect();
        assert_eq!(entries.len(), 5);
        for (index, offset) in entries.into_iter().enumerate() {
            let expected = format!("{} 0 obj", index + 1);
            assert!(pdf[offset..].starts_with(expected.as_bytes()), "{expected}");
        }
    }
}
