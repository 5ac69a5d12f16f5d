//! Pixel size and resolution sniffing for embedded pictures.

use std::fs;
use std::path::Path;

use crate::error::{BuildError, BuildResult};

pub const EMU_PER_INCH: u64 = 914_400;
/// Widest picture placed on the page: 20 cm.
pub const MAX_PICTURE_WIDTH_EMU: u64 = 7_200_000;
/// Resolution assumed when the file does not record one.
pub const DEFAULT_DPI: f64 = 72.0;

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";
const INCHES_PER_METER: f64 = 0.0254;
const CM_PER_INCH: f64 = 2.54;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageInfo {
    pub format: ImageFormat,
    pub width_px: u32,
    pub height_px: u32,
    pub dpi_x: f64,
    pub dpi_y: f64,
}

/// Read `path` and sniff its header. Returns the raw bytes alongside so the
/// caller can embed them without a second read.
pub fn read_image_info(path: &Path) -> BuildResult<(ImageInfo, Vec<u8>)> {
    if !path.is_file() {
        return Err(BuildError::MissingFile {
            path: path.to_path_buf(),
        });
    }
    let bytes = fs::read(path).map_err(|source| BuildError::io(path, source))?;
    let info = sniff(&bytes).ok_or_else(|| BuildError::UnsupportedImage {
        path: path.to_path_buf(),
    })?;
    Ok((info, bytes))
}

pub(crate) fn sniff(bytes: &[u8]) -> Option<ImageInfo> {
    if bytes.starts_with(PNG_SIGNATURE) {
        sniff_png(bytes)
    } else if bytes.starts_with(&[0xFF, 0xD8]) {
        sniff_jpeg(bytes)
    } else {
        None
    }
}

/// Display size in EMU, scaled down proportionally when wider than
/// [`MAX_PICTURE_WIDTH_EMU`].
pub fn extent_emu(info: &ImageInfo) -> (u64, u64) {
    let cx = to_emu(info.width_px, info.dpi_x);
    let cy = to_emu(info.height_px, info.dpi_y);
    if cx <= MAX_PICTURE_WIDTH_EMU || cx == 0 {
        return (cx, cy);
    }
    let scaled = (u128::from(cy) * u128::from(MAX_PICTURE_WIDTH_EMU) + u128::from(cx) / 2)
        / u128::from(cx);
    (MAX_PICTURE_WIDTH_EMU, scaled as u64)
}

fn to_emu(pixels: u32, dpi: f64) -> u64 {
    let dpi = if dpi > 0.0 { dpi } else { DEFAULT_DPI };
    (f64::from(pixels) * EMU_PER_INCH as f64 / dpi).round() as u64
}

fn be_u16(bytes: &[u8], at: usize) -> Option<u16> {
    Some(u16::from_be_bytes(bytes.get(at..at + 2)?.try_into().ok()?))
}

fn be_u32(bytes: &[u8], at: usize) -> Option<u32> {
    Some(u32::from_be_bytes(bytes.get(at..at + 4)?.try_into().ok()?))
}

fn sniff_png(bytes: &[u8]) -> Option<ImageInfo> {
    let mut info: Option<ImageInfo> = None;
    let mut offset = PNG_SIGNATURE.len();

    while let (Some(length), Some(kind)) = (be_u32(bytes, offset), bytes.get(offset + 4..offset + 8)) {
        let data = offset + 8;
        match kind {
            b"IHDR" => {
                info = Some(ImageInfo {
                    format: ImageFormat::Png,
                    width_px: be_u32(bytes, data)?,
                    height_px: be_u32(bytes, data + 4)?,
                    dpi_x: DEFAULT_DPI,
                    dpi_y: DEFAULT_DPI,
                });
            }
            b"pHYs" => {
                let unit = *bytes.get(data + 8)?;
                if let (Some(found), 1) = (info.as_mut(), unit) {
                    found.dpi_x = (f64::from(be_u32(bytes, data)?) * INCHES_PER_METER).round();
                    found.dpi_y = (f64::from(be_u32(bytes, data + 4)?) * INCHES_PER_METER).round();
                }
            }
            b"IDAT" | b"IEND" => break,
            _ => {}
        }
        offset = data + length as usize + 4;
    }

    info
}

fn sniff_jpeg(bytes: &[u8]) -> Option<ImageInfo> {
    let mut density: Option<(f64, f64)> = None;
    let mut offset = 2;

    loop {
        if *bytes.get(offset)? != 0xFF {
            return None;
        }
        let marker = *bytes.get(offset + 1)?;
        if marker == 0xFF {
            offset += 1;
            continue;
        }
        if marker == 0x01 || (0xD0..=0xD9).contains(&marker) {
            offset += 2;
            continue;
        }

        let length = usize::from(be_u16(bytes, offset + 2)?);
        let data = offset + 4;
        match marker {
            0xE0 if bytes.get(data..data + 5) == Some(b"JFIF\0".as_slice()) => {
                let units = *bytes.get(data + 7)?;
                let x = f64::from(be_u16(bytes, data + 8)?);
                let y = f64::from(be_u16(bytes, data + 10)?);
                density = match units {
                    1 => Some((x, y)),
                    2 => Some(((x * CM_PER_INCH).round(), (y * CM_PER_INCH).round())),
                    _ => None,
                };
            }
            0xC0..=0xCF if !matches!(marker, 0xC4 | 0xC8 | 0xCC) => {
                let (dpi_x, dpi_y) = density.unwrap_or((DEFAULT_DPI, DEFAULT_DPI));
                return Some(ImageInfo {
                    format: ImageFormat::Jpeg,
                    height_px: u32::from(be_u16(bytes, data + 1)?),
                    width_px: u32::from(be_u16(bytes, data + 3)?),
                    dpi_x,
                    dpi_y,
                });
            }
            _ => {}
        }
        offset += 2 + length;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png(width: u32, height: u32, pixels_per_meter: Option<u32>) -> Vec<u8> {
        let mut bytes = PNG_SIGNATURE.to_vec();
        let mut chunk = |kind: &[u8], data: Vec<u8>| {
            bytes.extend_from_slice(&(data.len() as u32).to_be_bytes());
            bytes.extend_from_slice(kind);
            bytes.extend_from_slice(&data);
            bytes.extend_from_slice(&[0, 0, 0, 0]);
        };
        let mut ihdr = width.to_be_bytes().to_vec();
        ihdr.extend_from_slice(&height.to_be_bytes());
        ihdr.extend_from_slice(&[8, 6, 0, 0, 0]);
        chunk(b"IHDR", ihdr);
        if let Some(ppm) = pixels_per_meter {
            let mut phys = ppm.to_be_bytes().to_vec();
            phys.extend_from_slice(&ppm.to_be_bytes());
            phys.push(1);
            chunk(b"pHYs", phys);
        }
        chunk(b"IEND", Vec::new());
        bytes
    }

    fn jpeg(width: u16, height: u16, dpi: Option<u16>) -> Vec<u8> {
        let mut bytes = vec![0xFF, 0xD8];
        if let Some(dpi) = dpi {
            bytes.extend_from_slice(&[0xFF, 0xE0, 0x00, 0x10]);
            bytes.extend_from_slice(b"JFIF\0");
            bytes.extend_from_slice(&[1, 1, 1]);
            bytes.extend_from_slice(&dpi.to_be_bytes());
            bytes.extend_from_slice(&dpi.to_be_bytes());
            bytes.extend_from_slice(&[0, 0]);
        }
        bytes.extend_from_slice(&[0xFF, 0xC0, 0x00, 0x11, 8]);
        bytes.extend_from_slice(&height.to_be_bytes());
        bytes.extend_from_slice(&width.to_be_bytes());
        bytes.extend_from_slice(&[3; 10]);
        bytes
    }

    #[test]
    fn png_without_phys_defaults_to_72_dpi() {
        let info = sniff(&png(144, 72, None)).unwrap();
        assert_eq!(info.format, ImageFormat::Png);
        assert_eq!((info.width_px, info.height_px), (144, 72));
        assert_eq!(extent_emu(&info), (2 * EMU_PER_INCH, EMU_PER_INCH));
    }

    #[test]
    fn wide_png_is_capped_proportionally() {
        // 7874 px/m rounds to 200 dpi.
        let info = sniff(&png(4000, 2000, Some(7874))).unwrap();
        assert_eq!(info.dpi_x, 200.0);
        assert_eq!(extent_emu(&info), (7_200_000, 3_600_000));
    }

    #[test]
    fn jpeg_reads_sof_and_jfif_density() {
        let info = sniff(&jpeg(300, 150, Some(150))).unwrap();
        assert_eq!(info.format, ImageFormat::Jpeg);
        assert_eq!((info.width_px, info.height_px), (300, 150));
        assert_eq!(extent_emu(&info), (2 * EMU_PER_INCH, EMU_PER_INCH));

        let plain = sniff(&jpeg(72, 72, None)).unwrap();
        assert_eq!(plain.dpi_x, DEFAULT_DPI);
    }

    #[test]
    fn unknown_bytes_are_unsupported() {
        assert!(sniff(b"GIF89a....").is_none());
        assert!(sniff(&[0x89, b'P']).is_none());
    }
}
