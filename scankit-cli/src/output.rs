use anyhow::{bail, Context};
use image::{DynamicImage, ImageBuffer, Luma, Rgb};
use scankit::{ImageFormat, ScanImage};
use std::path::Path;

pub fn save_png(image: &ScanImage, path: &Path) -> anyhow::Result<()> {
    let dynamic = to_dynamic(image)?;

    dynamic
        .save_with_format(path, image::ImageFormat::Png)
        .with_context(|| format!("writing '{}'", path.display()))?;

    log::info!(
        "Saved {}x{} image at {} DPI to '{}'",
        image.width,
        image.height,
        image.dpi,
        path.display()
    );
    Ok(())
}

fn rows(image: &ScanImage, row_bytes: usize) -> impl Iterator<Item = &[u8]> {
    image
        .data
        .chunks(image.bytes_per_line.max(1))
        .take(image.height)
        .map(move |row| &row[..row_bytes.min(row.len())])
}

fn samples16(bytes: &[u8]) -> impl Iterator<Item = u16> + '_ {
    bytes
        .chunks_exact(2)
        .map(|pair| u16::from_ne_bytes([pair[0], pair[1]]))
}

pub fn to_dynamic(image: &ScanImage) -> anyhow::Result<DynamicImage> {
    let (width, height) = (image.width as u32, image.height as u32);

    let dynamic = match image.format {
        ImageFormat::Invalid => bail!("image has no data"),
        // 1 is black, most significant bit first.
        ImageFormat::BlackWhite => {
            let pixels = rows(image, image.width.div_ceil(8))
                .flat_map(|row| {
                    (0..image.width).map(move |x| match row.get(x / 8) {
                        Some(byte) if byte & (0x80 >> (x % 8)) != 0 => 0,
                        _ => 255,
                    })
                })
                .collect();
            ImageBuffer::<Luma<u8>, _>::from_raw(width, height, pixels).map(DynamicImage::ImageLuma8)
        }
        ImageFormat::Gray8 => {
            let pixels = rows(image, image.width).flatten().copied().collect();
            ImageBuffer::<Luma<u8>, _>::from_raw(width, height, pixels).map(DynamicImage::ImageLuma8)
        }
        ImageFormat::Gray16 => {
            let pixels = rows(image, image.width * 2).flat_map(samples16).collect();
            ImageBuffer::<Luma<u16>, _>::from_raw(width, height, pixels).map(DynamicImage::ImageLuma16)
        }
        ImageFormat::Rgb8 => {
            let pixels = rows(image, image.width * 3).flatten().copied().collect();
            ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, pixels).map(DynamicImage::ImageRgb8)
        }
        ImageFormat::Rgb16 => {
            let pixels = rows(image, image.width * 6).flat_map(samples16).collect();
            ImageBuffer::<Rgb<u16>, _>::from_raw(width, height, pixels).map(DynamicImage::ImageRgb16)
        }
    };

    dynamic.with_context(|| {
        format!(
            "{:?} image of {}x{} does not fit {} bytes",
            image.format,
            image.width,
            image.height,
            image.data.len()
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(format: ImageFormat, width: usize, height: usize, bytes_per_line: usize, data: Vec<u8>) -> ScanImage {
        ScanImage {
            width,
            height,
            bytes_per_line,
            format,
            dpi: 300,
            data,
        }
    }

    #[test]
    fn lineart_is_expanded() {
        let scan = image(ImageFormat::BlackWhite, 10, 1, 2, vec![0b1000_0001, 0b0100_0000]);
        let gray = to_dynamic(&scan).unwrap().into_luma8();

        let row: Vec<u8> = gray.pixels().map(|pixel| pixel.0[0]).collect();
        assert_eq!(row, vec![0, 255, 255, 255, 255, 255, 255, 0, 255, 0]);
    }

    #[test]
    fn row_padding_is_dropped() {
        let scan = image(ImageFormat::Gray8, 2, 2, 4, vec![1, 2, 0, 0, 3, 4, 0, 0]);
        let gray = to_dynamic(&scan).unwrap().into_luma8();
        assert_eq!(gray.into_raw(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn short_data_is_an_error() {
        let scan = image(ImageFormat::Rgb8, 4, 4, 12, vec![0; 12]);
        assert!(to_dynamic(&scan).is_err());
        assert!(to_dynamic(&ScanImage::default()).is_err());
    }
}
