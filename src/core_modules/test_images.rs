// Synthetic listing photos shared by the unit tests.

use image::{Rgb, RgbImage};

/// White canvas with a dark square product in the middle.
pub fn product_on_white(size: u32, product: u32) -> RgbImage {
    product_on(size, product, Rgb([255, 255, 255]))
}

/// Square product centred on a flat background colour.
pub fn product_on(size: u32, product: u32, background: Rgb<u8>) -> RgbImage {
    let start = (size - product) / 2;
    let end = start + product;
    RgbImage::from_fn(size, size, |x, y| {
        if (start..end).contains(&x) && (start..end).contains(&y) {
            Rgb([30, 40, 50])
        } else {
            background
        }
    })
}

/// PNG bytes of an image, as a web server would return them.
pub fn png_bytes(image: &RgbImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("encode test png");
    bytes
}
