// THEORY:
// `image_ops` is the narrow image-processing interface the analyzers are written
// against. The scoring algorithms only ever ask for a handful of primitives:
//
// 1.  **Conversion**: `to_grayscale` turns the decoded RGB matrix into a single
//     luminance channel.
// 2.  **Masks**: `threshold`, `invert` and `and_not` build and combine binary masks
//     (0 = off, 255 = on).
// 3.  **Edges and morphology**: `detect_edges`, `dilate`, `morph_open` and
//     `morph_close`, all with square structuring elements.
// 4.  **Shape measurement**: `find_external_contours` and `contour_area`.
// 5.  **Sharpness**: `laplacian_variance`, the classic second-derivative blur metric.
//
// The heavy lifting is delegated to `imageproc`. Keeping the surface this small
// means the analyzers never touch the library directly and stay easy to test.

pub mod image_ops {
    use crate::core_modules::pixel::pixel::luma;
    use image::{GrayImage, ImageBuffer, Luma, RgbImage, imageops};
    use imageproc::contours::{BorderType, Contour, find_contours};
    use imageproc::distance_transform::Norm;
    use imageproc::filter::filter3x3;
    use imageproc::{edges, morphology};

    pub const MASK_ON: u8 = 255;
    pub const MASK_OFF: u8 = 0;

    const LAPLACIAN_KERNEL: [f32; 9] = [0.0, 1.0, 0.0, 1.0, -4.0, 1.0, 0.0, 1.0, 0.0];

    pub fn to_grayscale(image: &RgbImage) -> GrayImage {
        let mut gray = GrayImage::new(image.width(), image.height());
        for (source, target) in image.pixels().zip(gray.pixels_mut()) {
            *target = Luma([luma(source)]);
        }
        gray
    }

    /// Binary threshold: pixels at or above `level` are switched on.
    pub fn threshold(gray: &GrayImage, level: u8) -> GrayImage {
        let mut mask = gray.clone();
        for pixel in mask.pixels_mut() {
            pixel.0[0] = if pixel.0[0] >= level { MASK_ON } else { MASK_OFF };
        }
        mask
    }

    pub fn invert(mask: &GrayImage) -> GrayImage {
        let mut inverted = mask.clone();
        for pixel in inverted.pixels_mut() {
            pixel.0[0] = if pixel.0[0] > 0 { MASK_OFF } else { MASK_ON };
        }
        inverted
    }

    /// `keep AND NOT remove`.
    pub fn and_not(keep: &GrayImage, remove: &GrayImage) -> GrayImage {
        let mut combined = keep.clone();
        for (pixel, removed) in combined.pixels_mut().zip(remove.pixels()) {
            pixel.0[0] = if pixel.0[0] > 0 && removed.0[0] == 0 { MASK_ON } else { MASK_OFF };
        }
        combined
    }

    pub fn count_on(mask: &GrayImage) -> usize {
        mask.pixels().filter(|p| p.0[0] > 0).count()
    }

    pub fn detect_edges(gray: &GrayImage, low: f32, high: f32) -> GrayImage {
        edges::canny(gray, low, high)
    }

    /// All pixels on, or all off. Morphology leaves such masks unchanged, and
    /// `imageproc` gets very small empty masks wrong (a 1x1 empty mask dilates to on).
    fn is_uniform(mask: &GrayImage) -> bool {
        let mut values = mask.pixels().map(|p| p.0[0] > 0);
        match values.next() {
            Some(first) => values.all(|on| on == first),
            None => true,
        }
    }

    /// Dilation with a `(2 * radius + 1)` square structuring element.
    pub fn dilate(mask: &GrayImage, radius: u8) -> GrayImage {
        if is_uniform(mask) {
            return mask.clone();
        }
        morphology::dilate(mask, Norm::LInf, radius)
    }

    /// Erosion followed by dilation. Removes specks smaller than the kernel.
    pub fn morph_open(mask: &GrayImage, radius: u8) -> GrayImage {
        if is_uniform(mask) {
            return mask.clone();
        }
        morphology::open(mask, Norm::LInf, radius)
    }

    /// Dilation followed by erosion. Fills gaps smaller than the kernel.
    pub fn morph_close(mask: &GrayImage, radius: u8) -> GrayImage {
        if is_uniform(mask) {
            return mask.clone();
        }
        morphology::close(mask, Norm::LInf, radius)
    }

    /// Outer borders of the top-level foreground regions. Holes and anything nested
    /// inside a hole are skipped.
    ///
    /// The frame counts as background: the mask is traced inside a one-pixel off
    /// border, otherwise a region touching the left edge is reported as a hole.
    pub fn find_external_contours(mask: &GrayImage) -> Vec<Contour<i32>> {
        let mut padded = GrayImage::new(mask.width() + 2, mask.height() + 2);
        imageops::replace(&mut padded, mask, 1, 1);

        find_contours::<i32>(&padded)
            .into_iter()
            .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
            .map(|mut contour| {
                for point in &mut contour.points {
                    point.x -= 1;
                    point.y -= 1;
                }
                contour
            })
            .collect()
    }

    /// Area enclosed by the contour polygon (shoelace formula over the border pixel centres).
    pub fn contour_area(contour: &Contour<i32>) -> f64 {
        let points = &contour.points;
        if points.len() < 3 {
            return 0.0;
        }
        let mut twice_area = 0i64;
        for i in 0..points.len() {
            let j = (i + 1) % points.len();
            twice_area += points[i].x as i64 * points[j].y as i64;
            twice_area -= points[j].x as i64 * points[i].y as i64;
        }
        twice_area.abs() as f64 / 2.0
    }

    /// Population variance of the 3x3 Laplacian response.
    pub fn laplacian_variance(gray: &GrayImage) -> f64 {
        if gray.width() == 0 || gray.height() == 0 {
            return 0.0;
        }
        let response: ImageBuffer<Luma<f32>, Vec<f32>> = filter3x3(gray, &LAPLACIAN_KERNEL);

        let count = response.len() as f64;
        let mut sum = 0.0f64;
        let mut sum_sq = 0.0f64;
        for value in response.iter() {
            let v = *value as f64;
            sum += v;
            sum_sq += v * v;
        }
        let mean = sum / count;
        ((sum_sq / count) - mean * mean).max(0.0)
    }

}
