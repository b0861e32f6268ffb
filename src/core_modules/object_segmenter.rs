// THEORY:
// The `ObjectSegmenter` measures how much of the frame the product occupies.
// It does not try to recognise the product; it simply assumes that whatever is
// not clean background is the product.
//
// Steps:
// 1.  Invert the background mask to get a raw foreground mask.
// 2.  Open (remove specks) and then close (seal small gaps) with a square kernel.
// 3.  Trace the external contours and keep the one with the largest enclosed area.
//
// Only the area value travels downstream. When two contours tie, which one is
// reported makes no difference to the ranking.

use crate::core_modules::image_ops::image_ops;
use image::GrayImage;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectMeasurement {
    pub object_area_pixels: u64,
    /// Share of the frame covered by the largest object (0.0-1.0).
    pub object_percentage: f64,
}

impl ObjectMeasurement {
    pub const EMPTY: ObjectMeasurement = ObjectMeasurement {
        object_area_pixels: 0,
        object_percentage: 0.0,
    };
}

pub struct ObjectSegmenter {
    kernel_radius: u8,
}

impl ObjectSegmenter {
    pub fn new(kernel_radius: u8) -> Self {
        Self { kernel_radius }
    }

    pub fn measure(&self, background_mask: &GrayImage) -> ObjectMeasurement {
        let image_area = background_mask.width() as u64 * background_mask.height() as u64;
        if image_area == 0 {
            return ObjectMeasurement::EMPTY;
        }

        let object_mask = image_ops::invert(background_mask);
        let object_mask = image_ops::morph_open(&object_mask, self.kernel_radius);
        let object_mask = image_ops::morph_close(&object_mask, self.kernel_radius);

        let largest = image_ops::find_external_contours(&object_mask)
            .iter()
            .map(image_ops::contour_area)
            .fold(None, |best: Option<f64>, area| match best {
                Some(b) if b >= area => Some(b),
                _ => Some(area),
            });

        match largest {
            None => ObjectMeasurement::EMPTY,
            Some(area) => {
                let object_area_pixels = area.floor() as u64;
                ObjectMeasurement {
                    object_area_pixels,
                    object_percentage: (area / image_area as f64).clamp(0.0, 1.0),
                }
            }
        }
    }
}
