// THEORY:
// The `pixel` module holds the single-pixel heuristics the engine relies on.
// Everything here is computed from one pixel alone, with no knowledge of its
// neighbours. Spatial operations (edges, morphology, contours) live in `image_ops`.
//
// Luminance follows ITU-R BT.601, the same weighting classic vision libraries use
// for their RGB-to-gray conversion, so brightness thresholds tuned against them
// carry over unchanged.

pub mod pixel {
    use image::Rgb;

    pub type Channel = u8;
    pub type Luminance = f64;

    const RED_WEIGHT: Luminance = 0.299;
    const GREEN_WEIGHT: Luminance = 0.587;
    const BLUE_WEIGHT: Luminance = 0.114;

    /// Exact BT.601 luminance of an RGB pixel (0.0-255.0).
    pub fn luminance(pixel: &Rgb<Channel>) -> Luminance {
        let [red, green, blue] = pixel.0;
        RED_WEIGHT * red as Luminance
            + GREEN_WEIGHT * green as Luminance
            + BLUE_WEIGHT * blue as Luminance
    }

    /// Luminance rounded into a gray channel value.
    pub fn luma(pixel: &Rgb<Channel>) -> Channel {
        luminance(pixel).round().clamp(0.0, 255.0) as Channel
    }

}
