pub mod image_helper {
    use image::ImageEncoder;
    use std::path::{Path, PathBuf};

    const PATH_SEPARATORS: [char; 2] = ['/', '\\'];

    /// File name for a processed listing image: `{brand}_{product_name}.png`,
    /// with spaces in the product name replaced by underscores. Path separators
    /// in either part are replaced too, so the name is always a single component.
    pub fn processed_file_name(brand: &str, product_name: &str) -> String {
        let brand = brand.replace(PATH_SEPARATORS, "_");
        let product_name = product_name.replace(PATH_SEPARATORS, "_").replace(' ', "_");
        format!("{}_{}.png", brand, product_name)
    }

    pub fn processed_path(dir: &Path, brand: &str, product_name: &str) -> PathBuf {
        dir.join(processed_file_name(brand, product_name))
    }

    /// Re-encodes downloaded image bytes as an RGBA PNG, creating the parent directory.
    /// Decoding first guarantees that only a valid image ever lands on disk.
    pub fn save_png(path: &Path, bytes: &[u8]) -> Result<(), image::error::ImageError> {
        let rgba = image::load_from_memory(bytes)?.to_rgba8();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let output = std::fs::File::create(path)?;
        let encoder = image::codecs::png::PngEncoder::new(output);

        encoder.write_image(
            rgba.as_raw(),
            rgba.width(),
            rgba.height(),
            image::ExtendedColorType::Rgba8,
        )?;

        Ok(())
    }
}
