pub mod pixel;
pub mod image_ops;
pub mod image_fetcher;
pub mod background_analyzer;
pub mod object_segmenter;
pub mod quality_scorer;
pub mod image_evaluator;
pub mod candidate;
pub mod best_image_selector;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_images;
