pub mod background_removal;
pub mod search;
