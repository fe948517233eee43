pub mod listings;
pub mod media;
