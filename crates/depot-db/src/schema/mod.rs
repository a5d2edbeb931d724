pub mod blob;
pub mod content;
