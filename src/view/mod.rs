pub mod document;
pub mod export;
