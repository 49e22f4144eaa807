pub mod candidates;
pub mod getter;
pub mod image_resolver;
