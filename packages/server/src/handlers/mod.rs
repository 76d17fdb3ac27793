pub mod admin;
pub mod category;
pub mod comment;
pub mod content;
pub mod engagement;
pub mod livestream;
pub mod video;
