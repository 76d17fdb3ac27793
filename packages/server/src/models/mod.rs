pub mod admin;
pub mod auth;
pub mod category;
pub mod comment;
pub mod engagement;
pub mod livestream;
pub mod shared;
pub mod video;
