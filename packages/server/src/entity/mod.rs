pub mod banned_tag;
pub mod category;
pub mod comment;
pub mod live_stream;
pub mod video;
pub mod video_dislike;
pub mod video_like;
pub mod video_rating;
