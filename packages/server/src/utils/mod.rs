pub mod category_tree;
pub mod jwt;
pub mod range;
pub mod tags;
pub mod video;
