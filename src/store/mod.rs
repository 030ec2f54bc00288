//! Storage layer for users and posts

mod blog_db;

pub use blog_db::BlogDb;
