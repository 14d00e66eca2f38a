//! Study content: categories, videos and questions with answer options.
//!
//! Backed by PostgreSQL only; the routes are mounted when a database is
//! configured.

pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;

pub use error::CatalogError;
pub use models::{Category, Difficulty, Video};
pub use repository::{CategoryRepository, QuestionRepository, VideoRepository};
