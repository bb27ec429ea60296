mod models;
pub mod text;

pub use models::*;
