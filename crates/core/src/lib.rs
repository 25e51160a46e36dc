pub mod chunk;
pub mod config;

pub use chunk::{Chunk, Source};
pub use config::Config;
