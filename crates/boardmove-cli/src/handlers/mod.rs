pub mod board;
pub mod config;
pub mod extract;
pub mod migrate;
