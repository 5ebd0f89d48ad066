pub mod export;
pub mod filter;
pub mod service;
pub mod state;
pub mod summary;
pub mod time;
