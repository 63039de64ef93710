pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod export;
pub mod filter;
pub mod format;
pub mod fs_util;
pub mod genes;
pub mod output;
pub mod registry;
