pub mod app;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod ensembl;
pub mod error;
pub mod export;
pub mod output;
pub mod prompt;
pub mod record;
pub mod session;
pub mod store;
pub mod table;
