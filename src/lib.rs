pub mod api;
pub mod config;
pub mod downloader;
pub mod files;
pub mod naming;
pub mod notify;
pub mod observability;
pub mod retry;
pub mod store;
