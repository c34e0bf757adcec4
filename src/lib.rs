pub mod config;
pub mod db;
pub mod detail;
pub mod error;
pub mod geocoder;
pub mod ingester;
pub mod lifecycle;
pub mod listing;
pub mod logging;
pub mod regions;
pub mod source;
pub mod storage;
pub mod types;
