pub mod config;
pub mod db;
pub mod email;
pub mod error;
pub mod models;
pub mod render;
pub mod template;
pub mod totals;
