pub mod analysis;
pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod drugs;
pub mod error;
pub mod llm;
pub mod models;
pub mod processing;
pub mod services;
pub mod storage;
