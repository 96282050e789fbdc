pub mod app;
pub mod clients;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod state;
pub mod storage;
pub mod ws;
