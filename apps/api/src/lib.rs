pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod events;
pub mod flags;
pub mod inventory;
pub mod models;
pub mod routes;
pub mod state;
pub mod store;
