pub mod config;
pub mod controller;
pub mod error;
pub mod hierarchy;
pub mod layout;
pub mod model;
pub mod payload;
pub mod store;
