pub mod contract;
pub mod controller;
pub mod error;
pub mod fetchers;
pub mod notify;
pub mod page;
pub mod platform;
pub mod render;
pub mod serialize;
pub mod types;
