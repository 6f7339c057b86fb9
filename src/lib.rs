pub mod api;
pub mod cli;
pub mod config;
pub mod dataset;
pub mod error;
pub mod identity;
pub mod notify;
pub mod routes;
pub mod storage;
pub mod workflow;
