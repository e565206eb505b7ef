pub mod bus;
pub mod commands;
pub mod error;
pub mod handlers;
pub mod repo;
pub mod service;
