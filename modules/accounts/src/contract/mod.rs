pub mod client;
pub mod error;
pub mod id;
pub mod model;
