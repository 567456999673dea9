// Library shared by the collector and consumer binaries and the tests

pub mod collector;
pub mod config;
pub mod cycle;
pub mod error;
pub mod logging;
pub mod models;
pub mod publisher;
pub mod retention;
pub mod shutdown;
pub mod stats;
pub mod store;
pub mod subscriber;
pub mod version;
