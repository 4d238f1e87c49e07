pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod fetch;
pub mod hierarchy;
pub mod index;
pub mod lookup;
pub mod model;
pub mod output;
pub mod parser;
pub mod search;
pub mod store;
