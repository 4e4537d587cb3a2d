#![doc = "pagesync CLI crate: argument parsing, config loading and AWS provider clients."]

pub mod cli;
pub mod load_config;
pub mod store;
