#![doc = "pagesync-core: core publishing logic for pagesync."]

//! This crate contains the full publishing pipeline: local scan, matcher and
//! order rules, transfer planning and plan execution against provider
//! contracts. Provider-specific clients (S3, CloudFront) live in the CLI
//! crate.
//!
//! # Usage
//! Add this as a dependency for shared planning, config and sync code.

pub mod config;
pub mod contract;
pub mod error;
pub mod matcher;
pub mod plan;
pub mod publish;
pub mod retry;
pub mod scan;
