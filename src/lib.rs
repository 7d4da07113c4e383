//! File encryption vault backed by AWS KMS and S3
//!
//! This crate provides the core functionality for the kms-vault command
//! line tool. The public modules can be used for testing and extension.

pub mod aws;
pub mod cli;
pub mod config;
pub mod error;
pub mod files;
pub mod pipeline;
