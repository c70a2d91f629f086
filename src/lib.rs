//! Reshard worker: single-flight controller for long-running cluster jobs.

pub mod commands;
pub mod config;
pub mod error;
pub mod http;
pub mod jobs;
pub mod logging;
pub mod logutil;
pub mod signals;
pub mod worker;
