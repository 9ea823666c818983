//! STAC stocktake
//!
//! Scans the FBI file index slice by slice, reconciles it against the STAC
//! asset index and generates assets for files the catalogue is missing.

pub mod app;
pub mod config;
pub mod core;
pub mod generator;
pub mod messaging;
pub mod output;
pub mod scanner;
pub mod search;
pub mod stocktake;
