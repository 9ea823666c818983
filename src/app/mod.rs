//! Application shell

pub mod cli;
pub mod services;
pub mod startup;
