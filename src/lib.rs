#[macro_use]
extern crate tracing;

pub mod assertion;
pub mod cmd;
pub mod config;
pub mod constants;
pub mod errors;
pub mod fs;
pub mod harness;
pub mod logger;
pub mod plan;
pub mod suite;
mod template;
pub mod variables;
