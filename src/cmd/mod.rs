pub mod command;
pub mod terraform;
