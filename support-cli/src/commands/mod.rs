//! Bridges the composed command tree to clap and the terminal

pub mod dispatch;
pub mod output;
pub mod tree;
