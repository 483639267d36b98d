pub mod brain;
pub mod catalog;
pub mod config;
pub mod llm;
pub mod memory;
pub mod questions;
pub mod terminal;
pub mod tools;
