pub mod assistant;
pub mod cli;
pub mod commands;
pub mod config;
pub mod console;
pub mod container;
pub mod errors;
pub mod indexer;
pub mod llm;
pub mod logger;
pub mod models;
pub mod project;
pub mod rag;
pub mod web;

#[cfg(test)]
mod testing;
