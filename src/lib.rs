// Qmirac - Local-first business analysis pipeline
// Library exports

pub mod cli;
pub mod config;
pub mod groups;
pub mod ingest;
pub mod ollama;
pub mod prompts;
pub mod questions;
pub mod report;
pub mod runner;
