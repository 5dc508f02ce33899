pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use config::{cli::LocalStorage, JobConfig};
pub use core::{
    assess::AssessPipeline, engine::JudgeEngine, rag::RagProbe, statements::StatementPipeline,
};
pub use utils::error::{JudgeError, Result};
