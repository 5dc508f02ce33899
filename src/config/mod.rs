pub mod cli;
pub mod job;

pub use job::JobConfig;
