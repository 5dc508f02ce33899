pub mod assess;
pub mod chat;
pub mod engine;
pub mod filter;
pub mod rag;
pub mod salvage;
pub mod statements;

pub use crate::domain::model::{AssessmentReport, GeneratedStatement, InputItem, RagRecord};
pub use crate::domain::ports::{Pipeline, Storage};
pub use crate::utils::error::Result;
