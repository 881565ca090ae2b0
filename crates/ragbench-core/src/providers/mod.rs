pub mod defaults;
pub mod llm;
pub mod retrieval;
