//! Application layer - flows combining settings, prompts and API calls

pub mod use_cases;
