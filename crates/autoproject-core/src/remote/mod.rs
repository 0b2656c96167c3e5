//! Remote service client
//!
//! HTTP implementation of the agent, thread and run interfaces.

pub mod logging;
mod openai;

pub use logging::{log_api_call, ApiLogEntry, API_LOG_ENV};
pub use openai::OpenAiClient;
