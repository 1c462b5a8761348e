pub mod client;
pub mod models;
pub mod prompts;
pub mod transport;
