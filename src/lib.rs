pub mod browser;
pub mod cli;
pub mod completion;
pub mod driver;
pub mod error;
pub mod pipeline;
pub mod profile;
pub mod schema;
pub mod trace;
