pub mod extractor;
pub mod orchestrator;
pub mod synthesizer;
