//! Dialogue generators available to the CLI

mod offline;
mod ollama;

use std::sync::Arc;

use rehearse_core::DialogueGenerator;

use crate::config::{GeneratorConfig, GeneratorKind};

pub use offline::OfflineGenerator;
pub use ollama::OllamaGenerator;

/// Build the generator selected by the `[generator]` section.
pub fn from_config(config: &GeneratorConfig) -> Arc<dyn DialogueGenerator> {
    match config.kind {
        GeneratorKind::Ollama => Arc::new(OllamaGenerator::new(&config.host, &config.model)),
        GeneratorKind::Offline => Arc::new(OfflineGenerator::new()),
    }
}
