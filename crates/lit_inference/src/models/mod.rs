use lit_core::{Error, InferenceModel, Result};
use std::sync::Arc;
use tracing::info;

use crate::{Config, ModelKind};

pub mod dummy;
pub mod openai;

pub use dummy::DummyModel;
pub use openai::OpenAiModel;

pub fn create_model(config: &Config) -> Result<Arc<dyn InferenceModel>> {
    info!("Using {} model", config.kind);
    match config.kind {
        ModelKind::Dummy => Ok(Arc::new(DummyModel::new())),
        kind => {
            if kind.requires_api_key() && config.api_key.as_deref().map_or(true, str::is_empty) {
                return Err(Error::Inference(format!("{} API key is required", kind)));
            }
            Ok(Arc::new(OpenAiModel::new(config)?))
        }
    }
}
