//! Serialization collaborator used by checkpoint callbacks

use super::format::SaveConfig;
use super::model::Model;
use super::save::{save_model, save_parameters};
use crate::Result;
use ndarray::Array1;
use std::path::Path;

/// What a checkpoint hands to the writer
#[derive(Debug, Clone, Copy)]
pub enum Payload<'a> {
    /// Metadata and parameters
    FullModel(&'a Model),
    /// Learned parameters only
    Parameters(&'a [(String, Array1<f32>)]),
}

/// Writes a checkpoint payload to a destination path
///
/// Implementations must overwrite an existing file and report failure
/// synchronously. The parent directory exists when `write` is called.
pub trait CheckpointWriter: Send {
    fn write(&self, payload: Payload<'_>, path: &Path) -> Result<()>;
}

/// Default writer backed by [`save_model`] / [`save_parameters`]
#[derive(Debug, Clone, Default)]
pub struct FormatWriter {
    config: SaveConfig,
}

impl FormatWriter {
    pub fn new(config: SaveConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SaveConfig {
        &self.config
    }
}

impl CheckpointWriter for FormatWriter {
    fn write(&self, payload: Payload<'_>, path: &Path) -> Result<()> {
        match payload {
            Payload::FullModel(model) => save_model(model, path, &self.config),
            Payload::Parameters(parameters) => save_parameters(parameters, path, &self.config),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{load_model, load_parameters, ModelFormat, ModelMetadata};
    use ndarray::array;
    use tempfile::TempDir;

    fn model() -> Model {
        Model::new(
            ModelMetadata::new("writer-test", "mlp"),
            vec![("w".to_string(), array![0.5, -0.5])],
        )
    }

    #[test]
    fn test_format_writer_full_model() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("full.yaml");
        let writer = FormatWriter::new(SaveConfig::new(ModelFormat::Yaml));

        writer.write(Payload::FullModel(&model()), &path).unwrap();

        let loaded = load_model(&path).unwrap();
        assert_eq!(loaded.metadata.architecture, "mlp");
    }

    #[test]
    fn test_format_writer_parameters() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("weights.safetensors");
        let writer = FormatWriter::new(SaveConfig::new(ModelFormat::SafeTensors));
        let m = model();

        writer.write(Payload::Parameters(&m.parameters), &path).unwrap();

        let params = load_parameters(&path).unwrap();
        assert_eq!(params, vec![("w".to_string(), array![0.5, -0.5])]);
    }
}
