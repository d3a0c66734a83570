//! Model loading functionality

use super::format::ModelFormat;
use super::model::{Model, ModelMetadata, ModelState, NamedParameters};
use super::save::ParameterEntry;
use crate::{Error, Result};
use ndarray::Array1;
use std::path::Path;

/// Load a model from a file
///
/// The format is detected from the file extension.
///
/// # Example
///
/// ```no_run
/// use guardar::io::load_model;
///
/// let model = load_model("checkpoints/model_5_0.1234.json").unwrap();
/// println!("Loaded model: {}", model.metadata.name);
/// ```
pub fn load_model(path: impl AsRef<Path>) -> Result<Model> {
    let path = path.as_ref();

    match detect_format(path)? {
        ModelFormat::SafeTensors => {
            let data = std::fs::read(path)?;
            let (_, st_metadata) = safetensors::SafeTensors::read_metadata(&data)
                .map_err(|e| Error::Serialization(format!("SafeTensors parsing failed: {e}")))?;

            let custom_meta = st_metadata.metadata();
            let field = |key: &str| {
                custom_meta
                    .as_ref()
                    .and_then(|m| m.get(key).cloned())
                    .unwrap_or_else(|| "unknown".to_string())
            };
            let mut metadata = ModelMetadata::new(field("name"), field("architecture"));
            if let Some(version) = custom_meta.as_ref().and_then(|m| m.get("version")) {
                metadata.version = version.clone();
            }

            Ok(Model::new(metadata, read_safetensors(&data)?))
        }
        format => {
            let content = std::fs::read_to_string(path)?;
            let state: ModelState = parse_text(&content, format)?;
            Model::from_state(state)
        }
    }
}

/// Load a parameter-only artifact written by [`save_parameters`](super::save_parameters)
///
/// Text formats keep the saved order; SafeTensors artifacts come back sorted
/// by tensor name.
pub fn load_parameters(path: impl AsRef<Path>) -> Result<NamedParameters> {
    let path = path.as_ref();

    match detect_format(path)? {
        ModelFormat::SafeTensors => read_safetensors(&std::fs::read(path)?),
        format => {
            let content = std::fs::read_to_string(path)?;
            let entries: Vec<ParameterEntry> = parse_text(&content, format)?;
            Ok(entries
                .into_iter()
                .map(|entry| (entry.name, Array1::from_vec(entry.values)))
                .collect())
        }
    }
}

fn detect_format(path: &Path) -> Result<ModelFormat> {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .ok_or_else(|| Error::Serialization("File has no extension".to_string()))?;

    ModelFormat::from_extension(ext)
        .ok_or_else(|| Error::Serialization(format!("Unsupported file extension: {ext}")))
}

fn parse_text<T: serde::de::DeserializeOwned>(content: &str, format: ModelFormat) -> Result<T> {
    match format {
        ModelFormat::Json => serde_json::from_str(content)
            .map_err(|e| Error::Serialization(format!("JSON deserialization failed: {e}"))),
        ModelFormat::Yaml => serde_yaml::from_str(content)
            .map_err(|e| Error::Serialization(format!("YAML deserialization failed: {e}"))),
        ModelFormat::SafeTensors => Err(Error::Serialization(
            "SafeTensors is a binary format".to_string(),
        )),
    }
}

fn read_safetensors(data: &[u8]) -> Result<NamedParameters> {
    let tensors = safetensors::SafeTensors::deserialize(data)
        .map_err(|e| Error::Serialization(format!("SafeTensors parsing failed: {e}")))?;

    // Same-dtype tensors are laid out by name
    let mut named = tensors.tensors();
    named.sort_by(|(a, _), (b, _)| a.cmp(b));

    named
        .into_iter()
        .map(|(name, view)| {
            if view.dtype() != safetensors::Dtype::F32 {
                return Err(Error::Serialization(format!(
                    "Tensor {name} has dtype {:?}, expected F32",
                    view.dtype()
                )));
            }
            let values: Vec<f32> = bytemuck::pod_collect_to_vec(view.data());
            Ok((name, Array1::from_vec(values)))
        })
        .collect()
}
