//! Model saving functionality

use super::format::{ModelFormat, SaveConfig};
use super::model::Model;
use crate::{Error, Result};
use ndarray::Array1;
use safetensors::tensor::{Dtype, TensorView};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// One entry of a parameter-only artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ParameterEntry {
    pub name: String,
    pub values: Vec<f32>,
}

/// Save a model (metadata and parameters) to a file
///
/// The file is overwritten if it exists. The parent directory must already
/// exist; the checkpoint callback takes care of creating it.
///
/// # Example
///
/// ```no_run
/// use guardar::io::{save_model, Model, ModelFormat, ModelMetadata, SaveConfig};
/// use ndarray::array;
///
/// let params = vec![("weight".to_string(), array![1.0, 2.0])];
/// let model = Model::new(ModelMetadata::new("my-model", "linear"), params);
/// let config = SaveConfig::new(ModelFormat::Json);
///
/// save_model(&model, "model.json", &config).unwrap();
/// ```
pub fn save_model(model: &Model, path: impl AsRef<Path>, config: &SaveConfig) -> Result<()> {
    let path = path.as_ref();

    match config.format {
        ModelFormat::SafeTensors => {
            let mut metadata = HashMap::new();
            metadata.insert("name".to_string(), model.metadata.name.clone());
            metadata.insert(
                "architecture".to_string(),
                model.metadata.architecture.clone(),
            );
            metadata.insert("version".to_string(), model.metadata.version.clone());
            write_safetensors(&model.parameters, Some(metadata), path)
        }
        format => write_text(&model.to_state(), format, config.pretty, path),
    }
}

/// Save only the parameter state of a model
///
/// Text formats store an ordered list of `{name, values}` entries; the
/// SafeTensors format stores the tensors without model metadata.
pub fn save_parameters(
    parameters: &[(String, Array1<f32>)],
    path: impl AsRef<Path>,
    config: &SaveConfig,
) -> Result<()> {
    let path = path.as_ref();

    match config.format {
        ModelFormat::SafeTensors => write_safetensors(parameters, None, path),
        format => {
            let entries: Vec<ParameterEntry> = parameters
                .iter()
                .map(|(name, tensor)| ParameterEntry {
                    name: name.clone(),
                    values: tensor.to_vec(),
                })
                .collect();
            write_text(&entries, format, config.pretty, path)
        }
    }
}

fn write_text<T: Serialize>(
    value: &T,
    format: ModelFormat,
    pretty: bool,
    path: &Path,
) -> Result<()> {
    let data = match format {
        ModelFormat::Json if pretty => serde_json::to_string_pretty(value)
            .map_err(|e| Error::Serialization(format!("JSON serialization failed: {e}")))?,
        ModelFormat::Json => serde_json::to_string(value)
            .map_err(|e| Error::Serialization(format!("JSON serialization failed: {e}")))?,
        ModelFormat::Yaml => serde_yaml::to_string(value)
            .map_err(|e| Error::Serialization(format!("YAML serialization failed: {e}")))?,
        ModelFormat::SafeTensors => {
            return Err(Error::Serialization(
                "SafeTensors is a binary format".to_string(),
            ))
        }
    };
    std::fs::write(path, data)?;
    Ok(())
}

/// Write tensors in SafeTensors format (HuggingFace compatible)
fn write_safetensors(
    parameters: &[(String, Array1<f32>)],
    metadata: Option<HashMap<String, String>>,
    path: &Path,
) -> Result<()> {
    // Byte buffers must outlive the views that borrow them
    let tensor_data: Vec<(&str, Vec<u8>, Vec<usize>)> = parameters
        .iter()
        .map(|(name, tensor)| {
            let values = tensor.to_vec();
            let bytes: Vec<u8> = bytemuck::cast_slice(&values).to_vec();
            (name.as_str(), bytes, vec![tensor.len()])
        })
        .collect();

    let views = tensor_data
        .iter()
        .map(|(name, bytes, shape)| {
            TensorView::new(Dtype::F32, shape.clone(), bytes)
                .map(|view| (*name, view))
                .map_err(|e| Error::Serialization(format!("Invalid tensor {name}: {e}")))
        })
        .collect::<Result<Vec<_>>>()?;

    let bytes = safetensors::serialize(views, metadata)
        .map_err(|e| Error::Serialization(format!("SafeTensors serialization failed: {e}")))?;
    std::fs::write(path, bytes)?;

    Ok(())
}
