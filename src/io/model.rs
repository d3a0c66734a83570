//! Model structure for serialization

use crate::{Error, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Named parameter tensors, in registration order
pub type NamedParameters = Vec<(String, Array1<f32>)>;

/// Model handle shared between the training driver and checkpoint callbacks
pub type SharedModel = Arc<RwLock<Model>>;

/// Model metadata containing architecture and training information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Model name/identifier
    pub name: String,

    /// Model architecture type (e.g., "transformer", "linear", "custom")
    pub architecture: String,

    /// Model version
    pub version: String,

    /// Custom metadata fields
    #[serde(default)]
    pub custom: HashMap<String, serde_json::Value>,
}

impl ModelMetadata {
    /// Create new metadata with minimal fields
    pub fn new(name: impl Into<String>, architecture: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            architecture: architecture.into(),
            version: "0.1.0".to_string(),
            custom: HashMap::new(),
        }
    }

    /// Add custom metadata field
    pub fn with_custom(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.custom.insert(key.into(), value);
        self
    }
}

/// Information about a model parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterInfo {
    /// Parameter name (e.g., "layer1.weight", "bias")
    pub name: String,

    /// Parameter shape
    pub shape: Vec<usize>,

    /// Data type (e.g., "f32")
    pub dtype: String,
}

/// Serializable model state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelState {
    /// Model metadata
    pub metadata: ModelMetadata,

    /// Parameter information
    pub parameters: Vec<ParameterInfo>,

    /// Flattened parameter data
    pub data: Vec<f32>,
}

/// High-level model abstraction for I/O
#[derive(Debug, Clone)]
pub struct Model {
    /// Model metadata
    pub metadata: ModelMetadata,

    /// Model parameters
    pub parameters: NamedParameters,
}

impl Model {
    /// Create a new model
    pub fn new(metadata: ModelMetadata, parameters: NamedParameters) -> Self {
        Self {
            metadata,
            parameters,
        }
    }

    /// Wrap the model for sharing with checkpoint callbacks
    pub fn into_shared(self) -> SharedModel {
        Arc::new(RwLock::new(self))
    }

    /// Get parameter by name
    pub fn get_parameter(&self, name: &str) -> Option<&Array1<f32>> {
        self.parameters
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| t)
    }

    /// Get mutable parameter by name
    pub fn get_parameter_mut(&mut self, name: &str) -> Option<&mut Array1<f32>> {
        self.parameters
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, t)| t)
    }

    /// Total number of scalar parameters
    pub fn num_parameters(&self) -> usize {
        self.parameters.iter().map(|(_, t)| t.len()).sum()
    }

    /// Convert model to serializable state
    pub fn to_state(&self) -> ModelState {
        let mut data = Vec::with_capacity(self.num_parameters());
        let parameters = self
            .parameters
            .iter()
            .map(|(name, tensor)| {
                data.extend(tensor.iter().copied());
                ParameterInfo {
                    name: name.clone(),
                    shape: vec![tensor.len()],
                    dtype: "f32".to_string(),
                }
            })
            .collect();

        ModelState {
            metadata: self.metadata.clone(),
            parameters,
            data,
        }
    }

    /// Create model from serializable state
    ///
    /// Fails if the flattened data is shorter or longer than the parameter
    /// shapes describe.
    pub fn from_state(state: ModelState) -> Result<Self> {
        let expected: usize = state
            .parameters
            .iter()
            .map(|p| p.shape.iter().product::<usize>())
            .sum();
        if expected != state.data.len() {
            return Err(Error::Serialization(format!(
                "parameter shapes describe {expected} values but state holds {}",
                state.data.len()
            )));
        }

        let mut offset = 0;
        let parameters = state
            .parameters
            .into_iter()
            .map(|info| {
                let size: usize = info.shape.iter().product();
                let values = state.data[offset..offset + size].to_vec();
                offset += size;
                (info.name, Array1::from_vec(values))
            })
            .collect();

        Ok(Self {
            metadata: state.metadata,
            parameters,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn linear() -> Model {
        Model::new(
            ModelMetadata::new("test-model", "linear"),
            vec![
                ("weight".to_string(), array![1.0, 2.0, 3.0]),
                ("bias".to_string(), array![0.1]),
            ],
        )
    }

    #[test]
    fn test_model_metadata_creation() {
        let meta = ModelMetadata::new("test-model", "linear");
        assert_eq!(meta.name, "test-model");
        assert_eq!(meta.architecture, "linear");
        assert_eq!(meta.version, "0.1.0");
        assert!(meta.custom.is_empty());
    }

    #[test]
    fn test_model_parameter_access() {
        let mut model = linear();

        assert!(model.get_parameter("weight").is_some());
        assert!(model.get_parameter("nonexistent").is_none());
        assert_eq!(model.num_parameters(), 4);

        model.get_parameter_mut("bias").unwrap()[0] = 0.5;
        assert_eq!(model.get_parameter("bias").unwrap()[0], 0.5);
    }

    #[test]
    fn test_model_state_round_trip() {
        let original = linear();
        let restored = Model::from_state(original.to_state()).unwrap();

        assert_eq!(original.metadata, restored.metadata);
        assert_eq!(
            original.get_parameter("weight"),
            restored.get_parameter("weight")
        );
    }

    #[test]
    fn test_model_state_rejects_truncated_data() {
        let mut state = linear().to_state();
        state.data.pop();

        let err = Model::from_state(state).unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
    }
}
