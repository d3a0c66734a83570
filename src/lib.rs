//! # Guardar: Epoch-End Checkpointing for Training Loops
//!
//! Guardar decides when a model should be written to disk during training and
//! where it goes. A [`ModelCheckpoint`](train::ModelCheckpoint) is driven once
//! per epoch; every `cadence` epochs it either saves unconditionally or only
//! when a monitored metric improved.
//!
//! ## Architecture
//!
//! - **train**: Callback seam, checkpoint policy, path templates, config
//! - **io**: Model saving and loading (JSON, YAML, SafeTensors formats)

pub mod io;
pub mod train;

pub mod error;

// Re-export commonly used types
pub use error::{Error, Result};
pub use io::{Model, ModelMetadata, SharedModel};
pub use train::{CheckpointConfig, CheckpointOutcome, Metrics, ModelCheckpoint};
