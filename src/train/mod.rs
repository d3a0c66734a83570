//! Training-loop hooks
//!
//! This module provides:
//! - The callback seam between a training loop and its hooks
//! - Epoch-end model checkpointing with cadence and best-only gating
//! - Path templates filled from the epoch number and metrics
//! - Declarative checkpoint configuration
//!
//! # Example
//!
//! ```no_run
//! use guardar::train::{CallbackContext, CallbackManager, ModelCheckpoint};
//! # use guardar::io::{Model, ModelMetadata};
//! # let model = Model::new(ModelMetadata::new("m", "linear"), vec![]).into_shared();
//!
//! let mut checkpoint = ModelCheckpoint::builder("ckpt/model_{epoch}.json")
//!     .cadence(5)
//!     .build()?;
//! checkpoint.set_model(model);
//!
//! let mut callbacks = CallbackManager::new();
//! callbacks.add(checkpoint);
//!
//! for epoch in 0..20 {
//!     // ... train one epoch
//!     let ctx = CallbackContext::new(epoch).with_metric("val_loss", 0.5);
//!     callbacks.on_epoch_end(&ctx)?;
//! }
//! # Ok::<(), guardar::Error>(())
//! ```

pub mod callback;
mod checkpoint;
mod config;
mod monitor;
mod template;

pub use callback::{CallbackAction, CallbackContext, CallbackManager, Metrics, TrainerCallback};
pub use checkpoint::{CheckpointOutcome, ModelCheckpoint, ModelCheckpointBuilder, DEFAULT_MONITOR};
pub use config::CheckpointConfig;
pub use monitor::{Direction, Mode, PersistScope, SavePolicy, ACCURACY_TOKEN};
pub use template::{PathTemplate, EPOCH_PLACEHOLDER};
