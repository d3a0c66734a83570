//! Model I/O - the serialization side of checkpointing
//!
//! The checkpoint policy decides *when* and *where* to save; this module
//! turns a [`Model`] (or just its parameters) into bytes on disk and back.

mod format;
mod load;
mod model;
mod save;
mod writer;


pub use format::{ModelFormat, SaveConfig};
pub use load::{load_model, load_parameters};
pub use model::{Model, ModelMetadata, ModelState, NamedParameters, ParameterInfo, SharedModel};
pub use save::{save_model, save_parameters};
pub use writer::{CheckpointWriter, FormatWriter, Payload};
