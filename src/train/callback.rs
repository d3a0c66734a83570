//! Callback system for training events
//!
//! The training loop owns the model and the metrics; callbacks hook into it:
//! - `on_train_begin` / `on_train_end`
//! - `on_epoch_begin` / `on_epoch_end`
//!
//! # Example
//!
//! ```rust
//! use guardar::train::{CallbackAction, CallbackContext, TrainerCallback};
//!
//! struct PrintCallback;
//!
//! impl TrainerCallback for PrintCallback {
//!     fn on_epoch_end(&mut self, ctx: &CallbackContext) -> guardar::Result<CallbackAction> {
//!         println!("Epoch {} finished with {:?}", ctx.epoch + 1, ctx.metrics);
//!         Ok(CallbackAction::Continue)
//!     }
//! }
//! ```

use crate::Result;
use std::collections::BTreeMap;

/// Scalar metrics reported at the end of an epoch, keyed by name
pub type Metrics = BTreeMap<String, f64>;

/// Context passed to callbacks with current training state
#[derive(Clone, Debug, Default)]
pub struct CallbackContext {
    /// Current epoch (0-indexed)
    pub epoch: usize,
    /// Total epochs planned
    pub max_epochs: usize,
    /// Metrics for the epoch (empty before the epoch finishes)
    pub metrics: Metrics,
}

impl CallbackContext {
    pub fn new(epoch: usize) -> Self {
        Self {
            epoch,
            ..Default::default()
        }
    }

    pub fn with_max_epochs(mut self, max_epochs: usize) -> Self {
        self.max_epochs = max_epochs;
        self
    }

    pub fn with_metric(mut self, name: impl Into<String>, value: f64) -> Self {
        self.metrics.insert(name.into(), value);
        self
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = metrics;
        self
    }
}

/// Action to take after a callback
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallbackAction {
    /// Continue training normally
    Continue,
    /// Stop training
    Stop,
}

/// Trait for training callbacks
///
/// All methods have default no-op implementations. `on_epoch_end` returns a
/// `Result` so that failures (a checkpoint that could not be written) reach
/// the training loop, which decides whether to abort the run.
pub trait TrainerCallback: Send {
    /// Called before training starts
    fn on_train_begin(&mut self, _ctx: &CallbackContext) -> CallbackAction {
        CallbackAction::Continue
    }

    /// Called after training ends
    fn on_train_end(&mut self, _ctx: &CallbackContext) {}

    /// Called before each epoch
    fn on_epoch_begin(&mut self, _ctx: &CallbackContext) -> CallbackAction {
        CallbackAction::Continue
    }

    /// Called after each epoch with that epoch's metrics
    fn on_epoch_end(&mut self, _ctx: &CallbackContext) -> Result<CallbackAction> {
        Ok(CallbackAction::Continue)
    }

    /// Get callback name for logging
    fn name(&self) -> &str {
        "TrainerCallback"
    }
}

/// Manages multiple callbacks and dispatches events in registration order
#[derive(Default)]
pub struct CallbackManager {
    callbacks: Vec<Box<dyn TrainerCallback>>,
}

impl CallbackManager {
    /// Create new callback manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a callback
    pub fn add<C: TrainerCallback + 'static>(&mut self, callback: C) {
        self.callbacks.push(Box::new(callback));
    }

    /// Check if no callbacks are registered
    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    /// Get number of callbacks
    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    /// Names of registered callbacks, in dispatch order
    pub fn names(&self) -> Vec<&str> {
        self.callbacks.iter().map(|cb| cb.name()).collect()
    }

    /// Fire train begin event
    pub fn on_train_begin(&mut self, ctx: &CallbackContext) -> CallbackAction {
        for cb in &mut self.callbacks {
            if cb.on_train_begin(ctx) == CallbackAction::Stop {
                return CallbackAction::Stop;
            }
        }
        CallbackAction::Continue
    }

    /// Fire train end event
    pub fn on_train_end(&mut self, ctx: &CallbackContext) {
        for cb in &mut self.callbacks {
            cb.on_train_end(ctx);
        }
    }

    /// Fire epoch begin event
    pub fn on_epoch_begin(&mut self, ctx: &CallbackContext) -> CallbackAction {
        for cb in &mut self.callbacks {
            if cb.on_epoch_begin(ctx) == CallbackAction::Stop {
                return CallbackAction::Stop;
            }
        }
        CallbackAction::Continue
    }

    /// Fire epoch end event
    ///
    /// The first error aborts dispatch; later callbacks do not see the event.
    pub fn on_epoch_end(&mut self, ctx: &CallbackContext) -> Result<CallbackAction> {
        for cb in &mut self.callbacks {
            match cb.on_epoch_end(ctx) {
                Ok(CallbackAction::Stop) => return Ok(CallbackAction::Stop),
                Ok(CallbackAction::Continue) => {}
                Err(err) => {
                    tracing::error!(
                        callback = cb.name(),
                        epoch = ctx.epoch,
                        error = %err,
                        "epoch-end callback failed"
                    );
                    return Err(err);
                }
            }
        }
        Ok(CallbackAction::Continue)
    }
}
