//! Epoch-end model checkpointing
//!
//! [`ModelCheckpoint`] is driven once per epoch. Every `cadence` epochs it
//! makes a save attempt: with [`SavePolicy::Always`] the attempt writes, with
//! [`SavePolicy::BestOnly`] it writes only when the monitored metric improved
//! on the best value seen so far.
//!
//! # Example
//!
//! ```no_run
//! use guardar::io::{Model, ModelMetadata};
//! use guardar::train::{Metrics, ModelCheckpoint};
//! use ndarray::array;
//!
//! let model = Model::new(
//!     ModelMetadata::new("mlp", "linear"),
//!     vec![("weight".to_string(), array![0.1, 0.2])],
//! )
//! .into_shared();
//!
//! let mut checkpoint = ModelCheckpoint::builder("checkpoints/model_{epoch:03d}_{val_loss:.4f}.json")
//!     .monitor("val_loss")
//!     .save_best_only()
//!     .verbose(true)
//!     .build()
//!     .unwrap();
//! checkpoint.set_model(model.clone());
//!
//! for epoch in 0..10 {
//!     // ... train, then report metrics
//!     let metrics: Metrics = [("val_loss".to_string(), 1.0 / (epoch as f64 + 1.0))].into();
//!     checkpoint.on_epoch_end(epoch, &metrics).unwrap();
//! }
//! ```

use super::callback::{CallbackAction, CallbackContext, Metrics, TrainerCallback};
use super::config::CheckpointConfig;
use super::monitor::{Direction, Mode, PersistScope, SavePolicy};
use super::template::PathTemplate;
use crate::io::{CheckpointWriter, FormatWriter, ModelFormat, Payload, SaveConfig, SharedModel};
use crate::{Error, Result};
use std::fmt;
use std::path::{Path, PathBuf};

/// Default monitored metric
pub const DEFAULT_MONITOR: &str = "val_loss";

/// What happened on an epoch-end event
///
/// `Display` renders the line printed in verbose mode; epochs are one-based.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckpointOutcome {
    /// Cadence not reached, nothing evaluated
    Deferred,
    /// Written unconditionally
    Saved { epoch: usize, path: PathBuf },
    /// Monitored metric improved and the checkpoint was written
    Improved {
        epoch: usize,
        metric: String,
        previous: f64,
        current: f64,
        path: PathBuf,
    },
    /// Monitored metric did not improve, nothing written
    NotImproved {
        epoch: usize,
        metric: String,
        best: f64,
        current: f64,
    },
    /// Monitored metric missing from the epoch's metrics, nothing written
    MetricUnavailable { epoch: usize, metric: String },
}

impl CheckpointOutcome {
    /// Destination path if this outcome writes a checkpoint
    pub fn path(&self) -> Option<&Path> {
        match self {
            CheckpointOutcome::Saved { path, .. } | CheckpointOutcome::Improved { path, .. } => {
                Some(path)
            }
            _ => None,
        }
    }

    /// Whether a checkpoint was written
    pub fn is_saved(&self) -> bool {
        self.path().is_some()
    }
}

impl fmt::Display for CheckpointOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckpointOutcome::Deferred => Ok(()),
            CheckpointOutcome::Saved { epoch, path } => {
                write!(f, "Epoch {epoch:05}: saving model to {}", path.display())
            }
            CheckpointOutcome::Improved {
                epoch,
                metric,
                previous,
                current,
                path,
            } => write!(
                f,
                "Epoch {epoch:05}: {metric} improved from {previous:.5} to {current:.5}, saving model to {}",
                path.display()
            ),
            CheckpointOutcome::NotImproved {
                epoch,
                metric,
                best,
                ..
            } => write!(f, "Epoch {epoch:05}: {metric} did not improve from {best:.5}"),
            CheckpointOutcome::MetricUnavailable { epoch, metric } => write!(
                f,
                "Epoch {epoch:05}: cannot evaluate, metric {metric} unavailable, skipping"
            ),
        }
    }
}

/// Periodic, optionally metric-gated model checkpointing
pub struct ModelCheckpoint {
    template: PathTemplate,
    monitor: Option<String>,
    direction: Direction,
    best: f64,
    save_policy: SavePolicy,
    persist_scope: PersistScope,
    cadence: usize,
    epochs_since_last_attempt: usize,
    verbose: bool,
    model: Option<SharedModel>,
    writer: Box<dyn CheckpointWriter>,
}

impl ModelCheckpoint {
    /// Start building a checkpoint callback for `path_template`
    pub fn builder(path_template: impl Into<String>) -> ModelCheckpointBuilder {
        ModelCheckpointBuilder::new(path_template)
    }

    /// Build from a validated configuration
    pub fn from_config(config: &CheckpointConfig) -> Result<Self> {
        config.validate()?;
        let mut builder = Self::builder(config.path_template.clone())
            .mode(config.mode)
            .save_policy(config.save_policy)
            .persist_scope(config.persist_scope)
            .cadence(config.cadence)
            .verbose(config.verbose)
            .writer(FormatWriter::new(
                SaveConfig::new(config.format).with_pretty(config.pretty),
            ));
        builder = match &config.monitor {
            Some(name) => builder.monitor(name.clone()),
            None => builder.no_monitor(),
        };
        builder.build()
    }

    /// Attach the model to persist; must happen before the first save
    pub fn set_model(&mut self, model: SharedModel) {
        self.model = Some(model);
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    /// Best monitored value seen so far
    pub fn best(&self) -> f64 {
        self.best
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn monitor(&self) -> Option<&str> {
        self.monitor.as_deref()
    }

    pub fn save_policy(&self) -> SavePolicy {
        self.save_policy
    }

    pub fn persist_scope(&self) -> PersistScope {
        self.persist_scope
    }

    pub fn cadence(&self) -> usize {
        self.cadence
    }

    pub fn epochs_since_last_attempt(&self) -> usize {
        self.epochs_since_last_attempt
    }

    pub fn path_template(&self) -> &PathTemplate {
        &self.template
    }

    /// Handle the end of zero-based `epoch` with its metrics
    ///
    /// Bookkeeping (cadence counter, best value) is updated before the path is
    /// resolved and the model written; a failure in either step leaves it
    /// updated and is returned to the caller.
    pub fn on_epoch_end(&mut self, epoch: usize, metrics: &Metrics) -> Result<CheckpointOutcome> {
        self.epochs_since_last_attempt += 1;
        if self.epochs_since_last_attempt < self.cadence {
            tracing::trace!(
                epoch,
                since_last = self.epochs_since_last_attempt,
                cadence = self.cadence,
                "checkpoint deferred"
            );
            return Ok(CheckpointOutcome::Deferred);
        }
        self.epochs_since_last_attempt = 0;

        let epoch = epoch + 1;
        let outcome = match self.save_policy {
            SavePolicy::Always => CheckpointOutcome::Saved {
                epoch,
                path: self.template.resolve(epoch, metrics)?,
            },
            SavePolicy::BestOnly => self.evaluate(epoch, metrics)?,
        };

        self.report(&outcome);
        if let Some(path) = outcome.path() {
            self.persist(path)?;
        }
        Ok(outcome)
    }

    fn evaluate(&mut self, epoch: usize, metrics: &Metrics) -> Result<CheckpointOutcome> {
        let metric = self.monitor.clone().ok_or_else(|| {
            Error::Configuration("best-only saving requires a monitored metric".to_string())
        })?;

        let Some(&current) = metrics.get(&metric) else {
            return Ok(CheckpointOutcome::MetricUnavailable { epoch, metric });
        };

        let previous = self.best;
        if !self.direction.is_improvement(current, previous) {
            return Ok(CheckpointOutcome::NotImproved {
                epoch,
                metric,
                best: previous,
                current,
            });
        }

        self.best = self.direction.extremum(previous, current);
        let path = self.template.resolve(epoch, metrics)?;
        Ok(CheckpointOutcome::Improved {
            epoch,
            metric,
            previous,
            current,
            path,
        })
    }

    fn report(&self, outcome: &CheckpointOutcome) {
        match outcome {
            CheckpointOutcome::Deferred => return,
            CheckpointOutcome::Saved { epoch, path } => {
                tracing::info!(epoch, path = %path.display(), "saving checkpoint");
            }
            CheckpointOutcome::Improved {
                epoch,
                metric,
                previous,
                current,
                path,
            } => {
                tracing::info!(
                    epoch,
                    metric = metric.as_str(),
                    previous,
                    current,
                    path = %path.display(),
                    "monitored metric improved"
                );
            }
            CheckpointOutcome::NotImproved {
                epoch,
                metric,
                best,
                current,
            } => {
                tracing::debug!(
                    epoch,
                    metric = metric.as_str(),
                    best,
                    current,
                    "monitored metric did not improve"
                );
            }
            CheckpointOutcome::MetricUnavailable { epoch, metric } => {
                tracing::warn!(
                    epoch,
                    metric = metric.as_str(),
                    "monitored metric unavailable, skipping checkpoint"
                );
                if self.verbose {
                    eprintln!("{outcome}");
                }
                return;
            }
        }
        if self.verbose {
            println!("{outcome}");
        }
    }

    fn persist(&self, path: &Path) -> Result<()> {
        let model = self.model.as_ref().ok_or_else(|| {
            Error::Configuration(
                "no model attached to checkpoint callback; call set_model before training"
                    .to_string(),
            )
        })?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| Error::persistence(path, e.into()))?;
        }

        let model = model.read().map_err(|_| {
            Error::persistence(path, Error::Serialization("model lock poisoned".to_string()))
        })?;
        let payload = match self.persist_scope {
            PersistScope::FullModel => Payload::FullModel(&*model),
            PersistScope::ParametersOnly => Payload::Parameters(&model.parameters),
        };
        self.writer
            .write(payload, path)
            .map_err(|e| Error::persistence(path, e))
    }
}

impl fmt::Debug for ModelCheckpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelCheckpoint")
            .field("template", &self.template.as_str())
            .field("monitor", &self.monitor)
            .field("direction", &self.direction)
            .field("best", &self.best)
            .field("save_policy", &self.save_policy)
            .field("persist_scope", &self.persist_scope)
            .field("cadence", &self.cadence)
            .field("epochs_since_last_attempt", &self.epochs_since_last_attempt)
            .field("verbose", &self.verbose)
            .field("has_model", &self.model.is_some())
            .finish_non_exhaustive()
    }
}

impl TrainerCallback for ModelCheckpoint {
    fn on_epoch_end(&mut self, ctx: &CallbackContext) -> Result<CallbackAction> {
        ModelCheckpoint::on_epoch_end(self, ctx.epoch, &ctx.metrics)?;
        Ok(CallbackAction::Continue)
    }

    fn name(&self) -> &str {
        "ModelCheckpoint"
    }
}

/// Builder for [`ModelCheckpoint`]
pub struct ModelCheckpointBuilder {
    path_template: String,
    monitor: Option<String>,
    mode: Mode,
    save_policy: SavePolicy,
    persist_scope: PersistScope,
    cadence: usize,
    verbose: bool,
    writer: Option<Box<dyn CheckpointWriter>>,
}

impl ModelCheckpointBuilder {
    fn new(path_template: impl Into<String>) -> Self {
        Self {
            path_template: path_template.into(),
            monitor: Some(DEFAULT_MONITOR.to_string()),
            mode: Mode::Auto,
            save_policy: SavePolicy::Always,
            persist_scope: PersistScope::FullModel,
            cadence: 1,
            verbose: false,
            writer: None,
        }
    }

    /// Metric that gates best-only saving (default `val_loss`)
    pub fn monitor(mut self, name: impl Into<String>) -> Self {
        self.monitor = Some(name.into());
        self
    }

    /// Monitor nothing; only valid with [`SavePolicy::Always`]
    pub fn no_monitor(mut self) -> Self {
        self.monitor = None;
        self
    }

    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn save_policy(mut self, policy: SavePolicy) -> Self {
        self.save_policy = policy;
        self
    }

    /// Shorthand for [`SavePolicy::BestOnly`]
    pub fn save_best_only(self) -> Self {
        self.save_policy(SavePolicy::BestOnly)
    }

    pub fn persist_scope(mut self, scope: PersistScope) -> Self {
        self.persist_scope = scope;
        self
    }

    /// Shorthand for [`PersistScope::ParametersOnly`]
    pub fn save_weights_only(self) -> Self {
        self.persist_scope(PersistScope::ParametersOnly)
    }

    /// Attempt a save every `epochs` epochs
    pub fn cadence(mut self, epochs: usize) -> Self {
        self.cadence = epochs;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Serialize with the default writer in `format`
    pub fn format(self, format: ModelFormat) -> Self {
        self.writer(FormatWriter::new(SaveConfig::new(format)))
    }

    /// Replace the serialization collaborator
    pub fn writer<W: CheckpointWriter + 'static>(mut self, writer: W) -> Self {
        self.writer = Some(Box::new(writer));
        self
    }

    pub fn build(self) -> Result<ModelCheckpoint> {
        let template = PathTemplate::parse(&self.path_template)?;
        if self.cadence == 0 {
            return Err(Error::Configuration(
                "checkpoint cadence must be at least 1 epoch".to_string(),
            ));
        }
        if self.save_policy == SavePolicy::BestOnly && self.monitor.is_none() {
            return Err(Error::Configuration(
                "best-only saving requires a monitored metric".to_string(),
            ));
        }

        let direction = self.mode.resolve(self.monitor.as_deref());
        Ok(ModelCheckpoint {
            template,
            monitor: self.monitor,
            direction,
            best: direction.initial_best(),
            save_policy: self.save_policy,
            persist_scope: self.persist_scope,
            cadence: self.cadence,
            epochs_since_last_attempt: 0,
            verbose: self.verbose,
            model: None,
            writer: self
                .writer
                .unwrap_or_else(|| Box::new(FormatWriter::default())),
        })
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::io::{Model, ModelMetadata};
    use proptest::prelude::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct CountingWriter(Arc<Mutex<usize>>);

    impl CheckpointWriter for CountingWriter {
        fn write(&self, _payload: Payload<'_>, _path: &Path) -> Result<()> {
            *self.0.lock().unwrap() += 1;
            Ok(())
        }
    }

    fn checkpoint(builder: ModelCheckpointBuilder) -> (ModelCheckpoint, CountingWriter) {
        let writer = CountingWriter::default();
        let mut cb = builder.writer(writer.clone()).build().unwrap();
        cb.set_model(Model::new(ModelMetadata::new("p", "p"), vec![]).into_shared());
        (cb, writer)
    }

    proptest! {
        /// Attempts happen exactly on every cadence-th call
        #[test]
        fn attempts_follow_cadence(cadence in 1usize..8, calls in 0usize..64) {
            let (mut cb, writer) = checkpoint(ModelCheckpoint::builder("m.json").cadence(cadence));

            for epoch in 0..calls {
                let outcome = cb.on_epoch_end(epoch, &Metrics::new()).unwrap();
                prop_assert_eq!(outcome.is_saved(), (epoch + 1) % cadence == 0);
                prop_assert!(cb.epochs_since_last_attempt() < cadence);
            }
            prop_assert_eq!(*writer.0.lock().unwrap(), calls / cadence);
        }

        /// The best value is the running extremum of observed values
        #[test]
        fn best_tracks_running_extremum(
            values in proptest::collection::vec(-1e3f64..1e3, 1..40),
            maximize in any::<bool>(),
        ) {
            let mode = if maximize { Mode::Max } else { Mode::Min };
            let (mut cb, writer) = checkpoint(
                ModelCheckpoint::builder("m.json").mode(mode).save_best_only(),
            );
            let direction = cb.direction();

            let mut expected = direction.initial_best();
            let mut saves = 0;
            for (epoch, &v) in values.iter().enumerate() {
                let metrics: Metrics = [("val_loss".to_string(), v)].into_iter().collect();
                let outcome = cb.on_epoch_end(epoch, &metrics).unwrap();
                if direction.is_improvement(v, expected) {
                    saves += 1;
                    prop_assert!(outcome.is_saved());
                }
                expected = direction.extremum(expected, v);
                prop_assert_eq!(cb.best(), expected);
            }
            prop_assert_eq!(*writer.0.lock().unwrap(), saves);
        }
    }
}
