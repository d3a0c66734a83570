//! Example: Checkpointing a Training Loop
//!
//! Simulates a training run whose validation loss improves unevenly and keeps
//! only the checkpoints that beat the best loss so far.
//!
//! Run with `RUST_LOG=guardar=debug cargo run --example training_loop` to see
//! the structured events alongside the console lines.

use guardar::io::{Model, ModelMetadata};
use guardar::train::{CallbackContext, CallbackManager, CheckpointConfig, ModelCheckpoint};
use ndarray::Array1;
use tracing_subscriber::EnvFilter;

const CONFIG: &str = r#"
path_template: "demo_checkpoints/model_{epoch:03d}_{val_loss:.4f}.json"
monitor: val_loss
save_policy: best_only
verbose: true
"#;

fn main() -> guardar::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Checkpointing Example ===\n");

    let model = Model::new(
        ModelMetadata::new("demo-mlp", "linear"),
        vec![
            ("weight".to_string(), Array1::from_elem(4, 0.5)),
            ("bias".to_string(), Array1::zeros(1)),
        ],
    )
    .into_shared();

    let config = CheckpointConfig::from_yaml_str(CONFIG)?;
    let mut checkpoint = ModelCheckpoint::from_config(&config)?;
    checkpoint.set_model(model.clone());

    let mut callbacks = CallbackManager::new();
    callbacks.add(checkpoint);

    let val_losses = [0.92, 0.71, 0.75, 0.60, 0.60, 0.64, 0.48, 0.51];
    for (epoch, &val_loss) in val_losses.iter().enumerate() {
        // Stand-in for an optimizer step
        {
            let mut model = model.write().unwrap();
            if let Some(weight) = model.get_parameter_mut("weight") {
                weight.mapv_inplace(|w| w * 0.9);
            }
        }

        let ctx = CallbackContext::new(epoch)
            .with_max_epochs(val_losses.len())
            .with_metric("loss", val_loss * 0.8)
            .with_metric("val_loss", val_loss);
        callbacks.on_epoch_end(&ctx)?;
    }

    println!("\n=== Training Complete ===");
    Ok(())
}
