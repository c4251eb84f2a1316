//! Typed controller commands.

use anyhow::{Context, Result};

use super::Client;
use crate::config::Units;

/// Which kind of on/off entity to toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Switch {
    /// A circuit (pool, spa, lights, ...).
    Circuit,
    /// A feature.
    Feature,
}

/// Flip a circuit or feature based on the controller's current state.
pub async fn toggle(client: &Client, switch: Switch, id: i64) -> Result<()> {
    // Read-modify-send: take the freshest snapshot we can before flipping.
    if let Err(e) = client.refetch().await {
        tracing::warn!("could not refresh state before toggling: {}", e);
    }

    let dispatcher = client.dispatcher();
    let on = match switch {
        Switch::Circuit => dispatcher.toggle_circuit(id).await,
        Switch::Feature => dispatcher.toggle_feature(id).await,
    }
    .with_context(|| format!("Failed to toggle {switch:?} {id}"))?;

    println!(
        "{switch:?} {id} turned {}",
        if on { "on" } else { "off" }
    );
    Ok(())
}

/// Set a body's heat setpoint.
pub async fn setpoint(client: &Client, body_id: i64, degrees: f64, units: Units) -> Result<()> {
    client
        .dispatcher()
        .set_heat_setpoint(body_id, degrees)
        .await
        .context("Failed to set heat setpoint")?;

    println!("Body {body_id} setpoint set to {degrees}{units}");
    Ok(())
}

/// Set a body's heat mode.
pub async fn heat_mode(client: &Client, body_id: i64, mode: i64) -> Result<()> {
    client
        .dispatcher()
        .set_heat_mode(body_id, mode)
        .await
        .context("Failed to set heat mode")?;

    println!("Body {body_id} heat mode set to {mode}");
    Ok(())
}

/// Set a pump's speed.
pub async fn pump_speed(client: &Client, pump_id: i64, rpm: u32) -> Result<()> {
    client
        .dispatcher()
        .set_pump_speed(pump_id, rpm)
        .await
        .context("Failed to set pump speed")?;

    println!("Pump {pump_id} speed set to {rpm} rpm");
    Ok(())
}
