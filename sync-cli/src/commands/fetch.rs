//! Fetch and print the controller's full state.

use anyhow::{Context, Result};
use serde_json::Value;
use sync_types::Snapshot;

use super::Client;
use crate::config::Units;

/// Run the fetch command.
pub async fn run(client: &Client, units: Units, raw: bool) -> Result<()> {
    let snapshot = client
        .refetch()
        .await
        .context("Failed to fetch controller state")?;

    if raw {
        println!("{}", serde_json::to_string_pretty(snapshot.document())?);
    } else {
        for line in summarize(&snapshot, units) {
            println!("{line}");
        }
    }
    Ok(())
}

/// Human-readable overview of a snapshot.
pub fn summarize(snapshot: &Snapshot, units: Units) -> Vec<String> {
    let document = snapshot.document();
    let mut lines = Vec::new();

    if !snapshot.is_complete() {
        lines.push("(partial state: some collections are missing)".to_string());
    }

    for (label, key) in [("Circuits", "circuits"), ("Features", "features")] {
        if let Some(items) = document.get(key).and_then(Value::as_array) {
            let on = items
                .iter()
                .filter(|item| item.get("isOn").and_then(Value::as_bool) == Some(true))
                .count();
            lines.push(format!("{label}: {} ({on} on)", items.len()));
            lines.extend(items.iter().map(describe_switch));
        }
    }

    if let Some(pumps) = document.get("pumps").and_then(Value::as_array) {
        lines.push(format!("Pumps: {}", pumps.len()));
        lines.extend(pumps.iter().map(describe_pump));
    }

    if let Some(temps) = document.get("temps").and_then(Value::as_object) {
        lines.push("Temperatures:".to_string());
        for (name, value) in temps {
            if let Some(degrees) = value.as_f64() {
                lines.push(format!("  {name}: {degrees}{units}"));
            }
        }
    }

    lines
}

fn label(item: &Value) -> String {
    let id = item.get("id").map_or_else(|| "?".to_string(), Value::to_string);
    match item.get("name").and_then(Value::as_str) {
        Some(name) => format!("#{id} {name}"),
        None => format!("#{id}"),
    }
}

fn describe_switch(item: &Value) -> String {
    let state = match item.get("isOn").and_then(Value::as_bool) {
        Some(true) => "on",
        Some(false) => "off",
        None => "unknown",
    };
    format!("  {}: {state}", label(item))
}

fn describe_pump(item: &Value) -> String {
    match item.get("rpm").and_then(Value::as_u64) {
        Some(rpm) => format!("  {}: {rpm} rpm", label(item)),
        None => format!("  {}", label(item)),
    }
}
