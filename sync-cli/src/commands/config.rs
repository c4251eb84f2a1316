//! Show or change saved preferences.

use anyhow::Result;
use std::path::Path;

use crate::config::{Preferences, Units};

/// Changes requested by `poolsync config set`.
#[derive(Debug, Default)]
pub struct Update {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub tls: Option<bool>,
    pub units: Option<Units>,
}

impl Update {
    fn is_empty(&self) -> bool {
        self.host.is_none() && self.port.is_none() && self.tls.is_none() && self.units.is_none()
    }

    fn apply(self, prefs: &mut Preferences) {
        if let Some(host) = self.host {
            prefs.host = host;
        }
        if let Some(port) = self.port {
            prefs.port = port;
        }
        if let Some(tls) = self.tls {
            prefs.use_tls = tls;
        }
        if let Some(units) = self.units {
            prefs.units = units;
        }
    }
}

/// Print the saved preferences.
pub async fn show(data_dir: &Path) -> Result<()> {
    let prefs = Preferences::load(data_dir).await?;
    let config = prefs.client_config(Default::default());

    println!("=== poolsync preferences ===");
    println!();
    println!("  Host:   {}", prefs.host);
    println!("  Port:   {}", prefs.port);
    println!("  TLS:    {}", if prefs.use_tls { "on" } else { "off" });
    println!("  Units:  {}", prefs.units);
    println!();
    println!("  HTTP:   {}", config.base_url());
    println!("  Stream: {}", config.socket_url());
    println!();
    println!("Stored in {}", Preferences::path(data_dir).display());
    Ok(())
}

/// Apply `update` to the saved preferences.
pub async fn set(data_dir: &Path, update: Update) -> Result<()> {
    if update.is_empty() {
        anyhow::bail!("Nothing to change. Pass --host, --port, --tls or --units.");
    }

    let mut prefs = Preferences::load(data_dir).await?;
    update.apply(&mut prefs);
    prefs.save(data_dir).await?;

    println!("Preferences saved.");
    show(data_dir).await
}
