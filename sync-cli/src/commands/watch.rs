//! Follow the controller live until interrupted.

use anyhow::Result;
use std::time::Duration;
use sync_types::ConnectionStatus;

use super::fetch::summarize;
use super::Client;
use crate::config::Units;

/// Run the watch command.
///
/// Connects, prints every status change and snapshot, and disconnects on
/// Ctrl-C or once `duration` has elapsed.
pub async fn run(client: &Client, units: Units, duration: Option<Duration>) -> Result<()> {
    let mut status = client.subscribe_status();
    let mut state = client.subscribe_state();
    let deadline = async {
        match duration {
            Some(d) => tokio::time::sleep(d).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);

    client.connect().await?;
    println!("Watching {} (Ctrl-C to stop)", client.config().base_url());

    let mut last_shown: Option<ConnectionStatus> = None;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = &mut deadline => break,
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let _ = status.borrow_and_update();
                show_status(client, &mut last_shown);
            }
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = state.borrow_and_update().clone();
                if let Some(fault) = current.last_error() {
                    println!("! {fault}");
                } else if let Some(snapshot) = current.snapshot() {
                    println!("--- state ---");
                    for line in summarize(snapshot, units) {
                        println!("{line}");
                    }
                }
                show_status(client, &mut last_shown);
            }
        }
    }

    client.disconnect().await?;
    println!("Disconnected.");
    Ok(())
}

/// Print the effective status when it differs from what was last shown.
fn show_status(client: &Client, last_shown: &mut Option<ConnectionStatus>) {
    let effective = client.effective_status();
    if *last_shown != Some(effective) {
        let note = if effective == ConnectionStatus::Connected && client.status() != effective {
            " (polling)"
        } else {
            ""
        };
        println!("* {effective}{note}");
        *last_shown = Some(effective);
    }
}
