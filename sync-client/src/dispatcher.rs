//! Outbound commands.
//!
//! A command is one `PUT` to a controller endpoint. A 200 response counts as
//! success and triggers a refetch so the snapshot shows the command's
//! effect. Anything else is returned to the caller and posted to the
//! coordinator, which records it as the last error. Nothing is retried.

use std::sync::Arc;

use serde_json::{Map, Value};
use sync_core::{toggle_target, FetchSource, SyncFault};
use sync_types::Command;
use tokio::sync::mpsc::UnboundedSender;

use crate::api::StateApi;
use crate::client::ClientError;
use crate::context::SyncContext;
use crate::coordinator::Input;

const CIRCUITS: &str = "/circuits";
const FEATURES: &str = "/features";

/// Sends commands to the controller.
///
/// Cheap to clone; clones share the API client and the client's state.
pub struct CommandDispatcher<A: StateApi> {
    api: Arc<A>,
    context: SyncContext,
    inputs: UnboundedSender<Input>,
}

impl<A: StateApi> Clone for CommandDispatcher<A> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            context: self.context.clone(),
            inputs: self.inputs.clone(),
        }
    }
}

impl<A: StateApi> std::fmt::Debug for CommandDispatcher<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDispatcher").finish_non_exhaustive()
    }
}

impl<A: StateApi> CommandDispatcher<A> {
    pub(crate) fn new(api: Arc<A>, context: SyncContext, inputs: UnboundedSender<Input>) -> Self {
        Self {
            api,
            context,
            inputs,
        }
    }

    /// Send `params` to `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Api`] if the request fails or the controller
    /// answers with anything but 200. The failure is also recorded as the
    /// client's last error.
    pub async fn dispatch(
        &self,
        endpoint: &str,
        params: Map<String, Value>,
    ) -> Result<(), ClientError> {
        self.send(Command::new(endpoint, params)).await
    }

    /// Send a prepared command.
    ///
    /// # Errors
    ///
    /// Same as [`dispatch`](Self::dispatch).
    pub async fn send(&self, command: Command) -> Result<(), ClientError> {
        match self.api.send_command(&command).await {
            Ok(()) => {
                tracing::info!(endpoint = command.endpoint(), "command accepted");
                let refetch = Input::Refetch {
                    source: FetchSource::Command,
                    reply: None,
                };
                if self.inputs.send(refetch).is_err() {
                    tracing::warn!("client stopped; skipping refetch after command");
                }
                Ok(())
            }
            Err(e) => {
                tracing::error!(endpoint = command.endpoint(), "command failed: {}", e);
                let failed = Input::CommandFailed {
                    fault: SyncFault::from(&e),
                };
                if self.inputs.send(failed).is_err() {
                    tracing::warn!("client stopped; command failure not recorded");
                }
                Err(ClientError::Api(e))
            }
        }
    }

    /// Turn a circuit on or off.
    pub async fn set_circuit_state(&self, id: i64, on: bool) -> Result<(), ClientError> {
        self.send(Command::circuit_state(id, on)).await
    }

    /// Turn a feature on or off.
    pub async fn set_feature_state(&self, id: i64, on: bool) -> Result<(), ClientError> {
        self.send(Command::feature_state(id, on)).await
    }

    /// Flip a circuit relative to the current snapshot.
    ///
    /// The target is read from the local snapshot, which may be stale; the
    /// refetch that follows shows the real outcome. Returns the value sent.
    pub async fn toggle_circuit(&self, id: i64) -> Result<bool, ClientError> {
        let on = toggle_target(self.context.snapshot().as_deref(), CIRCUITS, id);
        self.set_circuit_state(id, on).await?;
        Ok(on)
    }

    /// Flip a feature relative to the current snapshot. Returns the value sent.
    pub async fn toggle_feature(&self, id: i64) -> Result<bool, ClientError> {
        let on = toggle_target(self.context.snapshot().as_deref(), FEATURES, id);
        self.set_feature_state(id, on).await?;
        Ok(on)
    }

    /// Set a body's heat setpoint.
    pub async fn set_heat_setpoint(&self, body_id: i64, setpoint: f64) -> Result<(), ClientError> {
        self.send(Command::heat_setpoint(body_id, setpoint)).await
    }

    /// Set a body's heat mode.
    pub async fn set_heat_mode(&self, body_id: i64, mode: i64) -> Result<(), ClientError> {
        self.send(Command::heat_mode(body_id, mode)).await
    }

    /// Set a pump's speed.
    pub async fn set_pump_speed(&self, pump_id: i64, rpm: u32) -> Result<(), ClientError> {
        self.send(Command::pump_speed(pump_id, rpm)).await
    }
}
