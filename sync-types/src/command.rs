//! Outbound commands.
//!
//! A command is an opaque `(endpoint, parameters)` pair. The builders below
//! cover the controller endpoints the client knows about; anything else can
//! be sent with [`Command::new`].

use serde_json::{json, Map, Value};

/// Controller HTTP endpoints.
pub mod endpoints {
    /// Full-state fetch.
    pub const STATE_ALL: &str = "/state/all";
    /// Switch a circuit on or off.
    pub const CIRCUIT_SET_STATE: &str = "/state/circuit/setState";
    /// Switch a feature on or off.
    pub const FEATURE_SET_STATE: &str = "/state/feature/setState";
    /// Change a body's heat setpoint.
    pub const BODY_SET_POINT: &str = "/state/body/setPoint";
    /// Change a body's heat mode.
    pub const BODY_HEAT_MODE: &str = "/state/body/heatMode";
    /// Change a pump's speed.
    pub const PUMP_SET_SPEED: &str = "/state/pump/setSpeed";
}

/// A pending outbound command.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    endpoint: String,
    params: Map<String, Value>,
}

impl Command {
    /// Create a command from an endpoint and a parameter map.
    pub fn new(endpoint: impl Into<String>, params: Map<String, Value>) -> Self {
        Self {
            endpoint: endpoint.into(),
            params,
        }
    }

    /// Create a command from an endpoint and a JSON object.
    ///
    /// Non-object values produce an empty parameter map.
    pub fn from_json(endpoint: impl Into<String>, params: Value) -> Self {
        let params = match params {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self::new(endpoint, params)
    }

    /// `{id, state}` to the circuit endpoint.
    pub fn circuit_state(id: i64, on: bool) -> Self {
        Self::from_json(endpoints::CIRCUIT_SET_STATE, json!({"id": id, "state": on}))
    }

    /// `{id, state}` to the feature endpoint.
    pub fn feature_state(id: i64, on: bool) -> Self {
        Self::from_json(endpoints::FEATURE_SET_STATE, json!({"id": id, "state": on}))
    }

    /// `{id, heatSetpoint}` to the body setpoint endpoint.
    pub fn heat_setpoint(body_id: i64, setpoint: f64) -> Self {
        Self::from_json(
            endpoints::BODY_SET_POINT,
            json!({"id": body_id, "heatSetpoint": setpoint}),
        )
    }

    /// `{id, mode}` to the body heat mode endpoint.
    pub fn heat_mode(body_id: i64, mode: i64) -> Self {
        Self::from_json(endpoints::BODY_HEAT_MODE, json!({"id": body_id, "mode": mode}))
    }

    /// `{id, rpm}` to the pump speed endpoint.
    pub fn pump_speed(pump_id: i64, rpm: u32) -> Self {
        Self::from_json(endpoints::PUMP_SET_SPEED, json!({"id": pump_id, "rpm": rpm}))
    }

    /// The endpoint path.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The parameter map.
    pub fn params(&self) -> &Map<String, Value> {
        &self.params
    }

    /// The JSON request body.
    pub fn body(&self) -> Value {
        Value::Object(self.params.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circuit_state_body() {
        let command = Command::circuit_state(5, true);
        assert_eq!(command.endpoint(), "/state/circuit/setState");
        assert_eq!(command.body(), json!({"id": 5, "state": true}));
    }

    #[test]
    fn typed_builders_use_documented_fields() {
        assert_eq!(
            Command::heat_setpoint(1, 84.0).body(),
            json!({"id": 1, "heatSetpoint": 84.0})
        );
        assert_eq!(Command::heat_mode(2, 3).body(), json!({"id": 2, "mode": 3}));
        assert_eq!(Command::pump_speed(1, 2400).body(), json!({"id": 1, "rpm": 2400}));
        assert_eq!(
            Command::feature_state(9, false).endpoint(),
            endpoints::FEATURE_SET_STATE
        );
    }

    #[test]
    fn non_object_params_become_empty() {
        let command = Command::from_json("/state/custom", json!([1, 2]));
        assert!(command.params().is_empty());
    }
}
