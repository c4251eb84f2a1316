//! Send a raw command to a controller endpoint.

use anyhow::{Context, Result};
use serde_json::{Map, Value};

use super::Client;

/// Run the send command.
pub async fn run(client: &Client, endpoint: &str, params: &str) -> Result<()> {
    let params = parse_params(params)?;
    let endpoint = normalize_endpoint(endpoint);

    client
        .dispatch(&endpoint, params)
        .await
        .with_context(|| format!("Command to {endpoint} failed"))?;

    println!("Command accepted by {endpoint}");
    Ok(())
}

/// Parse command parameters; they must form a JSON object.
pub fn parse_params(text: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str(text).context("Parameters are not valid JSON")? {
        Value::Object(map) => Ok(map),
        other => anyhow::bail!("Parameters must be a JSON object, got {other}"),
    }
}

fn normalize_endpoint(endpoint: &str) -> String {
    if endpoint.starts_with('/') {
        endpoint.to_string()
    } else {
        format!("/{endpoint}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_object_params() {
        let params = parse_params(r#"{"id": 5, "state": true}"#).unwrap();
        assert_eq!(params["id"], 5);
        assert_eq!(params["state"], true);
    }

    #[test]
    fn rejects_non_object_params() {
        assert!(parse_params("[1, 2]").is_err());
        assert!(parse_params("not json").is_err());
    }

    #[test]
    fn endpoint_gets_leading_slash() {
        assert_eq!(normalize_endpoint("state/pump/setSpeed"), "/state/pump/setSpeed");
        assert_eq!(normalize_endpoint("/state/pump/setSpeed"), "/state/pump/setSpeed");
    }
}
