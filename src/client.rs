use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use serde_json::{Value, json};
use tracing::debug;

use crate::ops;

#[derive(Debug, Clone)]
pub enum ClientMode {
    Http {
        endpoint: String,
        token: Option<String>,
        headers: Vec<(String, String)>,
    },
    /// Reads `IntrospectionQuery.json` from a directory instead of the network.
    Fixtures(PathBuf),
}

/// Captures introspection results from a live GraphQL endpoint.
#[derive(Debug, Clone)]
pub struct CaptureClient {
    mode: ClientMode,
}

impl CaptureClient {
    pub fn new(mode: ClientMode) -> Self {
        Self { mode }
    }

    /// Runs the introspection query and returns the raw response body.
    ///
    /// A body carrying GraphQL `errors` is still returned: it is a valid capture, just
    /// one that validation will reject.
    pub fn fetch_capture(&self) -> anyhow::Result<Value> {
        match &self.mode {
            ClientMode::Fixtures(dir) => {
                let path = dir.join(format!("{}.json", ops::INTROSPECTION_OPERATION));
                let s = fs::read_to_string(&path)
                    .with_context(|| format!("reading fixture {}", path.display()))?;
                Ok(serde_json::from_str(&s)?)
            }
            ClientMode::Http {
                endpoint,
                token,
                headers,
            } => {
                let http = reqwest::blocking::Client::new();
                let mut req = http.post(endpoint).json(&json!({
                    "operationName": ops::INTROSPECTION_OPERATION,
                    "query": ops::INTROSPECTION_QUERY,
                    "variables": {}
                }));
                if let Some(t) = token.as_ref() {
                    req = req.bearer_auth(t);
                }
                for (name, value) in headers {
                    req = req.header(name, value);
                }

                debug!(%endpoint, "fetching introspection capture");
                let resp = req.send()?;
                let status = resp.status();
                let body: Value = resp
                    .json()
                    .with_context(|| format!("introspection response ({status}) is not JSON"))?;

                let is_capture = body.get("data").is_some() || body.get("errors").is_some();
                if !status.is_success() && !is_capture {
                    anyhow::bail!("introspection http error {status}");
                }
                Ok(body)
            }
        }
    }
}

/// Parses a `Name: value` header argument.
pub fn parse_header(raw: &str) -> anyhow::Result<(String, String)> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| anyhow::anyhow!("header {raw:?} must look like `Name: value`"))?;
    let name = name.trim();
    if name.is_empty() {
        anyhow::bail!("header {raw:?} has an empty name");
    }
    Ok((name.to_string(), value.trim().to_string()))
}

/// One-line summary of the first GraphQL error in a response body.
pub fn format_graphql_error(body: &Value) -> Option<String> {
    let errors = body.get("errors")?.as_array()?;
    let first = errors.first()?;
    let message = first.get("message").and_then(|m| m.as_str()).unwrap_or("");
    let code = first
        .get("extensions")
        .and_then(|e| e.get("code"))
        .and_then(|c| c.as_str());

    if message.is_empty() && code.is_none() {
        return None;
    }

    let mut out = String::new();
    out.push_str("graphql error");
    if let Some(c) = code {
        out.push_str(&format!(" ({c})"));
    }
    if !message.is_empty() {
        out.push_str(&format!(": {message}"));
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_split_on_first_colon() {
        assert_eq!(
            parse_header("X-Api-Key: a:b").unwrap(),
            ("X-Api-Key".to_string(), "a:b".to_string())
        );
        assert!(parse_header("no-colon").is_err());
        assert!(parse_header(": value").is_err());
    }

    #[test]
    fn graphql_errors_format_with_code() {
        let body = json!({
            "errors": [{ "extensions": { "code": "FORBIDDEN" }, "message": "introspection disabled" }]
        });
        assert_eq!(
            format_graphql_error(&body).as_deref(),
            Some("graphql error (FORBIDDEN): introspection disabled")
        );
        assert_eq!(format_graphql_error(&json!({ "data": {} })), None);
    }

    #[test]
    fn fixtures_mode_reads_the_capture_file() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(
            tmp.path().join("IntrospectionQuery.json"),
            r#"{"errors":[{"message":"nope"}]}"#,
        )
        .unwrap();
        let client = CaptureClient::new(ClientMode::Fixtures(tmp.path().to_path_buf()));
        let body = client.fetch_capture().unwrap();
        assert_eq!(body["errors"][0]["message"], "nope");
    }
}
