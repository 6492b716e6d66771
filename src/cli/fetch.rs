use std::fs;

use anyhow::Context;
use tracing::{debug, warn};

use crate::client::{CaptureClient, ClientMode, format_graphql_error, parse_header};
use crate::config::load_token;

use super::FetchArgs;

/// Captures the endpoint's schema and writes the raw response.
///
/// The capture is written even when it carries errors, but the exit code is then 1.
pub(super) fn run_fetch(args: &FetchArgs) -> anyhow::Result<i32> {
    let mode = match &args.fixtures_dir {
        Some(dir) => ClientMode::Fixtures(dir.clone()),
        None => {
            let endpoint = args
                .endpoint
                .clone()
                .context("missing --endpoint (or GQLCHECK_ENDPOINT)")?;
            let headers = args
                .headers
                .iter()
                .map(|h| parse_header(h))
                .collect::<anyhow::Result<Vec<_>>>()?;
            ClientMode::Http {
                endpoint,
                token: resolve_token(args)?,
                headers,
            }
        }
    };

    let capture = CaptureClient::new(mode).fetch_capture()?;
    let text = serde_json::to_string_pretty(&capture)?;
    match &args.out {
        Some(path) => {
            fs::write(path, format!("{text}\n"))
                .with_context(|| format!("writing capture to {}", path.display()))?;
            debug!(path = %path.display(), "wrote introspection capture");
        }
        None => println!("{text}"),
    }

    if capture.get("errors").is_some() {
        let summary = format_graphql_error(&capture)
            .unwrap_or_else(|| "capture contains errors".to_string());
        warn!("{summary}");
        return Ok(1);
    }
    Ok(0)
}

fn resolve_token(args: &FetchArgs) -> anyhow::Result<Option<String>> {
    if let Some(t) = args.token.as_ref() {
        return Ok(Some(t.trim().to_string()));
    }
    if let Some(path) = args.token_file.as_ref() {
        let token = load_token(path)
            .with_context(|| format!("reading token file {}", path.display()))?;
        return Ok(Some(token));
    }
    if args.prompt_token {
        let token = rpassword::prompt_password("Bearer token: ")?;
        let token = token.trim().to_string();
        if token.is_empty() {
            anyhow::bail!("empty token");
        }
        return Ok(Some(token));
    }
    Ok(None)
}
