use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread::{self, JoinHandle};

use assert_cmd::Command;
use gqlcheck::client::{CaptureClient, ClientMode};
use predicates::prelude::*;

const AUTHOR_CAPTURE: &str = include_str!("fixtures/author_capture.json");

/// Answers one request with `status`/`body` and hands back the raw request text.
fn serve_one(status: u16, body: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();

        let mut buf = Vec::new();
        let mut header_end = None;
        while header_end.is_none() {
            let mut tmp = [0u8; 1024];
            let n = stream.read(&mut tmp).unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&tmp[..n]);
            if let Some(i) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                header_end = Some(i + 4);
            }
        }

        let header_end = header_end.expect("did not receive full headers");
        let headers = String::from_utf8_lossy(&buf[..header_end]).to_string();
        let lower = headers.to_lowercase();

        let content_length = lower
            .lines()
            .find_map(|l| l.strip_prefix("content-length: "))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);

        let mut body_buf = buf[header_end..].to_vec();
        while body_buf.len() < content_length {
            let mut tmp = vec![0u8; content_length - body_buf.len()];
            let n = stream.read(&mut tmp).unwrap();
            if n == 0 {
                break;
            }
            body_buf.extend_from_slice(&tmp[..n]);
        }
        let req_body = String::from_utf8_lossy(&body_buf[..content_length]).to_string();

        let resp = format!(
            "HTTP/1.1 {status} OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
            body.len(),
            body
        );
        stream.write_all(resp.as_bytes()).unwrap();

        format!("{lower}{req_body}")
    });

    (format!("http://{addr}/graphql"), handle)
}

#[test]
fn http_mode_posts_the_introspection_query_with_auth() {
    let (endpoint, server) = serve_one(200, AUTHOR_CAPTURE);
    let client = CaptureClient::new(ClientMode::Http {
        endpoint,
        token: Some("abc".to_string()),
        headers: vec![("X-Api-Key".to_string(), "secret".to_string())],
    });

    let capture = client.fetch_capture().unwrap();
    assert_eq!(capture["data"]["__schema"]["queryType"]["name"], "Query");

    let request = server.join().unwrap();
    assert!(request.starts_with("post /graphql"));
    assert!(request.contains("authorization: bearer abc"));
    assert!(request.contains("x-api-key: secret"));
    assert!(request.contains("\"operationName\":\"IntrospectionQuery\""));
    assert!(request.contains("__schema"));
}

#[test]
fn http_mode_keeps_error_captures_even_on_failure_status() {
    let (endpoint, server) = serve_one(
        400,
        r#"{"errors":[{"message":"introspection is disabled"}]}"#,
    );
    let client = CaptureClient::new(ClientMode::Http {
        endpoint,
        token: None,
        headers: Vec::new(),
    });

    let capture = client.fetch_capture().unwrap();
    assert_eq!(capture["errors"][0]["message"], "introspection is disabled");

    let request = server.join().unwrap();
    assert!(!request.contains("authorization:"));
}

#[test]
fn http_mode_rejects_failures_without_a_capture() {
    let (endpoint, server) = serve_one(500, r#"{"message":"upstream down"}"#);
    let client = CaptureClient::new(ClientMode::Http {
        endpoint,
        token: None,
        headers: Vec::new(),
    });

    let err = client.fetch_capture().unwrap_err();
    assert!(err.to_string().contains("500"));
    server.join().unwrap();
}

#[test]
fn fetched_capture_validates_queries() {
    let (endpoint, server) = serve_one(200, AUTHOR_CAPTURE);
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("capture.json");

    Command::new(assert_cmd::cargo::cargo_bin!("gqlcheck"))
        .env_remove("GQLCHECK_TOKEN")
        .env_remove("GQLCHECK_TOKEN_FILE")
        .env_remove("GQLCHECK_FIXTURES_DIR")
        .args(["fetch", "--endpoint", &endpoint, "--token", "t0k"])
        .arg("--out")
        .arg(&out)
        .assert()
        .success();
    assert!(server.join().unwrap().contains("authorization: bearer t0k"));

    Command::new(assert_cmd::cargo::cargo_bin!("gqlcheck"))
        .env_remove("SCHEMA_STRING")
        .env_remove("QUERY_FILE")
        .arg("--schema-file")
        .arg(&out)
        .args(["--query", "{ author(id: 1) { firstName } }"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("SUCCESS"))
        .stdout(predicate::str::contains(r#"{"author":null}"#));
}

#[test]
fn fetch_exits_one_when_the_capture_has_errors() {
    let (endpoint, server) = serve_one(
        200,
        r#"{"errors":[{"message":"no","extensions":{"code":"FORBIDDEN"}}]}"#,
    );

    Command::new(assert_cmd::cargo::cargo_bin!("gqlcheck"))
        .env_remove("GQLCHECK_TOKEN")
        .env_remove("GQLCHECK_TOKEN_FILE")
        .env_remove("GQLCHECK_FIXTURES_DIR")
        .env_remove("GQLCHECK_LOG")
        .args(["fetch", "--endpoint", &endpoint])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("FORBIDDEN"))
        .stderr(predicate::str::contains("graphql error (FORBIDDEN): no"));
    server.join().unwrap();
}
