// SPDX-FileCopyrightText: © 2025 logrep Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! End-to-end round trip over the real HTTP surface (C7/C8): a matching
//! `GET /<uuid>/search` returns a streamed NDJSON body the same way a real
//! client would see it.

use std::net::SocketAddr;

use logrepd_lib::config::DaemonConfig;
use logrepd_lib::server;
use tokio::net::TcpListener;

fn write_log(dir: &std::path::Path) -> std::path::PathBuf {
    let path = dir.join("app.log");
    std::fs::write(&path, "one\ntwo needle\nthree\nfour needle\nfive\n").unwrap();
    path
}

fn write_settings(dir: &std::path::Path, log_path: &std::path::Path) -> std::path::PathBuf {
    let path = dir.join("logrep.toml");
    std::fs::write(
        &path,
        format!("uuid = \"integration-secret\"\nfile_path = \"{}\"\n", log_path.display()),
    )
    .unwrap();
    path
}

async fn start_test_server(settings_path: &std::path::Path) -> Option<(SocketAddr, tokio::task::JoinHandle<()>)> {
    let listener = match TcpListener::bind("127.0.0.1:0").await {
        Ok(listener) => listener,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => return None,
        Err(e) => panic!("failed to bind test server listener: {e}"),
    };
    let addr = listener.local_addr().unwrap();

    let daemon_config =
        DaemonConfig { address: addr.to_string(), settings_path: settings_path.to_string_lossy().into_owned(), ..DaemonConfig::default() };
    let handle = tokio::spawn(async move {
        server::serve(&daemon_config, listener).await.unwrap();
    });
    tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
    Some((addr, handle))
}

#[tokio::test]
async fn matching_search_streams_ndjson_records() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = write_log(dir.path());
    let settings_path = write_settings(dir.path(), &log_path);

    let Some((addr, _handle)) = start_test_server(&settings_path).await else {
        eprintln!("skipping: local TCP bind not permitted");
        return;
    };

    let client = reqwest::Client::new();
    let body = client
        .get(format!("http://{addr}/integration-secret/search"))
        .query(&[("pattern", "needle")])
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    assert!(body.contains("two needle"));
    assert!(body.contains("four needle"));
    assert!(!body.contains("\"payload\":\"one\""));
}

#[tokio::test]
async fn wrong_secret_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = write_log(dir.path());
    let settings_path = write_settings(dir.path(), &log_path);

    let Some((addr, _handle)) = start_test_server(&settings_path).await else {
        eprintln!("skipping: local TCP bind not permitted");
        return;
    };

    let client = reqwest::Client::new();
    let status = client
        .get(format!("http://{addr}/not-the-secret/search"))
        .query(&[("pattern", "needle")])
        .send()
        .await
        .unwrap()
        .status();

    assert_eq!(status, reqwest::StatusCode::NOT_FOUND);
}
