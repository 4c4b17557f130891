// SPDX-FileCopyrightText: © 2025 logrep Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! End-to-end round trip against a real `logrepd` (C9): the client issues a
//! search, reassembles the NDJSON frame stream regardless of where HTTP
//! chunk boundaries fall, and renders matches with a `--` separator between
//! non-contiguous hits the same way `grep -A/-B` does.

use std::net::SocketAddr;

use logrep_core::{predicate, PredicateTerm, Settings};
use logrep_lib::client::{build_client, build_search_url, run_search, RenderOptions, SearchQuery};
use logrep_lib::color::ColorMode;
use logrepd_lib::config::DaemonConfig;
use logrepd_lib::server;
use tokio::net::TcpListener;

fn write_log(dir: &std::path::Path) -> std::path::PathBuf {
    let path = dir.join("app.log");
    let mut lines = vec!["one".to_string()];
    for n in 2..400 {
        lines.push(if n == 5 || n == 390 { format!("{n} needle") } else { format!("filler line {n}") });
    }
    std::fs::write(&path, lines.join("\n") + "\n").unwrap();
    path
}

fn write_settings(dir: &std::path::Path, log_path: &std::path::Path) -> std::path::PathBuf {
    let path = dir.join("logrep.toml");
    std::fs::write(&path, format!("uuid = \"integration-secret\"\nfile_path = \"{}\"\n", log_path.display())).unwrap();
    path
}

async fn start_test_server(settings_path: &std::path::Path) -> Option<(SocketAddr, tokio::task::JoinHandle<()>)> {
    let listener = match TcpListener::bind("127.0.0.1:0").await {
        Ok(listener) => listener,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => return None,
        Err(e) => panic!("failed to bind test server listener: {e}"),
    };
    let addr = listener.local_addr().unwrap();

    let daemon_config = DaemonConfig {
        address: addr.to_string(),
        settings_path: settings_path.to_string_lossy().into_owned(),
        ..DaemonConfig::default()
    };
    let handle = tokio::spawn(async move {
        server::serve(&daemon_config, listener).await.unwrap();
    });
    tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
    Some((addr, handle))
}

#[tokio::test]
async fn client_reassembles_and_renders_a_real_ndjson_stream() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = write_log(dir.path());
    let settings_path = write_settings(dir.path(), &log_path);

    let Some((addr, _handle)) = start_test_server(&settings_path).await else {
        eprintln!("skipping: local TCP bind not permitted");
        return;
    };

    let http_client = build_client(false, None).unwrap();
    let settings = Settings {
        host: Some(addr.ip().to_string()),
        port: Some(addr.port()),
        uuid: Some("integration-secret".to_string()),
        pattern: Some("needle".to_string()),
        ..Default::default()
    };
    let url = build_search_url(None, &settings).unwrap();
    let query = SearchQuery::from_settings(&settings, None);
    let pattern_term: PredicateTerm = predicate::compile("needle").unwrap();
    let options = RenderOptions { line_number: true, color: ColorMode::Disabled };

    let mut out: Vec<u8> = Vec::new();
    let saw_match = run_search(&http_client, url, &query, &pattern_term, &settings, &options, &mut out).await.unwrap();
    assert!(saw_match);

    let rendered = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = rendered.lines().collect();

    assert_eq!(lines[0], log_path.to_string_lossy(), "first record announces the file path");
    assert_eq!(lines[1], "5:5 needle");
    assert_eq!(lines[2], "--", "non-contiguous matches get a `--` separator");
    assert_eq!(lines[3], "390:390 needle");
    assert_eq!(lines.len(), 4, "unexpected output: {rendered:?}");
}
