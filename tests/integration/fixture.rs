//! Local HTTP fixture serving canned release responses.
//!
//! A tiny blocking HTTP/1.1 server over `std::net::TcpListener`, good
//! enough for `reqwest` with `Connection: close` semantics. Tests
//! register exact paths with status/body pairs; anything else gets a 404.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

pub struct FixtureServer {
    base_url: String,
}

impl FixtureServer {
    /// Start a server on an ephemeral localhost port.
    ///
    /// The accept loop runs on a detached thread for the lifetime of the
    /// test process; each connection is answered once and closed.
    pub fn start(routes: HashMap<String, (u16, Vec<u8>)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind fixture listener");
        let addr = listener.local_addr().expect("fixture local addr");
        let routes = Arc::new(routes);

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                let routes = Arc::clone(&routes);
                thread::spawn(move || handle_connection(stream, &routes));
            }
        });

        Self { base_url: format!("http://{addr}") }
    }

    pub fn url(&self) -> &str {
        &self.base_url
    }
}

fn handle_connection(mut stream: TcpStream, routes: &HashMap<String, (u16, Vec<u8>)>) {
    let Ok(read_half) = stream.try_clone() else { return };
    let mut reader = BufReader::new(read_half);

    let mut request_line = String::new();
    if reader.read_line(&mut request_line).is_err() {
        return;
    }
    // Drain the request headers; the fixtures only route on the path.
    loop {
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) => break,
            Ok(_) if line == "\r\n" || line == "\n" => break,
            Ok(_) => {}
            Err(_) => return,
        }
    }

    let path = request_line.split_whitespace().nth(1).unwrap_or("/");
    let (status, body) = routes
        .get(path)
        .cloned()
        .unwrap_or((404, b"not found".to_vec()));
    let reason = match status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Status",
    };

    let header = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    );
    let _ = stream.write_all(header.as_bytes());
    let _ = stream.write_all(&body);
    let _ = stream.flush();
}

/// Build a gzip tar archive containing the given entries.
pub fn tar_gz(entries: &[(&str, &[u8])]) -> Vec<u8> {
    use flate2::Compression;
    use flate2::write::GzEncoder;

    let mut builder = tar::Builder::new(Vec::new());
    for (name, data) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_path(name).expect("entry path");
        header.set_size(data.len() as u64);
        header.set_mode(0o755);
        header.set_cksum();
        builder.append(&header, *data).expect("append entry");
    }
    let tar_bytes = builder.into_inner().expect("finish tar");

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&tar_bytes).expect("gzip write");
    encoder.finish().expect("gzip finish")
}

/// Hex SHA-256 of a byte slice, as published in checksums.txt.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// The release-feed JSON body for a given tag.
pub fn release_json(tag: &str) -> Vec<u8> {
    serde_json::json!({
        "tag_name": tag,
        "name": format!("{tag} release"),
        "body": "automated fixture release",
        "prerelease": false,
        "published_at": "2025-06-01T12:00:00Z",
        "html_url": format!("https://github.com/biwakonbu/reviewtask/releases/tag/{tag}"),
    })
    .to_string()
    .into_bytes()
}
