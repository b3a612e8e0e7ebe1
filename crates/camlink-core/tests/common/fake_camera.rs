//! Minimal HTTP/1.1 camera for integration tests.
//!
//! Serves the vendor control API: info, status, a shutter endpoint that
//! appends a new artifact to the listing, artifact download, and delete.
//! Stateful, so a capture-then-sync flow can be exercised end to end.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;

#[derive(Clone)]
pub struct Artifact {
    pub name: String,
    pub bytes: Vec<u8>,
}

#[derive(Clone)]
pub struct FakeCamera {
    /// "host:port" of the listening socket.
    pub address: String,
    files: Arc<Mutex<Vec<Artifact>>>,
    shot_counter: Arc<Mutex<u32>>,
}

impl FakeCamera {
    pub fn file_names(&self) -> Vec<String> {
        self.files
            .lock()
            .unwrap()
            .iter()
            .map(|a| a.name.clone())
            .collect()
    }

    pub fn seed_file(&self, name: &str, bytes: &[u8]) {
        self.files.lock().unwrap().push(Artifact {
            name: name.to_string(),
            bytes: bytes.to_vec(),
        });
    }
}

/// Starts a camera in a background thread. One thread per connection;
/// runs until the process exits.
pub fn start() -> FakeCamera {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let files: Arc<Mutex<Vec<Artifact>>> = Arc::new(Mutex::new(Vec::new()));
    let shot_counter = Arc::new(Mutex::new(0u32));

    let camera = FakeCamera {
        address: format!("127.0.0.1:{}", port),
        files: Arc::clone(&files),
        shot_counter: Arc::clone(&shot_counter),
    };

    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let files = Arc::clone(&files);
            let shot_counter = Arc::clone(&shot_counter);
            thread::spawn(move || handle(stream, &files, &shot_counter));
        }
    });

    camera
}

fn handle(
    mut stream: std::net::TcpStream,
    files: &Mutex<Vec<Artifact>>,
    shot_counter: &Mutex<u32>,
) {
    let _ = stream.set_read_timeout(Some(std::time::Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(std::time::Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s,
        Err(_) => return,
    };
    let mut parts = request.split_whitespace();
    let method = parts.next().unwrap_or("").to_string();
    let path = parts.next().unwrap_or("").to_string();

    match (method.as_str(), path.as_str()) {
        ("GET", "/api/v1/info") => write_json(
            stream,
            200,
            r#"{"name":"FAKE-CAM","serial":"FC-0001","firmware":"1.2.0","battery":87}"#,
        ),
        ("GET", "/api/v1/status") => {
            write_json(stream, 200, r#"{"battery":87,"storage_free_mb":4096}"#)
        }
        ("POST", "/api/v1/shutter") => {
            let shot = {
                let mut counter = shot_counter.lock().unwrap();
                *counter += 1;
                *counter
            };
            let name = format!("IMG_{:04}.jpg", shot);
            files.lock().unwrap().push(Artifact {
                bytes: format!("image data {}", shot).into_bytes(),
                name,
            });
            write_json(stream, 200, r#"{"ok":true}"#)
        }
        ("GET", "/api/v1/files") => {
            let items: Vec<String> = files
                .lock()
                .unwrap()
                .iter()
                .map(|a| {
                    format!(
                        r#"{{"name":"{}","url":"/files/{}","size":{}}}"#,
                        a.name,
                        a.name,
                        a.bytes.len()
                    )
                })
                .collect();
            write_json(stream, 200, &format!(r#"{{"url":[{}]}}"#, items.join(",")))
        }
        ("GET", p) if p.starts_with("/files/") => {
            let name = &p["/files/".len()..];
            let body = files
                .lock()
                .unwrap()
                .iter()
                .find(|a| a.name == name)
                .map(|a| a.bytes.clone());
            match body {
                Some(bytes) => write_bytes(stream, 200, &bytes),
                None => write_json(stream, 404, "{}"),
            }
        }
        ("DELETE", p) if p.starts_with("/files/") => {
            let name = p["/files/".len()..].to_string();
            let mut files = files.lock().unwrap();
            let before = files.len();
            files.retain(|a| a.name != name);
            let status = if files.len() < before { 200 } else { 404 };
            drop(files);
            write_json(stream, status, "{}")
        }
        _ => write_json(stream, 404, "{}"),
    }
}

fn write_json(stream: std::net::TcpStream, status: u16, body: &str) {
    write_bytes(stream, status, body.as_bytes())
}

fn write_bytes(mut stream: std::net::TcpStream, status: u16, body: &[u8]) {
    let reason = match status {
        200 => "OK",
        404 => "Not Found",
        _ => "Status",
    };
    let head = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status,
        reason,
        body.len()
    );
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(body);
}
