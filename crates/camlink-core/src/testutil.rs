//! Minimal HTTP/1.1 server for unit tests: scriptable handler, hit log,
//! and a high-water gauge of concurrently served requests.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

pub(crate) struct Request {
    pub method: String,
    pub path: String,
    pub body: Vec<u8>,
}

pub(crate) struct Response {
    pub status: u16,
    pub body: Vec<u8>,
    /// Serve delay, applied while the request counts as in flight.
    pub delay: Duration,
}

impl Response {
    pub(crate) fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            delay: Duration::ZERO,
        }
    }

    pub(crate) fn status(status: u16) -> Self {
        Self {
            status,
            body: Vec::new(),
            delay: Duration::ZERO,
        }
    }

    pub(crate) fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

pub(crate) struct TestServer {
    /// Base URL, e.g. "http://127.0.0.1:12345".
    pub base: String,
    /// "METHOD path" per served request, in arrival order.
    pub hits: Arc<Mutex<Vec<String>>>,
    /// Highest number of requests in flight at once.
    pub max_concurrent: Arc<AtomicUsize>,
}

impl TestServer {
    pub(crate) fn hit_count(&self) -> usize {
        self.hits.lock().unwrap().len()
    }
}

/// Starts a server in a background thread. One thread per connection; each
/// response closes the connection so the client cannot pool around the
/// concurrency gauge. Runs until the process exits.
pub(crate) fn start<F>(handler: F) -> TestServer
where
    F: Fn(&Request) -> Response + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let hits: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let in_flight = Arc::new(AtomicUsize::new(0));
    let max_concurrent = Arc::new(AtomicUsize::new(0));
    let handler = Arc::new(handler);

    let server = TestServer {
        base: format!("http://127.0.0.1:{}", port),
        hits: Arc::clone(&hits),
        max_concurrent: Arc::clone(&max_concurrent),
    };

    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let hits = Arc::clone(&hits);
            let in_flight = Arc::clone(&in_flight);
            let max_concurrent = Arc::clone(&max_concurrent);
            let handler = Arc::clone(&handler);
            thread::spawn(move || {
                let mut stream = stream;
                if let Some(req) = read_request(&mut stream) {
                    hits.lock()
                        .unwrap()
                        .push(format!("{} {}", req.method, req.path));
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    max_concurrent.fetch_max(now, Ordering::SeqCst);
                    let resp = handler(&req);
                    if !resp.delay.is_zero() {
                        thread::sleep(resp.delay);
                    }
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    write_response(stream, &resp);
                }
            });
        }
    });

    server
}

fn read_request(stream: &mut std::net::TcpStream) -> Option<Request> {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];
    // Read until the header terminator, then the Content-Length'd body.
    loop {
        let n = stream.read(&mut chunk).ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(header_end) = find_header_end(&buf) {
            let head = std::str::from_utf8(&buf[..header_end]).ok()?;
            let mut lines = head.lines();
            let request_line = lines.next()?;
            let mut parts = request_line.split_whitespace();
            let method = parts.next()?.to_string();
            let path = parts.next()?.to_string();
            let content_length = lines
                .filter_map(|l| {
                    let (k, v) = l.split_once(':')?;
                    if k.eq_ignore_ascii_case("content-length") {
                        v.trim().parse::<usize>().ok()
                    } else {
                        None
                    }
                })
                .next()
                .unwrap_or(0);
            let body_start = header_end + 4;
            while buf.len() < body_start + content_length {
                let n = stream.read(&mut chunk).ok()?;
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }
            let body = buf.get(body_start..body_start + content_length)?.to_vec();
            return Some(Request { method, path, body });
        }
    }
    None
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

fn write_response(mut stream: std::net::TcpStream, resp: &Response) {
    let reason = match resp.status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Status",
    };
    let head = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        resp.status,
        reason,
        resp.body.len()
    );
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(&resp.body);
}
