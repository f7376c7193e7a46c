//! Minimal HTTP/1.1 server that accepts form POSTs for integration tests.
//!
//! Records every request (path, headers, body). The login path answers with
//! an XML document and sets a session cookie; every other path answers with
//! a one-row JSON save result.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

pub const LOGIN_PATH: &str = "/api/authenticate.sjs";
pub const SESSION_COOKIE: &str = "JSESSIONID=abc123";

#[derive(Debug, Clone, Default)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    /// Lower-cased header name and raw value.
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }
}

pub type Log = Arc<Mutex<Vec<RecordedRequest>>>;

/// Starts a server in a background thread. Returns the base URL
/// (e.g. "http://127.0.0.1:12345") and the request log.
pub fn start() -> (String, Log) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let server_log = Arc::clone(&log);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let log = Arc::clone(&server_log);
            thread::spawn(move || handle(stream, &log));
        }
    });
    (format!("http://127.0.0.1:{}", port), log)
}

fn handle(mut stream: TcpStream, log: &Log) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let request = match read_request(&mut stream) {
        Some(r) => r,
        None => return,
    };

    let (extra_headers, body) = if request.path == LOGIN_PATH {
        (
            format!("Set-Cookie: {SESSION_COOKIE}; Path=/\r\nContent-Type: text/xml\r\n"),
            r#"<?xml version="1.0"?><data organization_KEY="1234"><message>Successful Login</message></data>"#
                .to_string(),
        )
    } else {
        (
            "Content-Type: application/json\r\n".to_string(),
            r#"[{"object":"supporter","key":"98765","result":"success","messages":[]}]"#.to_string(),
        )
    };
    log.lock().unwrap().push(request);

    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n{}\r\n{}",
        body.len(),
        extra_headers,
        body
    );
    let _ = stream.write_all(response.as_bytes());
}

fn read_request(stream: &mut TcpStream) -> Option<RecordedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = stream.read(&mut chunk).ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = std::str::from_utf8(&buf[..header_end]).ok()?;
    let mut lines = head.lines();
    let mut start = lines.next()?.split_whitespace();
    let method = start.next()?.to_string();
    let path = start.next()?.to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|l| l.split_once(':'))
        .map(|(n, v)| (n.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();

    let length = headers
        .iter()
        .find(|(n, _)| n == "content-length")
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);
    while buf.len() < header_end + length {
        let n = stream.read(&mut chunk).ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body_end = (header_end + length).min(buf.len());
    let body = String::from_utf8_lossy(&buf[header_end..body_end]).into_owned();

    Some(RecordedRequest {
        method,
        path,
        headers,
        body,
    })
}
