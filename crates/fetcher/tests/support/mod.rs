//! Loopback HTTP stub for fetcher tests.
#![allow(dead_code)]

use std::io::{Read as _, Write as _};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub struct StubResponse {
    pub status: u16,
    pub body: String,
}

impl StubResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn not_found() -> Self {
        Self {
            status: 404,
            body: "not found".to_string(),
        }
    }
}

/// Serves every connection with `respond(path)` and records requested paths.
pub struct StubServer {
    base: String,
    requests: Arc<Mutex<Vec<String>>>,
    user_agents: Arc<Mutex<Vec<String>>>,
}

impl StubServer {
    pub fn start<F>(respond: F) -> Self
    where
        F: Fn(&str) -> StubResponse + Send + Sync + 'static,
    {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind");
        let addr = listener.local_addr().expect("local_addr");
        let requests = Arc::new(Mutex::new(Vec::new()));
        let user_agents = Arc::new(Mutex::new(Vec::new()));

        let seen = Arc::clone(&requests);
        let agents = Arc::clone(&user_agents);
        std::thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else {
                    continue;
                };
                handle(stream, &respond, &seen, &agents);
            }
        });

        Self {
            base: format!("http://{addr}"),
            requests,
            user_agents,
        }
    }

    /// Endpoint template rooted at `prefix`, e.g. `/primary`
    pub fn template(&self, prefix: &str) -> String {
        format!("{}{prefix}/{{app_id}}.flatpakref", self.base)
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub fn hits(&self) -> usize {
        self.requests.lock().expect("requests lock").len()
    }

    pub fn user_agents(&self) -> Vec<String> {
        self.user_agents.lock().expect("agents lock").clone()
    }
}

fn handle<F>(
    mut stream: TcpStream,
    respond: &F,
    seen: &Mutex<Vec<String>>,
    agents: &Mutex<Vec<String>>,
) where
    F: Fn(&str) -> StubResponse,
{
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));

    let mut buf = Vec::new();
    let mut tmp = [0u8; 4096];
    for _ in 0..64 {
        match stream.read(&mut tmp) {
            Ok(0) => break,
            Ok(n) => {
                buf.extend_from_slice(&tmp[..n]);
                if buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
            Err(_) => break,
        }
    }

    let head = String::from_utf8_lossy(&buf).into_owned();
    let path = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string();
    if let Some(agent) = head.lines().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        name.eq_ignore_ascii_case("user-agent")
            .then(|| value.trim().to_string())
    }) {
        agents.lock().expect("agents lock").push(agent);
    }
    seen.lock().expect("requests lock").push(path.clone());

    let response = respond(&path);
    let reason = if response.status == 200 { "OK" } else { "Error" };
    let raw = format!(
        "HTTP/1.1 {} {reason}\r\n\
Content-Type: text/plain\r\n\
Content-Length: {}\r\n\
Connection: close\r\n\
\r\n\
{}",
        response.status,
        response.body.len(),
        response.body
    );
    let _ = stream.write_all(raw.as_bytes());
    let _ = stream.flush();
}
