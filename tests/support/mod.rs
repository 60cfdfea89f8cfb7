#![allow(dead_code)]

use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// Answers the n-th connection with the n-th `(status, body)` pair and records
/// each request line.
pub struct ScriptedServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
    handle: JoinHandle<()>,
}

impl ScriptedServer {
    pub async fn new(script: Vec<(u16, Value)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let base_url = format!("http://{}", listener.local_addr().expect("addr"));
        let requests = Arc::new(Mutex::new(Vec::new()));

        let handle = tokio::spawn({
            let requests = Arc::clone(&requests);
            async move {
                let mut script = script.into_iter();
                while let Ok((socket, _)) = listener.accept().await {
                    let (status, body) = script
                        .next()
                        .unwrap_or((500, json!({"error": {"message": "unexpected request"}})));
                    serve_one(socket, &requests, status, body.to_string()).await;
                }
            }
        });

        Self {
            base_url,
            requests,
            handle,
        }
    }

    /// `"<METHOD> <path>"` for every request served, query strings stripped.
    pub fn request_lines(&self) -> Vec<String> {
        lock_unpoisoned(&self.requests).clone()
    }
}

impl Drop for ScriptedServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub fn run_json(status: &str) -> Value {
    json!({
        "id": "run_1",
        "object": "thread.run",
        "thread_id": "thread_1",
        "assistant_id": "asst_e2e",
        "status": status,
        "created_at": 1_700_000_000,
        "last_error": null,
        "usage": null
    })
}

pub fn messages_json(reply: &str) -> Value {
    json!({
        "object": "list",
        "data": [
            {
                "id": "msg_reply",
                "role": "assistant",
                "thread_id": "thread_1",
                "created_at": 1_700_000_001,
                "content": [{"type": "text", "text": {"value": reply, "annotations": []}}]
            },
            {
                "id": "msg_user",
                "role": "user",
                "thread_id": "thread_1",
                "created_at": 1_700_000_000,
                "content": [{"type": "text", "text": {"value": "Hello", "annotations": []}}]
            }
        ]
    })
}

async fn serve_one(mut socket: TcpStream, requests: &Mutex<Vec<String>>, status: u16, body: String) {
    let mut raw = Vec::new();
    let mut buffer = [0_u8; 4096];
    let header_end = loop {
        match socket.read(&mut buffer).await {
            Ok(0) | Err(_) => return,
            Ok(n) => raw.extend_from_slice(&buffer[..n]),
        }
        if let Some(position) = raw.windows(4).position(|window| window == b"\r\n\r\n") {
            break position + 4;
        }
    };

    let head = String::from_utf8_lossy(&raw[..header_end]).into_owned();
    let mut request_line = head.lines().next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default();
    let path = request_line
        .next()
        .unwrap_or_default()
        .split('?')
        .next()
        .unwrap_or_default();
    lock_unpoisoned(requests).push(format!("{method} {path}"));

    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);
    let mut received = raw.len() - header_end;
    while received < content_length {
        match socket.read(&mut buffer).await {
            Ok(0) | Err(_) => break,
            Ok(n) => received += n,
        }
    }

    let response = format!(
        "HTTP/1.1 {status} Scripted\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

pub fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
