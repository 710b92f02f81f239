//! Scripted in-memory [`HttpTransport`] for exercising layers above the backend.

#![allow(clippy::unwrap_used)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use url::Url;

use crate::transport::{HttpResponse, HttpTransport, TransportError};

/// One scripted answer.
#[derive(Debug, Clone)]
pub enum FakeReply {
    Respond {
        status: u16,
        body: Vec<u8>,
        location: Option<String>,
        content_disposition: Option<String>,
    },
    /// Never answers; the caller's deadline has to fire.
    Hang,
    ConnectionReset,
}

impl FakeReply {
    pub fn bytes(status: u16, body: &[u8]) -> Self {
        Self::Respond {
            status,
            body: body.to_vec(),
            location: None,
            content_disposition: None,
        }
    }

    pub fn file(filename: &str, body: &[u8]) -> Self {
        Self::Respond {
            status: 200,
            body: body.to_vec(),
            location: None,
            content_disposition: Some(format!("attachment; filename=\"{filename}\"")),
        }
    }

    pub fn redirect(status: u16, location: &str) -> Self {
        Self::Respond {
            status,
            body: Vec::new(),
            location: Some(location.to_string()),
            content_disposition: None,
        }
    }
}

/// Replies are queued per key. A key is matched against the full URL, then
/// path plus query, then path alone. The last reply of a queue repeats.
#[derive(Debug, Default)]
pub struct FakeTransport {
    replies: Mutex<HashMap<String, VecDeque<FakeReply>>>,
    requested: Mutex<Vec<Url>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, key: &str, reply: FakeReply) {
        self.replies
            .lock()
            .unwrap()
            .entry(key.to_string())
            .or_default()
            .push_back(reply);
    }

    pub fn push_url(&self, url: &str, reply: FakeReply) {
        self.push(url, reply);
    }

    /// Number of requests whose URL matched `key`.
    pub fn calls(&self, key: &str) -> usize {
        self.requested
            .lock()
            .unwrap()
            .iter()
            .filter(|url| candidate_keys(url).iter().any(|k| k == key))
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.requested.lock().unwrap().len()
    }

    fn next_reply(&self, url: &Url) -> Option<FakeReply> {
        let mut replies = self.replies.lock().unwrap();
        for key in candidate_keys(url) {
            if let Some(queue) = replies.get_mut(&key) {
                if queue.len() > 1 {
                    return queue.pop_front();
                }
                return queue.front().cloned();
            }
        }
        None
    }
}

fn candidate_keys(url: &Url) -> Vec<String> {
    let path = url.path().to_string();
    let path_and_query = match url.query() {
        Some(query) => format!("{path}?{query}"),
        None => path.clone(),
    };
    vec![url.as_str().to_string(), path_and_query, path]
}

#[async_trait]
impl HttpTransport for FakeTransport {
    async fn get(&self, url: &Url) -> Result<HttpResponse, TransportError> {
        self.requested.lock().unwrap().push(url.clone());

        match self.next_reply(url) {
            None => Ok(HttpResponse::new(404, url.clone())),
            Some(FakeReply::Hang) => std::future::pending().await,
            Some(FakeReply::ConnectionReset) => Err(TransportError::network(
                url.as_str(),
                "connection reset by peer",
            )),
            Some(FakeReply::Respond {
                status,
                body,
                location,
                content_disposition,
            }) => {
                let mut response = HttpResponse::from_bytes(status, url.clone(), body);
                response.location = location;
                response.content_disposition = content_disposition;
                Ok(response)
            }
        }
    }
}
