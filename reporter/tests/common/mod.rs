#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use trackkit_location::mock::MockBackend;
use trackkit_location::{AuthorizationLevel, AuthorizationStatus, LocationManager};
use trackkit_reporter::{
    HttpResponse, Reporter, ReporterConfig, ReportPayload, Transport, TransportError,
};

/// How the stub transport answers one request.
#[derive(Debug, Clone)]
pub enum Reply {
    Respond(u16, &'static str),
    Fail(TransportError),
    Hang,
}

/// One request seen by the stub transport.
#[derive(Debug, Clone)]
pub struct Request {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub timeout: Duration,
    pub payload: ReportPayload,
}

/// Transport answering from a script; repeats the last reply when exhausted.
#[derive(Debug)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Reply>>,
    last: Mutex<Reply>,
    requests: Mutex<Vec<Request>>,
}

impl ScriptedTransport {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().collect()),
            last: Mutex::new(Reply::Respond(200, "")),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// A transport that accepts everything with an empty 200.
    pub fn idle() -> Arc<Self> {
        Self::new(std::iter::empty())
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn post(
        &self,
        url: &Url,
        body: Vec<u8>,
        headers: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(Request {
            url: url.to_string(),
            headers: headers
                .iter()
                .map(|(name, value)| ((*name).to_string(), (*value).to_string()))
                .collect(),
            timeout,
            payload: serde_json::from_slice(&body).unwrap(),
        });

        let reply = {
            let mut replies = self.replies.lock().unwrap();
            let mut last = self.last.lock().unwrap();
            if let Some(reply) = replies.pop_front() {
                last.clone_from(&reply);
            }
            last.clone()
        };

        match reply {
            Reply::Respond(status, body) => Ok(HttpResponse {
                status,
                body: body.as_bytes().to_vec(),
            }),
            Reply::Fail(err) => Err(err),
            Reply::Hang => std::future::pending().await,
        }
    }
}

pub fn config() -> ReporterConfig {
    ReporterConfig {
        endpoint: "http://collector.test/api/device-location".to_string(),
        device_id: "2162127".to_string(),
        interval: Duration::ZERO,
        ..ReporterConfig::default()
    }
}

pub fn reporter_with(
    config: ReporterConfig,
    backend: &Arc<MockBackend>,
    transport: &Arc<ScriptedTransport>,
) -> Reporter {
    let location = LocationManager::new(backend.clone(), AuthorizationLevel::WhenInUse);
    Reporter::new(config, location, transport.clone())
}

pub fn reporter(backend: &Arc<MockBackend>, transport: &Arc<ScriptedTransport>) -> Reporter {
    reporter_with(config(), backend, transport)
}

pub fn authorized_backend() -> Arc<MockBackend> {
    Arc::new(MockBackend::new(AuthorizationStatus::AuthorizedAlways))
}
