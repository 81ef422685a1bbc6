//! Scripted in-memory transport for gateway and retry tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::transport::{Transport, TransportError, TransportRequest, TransportResponse};

/// What the transport does for one call.
#[derive(Debug, Clone)]
pub enum Step {
    Respond(u16, String),
    Refuse,
    /// Waits, then responds.
    Slow(Duration, u16, String),
}

impl Step {
    pub fn ok(body: &serde_json::Value) -> Self {
        Self::Respond(200, body.to_string())
    }

    pub fn status(status: u16) -> Self {
        Self::Respond(status, format!("HTTP {status}"))
    }
}

#[derive(Debug, Clone)]
pub struct Call {
    pub request: TransportRequest,
    pub at: Instant,
}

/// Plays `script` in order, then repeats `fallback` forever. Requests whose
/// URL ends with a routed path always get that path's step instead.
pub struct ScriptedTransport {
    routes: Vec<(String, Step)>,
    script: Mutex<VecDeque<Step>>,
    fallback: Step,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedTransport {
    pub fn always(step: Step) -> Self {
        Self::sequence(Vec::new(), step)
    }

    pub fn routed(routes: Vec<(&str, Step)>, fallback: Step) -> Self {
        Self {
            routes: routes
                .into_iter()
                .map(|(path, step)| (path.to_string(), step))
                .collect(),
            ..Self::always(fallback)
        }
    }

    pub fn sequence(script: Vec<Step>, fallback: Step) -> Self {
        Self {
            routes: Vec::new(),
            script: Mutex::new(script.into()),
            fallback,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, request: &TransportRequest) -> Result<TransportResponse, TransportError> {
        let routed = self
            .routes
            .iter()
            .find(|(path, _)| request.url.ends_with(path.as_str()))
            .map(|(_, step)| step.clone());
        let step = routed.unwrap_or_else(|| {
            let mut script = self.script.lock().unwrap();
            script.pop_front().unwrap_or_else(|| self.fallback.clone())
        });
        self.calls.lock().unwrap().push(Call {
            request: request.clone(),
            at: Instant::now(),
        });

        match step {
            Step::Respond(status, body) => Ok(TransportResponse { status, body }),
            Step::Refuse => Err(TransportError::Connect("connection refused".to_string())),
            Step::Slow(delay, status, body) => {
                tokio::time::sleep(delay).await;
                Ok(TransportResponse { status, body })
            }
        }
    }
}

/// A successful envelope around `items`.
pub fn envelope(items: &serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "resultCode": "00",
        "resultMsg": "NORMAL_CODE",
        "totalCount": items.as_array().map_or(0, Vec::len),
        "items": { "item": items },
    })
}
