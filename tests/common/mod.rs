//! Shared test doubles.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use svclink::{Transport, TransportError, TransportResponse};

/// One scripted outcome for a physical attempt.
#[derive(Debug, Clone)]
pub enum Step {
    Status(u16, &'static str),
    ConnectError,
    Timeout,
}

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: String,
    pub url: String,
    pub headers: HashMap<String, String>,
}

/// Transport that replays a fixed script and records every attempt.
///
/// An exhausted script answers 200 so tests only script the interesting
/// prefix.
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Step>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedTransport {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            script: Mutex::new(steps.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn push(&self, step: Step) {
        self.script.lock().unwrap().push_back(step);
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(
        &self,
        method: &str,
        url: &str,
        headers: &HashMap<String, String>,
        _body: Option<&serde_json::Value>,
        timeout: Duration,
    ) -> Result<TransportResponse, TransportError> {
        self.calls.lock().unwrap().push(RecordedCall {
            method: method.to_string(),
            url: url.to_string(),
            headers: headers.clone(),
        });

        let step = self.script.lock().unwrap().pop_front();
        match step {
            Some(Step::Status(status, body)) => Ok(TransportResponse {
                status,
                body: body.to_string(),
                duration: Duration::from_millis(1),
            }),
            Some(Step::ConnectError) => {
                Err(TransportError::Connect("connection refused".to_string()))
            }
            Some(Step::Timeout) => Err(TransportError::Timeout(timeout)),
            None => Ok(TransportResponse {
                status: 200,
                body: "{}".to_string(),
                duration: Duration::from_millis(1),
            }),
        }
    }
}
