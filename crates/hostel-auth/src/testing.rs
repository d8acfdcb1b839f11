//! Scripted transport used by unit tests.

use crate::transport::{ApiResponse, HttpTransport, OutgoingRequest};
use crate::AuthResult;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

type Handler = Box<dyn Fn(&OutgoingRequest) -> AuthResult<ApiResponse> + Send + Sync>;

/// Answers requests from a closure and records every request it sees.
///
/// Requests to a held path wait until the returned `Notify` fires.
pub(crate) struct ScriptedTransport {
    handler: Handler,
    requests: Mutex<Vec<OutgoingRequest>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
}

impl ScriptedTransport {
    pub fn new<F>(handler: F) -> Arc<Self>
    where
        F: Fn(&OutgoingRequest) -> AuthResult<ApiResponse> + Send + Sync + 'static,
    {
        Arc::new(Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
            gates: Mutex::new(HashMap::new()),
        })
    }

    pub fn hold(&self, path: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates
            .lock()
            .unwrap()
            .insert(path.to_string(), gate.clone());
        gate
    }

    pub fn requests(&self) -> Vec<OutgoingRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|request| request.path == path)
            .count()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn execute(&self, request: OutgoingRequest) -> AuthResult<ApiResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let gate = self.gates.lock().unwrap().get(&request.path).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        (self.handler)(&request)
    }
}
