//! Recording transport used by the unit tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::io::AsyncReadExt;

use crate::client::DelugeClient;
use crate::config::DelugeConfig;
use crate::protocol::UPLOAD_ENDPOINT;
use crate::transport::{
    COOKIE_HEADER, HttpRequest, HttpResponse, RequestBody, Transport, TransportError,
    UploadContent,
};

/// One request as seen by the stub.
#[derive(Debug, Clone)]
pub(crate) struct RecordedCall {
    pub(crate) method: String,
    pub(crate) params: Value,
    pub(crate) id: u32,
    pub(crate) cookie: String,
    pub(crate) upload: Option<RecordedUpload>,
}

/// Multipart upload captured by the stub, with its content fully read.
#[derive(Debug, Clone)]
pub(crate) struct RecordedUpload {
    pub(crate) field: String,
    pub(crate) file_name: String,
    pub(crate) bytes: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct CallLog {
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl CallLog {
    pub(crate) fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("call log poisoned").clone()
    }

    /// JSON-RPC calls only, uploads excluded.
    pub(crate) fn rpc_calls(&self) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.upload.is_none())
            .collect()
    }

    pub(crate) fn methods(&self) -> Vec<String> {
        self.calls().into_iter().map(|call| call.method).collect()
    }

    fn push(&self, call: RecordedCall) {
        self.calls.lock().expect("call log poisoned").push(call);
    }
}

type Handler = Arc<dyn Fn(&RecordedCall) -> HttpResponse + Send + Sync>;

/// Transport that records every request and answers through a handler.
pub(crate) struct StubTransport {
    handler: Handler,
    log: CallLog,
}

impl StubTransport {
    pub(crate) fn json(status: u16, body: Value) -> HttpResponse {
        HttpResponse {
            status,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body,
        }
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        // Suspend once per request so joined callers interleave like real I/O.
        tokio::task::yield_now().await;

        let cookie = request
            .headers
            .iter()
            .find(|(name, _)| name == COOKIE_HEADER)
            .map(|(_, value)| value.clone())
            .expect("cookie header is always sent");

        let call = match request.body {
            RequestBody::Json(envelope) => RecordedCall {
                method: envelope["method"]
                    .as_str()
                    .expect("method name")
                    .to_string(),
                params: envelope["params"].clone(),
                id: envelope["id"]
                    .as_u64()
                    .and_then(|id| u32::try_from(id).ok())
                    .expect("numeric id"),
                cookie,
                upload: None,
            },
            RequestBody::Multipart(file) => {
                let bytes = match file.content {
                    UploadContent::Bytes(bytes) => bytes,
                    UploadContent::Stream(mut reader) => {
                        let mut buffer = Vec::new();
                        reader
                            .read_to_end(&mut buffer)
                            .await
                            .map_err(|source| TransportError::Other {
                                source: Box::new(source),
                            })?;
                        buffer
                    }
                };
                RecordedCall {
                    method: UPLOAD_ENDPOINT.to_string(),
                    params: Value::Null,
                    id: 0,
                    cookie,
                    upload: Some(RecordedUpload {
                        field: file.field,
                        file_name: file.file_name,
                        bytes,
                    }),
                }
            }
        };

        let response = (self.handler)(&call);
        self.log.push(call);
        Ok(response)
    }
}

impl HttpResponse {
    pub(crate) fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}

pub(crate) fn rpc_ok(result: Value) -> HttpResponse {
    StubTransport::json(200, json!({"result": result, "error": null, "id": 0}))
}

pub(crate) fn rpc_error(error: Value) -> HttpResponse {
    StubTransport::json(200, json!({"result": null, "error": error, "id": 0}))
}

/// Client wired to a recording stub, authenticating with the password `secret`.
pub(crate) fn stub_client<F>(handler: F) -> (DelugeClient<StubTransport>, CallLog)
where
    F: Fn(&RecordedCall) -> HttpResponse + Send + Sync + 'static,
{
    let log = CallLog::default();
    let transport = StubTransport {
        handler: Arc::new(handler),
        log: log.clone(),
    };
    let config =
        DelugeConfig::new("http://deluge.test:8112", "secret").expect("valid stub config");
    let client = DelugeClient::with_transport(config, transport).expect("stub client");
    (client, log)
}
