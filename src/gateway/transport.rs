use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use crate::error::ClientError;

#[async_trait]
pub trait Transport: Send + Sync {
    /// POST a JSON body to `path` and return the parsed JSON response.
    async fn post(&self, path: &str, body: Value) -> Result<Value, ClientError>;
}

#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, path: &str, body: Value) -> Result<Value, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%url, %status, "nutrition service returned error status");
            return Err(ClientError::Http {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<Value>().await?)
    }
}

#[cfg(test)]
pub(crate) mod scripted {
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::Value;
    use tokio::sync::oneshot;

    use super::Transport;
    use crate::error::ClientError;

    pub(crate) type Reply = Result<Value, ClientError>;

    enum Step {
        Now(Reply),
        Held(oneshot::Receiver<Reply>),
    }

    /// In-memory nutrition service: records every call, answers from a
    /// per-path script (one-shot steps first, then the standing reply).
    #[derive(Default)]
    pub(crate) struct ScriptedTransport {
        calls: Mutex<Vec<(String, Value)>>,
        once: Mutex<HashMap<String, VecDeque<Step>>>,
        standing: Mutex<HashMap<String, Value>>,
    }

    impl ScriptedTransport {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn reply(&self, path: &str, value: Value) {
            self.standing.lock().unwrap().insert(path.to_string(), value);
        }

        pub(crate) fn reply_once(&self, path: &str, reply: Reply) {
            self.push(path, Step::Now(reply));
        }

        /// Next call to `path` stays pending until the returned sender fires.
        pub(crate) fn hold(&self, path: &str) -> oneshot::Sender<Reply> {
            let (tx, rx) = oneshot::channel();
            self.push(path, Step::Held(rx));
            tx
        }

        pub(crate) fn calls_to(&self, path: &str) -> Vec<Value> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|(p, _)| p == path)
                .map(|(_, body)| body.clone())
                .collect()
        }

        pub(crate) fn count(&self, path: &str) -> usize {
            self.calls_to(path).len()
        }

        fn push(&self, path: &str, step: Step) {
            self.once
                .lock()
                .unwrap()
                .entry(path.to_string())
                .or_default()
                .push_back(step);
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn post(&self, path: &str, body: Value) -> Result<Value, ClientError> {
            self.calls.lock().unwrap().push((path.to_string(), body));
            let step = self
                .once
                .lock()
                .unwrap()
                .get_mut(path)
                .and_then(VecDeque::pop_front);
            match step {
                Some(Step::Now(reply)) => reply,
                Some(Step::Held(rx)) => rx
                    .await
                    .unwrap_or_else(|_| Err(ClientError::Network("held reply dropped".into()))),
                None => self.standing.lock().unwrap().get(path).cloned().ok_or(
                    ClientError::Http {
                        status: 404,
                        body: format!("no script for {path}"),
                    },
                ),
            }
        }
    }
}
