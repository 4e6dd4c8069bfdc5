//! Command/response gateway for the camera's CGI endpoint.
//!
//! Requests are either a literal query (`?mode=camcmd&value=capture`) or an
//! ordered parameter list. Every reply is classified:
//!
//! - non-2xx status: [`CameraError::RequestFailed`]
//! - unparseable reply: [`CameraError::Parse`]
//! - `result` other than `ok`: [`CameraError::LogicalFailure`] with the raw body
//! - otherwise the typed reply

mod transport;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::debug;

use crate::capability::DescriptorNode;
use crate::types::{CameraState, CommandSpec};
use crate::{CameraError, Result};

pub use transport::{HttpTransport, Transport, TransportResponse};

const RESULT_OK: &str = "ok";

/// One control request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Literal query, e.g. `?mode=getstate`
    Query(String),
    /// Ordered key/value parameters
    Params(Vec<(String, String)>),
}

impl Request {
    pub fn query(query: impl Into<String>) -> Self {
        Request::Query(query.into())
    }

    pub fn params<I, K, V>(params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Request::Params(params.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    /// Path and query appended to the endpoint.
    pub fn path(&self) -> String {
        match self {
            Request::Query(query) if query.starts_with('?') => query.clone(),
            Request::Query(query) => format!("?{query}"),
            Request::Params(params) => {
                let joined: Vec<String> = params.iter().map(|(k, v)| format!("{k}={v}")).collect();
                format!("?{}", joined.join("&"))
            }
        }
    }
}

impl From<&str> for Request {
    fn from(query: &str) -> Self {
        Request::query(query)
    }
}

impl From<String> for Request {
    fn from(query: String) -> Self {
        Request::Query(query)
    }
}

impl From<&CommandSpec> for Request {
    fn from(command: &CommandSpec) -> Self {
        Request::Params(command.params())
    }
}

/// A typed reply carrying the `result` field.
pub trait CamReply: DeserializeOwned {
    fn result(&self) -> &str;
}

/// Reply with no payload beyond `result`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BaseReply {
    pub result: String,
}

impl CamReply for BaseReply {
    fn result(&self) -> &str {
        &self.result
    }
}

/// Reply to `?mode=getstate`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StateReply {
    pub result: String,
    #[serde(default)]
    pub state: Option<CameraState>,
}

impl CamReply for StateReply {
    fn result(&self) -> &str {
        &self.result
    }
}

/// Parse and classify a reply body received for `path`.
pub fn classify<R: CamReply>(path: &str, body: &str) -> Result<R> {
    let reply: R = quick_xml::de::from_str(body).map_err(|e| {
        CameraError::parse(format!("reply to {path}"), e.to_string())
    })?;
    if reply.result() != RESULT_OK {
        return Err(CameraError::logical_failure(path, body));
    }
    Ok(reply)
}

/// Issues requests over a [`Transport`] and classifies the replies.
#[derive(Debug)]
pub struct CommandGateway<T> {
    transport: Arc<T>,
}

impl<T> Clone for CommandGateway<T> {
    fn clone(&self) -> Self {
        Self { transport: Arc::clone(&self.transport) }
    }
}

impl<T: Transport> CommandGateway<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Issue a request and return its typed reply.
    pub async fn get<R: CamReply>(&self, request: impl Into<Request>) -> Result<R> {
        let path = request.into().path();
        let body = self.fetch(&path).await?;
        classify(&path, &body)
    }

    /// Issue a request and return the raw body of a 2xx reply.
    pub async fn get_string(&self, request: impl Into<Request>) -> Result<String> {
        let path = request.into().path();
        self.fetch(&path).await
    }

    /// Issue a request whose reply is parsed as a generic tree, e.g. a menu descriptor.
    pub async fn get_descriptor(&self, request: impl Into<Request>) -> Result<DescriptorNode> {
        let path = request.into().path();
        let body = self.fetch(&path).await?;
        let tree = DescriptorNode::parse_xml(&body).map_err(|e| match e {
            CameraError::Parse { details, .. } => CameraError::parse(format!("reply to {path}"), details),
            other => other,
        })?;
        match tree.child("result").map(|result| result.text.as_str()) {
            Some(RESULT_OK) => Ok(tree),
            _ => Err(CameraError::logical_failure(path, body)),
        }
    }

    async fn fetch(&self, path: &str) -> Result<String> {
        let response = self.transport.get(path).await?;
        if !response.is_success() {
            return Err(CameraError::request_failed(path, response.status));
        }
        debug!(path, status = response.status, len = response.body.len(), "Camera replied");
        Ok(response.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MockTransport, fixtures};

    fn gateway(mock: MockTransport) -> CommandGateway<MockTransport> {
        CommandGateway::new(Arc::new(mock))
    }

    #[test]
    fn request_paths() {
        assert_eq!(Request::query("?mode=getstate").path(), "?mode=getstate");
        assert_eq!(Request::query("mode=getstate").path(), "?mode=getstate");
        assert_eq!(
            Request::params([("mode", "setsetting"), ("type", "iso"), ("value", "400")]).path(),
            "?mode=setsetting&type=iso&value=400"
        );
        let command = CommandSpec::new("camcmd", "", "capture");
        assert_eq!(Request::from(&command).path(), "?mode=camcmd&value=capture");
    }

    #[test]
    fn classify_ok_reply() {
        let reply: BaseReply = classify("?mode=camcmd&value=recmode", fixtures::OK_REPLY).unwrap();
        assert_eq!(reply.result, "ok");
    }

    #[test]
    fn classify_not_ok_reply_keeps_body() {
        let body = "<camrply><result>err_busy</result></camrply>";
        match classify::<BaseReply>("?mode=camcmd&value=capture", body).unwrap_err() {
            CameraError::LogicalFailure { path, body: raw } => {
                assert_eq!(path, "?mode=camcmd&value=capture");
                assert_eq!(raw, body);
            }
            other => panic!("expected LogicalFailure, got {other:?}"),
        }
    }

    #[test]
    fn classify_garbage_is_parse_error() {
        let err = classify::<BaseReply>("?mode=getstate", "<html>busy</html>").unwrap_err();
        assert!(matches!(err, CameraError::Parse { .. }));
    }

    #[test]
    fn state_reply_parses_payload() {
        let reply: StateReply = classify("?mode=getstate", &fixtures::state_reply("on")).unwrap();
        let state = reply.state.expect("state payload");
        assert_eq!(state.batt.as_deref(), Some("3/3"));
        assert!(state.is_recording());
        assert!(state.is_rec_mode());
    }

    #[tokio::test]
    async fn non_success_status_is_request_failed() {
        let mock = MockTransport::new();
        mock.respond_status("?mode=getstate", 503, "");
        let err = gateway(mock).get::<StateReply>("?mode=getstate").await.unwrap_err();
        assert!(matches!(err, CameraError::RequestFailed { status: 503, ref path } if path == "?mode=getstate"));
    }

    #[tokio::test]
    async fn transport_errors_propagate() {
        let mock = MockTransport::new();
        mock.fail("?mode=getstate");
        let err = gateway(mock).get::<StateReply>("?mode=getstate").await.unwrap_err();
        assert!(matches!(err, CameraError::Transport { .. }));
    }

    #[tokio::test]
    async fn params_are_sent_in_order() {
        let mock = MockTransport::new();
        mock.respond("?mode=setsetting&type=iso&value=400", fixtures::OK_REPLY);
        let gateway = gateway(mock);
        let command = CommandSpec::new("setsetting", "iso", "400");
        gateway.get::<BaseReply>(&command).await.unwrap();
        assert_eq!(gateway.transport().requests(), vec!["?mode=setsetting&type=iso&value=400"]);
    }

    #[tokio::test]
    async fn descriptor_reply_must_be_ok() {
        let mock = MockTransport::new();
        mock.respond("?mode=getinfo&type=allmenu", fixtures::ALLMENU_REPLY);
        mock.respond("?mode=getinfo&type=curmenu", "<camrply><result>err_param</result></camrply>");
        let gateway = gateway(mock);

        let tree = gateway.get_descriptor("?mode=getinfo&type=allmenu").await.unwrap();
        assert!(tree.find("menuset").is_some());

        let err = gateway.get_descriptor("?mode=getinfo&type=curmenu").await.unwrap_err();
        assert!(matches!(err, CameraError::LogicalFailure { .. }));
    }
}
