//! Push client — delivers one sample per request to the aggregator.

use std::time::Duration;

use http_body_util::Full;
use thiserror::Error;
use tracing::debug;

use nodepulse_model::NodeSample;

const PUSH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum PushError {
    #[error("connect: {0}")]
    Connect(std::io::Error),
    #[error("http: {0}")]
    Http(#[from] hyper::Error),
    #[error("encode: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("aggregator answered {0}")]
    Status(http::StatusCode),
    #[error("push timed out")]
    Timeout,
}

/// PUT the sample to `http://{aggregator}/api/v1/nodes/{id}/sample`
/// over a fresh http1 connection.
pub async fn push_sample(aggregator: &str, sample: &NodeSample) -> Result<(), PushError> {
    let uri = format!(
        "http://{aggregator}/api/v1/nodes/{}/sample",
        sample.node_id
    );
    let body = serde_json::to_vec(sample)?;

    let result = tokio::time::timeout(PUSH_TIMEOUT, async {
        let stream = tokio::net::TcpStream::connect(aggregator)
            .await
            .map_err(PushError::Connect)?;

        let io = hyper_util::rt::TokioIo::new(stream);
        let (mut sender, conn) = hyper::client::conn::http1::handshake(io).await?;

        // Drive the connection in the background.
        tokio::spawn(async move {
            let _ = conn.await;
        });

        let req = http::Request::builder()
            .method("PUT")
            .uri(&uri)
            .header("host", aggregator)
            .header("content-type", "application/json")
            .header("user-agent", "nodepulse-agent/0.1")
            .body(Full::<bytes::Bytes>::new(body.into()))
            .expect("static request parts are valid");

        let resp = sender.send_request(req).await?;
        if !resp.status().is_success() {
            return Err(PushError::Status(resp.status()));
        }
        debug!(%uri, status = %resp.status(), "sample delivered");
        Ok(())
    })
    .await;

    match result {
        Ok(push) => push,
        Err(_) => Err(PushError::Timeout),
    }
}
