//! Response helpers.
//!
//! The webhook acknowledgement is a fixed-length body that signals once its
//! last chunk has been handed to the transport, or once it is dropped with the
//! connection. The handoff precedes the socket write, so work gated on the
//! signal can begin a moment before the bytes are on the wire.

use std::convert::Infallible;

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::Response,
};
use bytes::Bytes;
use futures_util::stream;
use tokio::sync::oneshot;

/// Fires when dropped. The server drops the body after taking its last chunk,
/// before that chunk is written out.
struct HandoffSignal(Option<oneshot::Sender<()>>);

impl Drop for HandoffSignal {
    fn drop(&mut self) {
        if let Some(tx) = self.0.take() {
            let _ = tx.send(());
        }
    }
}

/// 200 with `Content-Length` and `Connection: close`, plus a receiver that
/// resolves once the transport has taken the whole body.
pub fn acknowledgement_with_handoff(text: &'static str) -> (Response, oneshot::Receiver<()>) {
    let (tx, rx) = oneshot::channel();
    let bytes = Bytes::from_static(text.as_bytes());
    let length = bytes.len();

    let body = stream::unfold(
        (Some(bytes), HandoffSignal(Some(tx))),
        |(chunk, signal)| async move {
            chunk.map(|chunk| (Ok::<_, Infallible>(chunk), (None, signal)))
        },
    );

    let mut response = Response::new(Body::from_stream(body));
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    headers.insert(header::CONNECTION, HeaderValue::from_static("close"));
    (response, rx)
}
