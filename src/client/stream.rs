//! Streaming SSE over a policy-wrapped request.

use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::fetch::fetch_with_policy;
use crate::error::{classify, ApiClientError, ApiResult};
use crate::policy::RequestPolicy;
use crate::sse::{SseMessage, SseParser, Utf8ChunkDecoder};
use crate::traits::{HttpClient, HttpRequest};

/// Send `request` and hand every SSE message of the response body to
/// `on_message`, in order.
///
/// Returns `Ok(())` once the body has ended and the parser has been
/// flushed. Cancelling `signal` while the body is being read fails with an
/// `abort` error; messages already delivered stay delivered.
pub async fn stream_sse<C, F>(
    http: &C,
    request: &HttpRequest,
    policy: &RequestPolicy,
    signal: Option<&CancellationToken>,
    mut on_message: F,
) -> ApiResult<()>
where
    C: HttpClient + ?Sized,
    F: FnMut(SseMessage),
{
    let response = fetch_with_policy(http, request, policy, signal).await?;
    debug!(url = %request.url, status = response.status, "SSE stream opened");

    let mut body = response.body;
    let mut decoder = Utf8ChunkDecoder::new();
    let mut parser = SseParser::new();

    let cancelled = async {
        match signal {
            Some(token) => token.cancelled().await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(cancelled);

    loop {
        let next = tokio::select! {
            biased;
            () = &mut cancelled => {
                debug!(url = %request.url, "SSE stream cancelled");
                return Err(ApiClientError::abort());
            }
            next = body.next() => next,
        };

        let chunk = match next {
            Some(Ok(chunk)) => chunk,
            Some(Err(e)) => return Err(classify(e)),
            None => break,
        };

        let text = decoder.decode(&chunk);
        trace!(bytes = chunk.len(), "SSE chunk: {:?}", text);
        for message in parser.push(&text) {
            on_message(message);
        }
    }

    let tail = decoder.finish();
    if !tail.is_empty() {
        trace!("SSE tail: {:?}", tail);
        for message in parser.push(&tail) {
            on_message(message);
        }
    }
    for message in parser.flush() {
        on_message(message);
    }

    debug!(url = %request.url, "SSE stream complete");
    Ok(())
}
