//! Type-erased request handlers.
//!
//! A typed handler `Fn(Req) -> Future<Output = Result<Resp, RpcError>>` is
//! wrapped into a byte-level handler the server can store per registration.

use crate::error::RpcError;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared_types::{decode, encode, ErrorCode};
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Byte-level handler stored by the server.
pub type ErasedHandler =
    Arc<dyn Fn(Vec<u8>) -> BoxFuture<'static, Result<Vec<u8>, RpcError>> + Send + Sync>;

/// Wrap a typed handler.
///
/// Request payloads that fail to decode are answered with a `Malformed`
/// handler error without calling `handler`.
pub fn erase<Req, Resp, F, Fut>(handler: F) -> ErasedHandler
where
    Req: DeserializeOwned + Send + 'static,
    Resp: Serialize + Send + 'static,
    F: Fn(Req) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Resp, RpcError>> + Send + 'static,
{
    let handler = Arc::new(handler);
    Arc::new(move |payload: Vec<u8>| {
        let handler = Arc::clone(&handler);
        async move {
            let request: Req = decode(&payload)
                .map_err(|e| RpcError::handler(ErrorCode::Malformed, e.to_string()))?;
            let response = handler(request).await?;
            Ok(encode(&response)?)
        }
        .boxed()
    })
}

/// Run a handler, converting a panic into an `Internal` handler error.
pub(crate) async fn invoke(handler: &ErasedHandler, payload: Vec<u8>) -> Result<Vec<u8>, RpcError> {
    let handler = Arc::clone(handler);
    // The call itself happens inside the guarded future so a panic before
    // the first await is caught too.
    match AssertUnwindSafe(async move { handler(payload).await })
        .catch_unwind()
        .await
    {
        Ok(result) => result,
        Err(panic) => Err(RpcError::handler(
            ErrorCode::Internal,
            format!("handler panicked: {}", panic_message(panic.as_ref())),
        )),
    }
}

/// Whether an error produced by [`invoke`] came from a caught panic.
pub(crate) fn is_panic(error: &RpcError) -> bool {
    match error {
        RpcError::Handler {
            code: ErrorCode::Internal,
            message,
        } => message.starts_with("handler panicked"),
        _ => false,
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}
