//! Timeout enforcement for upstream calls.
//!
//! Every adapter call runs under a deadline; expiry is reported as an
//! adapter error of kind `Timeout` so the pipeline treats it like any other
//! upstream failure.

use std::future::Future;
use std::time::Duration;

use crate::upstream::{AdapterError, AdapterErrorKind};

/// Run `call`, failing with a timeout error once `deadline` passes.
pub async fn with_deadline<T, F>(deadline: Duration, call: F) -> Result<T, AdapterError>
where
    F: Future<Output = Result<T, AdapterError>>,
{
    match tokio::time::timeout(deadline, call).await {
        Ok(result) => result,
        Err(_) => Err(AdapterError::new(
            AdapterErrorKind::Timeout,
            format!("upstream call exceeded {}ms", deadline.as_millis()),
        )),
    }
}
