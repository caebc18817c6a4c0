use axum::{extract::Request, middleware::Next, response::Response};
use scribe_types::{IDENTITY_HEADER, Identity};
use tracing::debug;

use crate::error::ApiError;

/// Parse the caller identity from `X-USER-ID` and hand it to handlers as an
/// `Extension<Identity>`. Anything but a positive integer is rejected.
pub async fn require_identity(mut req: Request, next: Next) -> Result<Response, ApiError> {
    let identity = req
        .headers()
        .get(IDENTITY_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Unauthorized)?
        .parse::<Identity>()
        .map_err(|e| {
            debug!("Rejected {} {}: {}", req.method(), req.uri(), e);
            ApiError::Unauthorized
        })?;

    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}
