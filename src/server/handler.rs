//! Request handling for the probe endpoints.

use std::convert::Infallible;

use bytes::Bytes;
use http_body_util::Empty;
use hyper::{Request, Response, StatusCode};

use crate::health::{HealthState, ProbeType};

/// Status code reported for a probe whose signal is `up`.
#[inline]
pub(crate) fn probe_status(up: bool) -> StatusCode {
    if up {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// Route a request to its probe. The method is not inspected and the body is
/// never read.
pub fn route<B>(req: &Request<B>, state: &HealthState) -> StatusCode {
    match ProbeType::from_path(req.uri().path()) {
        Some(probe) => probe_status(state.check(probe)),
        None => StatusCode::NOT_FOUND,
    }
}

/// Handle one probe request.
pub async fn handle_probe_request<B>(
    req: Request<B>,
    state: HealthState,
) -> Result<Response<Empty<Bytes>>, Infallible> {
    let mut response = Response::new(Empty::new());
    *response.status_mut() = route(&req, &state);
    Ok(response)
}
