//! Request handlers, one module per upstream resource

pub mod attributes;
pub mod batch;
pub mod context;
pub mod entities;
pub mod entity_map;
pub mod notify;
pub mod source_identity;
pub mod subscriptions;
pub mod types;

use ngsi_core::{BrokerRequest, BrokerResponse};

use crate::error::Problem;
use crate::state::AppState;

/// Executes one backend call, mapping transport failures to problem
/// responses. `path` is the upstream path used in failure messages.
pub(crate) async fn call_broker(
    state: &AppState,
    req: BrokerRequest,
    path: &str,
) -> Result<BrokerResponse, Problem> {
    state
        .broker
        .send(req)
        .await
        .map_err(|err| Problem::transport(&err, path))
}

/// Short-circuits on non-2xx backend replies.
pub(crate) fn ensure_success(response: &BrokerResponse) -> Result<(), Problem> {
    if response.is_success() {
        Ok(())
    } else {
        Err(Problem::backend(response.status, response.body.clone()))
    }
}
