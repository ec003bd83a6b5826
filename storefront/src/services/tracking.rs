// storefront/src/services/tracking.rs

use tracing::{debug, instrument};

use crate::errors::{AppError, Result as AppResult};
use crate::models::TrackedOrder;
use crate::services::order_code;
use crate::state::AppState;
use crate::store::with_timeout;

/// Public order lookup. Input is trimmed and uppercased; a malformed code is a
/// validation error and an unknown one is `Ok(None)`.
#[instrument(name = "tracking::track_order", skip(state), err(Display))]
pub async fn track_order(state: &AppState, raw_code: &str) -> AppResult<Option<TrackedOrder>> {
  let code = order_code::normalize(raw_code);
  if !order_code::is_well_formed(&code) {
    return Err(AppError::Validation(
      "Order codes look like AB123456: two letters then six digits.".to_string(),
    ));
  }

  let found = with_timeout(
    state.config.external_call_timeout,
    state.stores.orders.find_order_by_code(&code),
  )
  .await?;
  debug!(order_code = %code, found = found.is_some(), "Tracking lookup finished.");
  Ok(found.as_ref().map(TrackedOrder::from))
}
