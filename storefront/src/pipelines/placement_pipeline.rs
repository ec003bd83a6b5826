// storefront/src/pipelines/placement_pipeline.rs

//! Order placement.
//!
//! The order row and its lines are the only required writes. Once they are
//! committed the customer has an order: the confirmation mail and the stock
//! decrement are best-effort, and a stock shortfall flags the order for
//! reconciliation instead of failing the request.

use crate::errors::{AppError, Result as AppResult};
use crate::models::{NewOrder, PlacementRequest};
use crate::pipelines::contexts::{PlaceOrderCtxData, StockLineOutcome, StockLineResult};
use crate::services::email::{compose_order_confirmation, OrderConfirmation};
use crate::services::order_code::MAX_ORDER_CODE_ATTEMPTS;
use crate::services::pricing;
use crate::state::AppState;
use crate::store::{with_timeout, StockDecrement, ORDER_CODE_CONSTRAINT};
use serde::Serialize;
use std::sync::Arc;
use tarzify_flow::{ContextData, FlowRegistry, Pipeline, PipelineControl, StepDef};
use tracing::{error, event, info, instrument, warn, Level};

pub const VALIDATE_REQUEST: &str = "validate_request";
pub const VERIFY_CUSTOMER: &str = "verify_customer";
pub const PERSIST_ORDER: &str = "persist_order";
pub const SEND_CONFIRMATION_EMAIL: &str = "send_confirmation_email";
pub const DECREMENT_STOCK: &str = "decrement_stock";

/// What the caller learns about a placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementReceipt {
  pub order_id: i64,
  pub order_code: String,
  pub total_amount: i64,
  pub line_count: usize,
  pub confirmation_sent: bool,
  /// Products whose stock could not be decremented.
  pub stock_shortfalls: Vec<i64>,
  pub needs_reconciliation: bool,
  /// Best-effort steps that failed.
  pub degraded_steps: Vec<String>,
}

pub fn register_placement_pipeline(flows: &Arc<FlowRegistry<AppError>>, app_state: &AppState) {
  let call_limit = app_state.config.external_call_timeout;

  let mut placement_p = Pipeline::<PlaceOrderCtxData, AppError>::new(vec![
    StepDef::required(VALIDATE_REQUEST),
    StepDef::required(VERIFY_CUSTOMER).with_timeout(call_limit),
    StepDef::required(PERSIST_ORDER),
    StepDef::best_effort(SEND_CONFIRMATION_EMAIL)
      .with_timeout(call_limit)
      .skip_if(|ctx_data: ContextData<PlaceOrderCtxData>| {
        let no_email = ctx_data.read().customer_email().is_none();
        no_email
      }),
    StepDef::best_effort(DECREMENT_STOCK),
  ]);

  // Step 1: shape of the request and the total check. Nothing is written on failure.
  placement_p.on_root(VALIDATE_REQUEST, |ctx_data: ContextData<PlaceOrderCtxData>| {
    Box::pin(async move {
      let (request, total_check, rates) = {
        let guard = ctx_data.read();
        (
          guard.request.clone(),
          guard.app_state.config.total_check,
          guard.app_state.config.shipping_rates.clone(),
        )
      };

      validate_request_shape(&request)?;
      let amounts = pricing::check_total(
        total_check,
        &rates,
        &request.lines,
        request.payment_method,
        request.total,
      )?;

      ctx_data.write().amounts = Some(amounts);
      event!(Level::DEBUG, lines = request.lines.len(), total = request.total, "Placement request is valid.");
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  // Step 2: the customer must exist before anything is written. The contact
  // found here also addresses the confirmation mail.
  placement_p.on_root(VERIFY_CUSTOMER, |ctx_data: ContextData<PlaceOrderCtxData>| {
    Box::pin(async move {
      let (customer_id, customers) = {
        let guard = ctx_data.read();
        (guard.request.customer_id, guard.app_state.stores.customers.clone())
      };

      let Some(contact) = customers.find_customer(customer_id).await? else {
        warn!(%customer_id, "Placement refused: unknown customer.");
        return Err(AppError::Validation("Unknown customer.".to_string()));
      };
      if contact.email.is_none() {
        info!(%customer_id, "No email on file, confirmation will be skipped.");
      }
      ctx_data.write().customer = Some(contact);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  // Step 3: order row and lines in one transaction. A collision on the order
  // code retries the whole write with a fresh code.
  placement_p.on_root(PERSIST_ORDER, move |ctx_data: ContextData<PlaceOrderCtxData>| {
    Box::pin(async move {
      let (request, orders, order_codes) = {
        let guard = ctx_data.read();
        (
          guard.request.clone(),
          guard.app_state.stores.orders.clone(),
          guard.app_state.order_codes.clone(),
        )
      };

      for attempt in 1..=MAX_ORDER_CODE_ATTEMPTS {
        let new_order = NewOrder {
          order_code: order_codes.next_code(),
          customer_id: request.customer_id,
          total_amount: request.total,
          shipping_address: request.shipping_address.clone(),
          phone: request.phone.clone(),
          payment_method: request.payment_method,
        };

        match with_timeout(call_limit, orders.insert_order_with_items(&new_order, &request.lines)).await {
          Ok(placed) => {
            info!(
              order_id = placed.order.id,
              order_code = %placed.order.order_code,
              attempt,
              "Order persisted."
            );
            let mut guard = ctx_data.write();
            guard.code_attempts = attempt;
            guard.placed = Some(placed);
            return Ok(PipelineControl::Continue);
          }
          Err(e) if e.is_duplicate_of(ORDER_CODE_CONSTRAINT) => {
            warn!(attempt, order_code = %new_order.order_code, "Order code already taken, retrying with a new one.");
          }
          Err(e) => return Err(AppError::Store(e)),
        }
      }

      ctx_data.write().code_attempts = MAX_ORDER_CODE_ATTEMPTS;
      error!(
        attempts = MAX_ORDER_CODE_ATTEMPTS,
        "Every generated order code collided; the code source or the uniqueness check is suspect."
      );
      Err(AppError::OrderCodeExhausted {
        attempts: MAX_ORDER_CODE_ATTEMPTS,
      })
    })
  });

  placement_p.on_root(SEND_CONFIRMATION_EMAIL, |ctx_data: ContextData<PlaceOrderCtxData>| {
    Box::pin(async move {
      let message = {
        let guard = ctx_data.read();
        let (Some(placed), Some(amounts), Some(to)) = (&guard.placed, guard.amounts, guard.customer_email()) else {
          return Err(AppError::Internal("Confirmation mail prerequisites missing.".to_string()));
        };
        let config = &guard.app_state.config;
        let confirmation = OrderConfirmation {
          order: &placed.order,
          lines: &guard.request.lines,
          amounts,
          tracking_page_url: &config.tracking_page_url,
        };
        let message = compose_order_confirmation(&config.email_sender, to, &confirmation);
        message
      };
      let mailer = ctx_data.read().app_state.mailer.clone();

      let sent = mailer.send(&message).await?;
      info!(message_id = %sent.message_id, subject = %message.subject, "Order confirmation sent.");
      ctx_data.write().confirmation_message_id = Some(sent.message_id);
      Ok(PipelineControl::Continue)
    })
  });

  // Each line is decremented and reported on its own; a failing line does not
  // stop the others.
  placement_p.on_root(DECREMENT_STOCK, move |ctx_data: ContextData<PlaceOrderCtxData>| {
    Box::pin(async move {
      let (lines, stock) = {
        let guard = ctx_data.read();
        (guard.request.lines.clone(), guard.app_state.stores.stock.clone())
      };

      let mut outcomes = Vec::with_capacity(lines.len());
      for line in &lines {
        let result = match with_timeout(call_limit, stock.decrement_stock(line.product_id, line.quantity)).await {
          Ok(StockDecrement::Applied { remaining }) => StockLineResult::Decremented { remaining },
          Ok(StockDecrement::Insufficient) => StockLineResult::Insufficient,
          Ok(StockDecrement::UnknownProduct) => StockLineResult::UnknownProduct,
          Err(e) => StockLineResult::Failed(e.to_string()),
        };
        if !matches!(result, StockLineResult::Decremented { .. }) {
          warn!(product_id = line.product_id, quantity = line.quantity, ?result, "Stock not decremented.");
        }
        outcomes.push(StockLineOutcome {
          product_id: line.product_id,
          quantity: line.quantity,
          result,
        });
      }

      ctx_data.write().stock_outcomes = outcomes;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  placement_p.after_root(DECREMENT_STOCK, move |ctx_data: ContextData<PlaceOrderCtxData>| {
    Box::pin(async move {
      let (order_id, note, orders) = {
        let guard = ctx_data.read();
        let Some(order_id) = guard.placed.as_ref().map(|p| p.order.id) else {
          return Ok(PipelineControl::Continue);
        };
        (
          order_id,
          reconciliation_note(&guard.stock_outcomes),
          guard.app_state.stores.orders.clone(),
        )
      };
      let Some(note) = note else {
        return Ok(PipelineControl::Continue);
      };

      with_timeout(call_limit, orders.flag_for_reconciliation(order_id, &note)).await?;
      if let Some(placed) = ctx_data.write().placed.as_mut() {
        placed.order.needs_reconciliation = true;
        placed.order.reconciliation_note = Some(note.clone());
      }
      warn!(order_id, %note, "Order flagged for stock reconciliation.");
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  flows.register_pipeline(placement_p);
  tracing::info!("Order placement pipeline registered.");
}

fn validate_request_shape(request: &PlacementRequest) -> AppResult<()> {
  if request.lines.is_empty() {
    return Err(AppError::Validation("Cart is empty.".to_string()));
  }
  if let Some(line) = request.lines.iter().find(|l| l.quantity < 1) {
    return Err(AppError::Validation(format!(
      "Quantity for product {} must be at least 1.",
      line.product_id
    )));
  }
  if let Some(line) = request.lines.iter().find(|l| l.unit_price < 0) {
    return Err(AppError::Validation(format!(
      "Price for product {} cannot be negative.",
      line.product_id
    )));
  }
  if request.total < 0 {
    return Err(AppError::Validation("Order total cannot be negative.".to_string()));
  }
  if request.shipping_address.trim().is_empty() {
    return Err(AppError::Validation("Shipping address is required.".to_string()));
  }
  if request.phone.trim().is_empty() {
    return Err(AppError::Validation("Phone number is required.".to_string()));
  }
  Ok(())
}

/// `None` when every line was decremented.
fn reconciliation_note(outcomes: &[StockLineOutcome]) -> Option<String> {
  let parts: Vec<String> = outcomes
    .iter()
    .filter_map(|o| {
      let reason = match &o.result {
        StockLineResult::Decremented { .. } => return None,
        StockLineResult::Insufficient => "insufficient stock",
        StockLineResult::UnknownProduct => "unknown product",
        StockLineResult::Failed(e) => e.as_str(),
      };
      Some(format!("product {} x{} ({})", o.product_id, o.quantity, reason))
    })
    .collect();
  if parts.is_empty() {
    None
  } else {
    Some(format!("stock not decremented: {}", parts.join("; ")))
  }
}

/// Places an order: runs the placement pipeline and summarizes the result.
#[instrument(
  name = "place_order",
  skip(app_state, request),
  fields(customer_id = %request.customer_id, lines = request.lines.len()),
  err(Display)
)]
pub async fn place_order(app_state: &AppState, request: PlacementRequest) -> AppResult<PlacementReceipt> {
  let ctx_data = ContextData::new(PlaceOrderCtxData::new(app_state.clone(), request));
  let report = app_state.flows.run(ctx_data.clone()).await?;

  let guard = ctx_data.read();
  let placed = guard
    .placed
    .as_ref()
    .ok_or_else(|| AppError::Internal("Placement finished without an order.".to_string()))?;

  Ok(PlacementReceipt {
    order_id: placed.order.id,
    order_code: placed.order.order_code.clone(),
    total_amount: placed.order.total_amount,
    line_count: placed.items.len(),
    confirmation_sent: guard.confirmation_message_id.is_some(),
    stock_shortfalls: guard
      .stock_outcomes
      .iter()
      .filter(|o| o.is_shortfall())
      .map(|o| o.product_id)
      .collect(),
    needs_reconciliation: placed.order.needs_reconciliation,
    degraded_steps: report.degraded.iter().map(|d| d.step_name.clone()).collect(),
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::{CartLine, PaymentMethod};
  use uuid::Uuid;

  fn request() -> PlacementRequest {
    PlacementRequest {
      customer_id: Uuid::new_v4(),
      lines: vec![CartLine {
        product_id: 1,
        quantity: 1,
        unit_price: 100,
        name: None,
      }],
      total: 350,
      shipping_address: "12 Mall Road".into(),
      phone: "03001234567".into(),
      payment_method: PaymentMethod::FastPay,
    }
  }

  #[test]
  fn shape_validation_catches_each_blank_field() {
    assert!(validate_request_shape(&request()).is_ok());

    let mut empty = request();
    empty.lines.clear();
    assert!(matches!(validate_request_shape(&empty), Err(AppError::Validation(m)) if m == "Cart is empty."));

    let mut zero_qty = request();
    zero_qty.lines[0].quantity = 0;
    assert!(validate_request_shape(&zero_qty).is_err());

    let mut no_phone = request();
    no_phone.phone = "   ".into();
    assert!(validate_request_shape(&no_phone).is_err());
  }

  #[test]
  fn reconciliation_note_names_every_shortfall() {
    let outcomes = vec![
      StockLineOutcome {
        product_id: 1,
        quantity: 2,
        result: StockLineResult::Decremented { remaining: 3 },
      },
      StockLineOutcome {
        product_id: 2,
        quantity: 1,
        result: StockLineResult::Insufficient,
      },
      StockLineOutcome {
        product_id: 3,
        quantity: 4,
        result: StockLineResult::Failed("store unavailable".into()),
      },
    ];
    assert_eq!(
      reconciliation_note(&outcomes).as_deref(),
      Some("stock not decremented: product 2 x1 (insufficient stock); product 3 x4 (store unavailable)")
    );
    assert_eq!(reconciliation_note(&outcomes[..1]), None);
  }
}
