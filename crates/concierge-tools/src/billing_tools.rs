//! Billing tools over the front-desk store.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use concierge_gateway::ToolSpec;
use concierge_types::ToolError;

use crate::front_desk::FrontDesk;
use crate::registry::{Tool, parse_args, to_payload};

/// `get_bill`: itemized charges for a booking.
pub struct GetBill {
    front_desk: Arc<FrontDesk>,
}

#[derive(Debug, Deserialize)]
struct GetBillArgs {
    booking_id: String,
}

impl GetBill {
    #[must_use]
    pub fn new(front_desk: Arc<FrontDesk>) -> Self {
        Self { front_desk }
    }
}

#[async_trait]
impl Tool for GetBill {
    fn spec(&self) -> ToolSpec {
        ToolSpec::new(
            "get_bill",
            "Retrieve the itemized bill for a booking.",
            json!({
                "type": "object",
                "properties": {
                    "booking_id": {"type": "string", "description": "The booking ID, e.g. BK-1001."}
                },
                "required": ["booking_id"]
            }),
        )
    }

    async fn invoke(&self, arguments: Value) -> Result<Value, ToolError> {
        let args: GetBillArgs = parse_args(arguments)?;
        let bill = self.front_desk.bill(&args.booking_id).await?;
        to_payload(&bill)
    }
}

/// `process_refund`: post a refund against a bill.
pub struct ProcessRefund {
    front_desk: Arc<FrontDesk>,
}

#[derive(Debug, Deserialize)]
struct ProcessRefundArgs {
    booking_id: String,
    amount: f64,
    reason: String,
}

impl ProcessRefund {
    #[must_use]
    pub fn new(front_desk: Arc<FrontDesk>) -> Self {
        Self { front_desk }
    }
}

#[async_trait]
impl Tool for ProcessRefund {
    fn spec(&self) -> ToolSpec {
        ToolSpec::new(
            "process_refund",
            "Process a refund against a guest's bill.",
            json!({
                "type": "object",
                "properties": {
                    "booking_id": {"type": "string", "description": "The booking ID, e.g. BK-1001."},
                    "amount": {"type": "number", "description": "Refund amount in USD."},
                    "reason": {"type": "string", "description": "Reason for the refund."}
                },
                "required": ["booking_id", "amount", "reason"]
            }),
        )
    }

    async fn invoke(&self, arguments: Value) -> Result<Value, ToolError> {
        let args: ProcessRefundArgs = parse_args(arguments)?;
        let receipt = self
            .front_desk
            .process_refund(&args.booking_id, args.amount, &args.reason)
            .await?;
        to_payload(&receipt)
    }
}

/// `apply_discount`: apply a promo code to a bill.
pub struct ApplyDiscount {
    front_desk: Arc<FrontDesk>,
}

#[derive(Debug, Deserialize)]
struct ApplyDiscountArgs {
    booking_id: String,
    promo_code: String,
}

impl ApplyDiscount {
    #[must_use]
    pub fn new(front_desk: Arc<FrontDesk>) -> Self {
        Self { front_desk }
    }
}

#[async_trait]
impl Tool for ApplyDiscount {
    fn spec(&self) -> ToolSpec {
        ToolSpec::new(
            "apply_discount",
            "Apply a promotional discount code to a booking's bill.",
            json!({
                "type": "object",
                "properties": {
                    "booking_id": {"type": "string", "description": "The booking ID, e.g. BK-1001."},
                    "promo_code": {"type": "string", "description": "The promotional code to apply."}
                },
                "required": ["booking_id", "promo_code"]
            }),
        )
    }

    async fn invoke(&self, arguments: Value) -> Result<Value, ToolError> {
        let args: ApplyDiscountArgs = parse_args(arguments)?;
        let receipt = self
            .front_desk
            .apply_discount(&args.booking_id, &args.promo_code)
            .await?;
        to_payload(&receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desk() -> Arc<FrontDesk> {
        Arc::new(FrontDesk::seeded())
    }

    #[tokio::test]
    async fn get_bill_payload_is_itemized() {
        let tool = GetBill::new(desk());
        let payload = tool
            .invoke(json!({"booking_id": "BK-1002"}))
            .await
            .unwrap();
        assert_eq!(payload["total"], 1182.0);
        assert_eq!(payload["paid"], false);
        let items = payload["items"].as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1]["description"], "Valet Parking (3 nights)");
    }

    #[tokio::test]
    async fn get_bill_unknown_booking_fails() {
        let tool = GetBill::new(desk());
        let err = tool
            .invoke(json!({"booking_id": "BK-9999"}))
            .await
            .unwrap_err();
        match err {
            ToolError::InvalidInput { reason } => {
                assert!(reason.contains("BK-9999"), "got: {reason}")
            }
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn refund_payload_reports_new_total() {
        let tool = ProcessRefund::new(desk());
        let payload = tool
            .invoke(json!({
                "booking_id": "BK-1001",
                "amount": 120.0,
                "reason": "spa session cancelled"
            }))
            .await
            .unwrap();
        assert_eq!(payload["new_total"], 973.5);
        assert!(
            payload["note"]
                .as_str()
                .unwrap()
                .contains("5-7 business days"),
        );
    }

    #[tokio::test]
    async fn discount_payload_reports_percentage() {
        let tool = ApplyDiscount::new(desk());
        let payload = tool
            .invoke(json!({"booking_id": "BK-1001", "promo_code": "welcome10"}))
            .await
            .unwrap();
        assert_eq!(payload["promo_code"], "WELCOME10");
        assert_eq!(payload["percent_off"], 10);
        assert_eq!(payload["discount"], 109.35);
        assert_eq!(payload["new_total"], 984.15);
    }
}
