//! Reservation tools over the front-desk store.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use concierge_gateway::ToolSpec;
use concierge_types::ToolError;

use crate::front_desk::FrontDesk;
use crate::registry::{Tool, parse_args, to_payload};

const ROOM_TYPE_DESCRIPTION: &str = "Room type key (standard, deluxe, premium_suite, \
     family_suite, penthouse, accessible).";

/// Treat absent and blank strings the same way; providers send both.
fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// `check_availability`: room options with rates and remaining inventory.
pub struct CheckAvailability {
    front_desk: Arc<FrontDesk>,
}

#[derive(Debug, Deserialize)]
struct CheckAvailabilityArgs {
    #[serde(default)]
    room_type: Option<String>,
    check_in: String,
    check_out: String,
}

impl CheckAvailability {
    #[must_use]
    pub fn new(front_desk: Arc<FrontDesk>) -> Self {
        Self { front_desk }
    }
}

#[async_trait]
impl Tool for CheckAvailability {
    fn spec(&self) -> ToolSpec {
        ToolSpec::new(
            "check_availability",
            "Check room availability for a date range. Omit room_type to list every \
             available room type.",
            json!({
                "type": "object",
                "properties": {
                    "room_type": {"type": "string", "description": ROOM_TYPE_DESCRIPTION},
                    "check_in": {"type": "string", "description": "Check-in date as YYYY-MM-DD."},
                    "check_out": {"type": "string", "description": "Check-out date as YYYY-MM-DD."}
                },
                "required": ["check_in", "check_out"]
            }),
        )
    }

    async fn invoke(&self, arguments: Value) -> Result<Value, ToolError> {
        let args: CheckAvailabilityArgs = parse_args(arguments)?;
        let report = self
            .front_desk
            .availability(
                non_blank(args.room_type.as_deref()),
                &args.check_in,
                &args.check_out,
            )
            .await?;
        to_payload(&report)
    }
}

/// `create_booking`: reserve a room and allocate a booking id.
pub struct CreateBooking {
    front_desk: Arc<FrontDesk>,
}

#[derive(Debug, Deserialize)]
struct CreateBookingArgs {
    guest_name: String,
    room_type: String,
    check_in: String,
    check_out: String,
    guests: u32,
}

impl CreateBooking {
    #[must_use]
    pub fn new(front_desk: Arc<FrontDesk>) -> Self {
        Self { front_desk }
    }
}

#[async_trait]
impl Tool for CreateBooking {
    fn spec(&self) -> ToolSpec {
        ToolSpec::new(
            "create_booking",
            "Create a new reservation for a guest.",
            json!({
                "type": "object",
                "properties": {
                    "guest_name": {"type": "string", "description": "Full name of the guest."},
                    "room_type": {"type": "string", "description": ROOM_TYPE_DESCRIPTION},
                    "check_in": {"type": "string", "description": "Check-in date as YYYY-MM-DD."},
                    "check_out": {"type": "string", "description": "Check-out date as YYYY-MM-DD."},
                    "guests": {"type": "integer", "description": "Number of guests staying."}
                },
                "required": ["guest_name", "room_type", "check_in", "check_out", "guests"]
            }),
        )
    }

    async fn invoke(&self, arguments: Value) -> Result<Value, ToolError> {
        let args: CreateBookingArgs = parse_args(arguments)?;
        let confirmation = self
            .front_desk
            .create_booking(
                &args.guest_name,
                &args.room_type,
                &args.check_in,
                &args.check_out,
                args.guests,
            )
            .await?;
        to_payload(&confirmation)
    }
}

/// `cancel_booking`: cancel a confirmed reservation.
pub struct CancelBooking {
    front_desk: Arc<FrontDesk>,
}

#[derive(Debug, Deserialize)]
struct CancelBookingArgs {
    booking_id: String,
}

impl CancelBooking {
    #[must_use]
    pub fn new(front_desk: Arc<FrontDesk>) -> Self {
        Self { front_desk }
    }
}

#[async_trait]
impl Tool for CancelBooking {
    fn spec(&self) -> ToolSpec {
        ToolSpec::new(
            "cancel_booking",
            "Cancel an existing booking.",
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
        let args: CancelBookingArgs = parse_args(arguments)?;
        let notice = self.front_desk.cancel_booking(&args.booking_id).await?;
        to_payload(&notice)
    }
}

/// `modify_booking`: change the dates of a confirmed reservation.
pub struct ModifyBooking {
    front_desk: Arc<FrontDesk>,
}

#[derive(Debug, Deserialize)]
struct ModifyBookingArgs {
    booking_id: String,
    #[serde(default)]
    new_check_in: Option<String>,
    #[serde(default)]
    new_check_out: Option<String>,
}

impl ModifyBooking {
    #[must_use]
    pub fn new(front_desk: Arc<FrontDesk>) -> Self {
        Self { front_desk }
    }
}

#[async_trait]
impl Tool for ModifyBooking {
    fn spec(&self) -> ToolSpec {
        ToolSpec::new(
            "modify_booking",
            "Change the dates of an existing booking. Omit a date to keep the current one.",
            json!({
                "type": "object",
                "properties": {
                    "booking_id": {"type": "string", "description": "The booking ID, e.g. BK-1001."},
                    "new_check_in": {"type": "string", "description": "New check-in date as YYYY-MM-DD."},
                    "new_check_out": {"type": "string", "description": "New check-out date as YYYY-MM-DD."}
                },
                "required": ["booking_id"]
            }),
        )
    }

    async fn invoke(&self, arguments: Value) -> Result<Value, ToolError> {
        let args: ModifyBookingArgs = parse_args(arguments)?;
        let summary = self
            .front_desk
            .modify_booking(
                &args.booking_id,
                non_blank(args.new_check_in.as_deref()),
                non_blank(args.new_check_out.as_deref()),
            )
            .await?;
        to_payload(&summary)
    }
}
