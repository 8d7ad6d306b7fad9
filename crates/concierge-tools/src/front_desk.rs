//! In-memory front-desk store simulating the property-management and billing
//! systems behind the builtin tools.
//!
//! The store is seeded with a fixed room catalog, three demonstration
//! bookings, their itemized bills, and a promo-code table. All arithmetic is
//! anchored to a fixed business date so results are deterministic.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;
use tokio::sync::RwLock;

use concierge_types::ToolError;

/// Date refunds and discounts are posted under.
pub fn business_date() -> NaiveDate {
    date(2026, 3, 1)
}

/// One room type in the catalog.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Room {
    pub key: &'static str,
    pub display_name: &'static str,
    pub rate_per_night: f64,
    pub max_guests: u32,
    pub total_inventory: u32,
    pub amenities: &'static [&'static str],
}

/// Fixed room catalog, in display order.
pub fn catalog() -> &'static [Room] {
    ROOM_CATALOG
}

static ROOM_CATALOG: &[Room] = &[
    Room {
        key: "standard",
        display_name: "Standard Room",
        rate_per_night: 149.0,
        max_guests: 2,
        total_inventory: 40,
        amenities: &["WiFi", "42\" TV", "mini-fridge", "coffee maker", "safe"],
    },
    Room {
        key: "deluxe",
        display_name: "Deluxe Room",
        rate_per_night: 219.0,
        max_guests: 3,
        total_inventory: 30,
        amenities: &[
            "WiFi",
            "55\" smart TV",
            "mini-fridge",
            "Keurig",
            "safe",
            "bathrobes",
        ],
    },
    Room {
        key: "premium_suite",
        display_name: "Premium Suite",
        rate_per_night: 349.0,
        max_guests: 4,
        total_inventory: 10,
        amenities: &[
            "WiFi",
            "65\" smart TV",
            "mini-bar",
            "Nespresso",
            "safe",
            "bathrobes",
            "jacuzzi",
        ],
    },
    Room {
        key: "family_suite",
        display_name: "Family Suite",
        rate_per_night: 299.0,
        max_guests: 5,
        total_inventory: 8,
        amenities: &[
            "WiFi",
            "2x TVs",
            "mini-fridge",
            "microwave",
            "coffee maker",
            "board games",
        ],
    },
    Room {
        key: "penthouse",
        display_name: "Penthouse Suite",
        rate_per_night: 599.0,
        max_guests: 4,
        total_inventory: 2,
        amenities: &[
            "WiFi",
            "75\" smart TV",
            "full bar",
            "Nespresso",
            "Bose speaker",
            "butler service",
            "private balcony",
        ],
    },
    Room {
        key: "accessible",
        display_name: "Accessible Room",
        rate_per_night: 149.0,
        max_guests: 2,
        total_inventory: 6,
        amenities: &[
            "WiFi",
            "42\" TV",
            "mini-fridge",
            "coffee maker",
            "safe",
            "roll-in shower",
            "grab bars",
        ],
    },
];

static PROMO_CODES: &[(&str, f64)] = &[
    ("WELCOME10", 0.10),
    ("SUMMER20", 0.20),
    ("LOYALTY15", 0.15),
    ("WEEKEND25", 0.25),
];

/// Reservation lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Confirmed,
    CheckedIn,
    Cancelled,
}

impl BookingStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::CheckedIn => "checked_in",
            Self::Cancelled => "cancelled",
        }
    }
}

/// A reservation held in the store.
#[derive(Debug, Clone, Serialize)]
pub struct Booking {
    pub booking_id: String,
    pub guest_name: String,
    pub room_type: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub total_cost: f64,
    pub status: BookingStatus,
}

/// One posted charge (or credit, when negative) on a bill.
#[derive(Debug, Clone, Serialize)]
pub struct BillItem {
    pub date: NaiveDate,
    pub description: String,
    pub amount: f64,
}

/// Itemized bill for a booking.
#[derive(Debug, Clone, Serialize)]
pub struct Bill {
    pub booking_id: String,
    pub guest_name: String,
    pub items: Vec<BillItem>,
    pub total: f64,
    pub paid: bool,
}

/// One bookable option returned by an availability query.
#[derive(Debug, Clone, Serialize)]
pub struct AvailabilityQuote {
    pub room_type: &'static str,
    pub display_name: &'static str,
    pub rate_per_night: f64,
    pub nights: i64,
    pub total: f64,
    pub max_guests: u32,
    pub amenities: &'static [&'static str],
    pub rooms_remaining: u32,
}

/// Availability query result.
#[derive(Debug, Clone, Serialize)]
pub struct AvailabilityReport {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub nights: i64,
    pub options: Vec<AvailabilityQuote>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Confirmation payload for a freshly created booking.
#[derive(Debug, Clone, Serialize)]
pub struct BookingConfirmation {
    pub booking: Booking,
    pub nights: i64,
    pub note: &'static str,
}

/// Result of a successful cancellation.
#[derive(Debug, Clone, Serialize)]
pub struct CancellationNotice {
    pub booking: Booking,
    pub refund: f64,
    pub note: String,
}

/// Result of a booking modification. `changes` is empty when the requested
/// values matched the booking as it stood.
#[derive(Debug, Clone, Serialize)]
pub struct ModificationSummary {
    pub booking: Booking,
    pub nights: i64,
    pub changes: Vec<String>,
}

/// Result of a posted refund.
#[derive(Debug, Clone, Serialize)]
pub struct RefundReceipt {
    pub booking_id: String,
    pub amount: f64,
    pub reason: String,
    pub new_total: f64,
    pub note: &'static str,
}

/// Result of an applied promo code.
#[derive(Debug, Clone, Serialize)]
pub struct DiscountReceipt {
    pub booking_id: String,
    pub promo_code: String,
    pub percent_off: u32,
    pub discount: f64,
    pub new_total: f64,
}

const CANCELLATION_NOTE: &str = "Free cancellation up to 48 hours before check-in.";
const REFUND_NOTE: &str = "Refund will appear on the guest's card within 5-7 business days.";

struct FrontDeskState {
    bookings: BTreeMap<String, Booking>,
    bills: BTreeMap<String, Bill>,
    next_booking_id: u32,
}

/// Shared front-desk store. Cheap to share behind an `Arc`; every operation
/// takes the interior lock for the duration of one tool call.
pub struct FrontDesk {
    state: RwLock<FrontDeskState>,
}

impl FrontDesk {
    /// Store seeded with the demonstration catalog, bookings, and bills.
    #[must_use]
    pub fn seeded() -> Self {
        let mut bookings = BTreeMap::new();
        for booking in seed_bookings() {
            bookings.insert(booking.booking_id.clone(), booking);
        }

        let mut bills = BTreeMap::new();
        for bill in seed_bills() {
            bills.insert(bill.booking_id.clone(), bill);
        }

        Self {
            state: RwLock::new(FrontDeskState {
                bookings,
                bills,
                next_booking_id: 1004,
            }),
        }
    }

    /// Availability for one room type, or the full catalog when `room_type`
    /// is `None`.
    ///
    /// # Errors
    ///
    /// `ToolError::InvalidInput` for unknown room types, malformed dates, or
    /// a check-out on or before the check-in.
    pub async fn availability(
        &self,
        room_type: Option<&str>,
        check_in: &str,
        check_out: &str,
    ) -> Result<AvailabilityReport, ToolError> {
        let requested = match room_type {
            Some(raw) => Some(find_room(raw)?),
            None => None,
        };
        let (ci, co, nights) = parse_stay(check_in, check_out)?;

        let state = self.state.read().await;
        let candidates: Vec<&'static Room> = match requested {
            Some(room) => vec![room],
            None => catalog().iter().collect(),
        };

        let mut options = Vec::new();
        for room in candidates {
            let remaining = remaining_inventory(&state, room);
            if remaining > 0 {
                options.push(AvailabilityQuote {
                    room_type: room.key,
                    display_name: room.display_name,
                    rate_per_night: room.rate_per_night,
                    nights,
                    total: round2(room.rate_per_night * nights as f64),
                    max_guests: room.max_guests,
                    amenities: room.amenities,
                    rooms_remaining: remaining,
                });
            }
        }

        let note = if options.is_empty() {
            Some(match requested {
                Some(room) => format!(
                    "No {} rooms are available for {ci} to {co}. \
                     Please try different dates or another room type.",
                    room.display_name
                ),
                None => format!("No rooms are available for {ci} to {co}. Please try different dates."),
            })
        } else {
            None
        };

        Ok(AvailabilityReport {
            check_in: ci,
            check_out: co,
            nights,
            options,
            note,
        })
    }

    /// Create a reservation, allocating the next `BK-` identifier.
    ///
    /// # Errors
    ///
    /// `ToolError::InvalidInput` for unknown room types, malformed dates, or
    /// a zero guest count; `ToolError::ExecutionFailed` when the party
    /// exceeds the room capacity or the type is sold out.
    pub async fn create_booking(
        &self,
        guest_name: &str,
        room_type: &str,
        check_in: &str,
        check_out: &str,
        guests: u32,
    ) -> Result<BookingConfirmation, ToolError> {
        let room = find_room(room_type)?;
        let (ci, co, nights) = parse_stay(check_in, check_out)?;

        if guests == 0 {
            return Err(ToolError::InvalidInput {
                reason: "guest count must be at least 1".to_string(),
            });
        }
        if guests > room.max_guests {
            return Err(ToolError::ExecutionFailed {
                reason: format!(
                    "party of {guests} exceeds the {} capacity of {}",
                    room.display_name, room.max_guests
                ),
            });
        }

        let mut state = self.state.write().await;
        if remaining_inventory(&state, room) == 0 {
            return Err(ToolError::ExecutionFailed {
                reason: format!(
                    "no {} rooms are available for {ci} to {co}",
                    room.display_name
                ),
            });
        }

        let booking_id = format!("BK-{}", state.next_booking_id);
        state.next_booking_id += 1;

        let booking = Booking {
            booking_id: booking_id.clone(),
            guest_name: guest_name.trim().to_string(),
            room_type: room.key.to_string(),
            check_in: ci,
            check_out: co,
            total_cost: round2(room.rate_per_night * nights as f64),
            status: BookingStatus::Confirmed,
        };
        state.bookings.insert(booking_id, booking.clone());

        Ok(BookingConfirmation {
            booking,
            nights,
            note: CANCELLATION_NOTE,
        })
    }

    /// Cancel a confirmed reservation.
    ///
    /// # Errors
    ///
    /// `ToolError::InvalidInput` for unknown ids;
    /// `ToolError::ExecutionFailed` for already-cancelled or checked-in
    /// bookings.
    pub async fn cancel_booking(&self, booking_id: &str) -> Result<CancellationNotice, ToolError> {
        let mut state = self.state.write().await;
        let booking = state
            .bookings
            .get_mut(booking_id)
            .ok_or_else(|| unknown_booking(booking_id))?;

        match booking.status {
            BookingStatus::Cancelled => Err(ToolError::ExecutionFailed {
                reason: format!("booking {booking_id} is already cancelled"),
            }),
            BookingStatus::CheckedIn => Err(ToolError::ExecutionFailed {
                reason: format!(
                    "booking {booking_id} has already been checked in and cannot be \
                     cancelled online, please contact the front desk"
                ),
            }),
            BookingStatus::Confirmed => {
                booking.status = BookingStatus::Cancelled;
                let refund = booking.total_cost;
                Ok(CancellationNotice {
                    booking: booking.clone(),
                    refund,
                    note: format!(
                        "Refund of ${refund:.2} will be processed within 5-7 business days \
                         (subject to the 48-hour cancellation policy)."
                    ),
                })
            }
        }
    }

    /// Change the dates of a confirmed reservation and recompute its total.
    ///
    /// # Errors
    ///
    /// `ToolError::InvalidInput` for unknown ids or malformed dates;
    /// `ToolError::ExecutionFailed` when the booking is not in `confirmed`
    /// state.
    pub async fn modify_booking(
        &self,
        booking_id: &str,
        new_check_in: Option<&str>,
        new_check_out: Option<&str>,
    ) -> Result<ModificationSummary, ToolError> {
        let ci_override = match new_check_in {
            Some(raw) => Some(parse_date(raw)?),
            None => None,
        };
        let co_override = match new_check_out {
            Some(raw) => Some(parse_date(raw)?),
            None => None,
        };

        let mut state = self.state.write().await;
        let booking = state
            .bookings
            .get_mut(booking_id)
            .ok_or_else(|| unknown_booking(booking_id))?;

        if booking.status != BookingStatus::Confirmed {
            return Err(ToolError::ExecutionFailed {
                reason: format!(
                    "booking {booking_id} (status: {}) cannot be modified",
                    booking.status.as_str()
                ),
            });
        }

        let room = find_room(&booking.room_type)?;
        let ci = ci_override.unwrap_or(booking.check_in);
        let co = co_override.unwrap_or(booking.check_out);
        let nights = (co - ci).num_days();
        if nights <= 0 {
            return Err(ToolError::InvalidInput {
                reason: "check-out must be after check-in".to_string(),
            });
        }
        let new_total = round2(room.rate_per_night * nights as f64);

        let mut changes = Vec::new();
        if ci != booking.check_in {
            changes.push(format!("check-in: {} -> {ci}", booking.check_in));
            booking.check_in = ci;
        }
        if co != booking.check_out {
            changes.push(format!("check-out: {} -> {co}", booking.check_out));
            booking.check_out = co;
        }
        if new_total != booking.total_cost {
            changes.push(format!("total: ${:.2} -> ${new_total:.2}", booking.total_cost));
            booking.total_cost = new_total;
        }

        Ok(ModificationSummary {
            booking: booking.clone(),
            nights,
            changes,
        })
    }

    /// Itemized bill for a booking. A booking with no posted charges yields
    /// an empty bill rather than a failure.
    ///
    /// # Errors
    ///
    /// `ToolError::InvalidInput` when the booking id is unknown.
    pub async fn bill(&self, booking_id: &str) -> Result<Bill, ToolError> {
        let state = self.state.read().await;
        if let Some(bill) = state.bills.get(booking_id) {
            return Ok(bill.clone());
        }

        let booking = state
            .bookings
            .get(booking_id)
            .ok_or_else(|| unknown_booking(booking_id))?;

        Ok(Bill {
            booking_id: booking.booking_id.clone(),
            guest_name: booking.guest_name.clone(),
            items: Vec::new(),
            total: 0.0,
            paid: false,
        })
    }

    /// Post a refund as a negative line item dated the business date.
    ///
    /// # Errors
    ///
    /// `ToolError::InvalidInput` when no bill exists or the amount is not
    /// positive; `ToolError::ExecutionFailed` when the amount exceeds the
    /// current bill total.
    pub async fn process_refund(
        &self,
        booking_id: &str,
        amount: f64,
        reason: &str,
    ) -> Result<RefundReceipt, ToolError> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(ToolError::InvalidInput {
                reason: "refund amount must be positive".to_string(),
            });
        }

        let mut state = self.state.write().await;
        let bill = state.bills.get_mut(booking_id).ok_or_else(|| {
            ToolError::InvalidInput {
                reason: format!("no bill found for booking '{booking_id}'"),
            }
        })?;

        if amount > bill.total {
            return Err(ToolError::ExecutionFailed {
                reason: format!(
                    "refund amount ${amount:.2} exceeds the current bill total ${:.2}",
                    bill.total
                ),
            });
        }

        bill.items.push(BillItem {
            date: business_date(),
            description: format!("REFUND: {reason}"),
            amount: -amount,
        });
        bill.total = round2(bill.total - amount);

        Ok(RefundReceipt {
            booking_id: booking_id.to_string(),
            amount,
            reason: reason.to_string(),
            new_total: bill.total,
            note: REFUND_NOTE,
        })
    }

    /// Apply a promo code as a percentage off the current bill total.
    ///
    /// # Errors
    ///
    /// `ToolError::InvalidInput` for unknown ids or codes;
    /// `ToolError::ExecutionFailed` when no charges have been posted yet.
    pub async fn apply_discount(
        &self,
        booking_id: &str,
        promo_code: &str,
    ) -> Result<DiscountReceipt, ToolError> {
        let code = promo_code.trim().to_uppercase();
        let pct = PROMO_CODES
            .iter()
            .find(|(known, _)| *known == code)
            .map(|(_, pct)| *pct)
            .ok_or_else(|| ToolError::InvalidInput {
                reason: format!("invalid promo code '{promo_code}'"),
            })?;

        let mut state = self.state.write().await;
        if !state.bookings.contains_key(booking_id) {
            return Err(unknown_booking(booking_id));
        }
        let bill = state.bills.get_mut(booking_id).ok_or_else(|| {
            ToolError::ExecutionFailed {
                reason: format!("no charges have been posted to booking {booking_id} yet"),
            }
        })?;

        let percent_off = (pct * 100.0).round() as u32;
        let discount = round2(bill.total * pct);
        bill.items.push(BillItem {
            date: business_date(),
            description: format!("Discount ({code}, {percent_off}% off)"),
            amount: -discount,
        });
        bill.total = round2(bill.total - discount);

        Ok(DiscountReceipt {
            booking_id: booking_id.to_string(),
            promo_code: code,
            percent_off,
            discount,
            new_total: bill.total,
        })
    }
}

fn remaining_inventory(state: &FrontDeskState, room: &Room) -> u32 {
    let booked = state
        .bookings
        .values()
        .filter(|b| {
            b.room_type == room.key
                && matches!(b.status, BookingStatus::Confirmed | BookingStatus::CheckedIn)
        })
        .count() as u32;
    room.total_inventory.saturating_sub(booked)
}

/// Resolve a raw room-type string against the catalog. Matching is
/// case-insensitive and tolerates spaces in place of underscores.
fn find_room(raw: &str) -> Result<&'static Room, ToolError> {
    let key = raw.trim().to_lowercase().replace(' ', "_");
    catalog()
        .iter()
        .find(|room| room.key == key)
        .ok_or_else(|| ToolError::InvalidInput {
            reason: format!(
                "unknown room type '{raw}', available types: {}",
                catalog()
                    .iter()
                    .map(|room| room.key)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        })
}

fn unknown_booking(booking_id: &str) -> ToolError {
    ToolError::InvalidInput {
        reason: format!("no booking found with id '{booking_id}'"),
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, ToolError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| ToolError::InvalidInput {
        reason: format!("invalid date '{raw}', use YYYY-MM-DD"),
    })
}

fn parse_stay(check_in: &str, check_out: &str) -> Result<(NaiveDate, NaiveDate, i64), ToolError> {
    let ci = parse_date(check_in)?;
    let co = parse_date(check_out)?;
    let nights = (co - ci).num_days();
    if nights <= 0 {
        return Err(ToolError::InvalidInput {
            reason: "check-out must be after check-in".to_string(),
        });
    }
    Ok((ci, co, nights))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid seed date")
}

fn seed_bookings() -> Vec<Booking> {
    vec![
        Booking {
            booking_id: "BK-1001".to_string(),
            guest_name: "Alice Johnson".to_string(),
            room_type: "deluxe".to_string(),
            check_in: date(2026, 3, 10),
            check_out: date(2026, 3, 14),
            total_cost: 876.0,
            status: BookingStatus::Confirmed,
        },
        Booking {
            booking_id: "BK-1002".to_string(),
            guest_name: "Bob Smith".to_string(),
            room_type: "premium_suite".to_string(),
            check_in: date(2026, 3, 15),
            check_out: date(2026, 3, 18),
            total_cost: 1047.0,
            status: BookingStatus::Confirmed,
        },
        Booking {
            booking_id: "BK-1003".to_string(),
            guest_name: "Carol Williams".to_string(),
            room_type: "standard".to_string(),
            check_in: date(2026, 3, 20),
            check_out: date(2026, 3, 22),
            total_cost: 298.0,
            status: BookingStatus::CheckedIn,
        },
    ]
}

fn seed_bills() -> Vec<Bill> {
    vec![
        Bill {
            booking_id: "BK-1001".to_string(),
            guest_name: "Alice Johnson".to_string(),
            items: vec![
                BillItem {
                    date: date(2026, 3, 10),
                    description: "Deluxe Room (4 nights)".to_string(),
                    amount: 876.0,
                },
                BillItem {
                    date: date(2026, 3, 11),
                    description: "Room Service - Dinner".to_string(),
                    amount: 62.50,
                },
                BillItem {
                    date: date(2026, 3, 12),
                    description: "Spa - Swedish Massage".to_string(),
                    amount: 120.0,
                },
                BillItem {
                    date: date(2026, 3, 13),
                    description: "Mini-bar".to_string(),
                    amount: 35.0,
                },
            ],
            total: 1093.50,
            paid: false,
        },
        Bill {
            booking_id: "BK-1002".to_string(),
            guest_name: "Bob Smith".to_string(),
            items: vec![
                BillItem {
                    date: date(2026, 3, 15),
                    description: "Premium Suite (3 nights)".to_string(),
                    amount: 1047.0,
                },
                BillItem {
                    date: date(2026, 3, 15),
                    description: "Valet Parking (3 nights)".to_string(),
                    amount: 135.0,
                },
            ],
            total: 1182.0,
            paid: false,
        },
        Bill {
            booking_id: "BK-1003".to_string(),
            guest_name: "Carol Williams".to_string(),
            items: vec![
                BillItem {
                    date: date(2026, 3, 20),
                    description: "Standard Room (2 nights)".to_string(),
                    amount: 298.0,
                },
                BillItem {
                    date: date(2026, 3, 20),
                    description: "Breakfast Buffet x2".to_string(),
                    amount: 56.0,
                },
            ],
            total: 354.0,
            paid: false,
        },
    ]
}
