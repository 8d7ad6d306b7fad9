//! Tool execution capability for the concierge pipeline.
//!
//! This crate holds the [`Tool`] trait and name-keyed [`ToolRegistry`], the
//! in-memory front-desk store the builtin reservation and billing tools run
//! against, and the [`KnowledgeStore`] retrieval seam behind
//! `search_hotel_info`.
//!
//! Tool failures are structured [`ToolError`](concierge_types::ToolError)s
//! and stay recoverable: the dispatcher feeds them back into the handler
//! conversation as failure observations instead of aborting the turn.

pub mod billing_tools;
pub mod booking_tools;
pub mod front_desk;
pub mod knowledge;
pub mod registry;

pub use front_desk::FrontDesk;
pub use knowledge::{KnowledgeStore, MemoryKnowledgeStore, Passage, SearchHotelInfo};
pub use registry::{Tool, ToolRegistry};
