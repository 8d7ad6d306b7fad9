//! Stage implementations for the concierge pipeline.
//!
//! Four stages wrap the completion backend: the [`Router`] classifies a
//! guest message, a [`SpecialistProfile`] describes the domain handler the
//! dispatcher runs, the [`ReviewGate`] checks the draft, and the
//! [`LifecycleAssessor`] reads the finished interaction. The engine crate
//! owns the loop bounds and span emission around them; nothing here keeps
//! its own counters.

pub mod lifecycle;
pub mod profiles;
pub mod review;
pub mod router;

pub use lifecycle::{AssessmentInput, EscalationFacts, LifecycleAssessor};
pub use profiles::SpecialistProfile;
pub use review::{ReviewGate, ReviewInput};
pub use router::{Classification, Router};
