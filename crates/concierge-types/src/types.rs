use serde::{Deserialize, Serialize};

/// Guest-message intent categories.
///
/// `Intent` is the fixed classification set produced by the router. Every
/// turn carries exactly one intent before the specialist stage runs; the
/// intent selects which specialist profile handles the message.
///
/// # Example
///
/// ```rust
/// use concierge_types::Intent;
///
/// let intent = Intent::Booking;
/// assert_eq!(intent.as_str(), "booking");
/// assert_eq!(Intent::parse("billing"), Some(Intent::Billing));
/// assert_eq!(Intent::parse("weather"), None);
/// ```
///
/// # Serialization
///
/// `Intent` serializes to its lowercase string form (e.g. `"booking"`,
/// `"complaint"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    /// Reservations: availability, new bookings, changes, cancellations.
    Booking,
    /// Facilities and services: pool, spa, dining, hours.
    Amenities,
    /// Charges, invoices, refunds, discounts.
    Billing,
    /// Dissatisfaction with a stay or service.
    Complaint,
    /// Anything that fits none of the above.
    General,
}

impl Intent {
    /// All intents in routing-priority order.
    pub const ALL: [Self; 5] = [
        Self::Booking,
        Self::Amenities,
        Self::Billing,
        Self::Complaint,
        Self::General,
    ];

    /// Canonical lowercase name used in prompts, spans, and reports.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Booking => "booking",
            Self::Amenities => "amenities",
            Self::Billing => "billing",
            Self::Complaint => "complaint",
            Self::General => "general",
        }
    }

    /// Parse a classifier-produced intent string.
    ///
    /// Returns `None` for anything outside the enumerated set; the caller
    /// decides whether that is a classification failure or a policy
    /// fallback.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "booking" => Some(Self::Booking),
            "amenities" => Some(Self::Amenities),
            "billing" => Some(Self::Billing),
            "complaint" | "complaints" => Some(Self::Complaint),
            "general" => Some(Self::General),
            _ => None,
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pipeline stages, used for span names and error context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Router,
    Specialist,
    Review,
    Lifecycle,
}

impl Stage {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Router => "router",
            Self::Specialist => "specialist",
            Self::Review => "review",
            Self::Lifecycle => "lifecycle",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// States of the per-turn state machine.
///
/// ```text
/// Routing → SpecialistActive → ReviewPending → LifecycleAssessment → Complete
///                    ↑              │
///                    └── Revision ──┘        (bounded loop-back)
/// ```
///
/// `Complete` and `Failed` are terminal. The degraded sub-paths (iteration
/// cap, review exhausted) still pass through `LifecycleAssessment` before
/// `Complete`; only unrecoverable router/gateway failures reach `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    Routing,
    SpecialistActive,
    ReviewPending,
    Revision,
    LifecycleAssessment,
    Complete,
    Failed,
}

impl TurnPhase {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Routing => "routing",
            Self::SpecialistActive => "specialist_active",
            Self::ReviewPending => "review_pending",
            Self::Revision => "revision",
            Self::LifecycleAssessment => "lifecycle_assessment",
            Self::Complete => "complete",
            Self::Failed => "failed",
        }
    }

    /// Whether this phase ends the turn.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }
}

impl std::fmt::Display for TurnPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Guest sentiment detected by the lifecycle stage.
///
/// Three-value scale; `Negative` is the strong signal that participates in
/// the escalation rule. Milder dissatisfaction lands on `Neutral`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Neutral => "neutral",
            Self::Negative => "negative",
        }
    }

    /// Parse a model-produced sentiment label.
    ///
    /// `"frustrated"` is accepted as an alias for `negative` since assessor
    /// models are prone to emitting it for upset guests.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "positive" => Some(Self::Positive),
            "neutral" => Some(Self::Neutral),
            "negative" | "frustrated" => Some(Self::Negative),
            _ => None,
        }
    }

    /// Numeric value recorded as the `guest_sentiment` trace score.
    #[must_use]
    pub const fn score(&self) -> f64 {
        match self {
            Self::Positive => 1.0,
            Self::Neutral => 0.5,
            Self::Negative => 0.0,
        }
    }
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final interaction status of a completed turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStatus {
    /// The request was handled to completion within the turn.
    Resolved,
    /// The request needs further turns (e.g. a pending booking).
    InProgress,
    /// A human must take over.
    Escalated,
}

impl LifecycleStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Resolved => "resolved",
            Self::InProgress => "in_progress",
            Self::Escalated => "escalated",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "resolved" => Some(Self::Resolved),
            "in_progress" => Some(Self::InProgress),
            "escalated" => Some(Self::Escalated),
            _ => None,
        }
    }
}

impl std::fmt::Display for LifecycleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Policy-bounded conditions that degrade a turn without failing it.
///
/// Recorded on the turn report and as span attributes; a turn carrying one
/// of these still terminates in `Complete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Degradation {
    /// The specialist hit the tool-loop cap before producing a final draft.
    IterationCapReached,
    /// The review/specialist loop ran out of budget; the best draft was
    /// force-approved.
    ReviewExhausted,
}

impl Degradation {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::IterationCapReached => "iteration_cap_reached",
            Self::ReviewExhausted => "review_exhausted",
        }
    }
}

/// Approve/revise decision from the review gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewDecision {
    Approved,
    Revise,
}

/// One review pass over a specialist draft.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewAssessment {
    pub decision: ReviewDecision,
    /// Quality score on the 1-10 scale.
    pub score: u8,
    /// Concrete problems the reviewer found.
    pub issues: Vec<String>,
    /// Guidance for the specialist if a re-run happens.
    pub suggestions: Option<String>,
    /// Inline rewrite supplied by the reviewer, if any.
    pub revised_response: Option<String>,
    /// True when the reviewer reply did not parse and defaults were used.
    pub parse_fallback: bool,
}

impl ReviewAssessment {
    #[must_use]
    pub const fn approved(&self) -> bool {
        matches!(self.decision, ReviewDecision::Approved)
    }

    /// Rationale string appended to specialist context on a revision re-run.
    #[must_use]
    pub fn rationale(&self) -> String {
        let mut parts = Vec::new();
        if !self.issues.is_empty() {
            parts.push(format!("Issues: {}", self.issues.join("; ")));
        }
        if let Some(suggestions) = &self.suggestions {
            parts.push(format!("Suggestions: {suggestions}"));
        }
        if parts.is_empty() {
            parts.push("The previous draft did not pass review.".to_string());
        }
        parts.join(" ")
    }
}

/// Signal extracted from the lifecycle model call, before the deterministic
/// escalation rules are applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleSignal {
    /// Model's status suggestion; overridden to `Escalated` when a rule fires.
    pub status_suggestion: LifecycleStatus,
    pub sentiment: Sentiment,
    pub follow_up_needed: bool,
    pub notes: Option<String>,
    /// True when the lifecycle call failed or did not parse and the neutral
    /// defaults were substituted.
    pub degraded: bool,
}

impl LifecycleSignal {
    /// Neutral defaults used when the lifecycle model call cannot be used.
    #[must_use]
    pub const fn fallback() -> Self {
        Self {
            status_suggestion: LifecycleStatus::Resolved,
            sentiment: Sentiment::Neutral,
            follow_up_needed: false,
            notes: None,
            degraded: true,
        }
    }
}

/// Final lifecycle outcome of a turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleResult {
    pub status: LifecycleStatus,
    pub sentiment: Sentiment,
    pub escalated: bool,
    /// Human-readable reason when `escalated` is true.
    pub escalation_reason: Option<String>,
    pub follow_up_needed: bool,
    pub notes: Option<String>,
}

/// Terminal result of one processed turn, returned to the API layer.
///
/// Fully populated by pipeline end and immutable afterwards; re-invoking the
/// pipeline produces a new report with a fresh correlation id, never a
/// mutation of a prior one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnReport {
    /// Trace correlation id (UUID v4) shared by every span of this turn.
    pub correlation_id: String,
    pub session_id: String,
    /// The approved (or best-effort) response text for the guest.
    pub final_response: String,
    pub intent: Intent,
    /// Confidence the router reported for `intent`, in [0, 1].
    pub confidence: f64,
    /// Name of the specialist profile that produced the response.
    pub specialist_used: String,
    pub lifecycle_status: LifecycleStatus,
    pub sentiment: Sentiment,
    pub escalated: bool,
    /// Last review score on the 1-10 scale.
    pub review_score: u8,
    /// Policy-bounded conditions hit while producing the response.
    pub degradations: Vec<Degradation>,
    pub follow_up_needed: bool,
}

impl TurnReport {
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        !self.degradations.is_empty()
    }
}
