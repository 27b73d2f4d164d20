// ********* Input data structures ***********

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::Display;

/// The base admission category of a seat bucket or a candidate.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum Category {
    Gen,
    Obc,
    Sc,
    St,
    Ews,
}

impl Category {
    pub fn tag(&self) -> &'static str {
        match self {
            Category::Gen => "GEN",
            Category::Obc => "OBC",
            Category::Sc => "SC",
            Category::St => "ST",
            Category::Ews => "EWS",
        }
    }
}

/// Who may hold a seat in a bucket.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum GenderScope {
    FemaleOnly,
    FemaleAndMale,
}

/// Whether a bucket is reserved for disability-flagged candidates.
///
/// The common disability pool is not a bucket and is configured
/// separately on the catalog: it caps how many disability-flagged
/// candidates may enter an `Open` bucket ahead of round order.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum DisabilityScope {
    Open,
    Reserved,
}

/// The typed composite key of a seat bucket.
///
/// Rendered for operators as `GEN_FandM`, `OBC_Female_PWD`, etc.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub struct BucketKey {
    pub category: Category,
    pub gender: GenderScope,
    pub disability: DisabilityScope,
}

impl BucketKey {
    pub const fn new(category: Category, gender: GenderScope, disability: DisabilityScope) -> BucketKey {
        BucketKey {
            category,
            gender,
            disability,
        }
    }

    /// An ordinary (non disability-reserved) bucket.
    pub const fn open(category: Category, gender: GenderScope) -> BucketKey {
        BucketKey::new(category, gender, DisabilityScope::Open)
    }

    /// A disability-reserved bucket.
    pub const fn reserved(category: Category, gender: GenderScope) -> BucketKey {
        BucketKey::new(category, gender, DisabilityScope::Reserved)
    }
}

impl Display for BucketKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let gender = match self.gender {
            GenderScope::FemaleOnly => "Female",
            GenderScope::FemaleAndMale => "FandM",
        };
        write!(f, "{}_{}", self.category.tag(), gender)?;
        if self.disability == DisabilityScope::Reserved {
            write!(f, "_PWD")?;
        }
        Ok(())
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum Gender {
    Female,
    Male,
}

/// An applicant, immutable once registered.
///
/// `registration_id` is the cross-institute identifier used by the
/// consolidated decision reports. `application_no` is the own-institute
/// number under which the applicant appears in decision uploads; the
/// two numbering schemes are joined through this record.
#[derive(PartialEq, Debug, Clone)]
pub struct Candidate {
    pub registration_id: String,
    pub application_no: String,
    pub full_name: String,
    /// Merit score. Candidates without a score are never eligible.
    pub score: Option<f64>,
    pub category: Category,
    pub ews: bool,
    pub gender: Gender,
    pub disability: bool,
}

impl Candidate {
    /// The category whose buckets this candidate competes in, after the
    /// economically-weaker flag is applied.
    pub fn reserved_category(&self) -> Category {
        if self.ews {
            Category::Ews
        } else {
            self.category
        }
    }
}

// ******** Decision ledger rows *********

/// Decision submitted on an own-institute offer.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum OwnDecision {
    AcceptAndFreeze,
    RejectAndWait,
    RetainAndWait,
    /// Treated with the same upgrade priority as [`OwnDecision::RetainAndWait`].
    AcceptAndWait,
}

/// Decision reported by another institute in the same admission system.
/// Recorded for audit; the eligibility rules rely on the consolidated
/// report instead.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum OtherInstituteDecision {
    AcceptAndFreeze,
    Other,
}

/// Consolidated cross-institute decision.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum ConsolidatedDecision {
    AcceptAndFreeze,
    Other,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct OwnDecisionRow {
    pub application_no: String,
    pub decision: OwnDecision,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct OtherInstituteRow {
    pub application_no: String,
    pub decision: OtherInstituteDecision,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ConsolidatedRow {
    pub registration_id: String,
    pub decision: ConsolidatedDecision,
}

// ******** Output data structures *********

/// Audit label attached to an offer. Does not feed back into the
/// allocation rules; the decision ledger does.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum OfferStatus {
    FirstOffer,
    DisabilityPriority,
    Upgraded,
}

impl Display for OfferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            OfferStatus::FirstOffer => "Offered",
            OfferStatus::DisabilityPriority => "Offered (Common PWD)",
            OfferStatus::Upgraded => "Offered (Upgrade)",
        };
        write!(f, "{}", label)
    }
}

/// One seat offer. Identified by `(round_no, registration_id)`; never
/// mutated, only superseded by a later round's row.
#[derive(PartialEq, Debug, Clone)]
pub struct Offer {
    pub round_no: u32,
    pub registration_id: String,
    pub bucket: BucketKey,
    /// Merit score at the time of the offer.
    pub score: f64,
    pub status: OfferStatus,
}

/// Capacity and irrevocably consumed seats of one bucket.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct BucketQuota {
    pub capacity: u32,
    pub confirmed: u32,
}

/// The common disability pool: a priority allowance, not a seat pool.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct PoolQuota {
    pub total: u32,
    pub consumed: u32,
}

/// Quota snapshot entering a round: static capacities combined with the
/// recalculated confirmed counts, the common pool pulled out separately.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct QuotaState {
    pub buckets: BTreeMap<BucketKey, BucketQuota>,
    pub pool: PoolQuota,
}

/// Result of running one round. Scarcity is a value, never an error.
#[derive(PartialEq, Debug, Clone)]
pub enum RoundOutcome {
    Offers(Vec<Offer>),
    NoEligibleCandidates,
}

// ******** Catalog *********

/// Operator-set seat capacities plus the common disability pool total.
///
/// Capacities become immutable once a round has produced offers
/// referencing the bucket; [`crate::SeatAllocator`] enforces this.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct QuotaCatalog {
    pub(crate) buckets: BTreeMap<BucketKey, u32>,
    pub(crate) pool_total: u32,
}

impl QuotaCatalog {
    pub fn new() -> QuotaCatalog {
        QuotaCatalog::default()
    }

    pub fn set_bucket(&mut self, key: BucketKey, capacity: u32) {
        self.buckets.insert(key, capacity);
    }

    pub fn set_pool(&mut self, total: u32) {
        self.pool_total = total;
    }

    pub fn capacity(&self, key: &BucketKey) -> Option<u32> {
        self.buckets.get(key).copied()
    }

    pub fn pool_total(&self) -> u32 {
        self.pool_total
    }

    pub fn bucket_keys(&self) -> impl Iterator<Item = &BucketKey> {
        self.buckets.keys()
    }
}

// ******** Errors *********

/// Errors that abort an operation on the allocator.
///
/// Scarcity (a candidate or a round finding no capacity) is not listed
/// here: it is part of the result values.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum AllocationError {
    /// Two candidates registered under the same cross-institute id.
    DuplicateCandidate { registration_id: String },
    /// Two candidates registered under the same application number.
    DuplicateApplication { application_no: String },
    /// The bucket is referenced by existing offers; its capacity can no
    /// longer be edited.
    CapacityFrozen { bucket: BucketKey },
    /// Disability-priority offers exist; the pool total can no longer
    /// be edited.
    PoolFrozen,
    /// A decision row references an applicant missing from the
    /// candidate store. The whole upload is rejected.
    UnknownApplicant { identifier: String },
    /// Two decision rows for the same applicant in one upload.
    DuplicateDecision { identifier: String },
    /// A decision references an offer that does not exist in the offer
    /// ledger for that round. Points at inconsistent uploads.
    MissingOfferForDecision {
        registration_id: String,
        round_no: u32,
    },
    /// More confirmed seats than capacity in a bucket. Indicates a
    /// round-logic or data bug, never a normal state.
    ConfirmedExceedsCapacity { bucket: BucketKey },
    /// Rounds are numbered from 1.
    InvalidRound { round_no: u32 },
    /// The operation needs this round to have produced offers first.
    RoundNotGenerated { round_no: u32 },
    /// A later round has been generated; this round can no longer be
    /// regenerated or reset without resetting the later one first.
    LaterRoundGenerated { round_no: u32 },
    /// Decision uploads for this round are required before the next
    /// round can be generated.
    DecisionsMissing { round_no: u32 },
    /// Decisions were already uploaded against this round's offers;
    /// reset the round before regenerating it.
    DecisionsAlreadyUploaded { round_no: u32 },
}

impl Error for AllocationError {}

impl Display for AllocationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AllocationError::DuplicateCandidate { registration_id } => {
                write!(f, "duplicate registration id {}", registration_id)
            }
            AllocationError::DuplicateApplication { application_no } => {
                write!(f, "duplicate application number {}", application_no)
            }
            AllocationError::CapacityFrozen { bucket } => {
                write!(f, "bucket {} is referenced by offers, capacity is frozen", bucket)
            }
            AllocationError::PoolFrozen => {
                write!(f, "disability-priority offers exist, the common pool is frozen")
            }
            AllocationError::UnknownApplicant { identifier } => {
                write!(f, "decision references unknown applicant {}", identifier)
            }
            AllocationError::DuplicateDecision { identifier } => {
                write!(f, "more than one decision row for applicant {}", identifier)
            }
            AllocationError::MissingOfferForDecision {
                registration_id,
                round_no,
            } => write!(
                f,
                "candidate {} has a decision for round {} but no offer row",
                registration_id, round_no
            ),
            AllocationError::ConfirmedExceedsCapacity { bucket } => {
                write!(f, "bucket {} has more confirmed seats than capacity", bucket)
            }
            AllocationError::InvalidRound { round_no } => {
                write!(f, "invalid round number {}", round_no)
            }
            AllocationError::RoundNotGenerated { round_no } => {
                write!(f, "round {} has not been generated", round_no)
            }
            AllocationError::LaterRoundGenerated { round_no } => {
                write!(f, "round {} has already been generated", round_no)
            }
            AllocationError::DecisionsMissing { round_no } => {
                write!(f, "decision uploads for round {} are missing", round_no)
            }
            AllocationError::DecisionsAlreadyUploaded { round_no } => {
                write!(
                    f,
                    "decisions already uploaded for round {}, reset it before regenerating",
                    round_no
                )
            }
        }
    }
}
