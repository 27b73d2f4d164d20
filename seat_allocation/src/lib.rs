mod config;
pub mod builder;
pub mod manual;
pub mod quick_start;

use log::{debug, info};

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

pub use crate::config::*;

// **** Private structures ****

type RoundId = u32;

// Working copy of one bucket during a round. The starting `taken`
// count is the number of confirmed (accept-and-freeze) seats.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
struct BucketLoad {
    capacity: u32,
    taken: u32,
}

impl BucketLoad {
    fn has_free(&self) -> bool {
        self.taken < self.capacity
    }
}

// Immutable-in, new-state-out snapshot consumed by the allocator.
#[derive(Eq, PartialEq, Debug, Clone)]
struct RoundSnapshot {
    buckets: BTreeMap<BucketKey, BucketLoad>,
    pool_free: u32,
}

impl RoundSnapshot {
    fn from_quota(quota: &QuotaState) -> RoundSnapshot {
        let buckets = quota
            .buckets
            .iter()
            .map(|(key, q)| {
                (
                    *key,
                    BucketLoad {
                        capacity: q.capacity,
                        taken: q.confirmed,
                    },
                )
            })
            .collect();
        RoundSnapshot {
            buckets,
            pool_free: quota.pool.total.saturating_sub(quota.pool.consumed),
        }
    }

    fn first_free(&self, keys: &[BucketKey]) -> Option<BucketKey> {
        keys.iter()
            .find(|key| self.buckets.get(key).map(|b| b.has_free()).unwrap_or(false))
            .copied()
    }

    fn take(&mut self, key: &BucketKey) {
        if let Some(load) = self.buckets.get_mut(key) {
            load.taken += 1;
        }
    }
}

/// The seat allocator: quota catalog, candidate store, decision ledger
/// and offer ledger, with the per-round operations on top.
///
/// All ledgers are single collections tagged with a round number;
/// round-scoped reads are ordinary filters. Every mutating operation is
/// all-or-nothing: it validates first and leaves the ledgers untouched
/// on any error.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct SeatAllocator {
    catalog: QuotaCatalog,
    // Input order is preserved: it is the merit tiebreak.
    candidates: Vec<Candidate>,
    by_registration: HashMap<String, usize>,
    by_application: HashMap<String, usize>,
    own_rows: Vec<(RoundId, OwnDecisionRow)>,
    other_rows: Vec<(RoundId, OtherInstituteRow)>,
    consolidated_rows: Vec<(RoundId, ConsolidatedRow)>,
    // Rounds with a recorded decision upload. An upload may legally
    // carry zero rows, so presence of rows cannot stand in for this.
    uploaded_rounds: BTreeSet<RoundId>,
    // Rounds that have produced offers, including zero-offer rounds.
    generated_rounds: BTreeSet<RoundId>,
    offers: Vec<Offer>,
}

impl SeatAllocator {
    pub fn new(catalog: QuotaCatalog, candidates: Vec<Candidate>) -> Result<SeatAllocator, AllocationError> {
        let mut by_registration: HashMap<String, usize> = HashMap::new();
        let mut by_application: HashMap<String, usize> = HashMap::new();
        for (idx, c) in candidates.iter().enumerate() {
            if by_registration.insert(c.registration_id.clone(), idx).is_some() {
                return Err(AllocationError::DuplicateCandidate {
                    registration_id: c.registration_id.clone(),
                });
            }
            if by_application.insert(c.application_no.clone(), idx).is_some() {
                return Err(AllocationError::DuplicateApplication {
                    application_no: c.application_no.clone(),
                });
            }
        }
        Ok(SeatAllocator {
            catalog,
            candidates,
            by_registration,
            by_application,
            ..SeatAllocator::default()
        })
    }

    // **** Catalog edits ****

    /// Sets a bucket capacity. Rejected once any offer references the
    /// bucket: seats already offered must not shrink underneath their
    /// holders.
    pub fn set_capacity(&mut self, bucket: BucketKey, capacity: u32) -> Result<(), AllocationError> {
        if self.offers.iter().any(|o| o.bucket == bucket) {
            return Err(AllocationError::CapacityFrozen { bucket });
        }
        self.catalog.set_bucket(bucket, capacity);
        Ok(())
    }

    /// Sets the common disability pool total. Rejected once any
    /// disability-priority offer exists.
    pub fn set_disability_pool(&mut self, total: u32) -> Result<(), AllocationError> {
        if self
            .offers
            .iter()
            .any(|o| o.status == OfferStatus::DisabilityPriority)
        {
            return Err(AllocationError::PoolFrozen);
        }
        self.catalog.set_pool(total);
        Ok(())
    }

    pub fn catalog(&self) -> &QuotaCatalog {
        &self.catalog
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn candidate(&self, registration_id: &str) -> Option<&Candidate> {
        self.by_registration
            .get(registration_id)
            .map(|idx| &self.candidates[*idx])
    }

    // **** Decision ingestion ****

    /// Records the three decision uploads for `round_no`, replacing any
    /// prior upload for that exact round.
    ///
    /// The round must have been generated first (decisions respond to
    /// offers). Every row must reference a known applicant and no
    /// applicant may appear twice within a table; any violation rejects
    /// the whole upload.
    pub fn ingest_decisions(
        &mut self,
        round_no: RoundId,
        own: Vec<OwnDecisionRow>,
        other: Vec<OtherInstituteRow>,
        consolidated: Vec<ConsolidatedRow>,
    ) -> Result<(), AllocationError> {
        if round_no == 0 {
            return Err(AllocationError::InvalidRound { round_no });
        }
        if !self.generated_rounds.contains(&round_no) {
            return Err(AllocationError::RoundNotGenerated { round_no });
        }

        let mut seen: HashSet<&str> = HashSet::new();
        for row in &own {
            if !self.by_application.contains_key(&row.application_no) {
                return Err(AllocationError::UnknownApplicant {
                    identifier: row.application_no.clone(),
                });
            }
            if !seen.insert(row.application_no.as_str()) {
                return Err(AllocationError::DuplicateDecision {
                    identifier: row.application_no.clone(),
                });
            }
        }
        let mut seen: HashSet<&str> = HashSet::new();
        for row in &other {
            if !self.by_application.contains_key(&row.application_no) {
                return Err(AllocationError::UnknownApplicant {
                    identifier: row.application_no.clone(),
                });
            }
            if !seen.insert(row.application_no.as_str()) {
                return Err(AllocationError::DuplicateDecision {
                    identifier: row.application_no.clone(),
                });
            }
        }
        let mut seen: HashSet<&str> = HashSet::new();
        for row in &consolidated {
            if !self.by_registration.contains_key(&row.registration_id) {
                return Err(AllocationError::UnknownApplicant {
                    identifier: row.registration_id.clone(),
                });
            }
            if !seen.insert(row.registration_id.as_str()) {
                return Err(AllocationError::DuplicateDecision {
                    identifier: row.registration_id.clone(),
                });
            }
        }

        info!(
            "ingest_decisions: round {}: {} own, {} other-institute, {} consolidated rows",
            round_no,
            own.len(),
            other.len(),
            consolidated.len()
        );

        self.own_rows.retain(|(r, _)| *r != round_no);
        self.other_rows.retain(|(r, _)| *r != round_no);
        self.consolidated_rows.retain(|(r, _)| *r != round_no);
        self.own_rows.extend(own.into_iter().map(|row| (round_no, row)));
        self.other_rows
            .extend(other.into_iter().map(|row| (round_no, row)));
        self.consolidated_rows
            .extend(consolidated.into_iter().map(|row| (round_no, row)));
        self.uploaded_rounds.insert(round_no);
        Ok(())
    }

    // **** Round driver ****

    /// Generates the offers of `round_no`.
    ///
    /// Rounds are generated strictly in sequence; every earlier round
    /// must have its decision uploads recorded. Re-running the highest
    /// generated round replaces its offers, as long as no decisions
    /// have been uploaded against them.
    pub fn run_round(&mut self, round_no: RoundId) -> Result<RoundOutcome, AllocationError> {
        if round_no == 0 {
            return Err(AllocationError::InvalidRound { round_no });
        }
        let last = self.last_generated();
        if round_no < last {
            return Err(AllocationError::LaterRoundGenerated { round_no: last });
        }
        if round_no > last + 1 {
            return Err(AllocationError::RoundNotGenerated {
                round_no: round_no - 1,
            });
        }
        if round_no == last && self.uploaded_rounds.contains(&round_no) {
            return Err(AllocationError::DecisionsAlreadyUploaded { round_no });
        }
        for r in 1..round_no {
            if !self.uploaded_rounds.contains(&r) {
                return Err(AllocationError::DecisionsMissing { round_no: r });
            }
        }

        let last_round = round_no - 1;
        let new_offers = {
            let (eligible, upgrades) = self.resolve_eligible(last_round)?;
            info!(
                "run_round: round {}: {} eligible candidates, {} upgrade claims",
                round_no,
                eligible.len(),
                upgrades.len()
            );
            if eligible.is_empty() {
                None
            } else {
                let quota = self.assemble_quota(last_round)?;
                debug!("run_round: round {}: quota entering round: {:?}", round_no, quota);
                let snapshot = RoundSnapshot::from_quota(&quota);
                let (offers, end_state) = allocate_round(round_no, &eligible, &upgrades, &snapshot);
                debug!("run_round: round {}: end state: {:?}", round_no, end_state);
                Some(offers)
            }
        };

        self.offers.retain(|o| o.round_no != round_no);
        self.generated_rounds.insert(round_no);
        match new_offers {
            None => {
                info!("run_round: round {}: no eligible candidates remain", round_no);
                Ok(RoundOutcome::NoEligibleCandidates)
            }
            Some(offers) => {
                info!("run_round: round {}: {} offers made", round_no, offers.len());
                self.offers.extend(offers.iter().cloned());
                Ok(RoundOutcome::Offers(offers))
            }
        }
    }

    /// Deletes the offers and the decision uploads of `round_no`,
    /// returning it to the ungenerated state. The only supported undo.
    pub fn reset_round(&mut self, round_no: RoundId) -> Result<(), AllocationError> {
        if round_no == 0 {
            return Err(AllocationError::InvalidRound { round_no });
        }
        if !self.generated_rounds.contains(&round_no) {
            return Err(AllocationError::RoundNotGenerated { round_no });
        }
        let last = self.last_generated();
        if round_no < last {
            return Err(AllocationError::LaterRoundGenerated { round_no: last });
        }
        info!("reset_round: round {}", round_no);
        self.offers.retain(|o| o.round_no != round_no);
        self.own_rows.retain(|(r, _)| *r != round_no);
        self.other_rows.retain(|(r, _)| *r != round_no);
        self.consolidated_rows.retain(|(r, _)| *r != round_no);
        self.uploaded_rounds.remove(&round_no);
        self.generated_rounds.remove(&round_no);
        Ok(())
    }

    // **** Read-only queries ****

    /// The offers of one round, in placement order.
    pub fn offers(&self, round_no: RoundId) -> Vec<Offer> {
        self.offers
            .iter()
            .filter(|o| o.round_no == round_no)
            .cloned()
            .collect()
    }

    pub fn all_offers(&self) -> &[Offer] {
        &self.offers
    }

    pub fn last_generated(&self) -> RoundId {
        self.generated_rounds.iter().next_back().copied().unwrap_or(0)
    }

    pub fn own_decisions(&self, round_no: RoundId) -> Vec<OwnDecisionRow> {
        self.own_rows
            .iter()
            .filter(|(r, _)| *r == round_no)
            .map(|(_, row)| row.clone())
            .collect()
    }

    pub fn other_institute_decisions(&self, round_no: RoundId) -> Vec<OtherInstituteRow> {
        self.other_rows
            .iter()
            .filter(|(r, _)| *r == round_no)
            .map(|(_, row)| row.clone())
            .collect()
    }

    pub fn consolidated_decisions(&self, round_no: RoundId) -> Vec<ConsolidatedRow> {
        self.consolidated_rows
            .iter()
            .filter(|(r, _)| *r == round_no)
            .map(|(_, row)| row.clone())
            .collect()
    }

    /// Registration ids of the candidates eligible for `round_no`, in
    /// merit order. Shares `run_round`'s preconditions on uploads.
    pub fn eligible(&self, round_no: RoundId) -> Result<Vec<String>, AllocationError> {
        if round_no == 0 {
            return Err(AllocationError::InvalidRound { round_no });
        }
        for r in 1..round_no {
            if !self.uploaded_rounds.contains(&r) {
                return Err(AllocationError::DecisionsMissing { round_no: r });
            }
        }
        let (eligible, _) = self.resolve_eligible(round_no - 1)?;
        Ok(eligible
            .iter()
            .map(|c| c.registration_id.clone())
            .collect())
    }

    /// The quota snapshot entering `round_no`: catalog capacities with
    /// the confirmed seats of rounds `1..round_no` subtracted, the
    /// common pool extracted separately.
    pub fn quota_state(&self, round_no: RoundId) -> Result<QuotaState, AllocationError> {
        if round_no == 0 {
            return Err(AllocationError::InvalidRound { round_no });
        }
        for r in 1..round_no {
            if !self.uploaded_rounds.contains(&r) {
                return Err(AllocationError::DecisionsMissing { round_no: r });
            }
        }
        self.assemble_quota(round_no - 1)
    }

    /// Recomputes, from scratch, how many seats of each bucket are
    /// irrevocably held after the decisions of rounds `1..=last_round`.
    ///
    /// Never cached: replaying a round stays correct no matter how many
    /// times its decisions were re-uploaded.
    pub fn confirmed_seats(
        &self,
        last_round: RoundId,
    ) -> Result<BTreeMap<BucketKey, u32>, AllocationError> {
        let mut confirmed: BTreeMap<BucketKey, u32> = BTreeMap::new();
        for offer in self.frozen_offers(last_round)? {
            *confirmed.entry(offer.bucket).or_insert(0) += 1;
        }
        Ok(confirmed)
    }

    // **** Internals ****

    // The offer rows held by candidates who accept-and-freeze'd them,
    // across rounds 1..=last_round. A freeze without a matching offer
    // row is a data-integrity error, not a row to skip.
    fn frozen_offers(&self, last_round: RoundId) -> Result<Vec<&Offer>, AllocationError> {
        let mut res: Vec<&Offer> = Vec::new();
        for (r, row) in &self.own_rows {
            if *r > last_round || row.decision != OwnDecision::AcceptAndFreeze {
                continue;
            }
            let idx = match self.by_application.get(&row.application_no) {
                Some(idx) => *idx,
                // Rows are validated against the store at ingestion.
                None => continue,
            };
            let registration_id = &self.candidates[idx].registration_id;
            let offer = self
                .offers
                .iter()
                .find(|o| o.round_no == *r && &o.registration_id == registration_id)
                .ok_or_else(|| AllocationError::MissingOfferForDecision {
                    registration_id: registration_id.clone(),
                    round_no: *r,
                })?;
            res.push(offer);
        }
        Ok(res)
    }

    fn assemble_quota(&self, last_round: RoundId) -> Result<QuotaState, AllocationError> {
        let frozen = self.frozen_offers(last_round)?;
        let mut confirmed: BTreeMap<BucketKey, u32> = BTreeMap::new();
        let mut pool_consumed: u32 = 0;
        for offer in frozen {
            *confirmed.entry(offer.bucket).or_insert(0) += 1;
            if offer.status == OfferStatus::DisabilityPriority {
                pool_consumed += 1;
            }
        }
        let mut buckets: BTreeMap<BucketKey, BucketQuota> = BTreeMap::new();
        for (key, capacity) in &self.catalog.buckets {
            let c = confirmed.remove(key).unwrap_or(0);
            if c > *capacity {
                return Err(AllocationError::ConfirmedExceedsCapacity { bucket: *key });
            }
            buckets.insert(
                *key,
                BucketQuota {
                    capacity: *capacity,
                    confirmed: c,
                },
            );
        }
        // Confirmed seats in a bucket the catalog no longer names.
        if let Some((key, _)) = confirmed.into_iter().next() {
            return Err(AllocationError::ConfirmedExceedsCapacity { bucket: key });
        }
        Ok(QuotaState {
            buckets,
            pool: PoolQuota {
                total: self.catalog.pool_total,
                consumed: pool_consumed,
            },
        })
    }

    // Eligible candidates for round last_round + 1, merit-sorted, plus
    // the upgrade map (candidate -> bucket they are entitled to keep).
    fn resolve_eligible(
        &self,
        last_round: RoundId,
    ) -> Result<(Vec<&Candidate>, HashMap<String, BucketKey>), AllocationError> {
        let mut excluded: HashSet<&str> = HashSet::new();
        let mut upgrades: HashMap<String, BucketKey> = HashMap::new();

        if last_round >= 1 {
            // Frozen anywhere in the system: out of all later rounds.
            for (r, row) in &self.own_rows {
                if *r <= last_round && row.decision == OwnDecision::AcceptAndFreeze {
                    if let Some(idx) = self.by_application.get(&row.application_no) {
                        excluded.insert(self.candidates[*idx].registration_id.as_str());
                    }
                }
            }
            for (r, row) in &self.consolidated_rows {
                if *r <= last_round && row.decision == ConsolidatedDecision::AcceptAndFreeze {
                    excluded.insert(row.registration_id.as_str());
                }
            }

            // The most recent own-institute decision decides between
            // reject-and-wait (out) and retain/accept-and-wait (in,
            // with a claim on the bucket held in that round).
            let mut latest: HashMap<&str, (RoundId, OwnDecision)> = HashMap::new();
            for (r, row) in &self.own_rows {
                if *r > last_round {
                    continue;
                }
                let entry = latest
                    .entry(row.application_no.as_str())
                    .or_insert((*r, row.decision));
                if *r >= entry.0 {
                    *entry = (*r, row.decision);
                }
            }
            for (application_no, (r, decision)) in latest {
                let idx = match self.by_application.get(application_no) {
                    Some(idx) => *idx,
                    None => continue,
                };
                let candidate = &self.candidates[idx];
                match decision {
                    OwnDecision::RejectAndWait => {
                        excluded.insert(candidate.registration_id.as_str());
                    }
                    OwnDecision::RetainAndWait | OwnDecision::AcceptAndWait => {
                        if excluded.contains(candidate.registration_id.as_str()) {
                            continue;
                        }
                        let offer = self
                            .offers
                            .iter()
                            .find(|o| {
                                o.round_no == r && o.registration_id == candidate.registration_id
                            })
                            .ok_or_else(|| AllocationError::MissingOfferForDecision {
                                registration_id: candidate.registration_id.clone(),
                                round_no: r,
                            })?;
                        upgrades.insert(candidate.registration_id.clone(), offer.bucket);
                    }
                    OwnDecision::AcceptAndFreeze => {
                        // Already excluded above.
                    }
                }
            }
        }

        let mut eligible: Vec<&Candidate> = self
            .candidates
            .iter()
            .filter(|c| c.score.is_some() && !excluded.contains(c.registration_id.as_str()))
            .collect();
        // Stable sort: input order breaks score ties.
        eligible.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        Ok((eligible, upgrades))
    }
}

// **** Allocation passes ****

// Eligibility guarantees a score.
fn merit(candidate: &Candidate) -> f64 {
    candidate.score.unwrap_or_default()
}

fn make_offer(round_no: RoundId, candidate: &Candidate, bucket: BucketKey, status: OfferStatus) -> Offer {
    Offer {
        round_no,
        registration_id: candidate.registration_id.clone(),
        bucket,
        score: merit(candidate),
        status,
    }
}

// Female candidates try the female-only variant before the combined one.
fn scoped_keys(category: Category, gender: Gender, scope: DisabilityScope) -> Vec<BucketKey> {
    let mut keys = Vec::new();
    if gender == Gender::Female {
        keys.push(BucketKey::new(category, GenderScope::FemaleOnly, scope));
    }
    keys.push(BucketKey::new(category, GenderScope::FemaleAndMale, scope));
    keys
}

// Common-pool pass targets: the candidate's own reserved-category
// ordinary buckets. Disability-reserved sub-buckets are never funded by
// the pool.
fn pool_keys(candidate: &Candidate) -> Vec<BucketKey> {
    scoped_keys(
        candidate.reserved_category(),
        candidate.gender,
        DisabilityScope::Open,
    )
}

// The fallback chain: general category first, then the candidate's own
// reserved/EWS category, then the upgrade-claim bucket as a last resort.
// Disability-flagged candidates walk the reserved variants of the chain.
fn priority_keys(candidate: &Candidate, claim: Option<BucketKey>) -> Vec<BucketKey> {
    let scope = if candidate.disability {
        DisabilityScope::Reserved
    } else {
        DisabilityScope::Open
    };
    let mut keys = scoped_keys(Category::Gen, candidate.gender, scope);
    let own = candidate.reserved_category();
    if own != Category::Gen {
        keys.extend(scoped_keys(own, candidate.gender, scope));
    }
    if let Some(bucket) = claim {
        if !keys.contains(&bucket) {
            keys.push(bucket);
        }
    }
    keys
}

// Runs the three allocation passes for one round. Pure: consumes a
// snapshot, returns the offers and the end-of-round state. Placements
// are irreversible within the round; there is no backtracking.
fn allocate_round(
    round_no: RoundId,
    eligible: &[&Candidate],
    upgrades: &HashMap<String, BucketKey>,
    snapshot: &RoundSnapshot,
) -> (Vec<Offer>, RoundSnapshot) {
    let mut state = snapshot.clone();
    let mut offers: Vec<Offer> = Vec::new();
    let mut placed: HashSet<&str> = HashSet::new();

    // Pass 1: common disability pool. Top-merit disability-flagged
    // candidates jump into their own ordinary bucket while the pool
    // and the target bucket both have headroom.
    for candidate in eligible.iter().filter(|c| c.disability) {
        if state.pool_free == 0 {
            break;
        }
        let keys = pool_keys(candidate);
        if let Some(key) = state.first_free(&keys) {
            state.take(&key);
            state.pool_free -= 1;
            placed.insert(candidate.registration_id.as_str());
            debug!(
                "allocate_round: round {}: {} -> {} via common pool",
                round_no, candidate.registration_id, key
            );
            offers.push(make_offer(round_no, candidate, key, OfferStatus::DisabilityPriority));
        } else {
            debug!(
                "allocate_round: round {}: no pool seat for {}",
                round_no, candidate.registration_id
            );
        }
    }

    // Pass 2: everyone not yet placed walks their priority chain; the
    // first bucket with a free seat wins.
    for candidate in eligible {
        if placed.contains(candidate.registration_id.as_str()) {
            continue;
        }
        let claim = upgrades.get(&candidate.registration_id).copied();
        let keys = priority_keys(candidate, claim);
        match state.first_free(&keys) {
            Some(key) => {
                state.take(&key);
                placed.insert(candidate.registration_id.as_str());
                let status = if claim.is_some() {
                    OfferStatus::Upgraded
                } else {
                    OfferStatus::FirstOffer
                };
                debug!(
                    "allocate_round: round {}: {} -> {} ({})",
                    round_no, candidate.registration_id, key, status
                );
                offers.push(make_offer(round_no, candidate, key, status));
            }
            None => {
                // Expected under seat scarcity; the candidate stays in
                // play for later rounds.
                debug!(
                    "allocate_round: round {}: no seat for {}",
                    round_no, candidate.registration_id
                );
            }
        }
    }

    (offers, state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Builder;

    fn cand(
        reg: &str,
        score: Option<f64>,
        category: Category,
        gender: Gender,
        ews: bool,
        disability: bool,
    ) -> Candidate {
        Candidate {
            registration_id: reg.to_string(),
            application_no: format!("APP-{}", reg),
            full_name: format!("Candidate {}", reg),
            score,
            category,
            ews,
            gender,
            disability,
        }
    }

    fn own(reg: &str, decision: OwnDecision) -> OwnDecisionRow {
        OwnDecisionRow {
            application_no: format!("APP-{}", reg),
            decision,
        }
    }

    fn elsewhere(reg: &str) -> ConsolidatedRow {
        ConsolidatedRow {
            registration_id: reg.to_string(),
            decision: ConsolidatedDecision::AcceptAndFreeze,
        }
    }

    const GEN_FM: BucketKey = BucketKey::open(Category::Gen, GenderScope::FemaleAndMale);
    const OBC_FM: BucketKey = BucketKey::open(Category::Obc, GenderScope::FemaleAndMale);
    const OBC_F: BucketKey = BucketKey::open(Category::Obc, GenderScope::FemaleOnly);
    const OBC_FM_PWD: BucketKey = BucketKey::reserved(Category::Obc, GenderScope::FemaleAndMale);

    // Catalog and candidates of the reference scenario: GEN_FandM 2,
    // OBC_FandM 1, pool 1; A(90 GEN), B(85 OBC, disabled), C(80 GEN),
    // D(70 GEN).
    fn reference_allocator() -> SeatAllocator {
        Builder::new()
            .bucket(GEN_FM, 2)
            .bucket(OBC_FM, 1)
            .disability_pool(1)
            .candidate(cand("A", Some(90.0), Category::Gen, Gender::Male, false, false))
            .candidate(cand("B", Some(85.0), Category::Obc, Gender::Male, false, true))
            .candidate(cand("C", Some(80.0), Category::Gen, Gender::Male, false, false))
            .candidate(cand("D", Some(70.0), Category::Gen, Gender::Male, false, false))
            .build()
            .unwrap()
    }

    fn offered(offers: &[Offer], reg: &str) -> Option<Offer> {
        offers.iter().find(|o| o.registration_id == reg).cloned()
    }

    #[test]
    fn reference_scenario_round_1() {
        let mut alloc = reference_allocator();
        let outcome = alloc.run_round(1).unwrap();
        let offers = match outcome {
            RoundOutcome::Offers(o) => o,
            x => panic!("unexpected outcome {:?}", x),
        };
        assert_eq!(offers.len(), 3);
        let b = offered(&offers, "B").unwrap();
        assert_eq!(b.bucket, OBC_FM);
        assert_eq!(b.status, OfferStatus::DisabilityPriority);
        assert_eq!(offered(&offers, "A").unwrap().bucket, GEN_FM);
        assert_eq!(offered(&offers, "C").unwrap().bucket, GEN_FM);
        // GEN_FandM exhausted and D is not OBC-eligible.
        assert!(offered(&offers, "D").is_none());
    }

    #[test]
    fn merit_ordering_within_bucket() {
        let mut alloc = Builder::new()
            .bucket(GEN_FM, 1)
            .candidate(cand("LOW", Some(60.0), Category::Gen, Gender::Male, false, false))
            .candidate(cand("HIGH", Some(95.0), Category::Gen, Gender::Male, false, false))
            .build()
            .unwrap();
        let offers = alloc.offers_of_round_1();
        assert_eq!(offers.len(), 1);
        assert_eq!(offers[0].registration_id, "HIGH");
    }

    impl SeatAllocator {
        // Test shorthand.
        fn offers_of_round_1(&mut self) -> Vec<Offer> {
            match self.run_round(1).unwrap() {
                RoundOutcome::Offers(o) => o,
                x => panic!("unexpected outcome {:?}", x),
            }
        }
    }

    #[test]
    fn null_scores_are_never_eligible() {
        let mut alloc = Builder::new()
            .bucket(GEN_FM, 2)
            .candidate(cand("N", None, Category::Gen, Gender::Male, false, false))
            .candidate(cand("S", Some(50.0), Category::Gen, Gender::Male, false, false))
            .build()
            .unwrap();
        assert_eq!(alloc.eligible(1).unwrap(), vec!["S".to_string()]);
        let offers = alloc.offers_of_round_1();
        assert_eq!(offers.len(), 1);
        assert_eq!(offers[0].registration_id, "S");
    }

    #[test]
    fn disability_pool_cap_holds() {
        let mut alloc = Builder::new()
            .bucket(OBC_FM, 2)
            .bucket(OBC_FM_PWD, 1)
            .disability_pool(1)
            .candidate(cand("P", Some(90.0), Category::Obc, Gender::Male, false, true))
            .candidate(cand("Q", Some(85.0), Category::Obc, Gender::Male, false, true))
            .build()
            .unwrap();
        let offers = alloc.offers_of_round_1();
        let pool_placements = offers
            .iter()
            .filter(|o| o.status == OfferStatus::DisabilityPriority)
            .count();
        assert_eq!(pool_placements, 1);
        assert_eq!(offered(&offers, "P").unwrap().bucket, OBC_FM);
        // The second disability candidate falls back to the reserved
        // sub-bucket in the ordinary pass.
        let q = offered(&offers, "Q").unwrap();
        assert_eq!(q.bucket, OBC_FM_PWD);
        assert_eq!(q.status, OfferStatus::FirstOffer);
    }

    #[test]
    fn pool_needs_a_free_target_bucket() {
        // The pool has headroom but the candidate's own bucket is full:
        // no pool placement, the reserved sub-bucket catches them.
        let mut alloc = Builder::new()
            .bucket(OBC_FM, 0)
            .bucket(OBC_FM_PWD, 1)
            .disability_pool(5)
            .candidate(cand("P", Some(90.0), Category::Obc, Gender::Male, false, true))
            .build()
            .unwrap();
        let offers = alloc.offers_of_round_1();
        assert_eq!(offers.len(), 1);
        assert_eq!(offers[0].bucket, OBC_FM_PWD);
        assert_eq!(offers[0].status, OfferStatus::FirstOffer);
    }

    #[test]
    fn female_bucket_tried_before_combined() {
        let mut alloc = Builder::new()
            .bucket(OBC_F, 1)
            .bucket(OBC_FM, 1)
            .candidate(cand("F", Some(70.0), Category::Obc, Gender::Female, false, false))
            .candidate(cand("M", Some(60.0), Category::Obc, Gender::Male, false, false))
            .build()
            .unwrap();
        let offers = alloc.offers_of_round_1();
        assert_eq!(offered(&offers, "F").unwrap().bucket, OBC_F);
        assert_eq!(offered(&offers, "M").unwrap().bucket, OBC_FM);
    }

    #[test]
    fn general_bucket_tried_before_own_category() {
        let mut alloc = Builder::new()
            .bucket(GEN_FM, 1)
            .bucket(OBC_FM, 1)
            .candidate(cand("O", Some(88.0), Category::Obc, Gender::Male, false, false))
            .build()
            .unwrap();
        let offers = alloc.offers_of_round_1();
        assert_eq!(offers[0].bucket, GEN_FM);
    }

    #[test]
    fn ews_flag_substitutes_the_base_category() {
        let ews_fm = BucketKey::open(Category::Ews, GenderScope::FemaleAndMale);
        let mut alloc = Builder::new()
            .bucket(ews_fm, 1)
            .candidate(cand("E", Some(75.0), Category::Gen, Gender::Male, true, false))
            .build()
            .unwrap();
        let offers = alloc.offers_of_round_1();
        assert_eq!(offers[0].bucket, ews_fm);
    }

    #[test]
    fn frozen_and_rejected_candidates_never_return() {
        let mut alloc = reference_allocator();
        alloc.run_round(1).unwrap();
        alloc
            .ingest_decisions(
                1,
                vec![own("A", OwnDecision::AcceptAndFreeze), own("C", OwnDecision::RejectAndWait)],
                vec![],
                vec![elsewhere("B")],
            )
            .unwrap();
        let eligible = alloc.eligible(2).unwrap();
        assert_eq!(eligible, vec!["D".to_string()]);

        // A froze, so one GEN seat is consumed and D takes the other.
        let offers = match alloc.run_round(2).unwrap() {
            RoundOutcome::Offers(o) => o,
            x => panic!("unexpected outcome {:?}", x),
        };
        assert_eq!(offers.len(), 1);
        assert_eq!(offers[0].registration_id, "D");
        assert_eq!(offers[0].bucket, GEN_FM);

        let quota = alloc.quota_state(2).unwrap();
        let gen = quota.buckets[&GEN_FM];
        assert_eq!(gen, BucketQuota { capacity: 2, confirmed: 1 });
        // The capacity invariant holds everywhere.
        assert!(quota.buckets.values().all(|b| b.confirmed <= b.capacity));
    }

    #[test]
    fn retained_candidates_keep_an_upgrade_claim() {
        let mut alloc = Builder::new()
            .bucket(OBC_FM, 1)
            .candidate(cand("S", Some(90.0), Category::Obc, Gender::Male, false, false))
            .candidate(cand("R", Some(80.0), Category::Obc, Gender::Male, false, false))
            .build()
            .unwrap();
        let offers = alloc.offers_of_round_1();
        assert_eq!(offers.len(), 1);
        assert_eq!(offers[0].registration_id, "S");

        alloc
            .ingest_decisions(1, vec![own("S", OwnDecision::RetainAndWait)], vec![], vec![])
            .unwrap();
        let offers = match alloc.run_round(2).unwrap() {
            RoundOutcome::Offers(o) => o,
            x => panic!("unexpected outcome {:?}", x),
        };
        let s = offered(&offers, "S").unwrap();
        assert_eq!(s.bucket, OBC_FM);
        assert_eq!(s.status, OfferStatus::Upgraded);
        assert!(offered(&offers, "R").is_none());

        // Accept-and-wait carries the identical claim.
        alloc
            .ingest_decisions(2, vec![own("S", OwnDecision::AcceptAndWait)], vec![], vec![])
            .unwrap();
        let offers = match alloc.run_round(3).unwrap() {
            RoundOutcome::Offers(o) => o,
            x => panic!("unexpected outcome {:?}", x),
        };
        assert_eq!(offered(&offers, "S").unwrap().status, OfferStatus::Upgraded);
    }

    #[test]
    fn no_eligible_candidates_is_a_normal_outcome() {
        let mut alloc = Builder::new()
            .bucket(GEN_FM, 1)
            .candidate(cand("A", Some(90.0), Category::Gen, Gender::Male, false, false))
            .build()
            .unwrap();
        alloc.run_round(1).unwrap();
        alloc
            .ingest_decisions(1, vec![own("A", OwnDecision::AcceptAndFreeze)], vec![], vec![])
            .unwrap();
        assert_eq!(alloc.run_round(2).unwrap(), RoundOutcome::NoEligibleCandidates);
        // The round still counts as generated.
        assert_eq!(alloc.last_generated(), 2);
    }

    #[test]
    fn recalculation_is_idempotent() {
        let mut alloc = reference_allocator();
        alloc.run_round(1).unwrap();
        alloc
            .ingest_decisions(1, vec![own("A", OwnDecision::AcceptAndFreeze)], vec![], vec![])
            .unwrap();
        let first = alloc.confirmed_seats(1).unwrap();
        let second = alloc.confirmed_seats(1).unwrap();
        assert_eq!(first, second);
        assert_eq!(first[&GEN_FM], 1);
    }

    #[test]
    fn reset_round_trip_reproduces_offers() {
        let mut alloc = reference_allocator();
        alloc.run_round(1).unwrap();
        alloc
            .ingest_decisions(
                1,
                vec![own("A", OwnDecision::AcceptAndFreeze), own("C", OwnDecision::RejectAndWait)],
                vec![],
                vec![],
            )
            .unwrap();
        alloc.run_round(2).unwrap();
        let original = alloc.offers(2);

        alloc.reset_round(2).unwrap();
        assert!(alloc.offers(2).is_empty());
        assert_eq!(alloc.last_generated(), 1);

        alloc.run_round(2).unwrap();
        assert_eq!(alloc.offers(2), original);
    }

    #[test]
    fn reset_also_drops_the_round_uploads() {
        let mut alloc = reference_allocator();
        alloc.run_round(1).unwrap();
        alloc
            .ingest_decisions(1, vec![own("A", OwnDecision::AcceptAndFreeze)], vec![], vec![])
            .unwrap();
        alloc.reset_round(1).unwrap();
        assert!(alloc.own_decisions(1).is_empty());
        // Round 2 now requires regenerating round 1 and re-uploading.
        assert_eq!(
            alloc.run_round(2),
            Err(AllocationError::RoundNotGenerated { round_no: 1 })
        );
    }

    #[test]
    fn freeze_without_offer_row_is_an_integrity_error() {
        let mut alloc = reference_allocator();
        alloc.run_round(1).unwrap();
        // D received no offer in round 1, yet a freeze is uploaded.
        alloc
            .ingest_decisions(1, vec![own("D", OwnDecision::AcceptAndFreeze)], vec![], vec![])
            .unwrap();
        assert_eq!(
            alloc.run_round(2),
            Err(AllocationError::MissingOfferForDecision {
                registration_id: "D".to_string(),
                round_no: 1,
            })
        );
    }

    #[test]
    fn state_machine_preconditions() {
        let mut alloc = reference_allocator();
        assert_eq!(alloc.run_round(0), Err(AllocationError::InvalidRound { round_no: 0 }));
        assert_eq!(
            alloc.run_round(2),
            Err(AllocationError::RoundNotGenerated { round_no: 1 })
        );
        assert_eq!(
            alloc.ingest_decisions(1, vec![], vec![], vec![]),
            Err(AllocationError::RoundNotGenerated { round_no: 1 })
        );
        alloc.run_round(1).unwrap();
        assert_eq!(
            alloc.run_round(2),
            Err(AllocationError::DecisionsMissing { round_no: 1 })
        );
        // Re-running round 1 is allowed until decisions land on it.
        alloc.run_round(1).unwrap();
        alloc.ingest_decisions(1, vec![], vec![], vec![]).unwrap();
        assert_eq!(
            alloc.run_round(1),
            Err(AllocationError::DecisionsAlreadyUploaded { round_no: 1 })
        );
        alloc.run_round(2).unwrap();
        assert_eq!(
            alloc.reset_round(1),
            Err(AllocationError::LaterRoundGenerated { round_no: 2 })
        );
    }

    #[test]
    fn capacity_is_frozen_once_offered() {
        let mut alloc = reference_allocator();
        alloc.run_round(1).unwrap();
        assert_eq!(
            alloc.set_capacity(GEN_FM, 5),
            Err(AllocationError::CapacityFrozen { bucket: GEN_FM })
        );
        assert_eq!(alloc.set_disability_pool(3), Err(AllocationError::PoolFrozen));
        // An untouched bucket can still be edited.
        let sc_fm = BucketKey::open(Category::Sc, GenderScope::FemaleAndMale);
        alloc.set_capacity(sc_fm, 4).unwrap();
        assert_eq!(alloc.catalog().capacity(&sc_fm), Some(4));
    }

    #[test]
    fn bad_uploads_are_rejected_wholesale() {
        let mut alloc = reference_allocator();
        alloc.run_round(1).unwrap();
        let res = alloc.ingest_decisions(
            1,
            vec![own("A", OwnDecision::AcceptAndFreeze), own("GHOST", OwnDecision::RejectAndWait)],
            vec![],
            vec![],
        );
        assert_eq!(
            res,
            Err(AllocationError::UnknownApplicant {
                identifier: "APP-GHOST".to_string()
            })
        );
        // Nothing from the upload landed in the ledger.
        assert!(alloc.own_decisions(1).is_empty());
        assert_eq!(
            alloc.run_round(2),
            Err(AllocationError::DecisionsMissing { round_no: 1 })
        );

        let res = alloc.ingest_decisions(
            1,
            vec![own("A", OwnDecision::RetainAndWait), own("A", OwnDecision::RejectAndWait)],
            vec![],
            vec![],
        );
        assert_eq!(
            res,
            Err(AllocationError::DuplicateDecision {
                identifier: "APP-A".to_string()
            })
        );
    }

    #[test]
    fn reupload_replaces_the_round_decisions() {
        let mut alloc = reference_allocator();
        alloc.run_round(1).unwrap();
        alloc
            .ingest_decisions(1, vec![own("A", OwnDecision::RejectAndWait)], vec![], vec![])
            .unwrap();
        alloc
            .ingest_decisions(1, vec![own("A", OwnDecision::RetainAndWait)], vec![], vec![])
            .unwrap();
        let rows = alloc.own_decisions(1);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].decision, OwnDecision::RetainAndWait);
        // A is retained, not excluded.
        assert!(alloc.eligible(2).unwrap().contains(&"A".to_string()));
    }

    #[test]
    fn duplicate_candidates_are_rejected_at_build() {
        let res = Builder::new()
            .bucket(GEN_FM, 1)
            .candidate(cand("X", Some(50.0), Category::Gen, Gender::Male, false, false))
            .candidate(cand("X", Some(60.0), Category::Gen, Gender::Male, false, false))
            .build();
        assert_eq!(
            res.err(),
            Some(AllocationError::DuplicateCandidate {
                registration_id: "X".to_string()
            })
        );
    }
}
