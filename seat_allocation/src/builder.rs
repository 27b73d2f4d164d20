pub use crate::config::*;
use crate::SeatAllocator;

/// A builder for assembling an allocator before the first round.
///
/// ```
/// pub use seat_allocation::builder::Builder;
/// pub use seat_allocation::{BucketKey, Candidate, Category, Gender, GenderScope};
/// # use seat_allocation::AllocationError;
///
/// let mut allocator = Builder::new()
///     .bucket(BucketKey::open(Category::Gen, GenderScope::FemaleAndMale), 2)
///     .disability_pool(1)
///     .candidate(Candidate {
///         registration_id: "COAP-001".to_string(),
///         application_no: "A-001".to_string(),
///         full_name: "Anna".to_string(),
///         score: Some(81.5),
///         category: Category::Gen,
///         ews: false,
///         gender: Gender::Female,
///         disability: false,
///     })
///     .build()?;
///
/// allocator.run_round(1)?;
///
/// # Ok::<(), AllocationError>(())
/// ```
#[derive(Default)]
pub struct Builder {
    pub(crate) _catalog: QuotaCatalog,
    pub(crate) _candidates: Vec<Candidate>,
}

impl Builder {
    pub fn new() -> Builder {
        Builder::default()
    }

    /// Declares a seat bucket with its capacity. Re-declaring a bucket
    /// overwrites the previous capacity.
    pub fn bucket(mut self, key: BucketKey, capacity: u32) -> Builder {
        self._catalog.set_bucket(key, capacity);
        self
    }

    /// Sets the total size of the common disability pool.
    pub fn disability_pool(mut self, total: u32) -> Builder {
        self._catalog.set_pool(total);
        self
    }

    pub fn candidate(mut self, candidate: Candidate) -> Builder {
        self._candidates.push(candidate);
        self
    }

    pub fn candidates(mut self, candidates: &[Candidate]) -> Builder {
        self._candidates.extend(candidates.iter().cloned());
        self
    }

    /// Validates the candidate list and produces the allocator.
    ///
    /// Duplicate registration ids or application numbers are rejected
    /// here, before any round can run.
    pub fn build(self) -> Result<SeatAllocator, AllocationError> {
        SeatAllocator::new(self._catalog, self._candidates)
    }
}
