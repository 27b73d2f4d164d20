/*!

# Manual

This page documents the concepts of the `seat_allocation` library and the
session format of the `seatalloc` command-line tool built on top of it.

## Seat buckets

Seats are partitioned into *buckets*. A bucket is identified by three
typed components:

- the admission category (`GEN`, `OBC`, `SC`, `ST`, `EWS`),
- the gender scope (female-only, or female-and-male),
- whether the bucket is reserved for disability-flagged candidates.

Operators refer to buckets by names such as `GEN_FandM`, `OBC_Female` or
`SC_FandM_PWD`; [`crate::BucketKey`] renders those names through its
`Display` implementation. Each bucket carries a capacity set before the
first round.

On top of the buckets sits the *common disability pool* (`COMMON_PWD` in
operator reports). The pool is not a bucket: it holds no seats of its
own. It is an allowance of placements that lets the top-merit
disability-flagged candidates enter the ordinary bucket of their own
category ahead of the regular merit walk. Each such placement consumes
one pool slot and one seat of the target bucket.

## Candidates

A candidate record carries two identifiers: the cross-institute
registration id used by consolidated reports, and the own-institute
application number under which the candidate appears in decision
uploads. Candidates also carry a merit score; a candidate without a
score is never eligible. The order in which candidates are registered is
significant: it breaks ties between equal scores.

A candidate flagged as economically weaker competes in the `EWS` buckets
instead of the buckets of their base category.

## Rounds

Allocation proceeds in numbered rounds, starting at 1, strictly in
sequence:

1. [`crate::SeatAllocator::run_round`] computes the set of still-eligible
   candidates, recalculates the seats irrevocably confirmed by earlier
   rounds, and places the eligible candidates into the remaining free
   seats. The offers of the round are recorded in the offer ledger.
2. The offers go out to the candidates, and their decisions come back as
   three tabular uploads, recorded with
   [`crate::SeatAllocator::ingest_decisions`]:
   - the *own-institute* decisions, keyed by application number:
     `Accept and Freeze`, `Reject and Wait`, `Retain and Wait` or
     `Accept and Wait`;
   - the *other-institute* report (offers this institute's applicants
     accepted elsewhere), kept for audit;
   - the *consolidated* cross-institute report, keyed by registration
     id, whose `Accept and Freeze` rows remove candidates from all
     later rounds here.
3. The next round is generated, and so on.

Accepting and freezing a seat is final: the seat counts against its
bucket's capacity in every later round, and the candidate leaves the
process. Rejecting and waiting also leaves the process. Retaining (or
accepting) and waiting keeps the candidate in the running with a claim
on the bucket they already hold: they can only move up, and if nothing
better is free their current bucket is the last entry of their priority
chain.

The most recent upload for a round replaces the previous one, and
uploads are all-or-nothing: a single unknown applicant or duplicated row
rejects the whole upload. [`crate::SeatAllocator::reset_round`] is the
only undo: it deletes the offers and the uploads of the highest
generated round.

## The allocation passes

Each round places candidates in three steps:

1. **Common pool.** Disability-flagged candidates, in merit order, are
   placed into the ordinary bucket of their own category (female-only
   variant first for female candidates) while the pool has headroom and
   the bucket has a free seat.
2. **Priority chain.** Every candidate not placed by the pool walks, in
   merit order, a fixed chain of buckets: the general-category bucket
   first, then the bucket of their own category, each female-first, and
   finally the bucket retained from an earlier round if they hold one.
   Disability-flagged candidates walk the disability-reserved variants
   of the chain. The first bucket with a free seat wins; there is no
   backtracking. A candidate finding no free bucket simply receives no
   offer this round and stays in play.
3. **Labels.** Offers carry how they were produced: `Offered`,
   `Offered (Common PWD)` or `Offered (Upgrade)`.

Running out of seats or candidates is a normal outcome, reported through
[`crate::RoundOutcome`], never an error.

## Session files

The `seatalloc` binary drives a whole admission session from one JSON
configuration file:

```javascript
{
    "programName": "M.Tech CSE",
    // Candidate list. "provider" selects the reader: "csv" or "xlsx".
    "candidateSource": {
        "provider": "xlsx",
        "filePath": "candidates.xlsx",
        "worksheetName": "Sheet1"
    },
    // Operator bucket names to capacities. "COMMON_PWD" sets the pool.
    "seatMatrix": {
        "GEN_FandM": 14,
        "GEN_Female": 4,
        "OBC_FandM": 9,
        "GEN_FandM_PWD": 1,
        "COMMON_PWD": 2
    },
    // One entry per completed round, in order.
    "rounds": [
        {
            "round": 1,
            "ownDecisions": { "provider": "csv", "filePath": "r1_own.csv" },
            "otherInstitute": { "provider": "csv", "filePath": "r1_other.csv" },
            "consolidated": { "provider": "csv", "filePath": "r1_coap.csv" }
        }
    ]
}
```

The candidate file must carry the columns `Registration Id`,
`Application No`, `Full Name`, `Category`, `EWS`, `Gender`, `PWD` and
`Score`. Decision files carry `Application No` (or `Registration Id` for
the consolidated report) and the decision column. Headers are matched
exactly; a file with missing columns is rejected as a whole.

The tool generates rounds and ingests the listed uploads in order,
then generates one round past the last upload, and writes a JSON summary
of every round's offers and quota state to `--out` (or stdout). With
`--reference`, the summary is compared against a stored expected summary
and any difference fails the run.

*/
