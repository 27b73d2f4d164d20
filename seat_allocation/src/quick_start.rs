/*!

# Quick start

This example runs a two-round session end to end from the command line.
It assumes three small CSV files exported from your admission
spreadsheets.

`candidates.csv`:

```text
Registration Id,Application No,Full Name,Category,EWS,Gender,PWD,Score
COAP-101,A-101,Anna,GEN,No,Female,No,91.25
COAP-102,A-102,Bikram,OBC,No,Male,Yes,88.00
COAP-103,A-103,Chetan,GEN,No,Male,No,83.50
```

`r1_own.csv` (the decisions that came back after round 1):

```text
Application No,Applicant Decision
A-101,Accept and Freeze
A-103,Retain and Wait
```

Write a session file `session.json`:

```javascript
{
    "programName": "M.Tech CSE",
    "candidateSource": { "provider": "csv", "filePath": "candidates.csv" },
    "seatMatrix": {
        "GEN_FandM": 2,
        "OBC_FandM": 1,
        "COMMON_PWD": 1
    },
    "rounds": [
        {
            "round": 1,
            "ownDecisions": { "provider": "csv", "filePath": "r1_own.csv" }
        }
    ]
}
```

Run the tool:

```bash
seatalloc --config session.json --out summary.json
```

You should see the rounds unfold in the log:

```text
[2026-03-02T10:12:41Z INFO  seat_allocation] run_round: round 1: 3 eligible candidates, 0 upgrade claims
[2026-03-02T10:12:41Z INFO  seat_allocation] run_round: round 1: 3 offers made
[2026-03-02T10:12:41Z INFO  seat_allocation] ingest_decisions: round 1: 2 own, 0 other-institute, 0 consolidated rows
[2026-03-02T10:12:41Z INFO  seat_allocation] run_round: round 2: 1 eligible candidates, 1 upgrade claims
[2026-03-02T10:12:41Z INFO  seat_allocation] run_round: round 2: 1 offers made
```

Anna froze her seat after round 1, Bikram entered through the common
disability pool, and Chetan retained his round-1 seat and keeps it in
round 2 with an upgrade claim. The details of every offer and the quota
state entering each round are in `summary.json`.

To pin a session's behavior down in a test harness, store a known-good
summary and pass it back with `--reference`: the run fails on any
difference.

If you are driving the engine from Rust instead of the command line,
start from [`crate::builder::Builder`] and the example on that page,
then follow the round lifecycle described in the [manual](../manual/index.html).

*/
