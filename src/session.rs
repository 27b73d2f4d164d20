use log::{debug, info, warn};

use seat_allocation::*;
use snafu::{prelude::*, Snafu};

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
use crate::session::config_reader::*;
use crate::session::io_common::ParsedTable;

pub mod io_common;
pub mod io_csv;
pub mod io_xlsx;

#[derive(Debug, Snafu)]
pub enum SessionError {
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("No readable worksheet in {path}"))]
    EmptyExcel { path: String },
    #[snafu(display("Error opening CSV file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error reading a line of {path}"))]
    CsvLineParse { source: csv::Error, path: String },
    #[snafu(display("Error opening file"))]
    OpeningJson { source: std::io::Error },
    #[snafu(display("Error processing JSON"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Error writing the summary file"))]
    WritingSummary { source: std::io::Error },
    #[snafu(display(""))]
    MissingParentDir {},
    #[snafu(display("Column {column} is missing in {path}"))]
    MissingColumn { column: String, path: String },
    #[snafu(display("Row {lineno} of {path} has no value in column {column}"))]
    MissingValue {
        column: String,
        lineno: usize,
        path: String,
    },
    #[snafu(display("Allocation failed: {source}"))]
    Allocation { source: AllocationError },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type SessionResult<T> = Result<T, SessionError>;

pub mod config_reader {
    use crate::session::*;

    #[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
    pub struct FileSource {
        pub provider: String,
        #[serde(rename = "filePath")]
        pub file_path: String,
        #[serde(rename = "worksheetName")]
        pub worksheet_name: Option<String>,
    }

    /// The decision uploads that came back after one round of offers.
    /// A missing table is read as an upload with zero rows.
    #[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
    pub struct RoundSources {
        pub round: u32,
        #[serde(rename = "ownDecisions")]
        pub own_decisions: Option<FileSource>,
        #[serde(rename = "otherInstitute")]
        pub other_institute: Option<FileSource>,
        pub consolidated: Option<FileSource>,
    }

    #[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
    pub struct SessionConfig {
        #[serde(rename = "programName")]
        pub program_name: String,
        #[serde(rename = "candidateSource")]
        pub candidate_source: FileSource,
        #[serde(rename = "seatMatrix")]
        pub seat_matrix: BTreeMap<String, i64>,
        pub rounds: Vec<RoundSources>,
    }

    pub fn read_config(path: &str) -> SessionResult<SessionConfig> {
        let contents = fs::read_to_string(path).context(OpeningJsonSnafu {})?;
        let config: SessionConfig =
            serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
        Ok(config)
    }

    pub fn read_summary(path: String) -> SessionResult<JSValue> {
        let contents = fs::read_to_string(path).context(OpeningJsonSnafu {})?;
        debug!("read content: {:?}", contents);
        let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
        Ok(js)
    }
}

// **** Operator-facing value parsing ****

/// Parses an operator bucket name (`GEN_FandM`, `OBC_Female_PWD`, ...).
/// `COMMON_PWD` is the disability pool and maps to `None`.
fn parse_bucket_name(name: &str) -> SessionResult<Option<BucketKey>> {
    if name == "COMMON_PWD" {
        return Ok(None);
    }
    let parts: Vec<&str> = name.split('_').collect();
    let (category_s, gender_s, disability) = match parts.as_slice() {
        [c, g] => (*c, *g, DisabilityScope::Open),
        [c, g, "PWD"] => (*c, *g, DisabilityScope::Reserved),
        _ => whatever!("Cannot understand bucket name {:?}", name),
    };
    let category = parse_category(category_s)?;
    let gender = match gender_s {
        "Female" => GenderScope::FemaleOnly,
        "FandM" => GenderScope::FemaleAndMale,
        x => whatever!("Cannot understand gender scope {:?} in bucket name {:?}", x, name),
    };
    Ok(Some(BucketKey::new(category, gender, disability)))
}

/// Candidates with a blank category compete as general.
fn parse_category(s: &str) -> SessionResult<Category> {
    match s.trim().to_uppercase().as_str() {
        "" | "GEN" | "GENERAL" => Ok(Category::Gen),
        "OBC" => Ok(Category::Obc),
        "SC" => Ok(Category::Sc),
        "ST" => Ok(Category::St),
        "EWS" => Ok(Category::Ews),
        x => whatever!("Cannot understand category {:?}", x),
    }
}

fn parse_gender(s: &str) -> Gender {
    if s.trim().eq_ignore_ascii_case("female") {
        Gender::Female
    } else {
        Gender::Male
    }
}

fn parse_flag(s: &str) -> bool {
    s.trim().eq_ignore_ascii_case("yes")
}

fn parse_score(s: &str) -> SessionResult<Option<f64>> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    match trimmed.parse::<f64>() {
        Ok(x) => Ok(Some(x)),
        Err(_) => whatever!("Cannot understand score {:?}", s),
    }
}

/// The decision strings used by the own-institute upload. Anything else
/// is a data error: a typo here must not silently change an applicant's
/// eligibility.
fn parse_own_decision(s: &str) -> SessionResult<OwnDecision> {
    match s.trim() {
        "Accept and Freeze" => Ok(OwnDecision::AcceptAndFreeze),
        "Reject and Wait" => Ok(OwnDecision::RejectAndWait),
        "Retain and Wait" => Ok(OwnDecision::RetainAndWait),
        "Accept and Wait" => Ok(OwnDecision::AcceptAndWait),
        x => whatever!("Cannot understand applicant decision {:?}", x),
    }
}

fn parse_other_decision(s: &str) -> OtherInstituteDecision {
    if s.trim() == "Accept and Freeze" {
        OtherInstituteDecision::AcceptAndFreeze
    } else {
        OtherInstituteDecision::Other
    }
}

fn parse_consolidated_decision(s: &str) -> ConsolidatedDecision {
    if s.trim() == "Accept and Freeze" {
        ConsolidatedDecision::AcceptAndFreeze
    } else {
        ConsolidatedDecision::Other
    }
}

// **** Table conversions ****

fn catalog_from_matrix(matrix: &BTreeMap<String, i64>) -> SessionResult<QuotaCatalog> {
    let mut catalog = QuotaCatalog::new();
    for (name, capacity) in matrix {
        if *capacity < 0 {
            whatever!("Negative capacity {} for {:?} in the seat matrix", capacity, name);
        }
        match parse_bucket_name(name)? {
            Some(key) => catalog.set_bucket(key, *capacity as u32),
            None => catalog.set_pool(*capacity as u32),
        }
    }
    Ok(catalog)
}

fn candidates_from_table(table: &ParsedTable) -> SessionResult<Vec<Candidate>> {
    let reg_col = table.column("Registration Id")?;
    let app_col = table.column("Application No")?;
    let name_col = table.column("Full Name")?;
    let cat_col = table.column("Category")?;
    let ews_col = table.column("EWS")?;
    let gender_col = table.column("Gender")?;
    let pwd_col = table.column("PWD")?;
    let score_col = table.column("Score")?;

    let mut res: Vec<Candidate> = Vec::new();
    for idx in 0..table.rows.len() {
        let candidate = Candidate {
            registration_id: table.cell(idx, reg_col, "Registration Id")?.to_string(),
            application_no: table.cell(idx, app_col, "Application No")?.to_string(),
            full_name: table.cell(idx, name_col, "Full Name")?.to_string(),
            score: parse_score(table.cell(idx, score_col, "Score")?)?,
            category: parse_category(table.cell(idx, cat_col, "Category")?)?,
            ews: parse_flag(table.cell(idx, ews_col, "EWS")?),
            gender: parse_gender(table.cell(idx, gender_col, "Gender")?),
            disability: parse_flag(table.cell(idx, pwd_col, "PWD")?),
        };
        debug!("candidates_from_table: row {}: {:?}", idx + 2, candidate);
        res.push(candidate);
    }
    Ok(res)
}

fn own_rows_from_table(table: &ParsedTable) -> SessionResult<Vec<OwnDecisionRow>> {
    let app_col = table.column("Application No")?;
    let dec_col = table.column("Applicant Decision")?;
    let mut res: Vec<OwnDecisionRow> = Vec::new();
    for idx in 0..table.rows.len() {
        res.push(OwnDecisionRow {
            application_no: table.cell(idx, app_col, "Application No")?.to_string(),
            decision: parse_own_decision(table.cell(idx, dec_col, "Applicant Decision")?)?,
        });
    }
    Ok(res)
}

fn other_rows_from_table(table: &ParsedTable) -> SessionResult<Vec<OtherInstituteRow>> {
    let app_col = table.column("Application No")?;
    let dec_col = table.column("Other Institute Decision")?;
    let mut res: Vec<OtherInstituteRow> = Vec::new();
    for idx in 0..table.rows.len() {
        res.push(OtherInstituteRow {
            application_no: table.cell(idx, app_col, "Application No")?.to_string(),
            decision: parse_other_decision(table.cell(idx, dec_col, "Other Institute Decision")?),
        });
    }
    Ok(res)
}

fn consolidated_rows_from_table(table: &ParsedTable) -> SessionResult<Vec<ConsolidatedRow>> {
    let reg_col = table.column("Registration Id")?;
    let dec_col = table.column("Applicant Decision")?;
    let mut res: Vec<ConsolidatedRow> = Vec::new();
    for idx in 0..table.rows.len() {
        res.push(ConsolidatedRow {
            registration_id: table.cell(idx, reg_col, "Registration Id")?.to_string(),
            decision: parse_consolidated_decision(table.cell(idx, dec_col, "Applicant Decision")?),
        });
    }
    Ok(res)
}

fn read_table(root_path: &str, cfs: &FileSource) -> SessionResult<ParsedTable> {
    let p: PathBuf = [root_path, cfs.file_path.as_str()].iter().collect();
    let p2 = p.as_path().display().to_string();
    info!("Attempting to read table file {:?}", p2);
    match cfs.provider.as_str() {
        "csv" => io_csv::read_csv_table(p2),
        "xlsx" => io_xlsx::read_excel_table(p2, &cfs.worksheet_name),
        x => whatever!("Provider not implemented {:?}", x),
    }
}

// **** Summary output ****

fn round_summary_js(round_no: u32, offers: &[Offer], quota: &QuotaState) -> JSValue {
    let offers_js: Vec<JSValue> = offers
        .iter()
        .map(|o| {
            json!({
                "registrationId": o.registration_id,
                "bucket": o.bucket.to_string(),
                "score": o.score,
                "status": o.status.to_string(),
            })
        })
        .collect();
    let mut buckets: JSMap<String, JSValue> = JSMap::new();
    for (key, q) in &quota.buckets {
        buckets.insert(
            key.to_string(),
            json!({"capacity": q.capacity, "confirmed": q.confirmed}),
        );
    }
    json!({
        "round": round_no,
        "offers": offers_js,
        "quota": buckets,
        "commonPool": {"total": quota.pool.total, "consumed": quota.pool.consumed},
    })
}

fn build_summary_js(config: &SessionConfig, rounds: Vec<JSValue>) -> JSValue {
    json!({"program": config.program_name, "rounds": rounds})
}

// **** Driver ****

pub fn run_session(args: &Args) -> SessionResult<()> {
    let config = config_reader::read_config(args.config.as_str())?;
    info!("config: {:?}", config);

    let config_p = Path::new(args.config.as_str());
    let root_p = config_p.parent().context(MissingParentDirSnafu {})?;
    let root = root_p.display().to_string();

    let catalog = catalog_from_matrix(&config.seat_matrix)?;
    let candidates = candidates_from_table(&read_table(&root, &config.candidate_source)?)?;
    info!("run_session: {} candidates registered", candidates.len());

    let mut allocator = SeatAllocator::new(catalog, candidates).context(AllocationSnafu)?;

    let last_round = args
        .round
        .unwrap_or_else(|| config.rounds.iter().map(|r| r.round).max().unwrap_or(0) + 1);

    let mut rounds_js: Vec<JSValue> = Vec::new();
    for round_no in 1..=last_round {
        let outcome = allocator.run_round(round_no).context(AllocationSnafu)?;
        match &outcome {
            RoundOutcome::Offers(offers) => {
                info!("run_session: round {}: {} offers", round_no, offers.len())
            }
            RoundOutcome::NoEligibleCandidates => {
                info!("run_session: round {}: no eligible candidates remain", round_no)
            }
        }
        let quota = allocator.quota_state(round_no).context(AllocationSnafu)?;
        rounds_js.push(round_summary_js(round_no, &allocator.offers(round_no), &quota));

        if round_no == last_round {
            break;
        }
        let sources = match config.rounds.iter().find(|r| r.round == round_no) {
            Some(rs) => rs,
            None => whatever!("No decision uploads configured for round {}", round_no),
        };
        let own = match &sources.own_decisions {
            Some(cfs) => own_rows_from_table(&read_table(&root, cfs)?)?,
            None => Vec::new(),
        };
        let other = match &sources.other_institute {
            Some(cfs) => other_rows_from_table(&read_table(&root, cfs)?)?,
            None => Vec::new(),
        };
        let consolidated = match &sources.consolidated {
            Some(cfs) => consolidated_rows_from_table(&read_table(&root, cfs)?)?,
            None => Vec::new(),
        };
        allocator
            .ingest_decisions(round_no, own, other, consolidated)
            .context(AllocationSnafu)?;
    }

    let result_js = build_summary_js(&config, rounds_js);
    let pretty_js_stats = serde_json::to_string_pretty(&result_js).context(ParsingJsonSnafu {})?;
    match &args.out {
        Some(out_path) if out_path != "stdout" => {
            fs::write(out_path, &pretty_js_stats).context(WritingSummarySnafu {})?;
        }
        _ => println!("{}", pretty_js_stats),
    }

    // The reference summary, if provided for comparison
    if let Some(summary_p) = &args.reference {
        let summary_ref = config_reader::read_summary(summary_p.clone())?;
        let pretty_js_summary_ref =
            serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
        if pretty_js_summary_ref != pretty_js_stats {
            warn!("Found differences with the reference string");
            print_diff(
                pretty_js_summary_ref.as_str(),
                pretty_js_stats.as_ref(),
                "\n",
            );
            whatever!("Difference detected between calculated summary and reference summary")
        }
    }

    Ok(())
}
