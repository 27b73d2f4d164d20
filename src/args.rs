use clap::Parser;

/// This is a round-based seat allocation program for academic admissions.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path) The JSON session description: candidate file, seat matrix and the
    /// decision uploads of each completed round. For more information about the file
    /// format, read the documentation.
    #[clap(short, long, value_parser)]
    pub config: String,

    /// (integer, optional) The last round to generate. Defaults to one round past the
    /// last decision upload listed in the session description.
    #[clap(long, value_parser)]
    pub round: Option<u32>,

    /// (file path, 'stdout' or empty) If specified, the summary of the session will be
    /// written in JSON format to the given location.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path) A reference file containing the expected session summary in JSON
    /// format. If provided, seatalloc will check that the computed summary matches the
    /// reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
