use clap::Args;

#[derive(Args, Debug, Clone)]
pub struct CreateArgs {
    /// The question being bet on
    pub question: String,

    /// Possible outcomes
    #[arg(required = true, num_args = 1..)]
    pub options: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct PlaceArgs {
    pub bet_id: u64,

    /// Index of the option to back, starting at 0
    pub option: u32,

    /// Stake in whole token units, e.g. 10.5
    pub amount: f64,
}

#[derive(Args, Debug, Clone)]
pub struct ResolveArgs {
    pub bet_id: u64,

    /// Index of the winning option, starting at 0
    pub winning_option: u32,
}

#[derive(Args, Debug, Clone)]
pub struct ClaimArgs {
    pub bet_id: u64,
}

#[derive(Args, Debug, Clone)]
pub struct GetArgs {
    pub bet_id: u64,
}

#[derive(Args, Debug, Clone)]
pub struct AwaitArgs {
    /// Hex transaction hash reported by an earlier command
    pub hash: String,
}
