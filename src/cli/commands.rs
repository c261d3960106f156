use super::output::{self, Rendered};
use super::{Cli, Commands, OutputFormat, Verbosity};
use crate::codec::Address;
use crate::engine::{CancelHandle, Cancellation, InvocationEngine};
use crate::gateway::RpcGateway;
use crate::signer::{KeypairSigner, SignerGateway};
use crate::{BetMarket, ClientConfig, ClientError};
use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Environment variable holding the signing key (`S…`).
pub const ENV_SECRET_KEY: &str = "BETS_SECRET_KEY";

/// Execute the parsed command line.
pub async fn run(cli: Cli) -> Result<()> {
    let verbosity = cli.verbosity();
    let format = cli.output;
    let config = load_config(&cli)?;

    let rendered = match cli.command {
        Commands::Status => status(&config, format).await?,
        Commands::Address => {
            let signer = signer_from_env()?;
            signer.request_access().await?;
            output::address(format, &signer.address().await?)
        }
        command => {
            config.validate()?;
            let signer = Arc::new(signer_from_env()?);
            let caller = signer.public_address();
            let node = Arc::new(RpcGateway::new(config.rpc_url.clone(), config.request_timeout)?);
            let engine = InvocationEngine::new(config, node, signer);
            let (handle, cancel) = Cancellation::new();
            cancel_on_ctrl_c(handle);
            let market = BetMarket::new(engine).with_cancellation(cancel.clone());
            dispatch(command, &market, caller, &cancel, format, verbosity).await?
        }
    };
    rendered.print()
}

fn load_config(cli: &Cli) -> Result<ClientConfig> {
    let mut config = ClientConfig::load(cli.config.as_deref())?;
    if let Some(url) = &cli.rpc_url {
        config.rpc_url = url.clone();
    }
    if let Some(passphrase) = &cli.network_passphrase {
        config.network_passphrase = passphrase.clone();
    }
    if let Some(id) = &cli.contract_id {
        config.contract_id = Some(id.clone());
    }
    if let Some(id) = &cli.token_id {
        config.token_id = Some(id.clone());
    }
    debug!(rpc_url = %config.rpc_url, "Loaded configuration");
    Ok(config)
}

fn signer_from_env() -> Result<KeypairSigner> {
    let secret = std::env::var(ENV_SECRET_KEY)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| {
            ClientError::SignerUnavailable(format!("{} is not set", ENV_SECRET_KEY))
        })?;
    Ok(KeypairSigner::from_secret(&secret)?)
}

fn cancel_on_ctrl_c(handle: CancelHandle) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, cancelling");
            handle.cancel();
        }
    });
}

async fn dispatch(
    command: Commands,
    market: &BetMarket,
    caller: Address,
    cancel: &Cancellation,
    format: OutputFormat,
    verbosity: Verbosity,
) -> Result<Rendered> {
    let progress = verbosity.shows_progress() && format == OutputFormat::Text;
    let rendered = match command {
        Commands::Create(args) => {
            let id = with_spinner(
                progress,
                "Creating bet...",
                market.create_bet(caller, &args.question, args.options.as_slice()),
            )
            .await
            .map_err(explain)?;
            output::created(format, id)
        }
        Commands::Place(args) => {
            with_spinner(
                progress,
                "Placing bet...",
                market.place_bet(caller, args.bet_id, args.option, args.amount),
            )
            .await
            .map_err(explain)?;
            output::done(
                format,
                &format!("Staked {} on option {} of bet {}", args.amount, args.option, args.bet_id),
            )
        }
        Commands::Resolve(args) => {
            with_spinner(
                progress,
                "Resolving bet...",
                market.resolve_bet(caller, args.bet_id, args.winning_option),
            )
            .await
            .map_err(explain)?;
            output::done(
                format,
                &format!("Bet {} resolved to option {}", args.bet_id, args.winning_option),
            )
        }
        Commands::Claim(args) => {
            with_spinner(
                progress,
                "Claiming winnings...",
                market.claim_winnings(caller, args.bet_id),
            )
            .await
            .map_err(explain)?;
            output::done(format, &format!("Claimed winnings from bet {}", args.bet_id))
        }
        Commands::Get(args) => match market.get_bet(args.bet_id).await? {
            Some(bet) => output::bet(format, &bet, Some(&caller)),
            None => output::not_found(format, args.bet_id),
        },
        Commands::List => output::bets(format, &market.list_bets().await?, Some(&caller)),
        Commands::Count => output::count(format, market.get_bets_count().await?),
        Commands::Await(args) => {
            let result = with_spinner(
                progress,
                "Waiting for transaction...",
                market.engine().await_transaction(&args.hash, cancel),
            )
            .await
            .map_err(explain)?;
            output::transaction(format, &args.hash, result.value.map(|v| v.to_json()))
        }
        Commands::Status | Commands::Address => {
            anyhow::bail!("command does not invoke the contract")
        }
    };
    Ok(rendered)
}

async fn status(config: &ClientConfig, format: OutputFormat) -> Result<Rendered> {
    let node = RpcGateway::new(config.rpc_url.clone(), config.request_timeout)?;
    let health = node.get_health().await?;
    let network = node.check_network(&config.network_passphrase).await?;
    Ok(output::status(format, node.url(), &health, &network))
}

async fn with_spinner<T>(
    enabled: bool,
    message: &'static str,
    fut: impl Future<Output = crate::Result<T>>,
) -> crate::Result<T> {
    if !enabled {
        return fut.await;
    }
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        spinner.set_style(style.tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ "));
    }
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    let result = fut.await;
    spinner.finish_and_clear();
    result
}

/// Point the user at `await` when a submitted transaction's fate is open.
fn explain(err: ClientError) -> anyhow::Error {
    let hint = match &err {
        ClientError::UnknownOutcome { hash, .. } | ClientError::Undecodable { hash, .. } => {
            Some(hash.clone())
        }
        ClientError::Network { hash: Some(hash), .. } => Some(hash.clone()),
        _ => None,
    };
    match hint {
        Some(hash) => anyhow::Error::new(err).context(format!(
            "transaction {} may still be applied; check with `soroban-bets await {}`",
            hash, hash
        )),
        None => err.into(),
    }
}
