//! Typed operations of the bet-market contract.
//!
//! Each write is checked against the current on-chain record first, so the
//! common contract-side rejections come back as [`BetError`] variants rather
//! than as an opaque simulation diagnostic.

use crate::codec::{to_minor_units, Address, Arg, Bet, NativeValue};
use crate::engine::{Cancellation, InvocationEngine, InvocationRequest, InvocationResult};
use crate::{BetError, ClientError, Result};
use futures_util::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, info};

/// How many `get_bet` reads `list_bets` keeps in flight.
const LIST_CONCURRENCY: usize = 8;

#[derive(Clone)]
pub struct BetMarket {
    engine: InvocationEngine,
    cancel: Cancellation,
}

impl BetMarket {
    pub fn new(engine: InvocationEngine) -> Self {
        Self {
            engine,
            cancel: Cancellation::never(),
        }
    }

    /// Observe `cancel` in every invocation made through this handle.
    pub fn with_cancellation(mut self, cancel: Cancellation) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn engine(&self) -> &InvocationEngine {
        &self.engine
    }

    async fn call(&self, request: InvocationRequest) -> Result<InvocationResult> {
        self.engine.invoke(&request, &self.cancel).await
    }

    /// Account used as the source of read-only simulations.
    async fn reader(&self) -> Result<Address> {
        self.engine.signer().address().await
    }

    /// Create a bet with `caller` as its oracle. Returns the new bet id.
    pub async fn create_bet<S: AsRef<str>>(
        &self,
        caller: Address,
        question: &str,
        options: &[S],
    ) -> Result<u64> {
        self.engine.config().contract()?;
        let question = question.trim();
        if question.is_empty() {
            return Err(BetError::EmptyQuestion.into());
        }
        let options: Vec<&str> = options.iter().map(|o| o.as_ref().trim()).collect();
        if let Some(index) = options.iter().position(|o| o.is_empty()) {
            return Err(BetError::EmptyOption(index).into());
        }
        if options.is_empty() {
            return Err(BetError::NoOptions.into());
        }

        let result = self
            .call(InvocationRequest::state_changing(
                "create_bet",
                vec![Arg::address(caller), Arg::string(question), Arg::strings(&options)],
                caller,
            ))
            .await?;
        let id = expect_u64("create_bet", result.value)?;
        info!(bet_id = id, "Created bet");
        Ok(id)
    }

    /// Stake `amount` major units on `option` of bet `bet_id`.
    pub async fn place_bet(
        &self,
        caller: Address,
        bet_id: u64,
        option: u32,
        amount: f64,
    ) -> Result<()> {
        self.engine.config().contract()?;
        let token = self.engine.config().token()?;
        let minor = to_minor_units(amount)?;

        let bet = self.require_bet(bet_id).await?;
        if bet.is_resolved {
            return Err(BetError::AlreadyResolved(bet_id).into());
        }
        check_option(&bet, option)?;
        if bet.stake_of(&caller).is_some() {
            return Err(BetError::AlreadyStaked {
                bet_id,
                account: caller.to_string(),
            }
            .into());
        }

        self.call(InvocationRequest::state_changing(
            "place_bet",
            vec![
                Arg::address(caller),
                Arg::u64(bet_id),
                Arg::u32(option),
                Arg::i128(minor),
                Arg::address(token),
            ],
            caller,
        ))
        .await?;
        info!(bet_id, option, amount = minor, "Placed bet");
        Ok(())
    }

    /// Declare `winning` the outcome of bet `bet_id`. Only its oracle may.
    pub async fn resolve_bet(&self, caller: Address, bet_id: u64, winning: u32) -> Result<()> {
        self.engine.config().contract()?;

        let bet = self.require_bet(bet_id).await?;
        if !bet.is_oracle(&caller) {
            return Err(BetError::NotOracle {
                bet_id,
                account: caller.to_string(),
            }
            .into());
        }
        if bet.is_resolved {
            return Err(BetError::AlreadyResolved(bet_id).into());
        }
        check_option(&bet, winning)?;

        self.call(InvocationRequest::state_changing(
            "resolve_bet",
            vec![Arg::address(caller), Arg::u64(bet_id), Arg::u32(winning)],
            caller,
        ))
        .await?;
        info!(bet_id, winning, "Resolved bet");
        Ok(())
    }

    /// Claim the caller's share of a resolved bet. Losing stakes are cleared
    /// without payout.
    pub async fn claim_winnings(&self, caller: Address, bet_id: u64) -> Result<()> {
        self.engine.config().contract()?;
        let token = self.engine.config().token()?;

        let bet = self.require_bet(bet_id).await?;
        if !bet.is_resolved {
            return Err(BetError::NotResolved(bet_id).into());
        }
        if bet.stake_of(&caller).is_none() {
            return Err(BetError::NoStake {
                bet_id,
                account: caller.to_string(),
            }
            .into());
        }

        self.call(InvocationRequest::state_changing(
            "claim_winnings",
            vec![Arg::address(caller), Arg::u64(bet_id), Arg::address(token)],
            caller,
        ))
        .await?;
        info!(bet_id, "Claimed winnings");
        Ok(())
    }

    /// `None` when no bet has this id.
    pub async fn get_bet(&self, bet_id: u64) -> Result<Option<Bet>> {
        self.engine.config().contract()?;
        let reader = self.reader().await?;
        let result = self
            .call(InvocationRequest::read_only(
                "get_bet",
                vec![Arg::u64(bet_id)],
                reader,
            ))
            .await?;
        match result.value {
            None => Ok(None),
            Some(value) => Bet::from_optional(&value),
        }
    }

    pub async fn get_bets_count(&self) -> Result<u64> {
        self.engine.config().contract()?;
        let reader = self.reader().await?;
        let result = self
            .call(InvocationRequest::read_only("get_bets_count", vec![], reader))
            .await?;
        expect_u64("get_bets_count", result.value)
    }

    /// Every bet, in id order. Ids run from 1 to the current count; ids with
    /// no record are skipped.
    pub async fn list_bets(&self) -> Result<Vec<Bet>> {
        let count = self.get_bets_count().await?;
        debug!(count, "Listing bets");
        let bets: Vec<Option<Bet>> = stream::iter(1..=count)
            .map(|id| self.get_bet(id))
            .buffered(LIST_CONCURRENCY)
            .try_collect()
            .await?;
        Ok(bets.into_iter().flatten().collect())
    }

    async fn require_bet(&self, bet_id: u64) -> Result<Bet> {
        self.get_bet(bet_id)
            .await?
            .ok_or_else(|| BetError::NotFound(bet_id).into())
    }
}

fn check_option(bet: &Bet, option: u32) -> Result<()> {
    if option as usize >= bet.options.len() {
        return Err(BetError::InvalidOption {
            bet_id: bet.id,
            option,
            options: bet.options.len(),
        }
        .into());
    }
    Ok(())
}

fn expect_u64(method: &str, value: Option<NativeValue>) -> Result<u64> {
    match value {
        Some(NativeValue::U64(v)) => Ok(v),
        Some(other) => Err(ClientError::Decode(format!(
            "{} returned {:?}, expected a u64",
            method, other
        ))),
        None => Err(ClientError::Decode(format!("{} returned nothing", method))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_must_be_u64() {
        assert_eq!(expect_u64("m", Some(NativeValue::U64(3))).unwrap(), 3);
        assert!(expect_u64("m", Some(NativeValue::U32(3))).is_err());
        assert!(expect_u64("m", None).is_err());
    }
}
