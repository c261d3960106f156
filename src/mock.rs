//! Scripted node and signer for exercising the engine without a network.
//!
//! [`MockGateway`] answers simulations per invoked function name and plays
//! back scripted submission and status sequences; the last scripted item
//! repeats once a script runs out. Every call is counted so tests can assert
//! which steps ran.

use crate::builder::{SignedEnvelope, UnsignedEnvelope};
use crate::codec::{encode, Address, NativeValue, WireType};
use crate::gateway::{
    AccountState, NodeGateway, SimulationOutcome, SimulationSuccess, SubmissionResult,
    SubmitStatus, TransactionStatus,
};
use crate::signer::SignerGateway;
use crate::{ClientError, Result, Step};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use stellar_xdr::curr::{ScMap, ScMapEntry, ScSymbol, ScVal};

type Responder = Arc<dyn Fn(&[ScVal]) -> SimulationOutcome + Send + Sync>;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Replays queued items, then keeps repeating the last one.
#[derive(Debug)]
struct Script<T> {
    queue: VecDeque<T>,
    last: T,
}

impl<T: Clone> Script<T> {
    fn new(last: T) -> Self {
        Self {
            queue: VecDeque::new(),
            last,
        }
    }

    fn set(&mut self, items: Vec<T>) {
        self.queue = items.into();
    }

    fn next(&mut self) -> T {
        if let Some(item) = self.queue.pop_front() {
            self.last = item;
        }
        self.last.clone()
    }
}

/// Successful simulation returning `value`, with no footprint or auth.
pub fn simulated(value: ScVal) -> SimulationOutcome {
    SimulationOutcome::Success(SimulationSuccess {
        return_value: Some(value),
        transaction_data: None,
        min_resource_fee: 0,
        auth: Vec::new(),
        latest_ledger: 1,
    })
}

#[derive(Debug, Default)]
struct Counters {
    fetch_account: AtomicU32,
    simulate: AtomicU32,
    submit: AtomicU32,
    poll: AtomicU32,
}

pub struct MockGateway {
    sequence: Mutex<Option<i64>>,
    unreachable: AtomicBool,
    submit_hangs: AtomicBool,
    simulations: Mutex<HashMap<String, SimulationOutcome>>,
    responders: Mutex<HashMap<String, Responder>>,
    default_simulation: Mutex<SimulationOutcome>,
    submissions: Mutex<Script<SubmitStatus>>,
    statuses: Mutex<Script<TransactionStatus>>,
    simulated: Mutex<Vec<UnsignedEnvelope>>,
    submitted: Mutex<Vec<SignedEnvelope>>,
    calls: Counters,
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGateway {
    /// Every account exists with sequence 100, simulations return void,
    /// submissions are accepted and the first poll reports success.
    pub fn new() -> Self {
        Self {
            sequence: Mutex::new(Some(100)),
            unreachable: AtomicBool::new(false),
            submit_hangs: AtomicBool::new(false),
            simulations: Mutex::new(HashMap::new()),
            responders: Mutex::new(HashMap::new()),
            default_simulation: Mutex::new(simulated(ScVal::Void)),
            submissions: Mutex::new(Script::new(SubmitStatus::Pending)),
            statuses: Mutex::new(Script::new(TransactionStatus::Success { return_value: None })),
            simulated: Mutex::new(Vec::new()),
            submitted: Mutex::new(Vec::new()),
            calls: Counters::default(),
        }
    }

    pub fn set_sequence(&self, sequence: i64) {
        *lock(&self.sequence) = Some(sequence);
    }

    /// `fetch_account` reports `AccountNotFound` from now on.
    pub fn set_account_missing(&self) {
        *lock(&self.sequence) = None;
    }

    /// Every call fails with a transport error.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// `submit` never completes.
    pub fn set_submit_hangs(&self, hangs: bool) {
        self.submit_hangs.store(hangs, Ordering::SeqCst);
    }

    /// Answer simulations of `function` with `outcome`.
    pub fn on_simulate(&self, function: &str, outcome: SimulationOutcome) {
        lock(&self.simulations).insert(function.to_string(), outcome);
    }

    pub fn on_simulate_value(&self, function: &str, value: ScVal) {
        self.on_simulate(function, simulated(value));
    }

    /// Answer simulations of `function` by looking at the call's arguments.
    /// Takes precedence over [`MockGateway::on_simulate`].
    pub fn on_simulate_with<F>(&self, function: &str, responder: F)
    where
        F: Fn(&[ScVal]) -> SimulationOutcome + Send + Sync + 'static,
    {
        lock(&self.responders).insert(function.to_string(), Arc::new(responder));
    }

    pub fn set_default_simulation(&self, outcome: SimulationOutcome) {
        *lock(&self.default_simulation) = outcome;
    }

    pub fn script_submissions(&self, statuses: Vec<SubmitStatus>) {
        lock(&self.submissions).set(statuses);
    }

    pub fn script_statuses(&self, statuses: Vec<TransactionStatus>) {
        lock(&self.statuses).set(statuses);
    }

    pub fn fetch_account_calls(&self) -> u32 {
        self.calls.fetch_account.load(Ordering::SeqCst)
    }

    pub fn simulate_calls(&self) -> u32 {
        self.calls.simulate.load(Ordering::SeqCst)
    }

    pub fn submit_calls(&self) -> u32 {
        self.calls.submit.load(Ordering::SeqCst)
    }

    pub fn poll_calls(&self) -> u32 {
        self.calls.poll.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> u32 {
        self.fetch_account_calls() + self.simulate_calls() + self.submit_calls() + self.poll_calls()
    }

    /// Envelopes passed to `simulate`, in call order.
    pub fn simulated_envelopes(&self) -> Vec<UnsignedEnvelope> {
        lock(&self.simulated).clone()
    }

    pub fn submitted_envelopes(&self) -> Vec<SignedEnvelope> {
        lock(&self.submitted).clone()
    }

    fn check_reachable(&self, step: Step) -> Result<()> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(ClientError::network(step, "connection refused"));
        }
        Ok(())
    }
}

#[async_trait]
impl NodeGateway for MockGateway {
    async fn fetch_account(&self, account: &Address) -> Result<AccountState> {
        self.calls.fetch_account.fetch_add(1, Ordering::SeqCst);
        self.check_reachable(Step::FetchAccount)?;
        let sequence = (*lock(&self.sequence))
            .ok_or_else(|| ClientError::AccountNotFound(account.to_string()))?;
        Ok(AccountState {
            account_id: *account,
            sequence,
        })
    }

    async fn simulate(&self, envelope: &UnsignedEnvelope) -> Result<SimulationOutcome> {
        self.calls.simulate.fetch_add(1, Ordering::SeqCst);
        self.check_reachable(Step::Simulate)?;
        lock(&self.simulated).push(envelope.clone());
        let Some(name) = envelope.function_name() else {
            return Ok(lock(&self.default_simulation).clone());
        };
        let responder = lock(&self.responders).get(&name).cloned();
        if let (Some(responder), Some(invocation)) = (responder, envelope.invocation()) {
            return Ok(responder(&invocation.args));
        }
        let scripted = lock(&self.simulations).get(&name).cloned();
        Ok(scripted.unwrap_or_else(|| lock(&self.default_simulation).clone()))
    }

    async fn submit(&self, envelope: &SignedEnvelope) -> Result<SubmissionResult> {
        self.calls.submit.fetch_add(1, Ordering::SeqCst);
        self.check_reachable(Step::Submit)?;
        if self.submit_hangs.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        lock(&self.submitted).push(envelope.clone());
        let status = lock(&self.submissions).next();
        Ok(SubmissionResult {
            hash: envelope.hash_hex()?,
            status,
            error_detail: None,
        })
    }

    async fn poll_status(&self, _hash: &str) -> Result<TransactionStatus> {
        self.calls.poll.fetch_add(1, Ordering::SeqCst);
        self.check_reachable(Step::Poll)?;
        Ok(lock(&self.statuses).next())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignerBehavior {
    Approve,
    Decline,
    Unavailable,
}

/// Signing authority that approves, declines or is absent on demand.
/// Approved envelopes carry no signatures.
pub struct MockSigner {
    address: Address,
    behavior: Mutex<SignerBehavior>,
    sign_calls: AtomicU32,
    access_requests: AtomicU32,
}

impl MockSigner {
    pub fn new(address: Address) -> Self {
        Self::with_behavior(address, SignerBehavior::Approve)
    }

    pub fn with_behavior(address: Address, behavior: SignerBehavior) -> Self {
        Self {
            address,
            behavior: Mutex::new(behavior),
            sign_calls: AtomicU32::new(0),
            access_requests: AtomicU32::new(0),
        }
    }

    pub fn set_behavior(&self, behavior: SignerBehavior) {
        *lock(&self.behavior) = behavior;
    }

    pub fn sign_calls(&self) -> u32 {
        self.sign_calls.load(Ordering::SeqCst)
    }

    pub fn access_requests(&self) -> u32 {
        self.access_requests.load(Ordering::SeqCst)
    }

    fn behavior(&self) -> SignerBehavior {
        *lock(&self.behavior)
    }
}

#[async_trait]
impl SignerGateway for MockSigner {
    async fn is_available(&self) -> bool {
        self.behavior() != SignerBehavior::Unavailable
    }

    async fn address(&self) -> Result<Address> {
        match self.behavior() {
            SignerBehavior::Unavailable => Err(ClientError::SignerUnavailable("no wallet".into())),
            _ => Ok(self.address),
        }
    }

    async fn request_access(&self) -> Result<()> {
        self.access_requests.fetch_add(1, Ordering::SeqCst);
        match self.behavior() {
            SignerBehavior::Approve => Ok(()),
            SignerBehavior::Decline => Err(ClientError::SigningDeclined("access denied".into())),
            SignerBehavior::Unavailable => Err(ClientError::SignerUnavailable("no wallet".into())),
        }
    }

    async fn sign(
        &self,
        envelope: &UnsignedEnvelope,
        _network_passphrase: &str,
    ) -> Result<SignedEnvelope> {
        self.sign_calls.fetch_add(1, Ordering::SeqCst);
        match self.behavior() {
            SignerBehavior::Approve => Ok(SignedEnvelope::new(envelope.clone(), Vec::new())),
            SignerBehavior::Decline => Err(ClientError::SigningDeclined("user rejected".into())),
            SignerBehavior::Unavailable => Err(ClientError::SignerUnavailable("no wallet".into())),
        }
    }
}

/// A bet record as the contract returns it from `get_bet`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BetRecord {
    pub id: u64,
    pub question: String,
    pub options: Vec<String>,
    pub oracle: Address,
    pub winning_option: Option<u32>,
    pub stakes: Vec<(Address, u32, i128)>,
}

impl BetRecord {
    pub fn new(id: u64, oracle: Address) -> Self {
        Self {
            id,
            question: "Will it rain tomorrow?".into(),
            options: vec!["Yes".into(), "No".into()],
            oracle,
            winning_option: None,
            stakes: Vec::new(),
        }
    }

    pub fn resolved(mut self, winner: u32) -> Self {
        self.winning_option = Some(winner);
        self
    }

    pub fn stake(mut self, account: Address, option: u32, amount: i128) -> Self {
        self.stakes.push((account, option, amount));
        self
    }

    /// Encode as the contract's struct map, fields in name order.
    pub fn to_scval(&self) -> Result<ScVal> {
        let total_pot: i128 = self.stakes.iter().map(|(_, _, amount)| amount).sum();
        let stakes = NativeValue::Map(
            self.stakes
                .iter()
                .map(|(who, option, amount)| {
                    (
                        NativeValue::Address(*who),
                        NativeValue::Vec(vec![NativeValue::U32(*option), NativeValue::I128(*amount)]),
                    )
                })
                .collect(),
        );
        let winning_option = self
            .winning_option
            .map(NativeValue::U32)
            .unwrap_or(NativeValue::Void);
        let options = NativeValue::Vec(self.options.iter().map(|o| o.as_str().into()).collect());

        let fields = [
            ("id", encode(&NativeValue::U64(self.id), &WireType::U64)?),
            (
                "is_resolved",
                encode(&self.winning_option.is_some().into(), &WireType::Bool)?,
            ),
            ("options", encode(&options, &WireType::vec(WireType::String))?),
            ("oracle", encode(&self.oracle.into(), &WireType::Address)?),
            ("question", encode(&self.question.as_str().into(), &WireType::String)?),
            (
                "stakes",
                encode(
                    &stakes,
                    &WireType::map(
                        WireType::Address,
                        WireType::Tuple(vec![WireType::U32, WireType::I128]),
                    ),
                )?,
            ),
            ("total_pot", encode(&NativeValue::I128(total_pot), &WireType::I128)?),
            (
                "winning_option",
                encode(&winning_option, &WireType::option(WireType::U32))?,
            ),
        ];

        let entries = fields
            .into_iter()
            .map(|(key, val)| {
                Ok(ScMapEntry {
                    key: ScVal::Symbol(ScSymbol(key.try_into().map_err(ClientError::encoding)?)),
                    val,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(ScVal::Map(Some(ScMap(
            entries.try_into().map_err(ClientError::encoding)?,
        ))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode, Bet};

    #[test]
    fn script_repeats_last_item() {
        let mut script = Script::new(0);
        script.set(vec![1, 2]);
        assert_eq!(script.next(), 1);
        assert_eq!(script.next(), 2);
        assert_eq!(script.next(), 2);
    }

    #[test]
    fn bet_record_decodes_into_bet() {
        let oracle = Address::Account([1; 32]);
        let alice = Address::Account([2; 32]);
        let record = BetRecord::new(4, oracle).stake(alice, 0, 30).resolved(0);
        let bet = Bet::from_native(&decode(&record.to_scval().unwrap()).unwrap()).unwrap();
        assert_eq!(bet.id, 4);
        assert_eq!(bet.total_pot, 30);
        assert_eq!(bet.winning_option, Some(0));
        assert!(bet.is_oracle(&oracle));
    }

    #[tokio::test]
    async fn unreachable_gateway_fails_every_call() {
        let gateway = MockGateway::new();
        gateway.set_unreachable(true);
        let err = gateway.poll_status("ab").await.unwrap_err();
        assert!(matches!(err, ClientError::Network { step: Step::Poll, .. }));
        assert_eq!(gateway.poll_calls(), 1);
    }

    #[tokio::test]
    async fn signer_behavior_controls_access() {
        let signer = MockSigner::new(Address::Account([5; 32]));
        signer.request_access().await.unwrap();
        signer.set_behavior(SignerBehavior::Decline);
        assert!(matches!(
            signer.request_access().await,
            Err(ClientError::SigningDeclined(_))
        ));
        signer.set_behavior(SignerBehavior::Unavailable);
        assert!(!signer.is_available().await);
        assert!(signer.address().await.is_err());
        assert_eq!(signer.access_requests(), 2);
    }
}
