//! Bet-market operations over the scripted gateway.

use soroban_bets::codec::Address;
use soroban_bets::gateway::TransactionStatus;
use soroban_bets::mock::{simulated, BetRecord, MockGateway, MockSigner};
use soroban_bets::{BetError, BetMarket, ClientConfig, ClientError, InvocationEngine};
use std::sync::Arc;
use stellar_xdr::curr::{Int128Parts, ScString, ScVal};

const CONTRACT: &str = "CAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAABSC4";
const ORACLE: Address = Address::Account([1; 32]);
const ALICE: Address = Address::Account([2; 32]);
const BOB: Address = Address::Account([3; 32]);

struct Market {
    gateway: Arc<MockGateway>,
    signer: Arc<MockSigner>,
    market: BetMarket,
}

fn market_with(config: ClientConfig, caller: Address) -> Market {
    let gateway = Arc::new(MockGateway::new());
    let signer = Arc::new(MockSigner::new(caller));
    let engine = InvocationEngine::new(config, gateway.clone(), signer.clone());
    Market {
        gateway,
        signer,
        market: BetMarket::new(engine),
    }
}

fn configured() -> ClientConfig {
    ClientConfig {
        contract_id: Some(CONTRACT.to_string()),
        token_id: Some(CONTRACT.to_string()),
        ..ClientConfig::default()
    }
}

fn market(caller: Address) -> Market {
    market_with(configured(), caller)
}

fn with_bet(m: &Market, record: BetRecord) {
    m.gateway.on_simulate_value("get_bet", record.to_scval().unwrap());
}

fn is_configuration(err: &ClientError, key: &str) -> bool {
    matches!(err, ClientError::Configuration(msg) if msg.contains(key))
}

#[tokio::test]
async fn missing_contract_id_touches_nothing() {
    let m = market_with(ClientConfig::default(), ALICE);

    let errors = vec![
        m.market.create_bet(ALICE, "Rain?", &["Yes", "No"]).await.unwrap_err(),
        m.market.place_bet(ALICE, 1, 0, 1.0).await.unwrap_err(),
        m.market.resolve_bet(ALICE, 1, 0).await.unwrap_err(),
        m.market.claim_winnings(ALICE, 1).await.unwrap_err(),
        m.market.get_bet(1).await.unwrap_err(),
        m.market.get_bets_count().await.unwrap_err(),
        m.market.list_bets().await.unwrap_err(),
    ];
    for err in &errors {
        assert!(is_configuration(err, "BETS_CONTRACT_ID"), "got {:?}", err);
    }
    assert_eq!(m.gateway.total_calls(), 0);
    assert_eq!(m.signer.sign_calls(), 0);
}

#[tokio::test]
async fn token_is_required_to_move_funds() {
    let config = ClientConfig {
        token_id: None,
        ..configured()
    };
    let m = market_with(config, ALICE);
    with_bet(&m, BetRecord::new(1, ORACLE));

    let err = m.market.place_bet(ALICE, 1, 0, 1.0).await.unwrap_err();
    assert!(is_configuration(&err, "BETS_TOKEN_ID"), "got {:?}", err);
    let err = m.market.claim_winnings(ALICE, 1).await.unwrap_err();
    assert!(is_configuration(&err, "BETS_TOKEN_ID"), "got {:?}", err);
    assert_eq!(m.gateway.total_calls(), 0);

    // Reads and oracle actions don't need the token.
    assert!(m.market.get_bet(1).await.unwrap().is_some());
}

#[tokio::test]
async fn create_then_get() {
    let m = market(ORACLE);
    m.gateway.script_statuses(vec![TransactionStatus::Success {
        return_value: Some(ScVal::U64(1)),
    }]);

    let id = m
        .market
        .create_bet(ORACLE, "  Will it rain tomorrow? ", &["Yes", "No"])
        .await
        .unwrap();
    assert_eq!(id, 1);

    let created = m
        .gateway
        .simulated_envelopes()
        .into_iter()
        .find(|e| e.function_name().as_deref() == Some("create_bet"))
        .unwrap();
    let args = &created.invocation().unwrap().args;
    assert_eq!(args.len(), 3);
    assert_eq!(
        args[1],
        ScVal::String(ScString("Will it rain tomorrow?".try_into().unwrap()))
    );

    with_bet(&m, BetRecord::new(1, ORACLE));
    let bet = m.market.get_bet(1).await.unwrap().unwrap();
    assert_eq!(bet.id, 1);
    assert_eq!(bet.question, "Will it rain tomorrow?");
    assert_eq!(bet.options, vec!["Yes", "No"]);
    assert_eq!(bet.oracle, ORACLE);
    assert!(!bet.is_resolved);
    assert_eq!(bet.winning_option, None);
    assert_eq!(bet.total_pot, 0);
}

#[tokio::test]
async fn create_validates_locally() {
    let m = market(ORACLE);

    let err = m.market.create_bet(ORACLE, "   ", &["Yes", "No"]).await.unwrap_err();
    assert!(matches!(err, ClientError::Bet(BetError::EmptyQuestion)));

    let none: [&str; 0] = [];
    let err = m.market.create_bet(ORACLE, "Rain?", &none).await.unwrap_err();
    assert!(matches!(err, ClientError::Bet(BetError::NoOptions)));

    let err = m.market.create_bet(ORACLE, "Rain?", &["Yes", " "]).await.unwrap_err();
    assert!(matches!(err, ClientError::Bet(BetError::EmptyOption(1))));

    assert_eq!(m.gateway.total_calls(), 0);
}

#[tokio::test]
async fn single_option_bet_is_allowed() {
    let m = market(ORACLE);
    m.gateway.script_statuses(vec![TransactionStatus::Success {
        return_value: Some(ScVal::U64(2)),
    }]);
    let id = m.market.create_bet(ORACLE, "Rain?", &["Yes"]).await.unwrap();
    assert_eq!(id, 2);
    assert_eq!(m.gateway.submit_calls(), 1);
}

#[tokio::test]
async fn get_missing_bet_is_none() {
    let m = market(ALICE);
    assert_eq!(m.market.get_bet(42).await.unwrap(), None);
    assert_eq!(m.gateway.submit_calls(), 0);
}

#[tokio::test]
async fn place_bet_sends_minor_units() {
    let m = market(ALICE);
    with_bet(&m, BetRecord::new(1, ORACLE));

    m.market.place_bet(ALICE, 1, 0, 10.0).await.unwrap();

    let placed = m
        .gateway
        .simulated_envelopes()
        .into_iter()
        .find(|e| e.function_name().as_deref() == Some("place_bet"))
        .unwrap();
    let args = &placed.invocation().unwrap().args;
    assert_eq!(args.len(), 5);
    assert_eq!(args[1], ScVal::U64(1));
    assert_eq!(args[2], ScVal::U32(0));
    assert_eq!(
        args[3],
        ScVal::I128(Int128Parts {
            hi: 0,
            lo: 100_000_000
        })
    );
    assert_eq!(m.gateway.submit_calls(), 1);
}

#[tokio::test]
async fn place_bet_preconditions() {
    let m = market(ALICE);

    let err = m.market.place_bet(ALICE, 9, 0, 1.0).await.unwrap_err();
    assert!(matches!(err, ClientError::Bet(BetError::NotFound(9))));

    with_bet(&m, BetRecord::new(1, ORACLE).resolved(0));
    let err = m.market.place_bet(ALICE, 1, 0, 1.0).await.unwrap_err();
    assert!(matches!(err, ClientError::Bet(BetError::AlreadyResolved(1))));

    with_bet(&m, BetRecord::new(1, ORACLE));
    let err = m.market.place_bet(ALICE, 1, 2, 1.0).await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Bet(BetError::InvalidOption {
            bet_id: 1,
            option: 2,
            options: 2
        })
    ));

    with_bet(&m, BetRecord::new(1, ORACLE).stake(ALICE, 1, 5_000_000));
    let err = m.market.place_bet(ALICE, 1, 0, 1.0).await.unwrap_err();
    assert!(matches!(err, ClientError::Bet(BetError::AlreadyStaked { bet_id: 1, .. })));

    assert_eq!(m.signer.sign_calls(), 0);
    assert_eq!(m.gateway.submit_calls(), 0);
}

#[tokio::test]
async fn place_bet_rejects_bad_amounts_before_reading() {
    let m = market(ALICE);
    for amount in [0.0, -1.0, f64::NAN] {
        let err = m.market.place_bet(ALICE, 1, 0, amount).await.unwrap_err();
        assert!(matches!(err, ClientError::Encoding(_)), "got {:?}", err);
    }
    assert_eq!(m.gateway.total_calls(), 0);
}

#[tokio::test]
async fn only_the_oracle_resolves() {
    let m = market(ALICE);
    with_bet(&m, BetRecord::new(1, ORACLE));

    let err = m.market.resolve_bet(ALICE, 1, 0).await.unwrap_err();
    match err {
        ClientError::Bet(BetError::NotOracle { bet_id, account }) => {
            assert_eq!(bet_id, 1);
            assert_eq!(account, ALICE.to_string());
        }
        other => panic!("expected NotOracle, got {:?}", other),
    }
    assert_eq!(m.gateway.submit_calls(), 0);
}

#[tokio::test]
async fn resolve_twice_is_rejected() {
    let m = market(ORACLE);
    with_bet(&m, BetRecord::new(1, ORACLE).resolved(1));
    let err = m.market.resolve_bet(ORACLE, 1, 0).await.unwrap_err();
    assert!(matches!(err, ClientError::Bet(BetError::AlreadyResolved(1))));
}

#[tokio::test]
async fn resolve_bet_submits() {
    let m = market(ORACLE);
    with_bet(&m, BetRecord::new(1, ORACLE).stake(ALICE, 0, 10));

    m.market.resolve_bet(ORACLE, 1, 0).await.unwrap();
    assert_eq!(m.signer.sign_calls(), 1);
    assert_eq!(m.gateway.submit_calls(), 1);

    let err = m.market.resolve_bet(ORACLE, 1, 5).await.unwrap_err();
    assert!(matches!(err, ClientError::Bet(BetError::InvalidOption { option: 5, .. })));
}

#[tokio::test]
async fn claim_requires_resolution_and_a_stake() {
    let m = market(ALICE);

    with_bet(&m, BetRecord::new(1, ORACLE).stake(ALICE, 0, 10));
    let err = m.market.claim_winnings(ALICE, 1).await.unwrap_err();
    assert!(matches!(err, ClientError::Bet(BetError::NotResolved(1))));

    with_bet(&m, BetRecord::new(1, ORACLE).stake(BOB, 0, 10).resolved(0));
    let err = m.market.claim_winnings(ALICE, 1).await.unwrap_err();
    assert!(matches!(err, ClientError::Bet(BetError::NoStake { bet_id: 1, .. })));
    assert_eq!(m.gateway.submit_calls(), 0);

    with_bet(
        &m,
        BetRecord::new(1, ORACLE)
            .stake(ALICE, 0, 10)
            .stake(BOB, 1, 30)
            .resolved(0),
    );
    m.market.claim_winnings(ALICE, 1).await.unwrap();
    assert_eq!(m.gateway.submit_calls(), 1);
}

#[tokio::test]
async fn resolved_projection_carries_payouts() {
    let m = market(ALICE);
    with_bet(
        &m,
        BetRecord::new(3, ORACLE)
            .stake(ALICE, 1, 20_000_000)
            .stake(BOB, 0, 60_000_000)
            .resolved(1),
    );

    let bet = m.market.get_bet(3).await.unwrap().unwrap();
    assert!(bet.is_resolved);
    assert_eq!(bet.winning_option, Some(1));
    assert!(bet.is_winner(1));
    assert!(!bet.is_winner(0));
    assert_eq!(bet.total_pot, 80_000_000);
    assert_eq!(bet.stake_of(&ALICE).map(|s| s.amount), Some(20_000_000));
    assert_eq!(bet.payout_for(&ALICE), Some(80_000_000));
    assert_eq!(bet.payout_for(&BOB), Some(0));
}

#[tokio::test]
async fn list_skips_missing_ids() {
    let m = market(ALICE);
    m.gateway.on_simulate_value("get_bets_count", ScVal::U64(3));
    m.gateway.on_simulate_with("get_bet", |args| {
        let ScVal::U64(id) = args[0] else {
            panic!("unexpected args {:?}", args);
        };
        if id == 2 {
            simulated(ScVal::Void)
        } else {
            simulated(BetRecord::new(id, ORACLE).to_scval().unwrap())
        }
    });

    let bets = m.market.list_bets().await.unwrap();
    let ids: Vec<u64> = bets.iter().map(|b| b.id).collect();
    assert_eq!(ids, vec![1, 3]);
    // One count read plus one read per id.
    assert_eq!(m.gateway.simulate_calls(), 4);
}

#[tokio::test]
async fn empty_market_lists_nothing() {
    let m = market(ALICE);
    m.gateway.on_simulate_value("get_bets_count", ScVal::U64(0));
    assert!(m.market.list_bets().await.unwrap().is_empty());
    assert_eq!(m.gateway.simulate_calls(), 1);
}
