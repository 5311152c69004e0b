//! End-to-end delegation scenarios against the reference token.
//!
//! Each test drives `Token` through a short sequence of ledger operations and checks votes,
//! supply, history and the events each operation returns.

use std::sync::Arc;
use std::thread;
use votesplit_core::{
    check_invariants, hash::state_digest, Address, Delegation, EngineConfig, ManualClock,
    SharedEngine, Token, VotesError, VotesEvent, VotingPowerQuery,
};

// =============================================================================
// Helpers
// =============================================================================

fn addr(n: u64) -> Address {
    Address::from_low_u64_be(n)
}

const A: u64 = 0xA;
const B: u64 = 0xB;
const D1: u64 = 0xD1;
const D2: u64 = 0xD2;
const D3: u64 = 0xD3;

fn token() -> (Token<Arc<ManualClock>>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(1));
    let token = Token::new(EngineConfig::default(), Arc::clone(&clock)).unwrap();
    (token, clock)
}

fn split_60_40() -> Vec<Delegation> {
    vec![
        Delegation::new(addr(D1), 6_000),
        Delegation::new(addr(D2), 4_000),
    ]
}

fn vote_changes(events: &[VotesEvent]) -> Vec<(Address, u128, u128)> {
    events
        .iter()
        .filter_map(|e| match e {
            VotesEvent::VotingPowerChanged {
                delegatee,
                old,
                new,
            } => Some((*delegatee, *old, *new)),
            _ => None,
        })
        .collect()
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn partial_delegation_splits_balance() {
    let (mut token, clock) = token();
    token.mint(addr(A), 1_000).unwrap();
    clock.advance(1);

    let events = token.set_delegations(addr(A), split_60_40()).unwrap();

    assert_eq!(token.current_votes(&addr(D1)), 600);
    assert_eq!(token.current_votes(&addr(D2)), 400);
    assert_eq!(
        events[0],
        VotesEvent::DelegationSetChanged {
            account: addr(A),
            old: vec![],
            new: split_60_40(),
        }
    );
    assert_eq!(
        vote_changes(&events),
        vec![(addr(D1), 0, 600), (addr(D2), 0, 400)]
    );
    assert_eq!(events.len(), 3);
}

#[test]
fn transfer_moves_votes_between_delegation_sets() {
    let (mut token, clock) = token();
    token.mint(addr(A), 1_000).unwrap();
    token.set_delegations(addr(A), split_60_40()).unwrap();
    token.delegate(addr(B), addr(D3)).unwrap();
    clock.advance(1);

    let events = token.transfer(addr(A), addr(B), 500).unwrap();

    assert_eq!(token.current_votes(&addr(D1)), 300);
    assert_eq!(token.current_votes(&addr(D2)), 200);
    assert_eq!(token.current_votes(&addr(D3)), 500);
    assert_eq!(token.current_total_supply(), 1_000);

    assert_eq!(
        vote_changes(&events),
        vec![
            (addr(D1), 600, 300),
            (addr(D2), 400, 200),
            (addr(D3), 0, 500),
        ]
    );
    assert!(events.iter().all(VotesEvent::is_voting_power_change));
}

#[test]
fn full_redelegation_writes_two_checkpoints() {
    let (mut token, clock) = token();
    token.mint(addr(A), 1_000).unwrap();
    token.delegate(addr(A), addr(D1)).unwrap();
    clock.advance(1);

    let events = token.delegate(addr(A), addr(D2)).unwrap();

    assert_eq!(
        vote_changes(&events),
        vec![(addr(D1), 1_000, 0), (addr(D2), 0, 1_000)]
    );
    assert_eq!(token.num_checkpoints(&addr(D1)), 2);
    assert_eq!(token.num_checkpoints(&addr(D2)), 1);
}

#[test]
fn mint_to_undelegated_account_moves_only_supply() {
    let (mut token, _) = token();
    let events = token.mint(addr(A), 1_000_000).unwrap();

    assert_eq!(token.current_total_supply(), 1_000_000);
    assert_eq!(
        events,
        vec![VotesEvent::TotalSupplyChanged {
            old: 0,
            new: 1_000_000
        }]
    );
}

#[test]
fn remainder_stays_unallocated() {
    let (mut token, _) = token();
    token.mint(addr(A), 1_001).unwrap();
    let thirds = vec![
        Delegation::new(addr(D1), 3_333),
        Delegation::new(addr(D2), 3_333),
    ];
    token.set_delegations(addr(A), thirds).unwrap();

    assert_eq!(token.current_votes(&addr(D1)), 333);
    assert_eq!(token.current_votes(&addr(D2)), 333);
    check_invariants(&token).unwrap();
}

#[test]
fn same_block_writes_collapse() {
    let (mut token, _) = token();
    token.mint(addr(A), 100).unwrap();
    token.delegate(addr(A), addr(D1)).unwrap();
    token.mint(addr(A), 50).unwrap();
    token.burn(addr(A), 30).unwrap();

    assert_eq!(token.num_checkpoints(&addr(D1)), 1);
    assert_eq!(token.current_votes(&addr(D1)), 120);
}

#[test]
fn history_survives_later_operations() {
    let (mut token, clock) = token();
    token.mint(addr(A), 1_000).unwrap();
    token.delegate(addr(A), addr(D1)).unwrap();
    clock.advance(1);

    token.transfer(addr(A), addr(B), 400).unwrap();
    token.delegate(addr(B), addr(D1)).unwrap();
    clock.advance(5);

    token.burn(addr(A), 600).unwrap();
    token.delegate(addr(B), addr(D2)).unwrap();
    clock.advance(1);

    assert_eq!(token.votes_at(&addr(D1), 1), Ok(1_000));
    assert_eq!(token.votes_at(&addr(D1), 2), Ok(1_000));
    assert_eq!(token.votes_at(&addr(D1), 6), Ok(1_000));
    assert_eq!(token.votes_at(&addr(D1), 7), Ok(0));
    assert_eq!(token.votes_at(&addr(D2), 7), Ok(400));
    assert_eq!(token.total_supply_at(0), Ok(0));
    assert_eq!(token.total_supply_at(6), Ok(1_000));
    assert_eq!(token.total_supply_at(7), Ok(400));
    assert_eq!(
        token.votes_at(&addr(D1), 8),
        Err(VotesError::FutureLookup {
            time: 8,
            current: 8
        })
    );
}

#[test]
fn rejected_operation_leaves_digest_unchanged() {
    let (mut token, _) = token();
    token.mint(addr(A), 1_000).unwrap();
    token.set_delegations(addr(A), split_60_40()).unwrap();
    let before = state_digest(token.engine());
    let emitted = token.engine().metrics().snapshot().events_total;

    let over = vec![
        Delegation::new(addr(D1), 6_000),
        Delegation::new(addr(D2), 4_001),
    ];
    let err = token.set_delegations(addr(A), over).unwrap_err();
    assert!(matches!(err, VotesError::ShareSumExceedsDenominator { .. }));
    assert!(token.transfer(addr(A), addr(B), 1_001).is_err());

    assert_eq!(state_digest(token.engine()), before);
    let snapshot = token.engine().metrics().snapshot();
    assert_eq!(snapshot.events_total, emitted);
    assert_eq!(snapshot.rejected_total, 2);
}

#[test]
fn events_serialize_with_snake_case_tags() {
    let (mut token, _) = token();
    let events = token.mint(addr(A), 5).unwrap();
    let json = serde_json::to_value(&events).unwrap();
    assert!(json[0].get("total_supply_changed").is_some());
}

// =============================================================================
// Concurrency
// =============================================================================

#[test]
fn shared_engine_readers_see_whole_operations() {
    let clock = Arc::new(ManualClock::new(1));
    let shared = SharedEngine::new(EngineConfig::default(), Arc::clone(&clock)).unwrap();
    shared.mint(addr(A), 1_000).unwrap();
    shared.set_delegations(addr(A), split_60_40()).unwrap();

    let writer = {
        let shared = shared.clone();
        thread::spawn(move || {
            for _ in 0..200 {
                shared.delegate(addr(A), addr(D3)).unwrap();
                shared.set_delegations(addr(A), split_60_40()).unwrap();
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let shared = shared.clone();
            thread::spawn(move || {
                for _ in 0..200 {
                    let (d1, d2, d3) = shared
                        .query(|t| {
                            (
                                t.current_votes(&addr(D1)),
                                t.current_votes(&addr(D2)),
                                t.current_votes(&addr(D3)),
                            )
                        })
                        .unwrap();
                    assert!(
                        (d1, d2, d3) == (600, 400, 0) || (d1, d2, d3) == (0, 0, 1_000),
                        "torn read: {d1} {d2} {d3}"
                    );
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for r in readers {
        r.join().unwrap();
    }
    shared.query(|t| check_invariants(t)).unwrap().unwrap();
}
