//! Property tests over random operation sequences.

use proptest::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;
use votesplit_core::{
    check_invariants, distribute, hash::state_digest, Address, Delegation, EngineConfig,
    ManualClock, Token, VotesEvent, VotingPowerQuery,
};

const ACCOUNTS: u64 = 5;
const DELEGATEES: u64 = 4;
const DENOMINATOR: u32 = 10_000;

#[derive(Clone, Debug)]
enum Op {
    Mint {
        to: u64,
        amount: u128,
    },
    Burn {
        from: u64,
        amount: u128,
    },
    Transfer {
        from: u64,
        to: u64,
        amount: u128,
    },
    Delegate {
        account: u64,
        delegatee: u64,
    },
    Split {
        account: u64,
        shares: Vec<(u64, u32)>,
    },
    Advance(u64),
}

fn account() -> impl Strategy<Value = u64> {
    1..=ACCOUNTS
}

fn delegatee() -> impl Strategy<Value = u64> {
    // 0 is the "no delegate" address.
    prop_oneof![Just(0u64), 100..100 + DELEGATEES]
}

fn split() -> impl Strategy<Value = Vec<(u64, u32)>> {
    proptest::collection::btree_map(100..100 + DELEGATEES, 1u32..5_000, 0..=DELEGATEES as usize)
        .prop_map(|m| m.into_iter().collect())
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (account(), 0u128..100_000)
            .prop_map(|(to, amount)| Op::Mint { to, amount }),
        (account(), 0u128..50_000)
            .prop_map(|(from, amount)| Op::Burn { from, amount }),
        (account(), account(), 0u128..50_000)
            .prop_map(|(from, to, amount)| Op::Transfer { from, to, amount }),
        (account(), delegatee())
            .prop_map(|(account, delegatee)| Op::Delegate { account, delegatee }),
        (account(), split())
            .prop_map(|(account, shares)| Op::Split { account, shares }),
        (0u64..3).prop_map(Op::Advance),
    ]
}

fn addr(n: u64) -> Address {
    Address::from_low_u64_be(n)
}

/// Apply `op`; rejections (overdrafts, oversized splits) are expected and ignored.
fn apply(token: &mut Token<Arc<ManualClock>>, clock: &ManualClock, op: &Op) {
    let _ = match op {
        Op::Mint { to, amount } => token.mint(addr(*to), *amount),
        Op::Burn { from, amount } => token.burn(addr(*from), *amount),
        Op::Transfer { from, to, amount } => token.transfer(addr(*from), addr(*to), *amount),
        Op::Delegate { account, delegatee } => token.delegate(addr(*account), addr(*delegatee)),
        Op::Split { account, shares } => token.set_delegations(
            addr(*account),
            shares
                .iter()
                .map(|(d, s)| Delegation::new(addr(*d), *s))
                .collect(),
        ),
        Op::Advance(n) => {
            clock.advance(*n);
            Ok(Vec::new())
        }
    };
}

fn fresh() -> (Token<Arc<ManualClock>>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(1));
    let token = Token::new(EngineConfig::default(), Arc::clone(&clock)).unwrap();
    (token, clock)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn invariants_hold_after_every_operation(ops in proptest::collection::vec(op(), 0..40)) {
        let (mut token, clock) = fresh();
        for op in &ops {
            apply(&mut token, &clock, op);
            if let Err(v) = check_invariants(&token) {
                prop_assert!(false, "after {:?}: {}", op, v);
            }
        }
    }

    #[test]
    fn past_values_never_change(
        prefix in proptest::collection::vec(op(), 0..25),
        suffix in proptest::collection::vec(op(), 0..25),
    ) {
        let (mut token, clock) = fresh();
        for op in &prefix {
            apply(&mut token, &clock, op);
        }
        clock.advance(1);
        let cutoff = token.clock() - 1;

        let votes: BTreeMap<u64, u128> = (100..100 + DELEGATEES)
            .map(|d| (d, token.votes_at(&addr(d), cutoff).unwrap()))
            .collect();
        let supply = token.total_supply_at(cutoff).unwrap();

        for op in &suffix {
            apply(&mut token, &clock, op);
        }
        clock.advance(1);

        for (d, v) in votes {
            prop_assert_eq!(token.votes_at(&addr(d), cutoff).unwrap(), v);
        }
        prop_assert_eq!(token.total_supply_at(cutoff).unwrap(), supply);
    }

    #[test]
    fn repeating_a_delegation_writes_nothing(
        ops in proptest::collection::vec(op(), 0..20),
        who in account(),
        shares in split(),
    ) {
        let (mut token, clock) = fresh();
        for op in &ops {
            apply(&mut token, &clock, op);
        }
        let set: Vec<_> = shares.iter().map(|(d, s)| Delegation::new(addr(*d), *s)).collect();
        if token.set_delegations(addr(who), set.clone()).is_ok() {
            let digest = state_digest(token.engine());

            let events = token.set_delegations(addr(who), set).unwrap();
            prop_assert!(!events.iter().any(VotesEvent::is_voting_power_change));
            prop_assert_eq!(state_digest(token.engine()), digest);
        }
    }

    #[test]
    fn distribution_never_exceeds_balance(balance in 0u128..(1u128 << 112), shares in split()) {
        let set: Vec<_> = shares.iter().map(|(d, s)| Delegation::new(addr(*d), *s)).collect();
        let sum: u128 = set.iter().map(|d| u128::from(d.share)).sum();
        prop_assume!(sum <= u128::from(DENOMINATOR));

        let out = distribute(&set, balance, DENOMINATOR).unwrap();
        let total: u128 = out.iter().map(|a| a.amount).sum();
        prop_assert!(total <= balance);

        let undelegated = balance / u128::from(DENOMINATOR) * (u128::from(DENOMINATOR) - sum)
            + balance % u128::from(DENOMINATOR) * (u128::from(DENOMINATOR) - sum)
                / u128::from(DENOMINATOR);
        prop_assert!(balance - total < set.len() as u128 + undelegated + 1);
    }
}
