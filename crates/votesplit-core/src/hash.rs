use crate::checkpoints::TraceKey;
use crate::clock::Clock;
use crate::engine::DelegationEngine;
use crate::{Balance, Hash32};
use sha2::{Digest, Sha256};

/// Domain separation tag for engine state digests.
pub const STATE_DIGEST_DOMAIN_V1: &[u8] = b"VOTESPLIT_STATE_DIGEST_V1";

/// `H(domain || data)`.
pub fn sha256_domain(domain: &[u8], data: &[u8]) -> Hash32 {
    let digest = Sha256::new()
        .chain_update(domain)
        .chain_update(data)
        .finalize();
    Hash32(digest.into())
}

fn put_balance(buf: &mut Vec<u8>, v: Balance) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn put_len(buf: &mut Vec<u8>, n: usize) {
    buf.extend_from_slice(&(n as u64).to_le_bytes());
}

/// Canonical v1 preimage of the engine's current state.
///
/// Layout (all integers little-endian):
/// - `total_supply: u128`
/// - `n_sets: u64`, then per account in ascending order: `account[20] || n: u64 ||
///   (delegatee[20] || share: u32)*`
/// - `n_delegatees: u64`, then per delegatee in ascending order: `delegatee[20] || votes: u128`
///
/// History is not included; two engines with equal current state share a digest.
pub fn state_digest_preimage<C: Clock>(engine: &DelegationEngine<C>) -> Vec<u8> {
    let store = engine.checkpoints();
    let sets = engine.delegation_sets();
    let mut buf = Vec::new();

    put_balance(&mut buf, store.latest(&TraceKey::TotalSupply));

    put_len(&mut buf, sets.len());
    for (account, set) in sets.iter() {
        buf.extend_from_slice(&account.0);
        put_len(&mut buf, set.len());
        for d in set.as_slice() {
            buf.extend_from_slice(&d.delegatee.0);
            buf.extend_from_slice(&d.share.to_le_bytes());
        }
    }

    let delegatees: Vec<_> = store.delegatees().collect();
    put_len(&mut buf, delegatees.len());
    for delegatee in delegatees {
        buf.extend_from_slice(&delegatee.0);
        put_balance(&mut buf, store.latest(&TraceKey::Delegatee(delegatee)));
    }

    buf
}

/// Deterministic commitment to the engine's current state.
pub fn state_digest<C: Clock>(engine: &DelegationEngine<C>) -> Hash32 {
    sha256_domain(STATE_DIGEST_DOMAIN_V1, &state_digest_preimage(engine))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::EngineConfig;
    use crate::Address;

    fn engine_with(delegatee: u64) -> DelegationEngine<ManualClock> {
        let mut e = DelegationEngine::new(EngineConfig::default(), ManualClock::new(1)).unwrap();
        e.delegate(
            Address::from_low_u64_be(1),
            Address::from_low_u64_be(delegatee),
            100,
        )
        .unwrap();
        e
    }

    #[test]
    fn domain_changes_hash() {
        assert_ne!(sha256_domain(b"A", b"x"), sha256_domain(b"B", b"x"));
    }

    #[test]
    fn equal_state_equal_digest() {
        assert_eq!(state_digest(&engine_with(2)), state_digest(&engine_with(2)));
        assert_ne!(state_digest(&engine_with(2)), state_digest(&engine_with(3)));
    }

    #[test]
    fn empty_engine_preimage_layout() {
        let e = DelegationEngine::new(EngineConfig::default(), ManualClock::new(0)).unwrap();
        let pre = state_digest_preimage(&e);
        assert_eq!(pre.len(), 16 + 8 + 8);
        assert!(pre.iter().all(|b| *b == 0));
    }

    #[test]
    fn lengths_are_encoded_as_u64() {
        let e = engine_with(2);
        let pre = state_digest_preimage(&e);
        // supply, n_sets, account, n, (delegatee, share), n_delegatees, (delegatee, votes)
        assert_eq!(pre.len(), 16 + 8 + 20 + 8 + 24 + 8 + 36);
        assert_eq!(&pre[16..24], &1u64.to_le_bytes());
        assert_eq!(&pre[44..52], &1u64.to_le_bytes());
    }
}
