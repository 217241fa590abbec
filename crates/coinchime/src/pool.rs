//! Instance pools
//!
//! Each registered sound owns a pool of handles over one shared decoded
//! buffer. A handle is checked out for the lifetime of one playing instance
//! so the same sound can overlap with itself without re-decoding. When every
//! handle is busy the pool grows by cloning, a deliberate trade of memory
//! for availability; the growth policy is explicit so hosts can opt into a
//! bounded pool instead.

use std::collections::HashMap;
use std::sync::Arc;

use crate::registry::SoundId;
use crate::sample::SampleData;

/// How a pool behaves when every handle is busy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PoolGrowthPolicy {
    /// Append a cloned handle and hand it out (the default).
    #[default]
    CloneOnDemand,
    /// Refuse the request; the caller falls back to synthesis.
    Fixed,
}

/// Checked-out claim on one pool slot. Returned to the pool via
/// [`PoolManager::release`] when the owning instance ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolHandle {
    /// The sound whose pool the slot belongs to
    pub sound: SoundId,
    /// Slot index within the pool
    pub slot: usize,
}

struct Pool {
    data: Arc<SampleData>,
    // Invariant: every slot was built from the same resolved asset, so a
    // slot is just a busy flag over the shared buffer.
    busy: Vec<bool>,
}

impl Pool {
    fn new(data: SampleData, size: usize) -> Self {
        Self {
            data: Arc::new(data),
            busy: vec![false; size.max(1)],
        }
    }

    fn acquire_slot(&mut self, policy: PoolGrowthPolicy) -> Option<usize> {
        if let Some(slot) = self.busy.iter().position(|b| !b) {
            self.busy[slot] = true;
            return Some(slot);
        }
        match policy {
            PoolGrowthPolicy::CloneOnDemand => {
                self.busy.push(true);
                Some(self.busy.len() - 1)
            }
            PoolGrowthPolicy::Fixed => None,
        }
    }
}

/// Owner of every instance pool, keyed by sound id.
pub struct PoolManager {
    pools: HashMap<SoundId, Pool>,
    policy: PoolGrowthPolicy,
}

impl PoolManager {
    /// Create an empty manager with the given growth policy.
    pub fn new(policy: PoolGrowthPolicy) -> Self {
        Self {
            pools: HashMap::new(),
            policy,
        }
    }

    /// Register decoded data for a sound, creating `size` handles.
    /// Re-registering replaces the pool.
    pub fn register(&mut self, id: SoundId, data: SampleData, size: usize) {
        log::debug!("pool registered for {id} ({size} handles)");
        self.pools.insert(id, Pool::new(data, size));
    }

    /// Whether a pool exists for this sound.
    pub fn is_registered(&self, id: SoundId) -> bool {
        self.pools.contains_key(&id)
    }

    /// Check out a free handle, growing the pool if the policy allows.
    ///
    /// Returns the claim plus the shared decoded buffer, or `None` when the
    /// sound was never registered or a fixed pool is saturated.
    pub fn acquire(&mut self, id: SoundId) -> Option<(PoolHandle, Arc<SampleData>)> {
        let pool = self.pools.get_mut(&id)?;
        let slot = pool.acquire_slot(self.policy)?;
        Some((PoolHandle { sound: id, slot }, Arc::clone(&pool.data)))
    }

    /// Return a handle to its pool. Unknown handles are ignored, which makes
    /// release idempotent across dispose.
    pub fn release(&mut self, handle: PoolHandle) {
        if let Some(pool) = self.pools.get_mut(&handle.sound) {
            if let Some(flag) = pool.busy.get_mut(handle.slot) {
                *flag = false;
            }
        }
    }

    /// Current pool size for a sound (free and busy handles).
    pub fn len(&self, id: SoundId) -> Option<usize> {
        self.pools.get(&id).map(|p| p.busy.len())
    }

    /// Number of checked-out handles for a sound.
    pub fn busy_count(&self, id: SoundId) -> usize {
        self.pools
            .get(&id)
            .map_or(0, |p| p.busy.iter().filter(|b| **b).count())
    }

    /// Drop every pool. Only called on engine dispose.
    pub fn clear(&mut self) {
        self.pools.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone() -> SampleData {
        SampleData::new(1, 44_100, vec![0.5; 64])
    }

    #[test]
    fn test_unregistered_acquire_is_none() {
        let mut pools = PoolManager::new(PoolGrowthPolicy::CloneOnDemand);
        assert!(pools.acquire(SoundId::Tap).is_none());
        assert!(!pools.is_registered(SoundId::Tap));
    }

    #[test]
    fn test_acquire_release_reuses_slot() {
        let mut pools = PoolManager::new(PoolGrowthPolicy::CloneOnDemand);
        pools.register(SoundId::Tap, tone(), 2);

        let (first, _) = pools.acquire(SoundId::Tap).unwrap();
        assert_eq!(first.slot, 0);
        pools.release(first);

        let (again, _) = pools.acquire(SoundId::Tap).unwrap();
        assert_eq!(again.slot, 0);
        assert_eq!(pools.len(SoundId::Tap), Some(2));
    }

    #[test]
    fn test_clone_on_demand_grows() {
        let mut pools = PoolManager::new(PoolGrowthPolicy::CloneOnDemand);
        pools.register(SoundId::CoinDrop, tone(), 2);

        let a = pools.acquire(SoundId::CoinDrop).unwrap().0;
        let b = pools.acquire(SoundId::CoinDrop).unwrap().0;
        assert_ne!(a.slot, b.slot);
        assert_eq!(pools.len(SoundId::CoinDrop), Some(2));

        // Third concurrent request clones rather than reusing a busy handle.
        let c = pools.acquire(SoundId::CoinDrop).unwrap().0;
        assert_eq!(c.slot, 2);
        assert_eq!(pools.len(SoundId::CoinDrop), Some(3));
        assert_eq!(pools.busy_count(SoundId::CoinDrop), 3);
    }

    #[test]
    fn test_fixed_pool_refuses_growth() {
        let mut pools = PoolManager::new(PoolGrowthPolicy::Fixed);
        pools.register(SoundId::ClickA, tone(), 1);

        let _held = pools.acquire(SoundId::ClickA).unwrap();
        assert!(pools.acquire(SoundId::ClickA).is_none());
        assert_eq!(pools.len(SoundId::ClickA), Some(1));
    }

    #[test]
    fn test_handles_share_decoded_data() {
        let mut pools = PoolManager::new(PoolGrowthPolicy::CloneOnDemand);
        pools.register(SoundId::Sparkle, tone(), 2);

        let (_, data_a) = pools.acquire(SoundId::Sparkle).unwrap();
        let (_, data_b) = pools.acquire(SoundId::Sparkle).unwrap();
        assert!(Arc::ptr_eq(&data_a, &data_b));
    }
}
