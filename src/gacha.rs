// 🎰 Gacha Engine - Weighted random draws paid from the ledger
// Debit first, sample after; a failed payment produces no outcomes

use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::PaymentError;
use crate::ledger::{Ledger, Transaction};
use crate::money::Money;

/// Accepted draw-count window for a single request.
pub const MIN_DRAWS: i64 = 1;
pub const MAX_DRAWS: i64 = 50;

// ============================================================================
// RARITY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Rare,
    Epic,
    Legendary,
    Mythic,
}

impl Rarity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rarity::Common => "common",
            Rarity::Rare => "rare",
            Rarity::Epic => "epic",
            Rarity::Legendary => "legendary",
            Rarity::Mythic => "mythic",
        }
    }
}

// ============================================================================
// POOL CONFIGURATION
// ============================================================================

/// One entry of a pool's item list. `weight` is the item's unnormalized
/// probability mass: the chance of drawing item i is weight_i / sum(weights).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolItem {
    pub name: String,
    pub rarity: Rarity,
    pub weight: u32,
}

impl PoolItem {
    pub fn new(name: &str, rarity: Rarity, weight: u32) -> Self {
        PoolItem {
            name: name.to_string(),
            rarity,
            weight,
        }
    }
}

/// Named draw configuration: cost per single draw plus the weighted item
/// list. Read-only at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pool {
    pub name: String,
    pub cost: Money,
    pub items: Vec<PoolItem>,
}

impl Pool {
    pub fn new(name: &str, cost: Money, items: Vec<PoolItem>) -> Self {
        Pool {
            name: name.to_string(),
            cost,
            items,
        }
    }

    fn total_weight(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.weight)).sum()
    }
}

/// The two pools shipped by the service.
fn default_pools() -> Vec<Pool> {
    vec![
        Pool::new(
            "standard",
            Money::from_cents(1000),
            vec![
                PoolItem::new("Bague de Cuivre", Rarity::Common, 70),
                PoolItem::new("Amulette d'Argent", Rarity::Rare, 25),
                PoolItem::new("Lame d'Ombre", Rarity::Legendary, 5),
            ],
        ),
        Pool::new(
            "premium",
            Money::from_cents(3000),
            vec![
                PoolItem::new("Cristal Azur", Rarity::Rare, 60),
                PoolItem::new("Relique Ancienne", Rarity::Epic, 30),
                PoolItem::new("Couronne du Néant", Rarity::Mythic, 10),
            ],
        ),
    ]
}

// ============================================================================
// DRAW RESULTS
// ============================================================================

/// One sampled outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawnItem {
    pub name: String,
    pub rarity: Rarity,
}

/// Result of a paid draw request: the sampled items in sampling order plus
/// the wallet balance after the debit.
#[derive(Debug, Clone, Serialize)]
pub struct DrawOutcome {
    pub pool_name: String,
    pub draw_count: i64,
    pub items: Vec<DrawnItem>,
    pub remaining_balance: Money,
}

// ============================================================================
// GACHA ENGINE
// ============================================================================

/// Owns the pool configuration and the process-wide random source.
///
/// The engine never touches wallets directly; payment goes through the
/// ledger's debit contract, and sampling only happens once that debit has
/// succeeded. The shared generator sits behind its own mutex, taken only
/// after the ledger call returns, so it never nests with a wallet lock. An
/// explicit per-call seed builds a private generator instead and leaves the
/// shared one untouched.
pub struct GachaEngine {
    pools: Vec<Pool>,
    rng: Mutex<StdRng>,
}

impl GachaEngine {
    /// Engine with the default pools. `seed` fixes the process-wide random
    /// source for reproducible runs; `None` self-seeds from system entropy.
    pub fn new(seed: Option<u64>) -> Self {
        GachaEngine::with_pools(default_pools(), seed)
    }

    pub fn with_pools(pools: Vec<Pool>, seed: Option<u64>) -> Self {
        debug_assert!(
            pools.iter().all(|pool| pool.total_weight() > 0),
            "every pool needs at least one positively weighted item"
        );
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        GachaEngine {
            pools,
            rng: Mutex::new(rng),
        }
    }

    /// All configured pools in insertion order. Pure read.
    pub fn list_pools(&self) -> &[Pool] {
        &self.pools
    }

    pub fn find_pool(&self, name: &str) -> Option<&Pool> {
        self.pools.iter().find(|pool| pool.name == name)
    }

    /// Perform `draw_count` paid draws from a pool.
    ///
    /// Validation order: pool, then count, then payment. The debit of
    /// `cost × draw_count` goes through the ledger and a failure there
    /// propagates unchanged with no sampling performed, so a draw that is
    /// not paid for has zero observable effect on outcomes.
    pub fn draw(
        &self,
        ledger: &Ledger,
        user_id: &str,
        pool_name: &str,
        draw_count: i64,
        seed: Option<u64>,
    ) -> Result<DrawOutcome, PaymentError> {
        let pool = self
            .find_pool(pool_name)
            .ok_or_else(|| PaymentError::PoolNotFound(pool_name.to_string()))?;
        if !(MIN_DRAWS..=MAX_DRAWS).contains(&draw_count) {
            return Err(PaymentError::InvalidDrawCount(draw_count.to_string()));
        }

        let total_cost = pool.cost.times(draw_count as u32);
        let payment: Transaction = ledger.debit(
            user_id,
            total_cost,
            Some(&format!("gacha:{}", pool_name)),
            None,
        )?;

        let items = match seed {
            Some(seed) => {
                // Private, unshared generator for this call only
                let mut rng = StdRng::seed_from_u64(seed);
                sample_items(pool, draw_count as usize, &mut rng)
            }
            None => {
                let mut rng = self.rng.lock().unwrap();
                sample_items(pool, draw_count as usize, &mut rng)
            }
        };

        Ok(DrawOutcome {
            pool_name: pool.name.clone(),
            draw_count,
            items,
            remaining_balance: payment.balance_after,
        })
    }
}

/// Weighted sampling with replacement over a cumulative-weight table.
///
/// Each draw picks a uniform integer in [0, total_weight) and takes the
/// first item whose cumulative weight exceeds it. Draws are sequential so a
/// given generator state always yields the same sequence.
fn sample_items(pool: &Pool, count: usize, rng: &mut StdRng) -> Vec<DrawnItem> {
    let total_weight = pool.total_weight();
    debug_assert!(total_weight > 0, "pool '{}' has no draw weight", pool.name);

    let mut drawn = Vec::with_capacity(count);
    for _ in 0..count {
        let roll = rng.gen_range(0..total_weight);
        let mut cumulative = 0u64;
        for item in &pool.items {
            cumulative += u64::from(item.weight);
            if roll < cumulative {
                drawn.push(DrawnItem {
                    name: item.name.clone(),
                    rarity: item.rarity,
                });
                break;
            }
        }
    }
    drawn
}

// ============================================================================
// TESTS
// ============================================================================
