//! Runtime settings shared by the cart services.

use std::time::Duration;

use jiff::SignedDuration;

/// Time-to-live for a new cart.
pub const DEFAULT_CART_TTL: SignedDuration = SignedDuration::from_hours(24);

/// Period between expiration sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// How long expired and closed carts are kept past their expiration date.
pub const DEFAULT_SWEEP_RETENTION: SignedDuration = SignedDuration::ZERO;

/// How long a cached average rating stays fresh.
pub const DEFAULT_RATING_TTL: SignedDuration = SignedDuration::from_hours(12);

/// Number of closed carts returned by order-history queries.
pub const DEFAULT_HISTORY_LIMIT: usize = 5;

/// Number of entries in a "top items" report.
pub const DEFAULT_TOP_ITEMS_LIMIT: usize = 5;

/// Cart lifecycle settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartSettings {
    /// Added to the creation time to derive `expires_at`.
    pub ttl: SignedDuration,
}

impl Default for CartSettings {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_CART_TTL,
        }
    }
}

/// Expiration sweeper settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweeperSettings {
    /// Period of the background loop.
    pub interval: Duration,

    /// Grace period before expired or closed carts are purged.
    pub retention: SignedDuration,
}

impl Default for SweeperSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_SWEEP_INTERVAL,
            retention: DEFAULT_SWEEP_RETENTION,
        }
    }
}

/// Rating cache settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatingSettings {
    /// Entries older than this are refetched.
    pub ttl: SignedDuration,
}

impl Default for RatingSettings {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_RATING_TTL,
        }
    }
}

/// All settings needed to assemble an [`AppContext`](crate::context::AppContext).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppSettings {
    /// Cart lifecycle settings.
    pub carts: CartSettings,

    /// Sweeper settings.
    pub sweeper: SweeperSettings,

    /// Rating cache settings.
    pub ratings: RatingSettings,
}
