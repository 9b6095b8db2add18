//! App Context

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    io,
    path::Path,
    sync::Arc,
};

use jiff::SignedDuration;
use rustc_hash::FxHashSet;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::{
    clock::{Clock, SystemClock},
    domain::{
        carts::{
            CartsService, StoreCartsService,
            records::{CartRecord, CartUuid},
            repositories::{CartsRepository, InMemoryCartsRepository, StoreError},
            sweeper::ExpirationSweeper,
        },
        ids::{MenuItemId, RestaurantId, UserEmail},
        menu::{InMemoryMenu, records::MenuItemRecord},
        ratings::{backend::CommentsBackend, cache::RatingCache},
        reports::ReportsService,
    },
    settings::AppSettings,
};

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read seed file")]
    Io(#[source] io::Error),

    #[error("seed file is not valid JSON")]
    Json(#[source] serde_json::Error),

    #[error("more than one active cart for {user_email} at {}", restaurant_label(.restaurant.as_ref()))]
    DuplicateActive {
        user_email: UserEmail,
        restaurant: Option<RestaurantId>,
    },

    #[error("seeded cart {cart} has a zero quantity for item {item}")]
    ZeroQuantity { cart: CartUuid, item: MenuItemId },

    #[error("seeded cart {cart} does not expire one time-to-live after creation")]
    Expiry { cart: CartUuid },

    #[error("failed to store seeded cart")]
    Store(#[from] StoreError),
}

fn restaurant_label(restaurant: Option<&RestaurantId>) -> &str {
    restaurant.map_or("no restaurant", RestaurantId::as_str)
}

/// On-disk seed: menu items and carts loaded into a fresh context.
#[derive(Debug, Default, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub menu: Vec<MenuItemRecord>,

    #[serde(default)]
    pub carts: Vec<CartRecord>,
}

impl Seed {
    /// Parse a seed from JSON. Validation happens when the seed is loaded.
    ///
    /// # Errors
    ///
    /// Returns [`SeedError::Json`] when the text is malformed.
    pub fn from_json(json: &str) -> Result<Self, SeedError> {
        serde_json::from_str(json).map_err(SeedError::Json)
    }

    /// Check the carts against the rules the service enforces: positive
    /// quantities, `expires_at` exactly `ttl` after `created_at`, and at most
    /// one active cart per scope.
    ///
    /// # Errors
    ///
    /// Returns the first [`SeedError`] found.
    pub fn validate(&self, ttl: SignedDuration) -> Result<(), SeedError> {
        let mut scopes = FxHashSet::default();

        for cart in &self.carts {
            if let Some((&item, _)) = cart.items.iter().find(|(_, quantity)| **quantity == 0) {
                return Err(SeedError::ZeroQuantity {
                    cart: cart.uuid,
                    item,
                });
            }

            if cart.created_at.checked_add(ttl).ok() != Some(cart.expires_at) {
                return Err(SeedError::Expiry { cart: cart.uuid });
            }

            if cart.is_active() && !scopes.insert((&cart.user_email, cart.restaurant.as_ref())) {
                return Err(SeedError::DuplicateActive {
                    user_email: cart.user_email.clone(),
                    restaurant: cart.restaurant.clone(),
                });
            }
        }

        Ok(())
    }
}

#[derive(Clone)]
pub struct AppContext {
    pub repository: Arc<InMemoryCartsRepository>,
    pub menu: Arc<InMemoryMenu>,
    pub carts: Arc<dyn CartsService>,
    pub reports: Arc<ReportsService>,
    pub clock: Arc<dyn Clock>,
    pub settings: AppSettings,
}

impl AppContext {
    /// Empty store and menu on the system clock.
    pub fn in_memory(settings: AppSettings) -> Self {
        Self::with_clock(settings, Arc::new(SystemClock))
    }

    /// Empty store and menu on the given clock.
    pub fn with_clock(settings: AppSettings, clock: Arc<dyn Clock>) -> Self {
        let repository = Arc::new(InMemoryCartsRepository::new());
        let menu = Arc::new(InMemoryMenu::new());

        Self {
            carts: Arc::new(StoreCartsService::new(
                repository.clone(),
                menu.clone(),
                clock.clone(),
                settings.carts,
            )),
            reports: Arc::new(ReportsService::new(repository.clone(), menu.clone())),
            repository,
            menu,
            clock,
            settings,
        }
    }

    /// Build a context on the system clock and load a JSON seed file into it.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be read or parsed, or when a
    /// seeded cart fails validation.
    pub async fn from_seed_file(
        path: impl AsRef<Path>,
        settings: AppSettings,
    ) -> Result<Self, SeedError> {
        let json = tokio::fs::read_to_string(path.as_ref())
            .await
            .map_err(SeedError::Io)?;

        let context = Self::in_memory(settings);

        context.load(Seed::from_json(&json)?).await?;

        info!(path = %path.as_ref().display(), "seed file loaded");

        Ok(context)
    }

    /// Validate a seed and insert it into this context's menu and store.
    ///
    /// Nothing is written unless the whole seed is valid, including against
    /// active carts already in the store. Meant for startup: the check and the
    /// inserts are not serialized with concurrent `create_cart` calls.
    ///
    /// # Errors
    ///
    /// Returns a validation [`SeedError`], [`SeedError::DuplicateActive`] when
    /// the store already holds an active cart in a seeded active cart's scope,
    /// or [`SeedError::Store`] when the store fails.
    pub async fn load(&self, seed: Seed) -> Result<(), SeedError> {
        seed.validate(self.settings.carts.ttl)?;

        for cart in seed.carts.iter().filter(|cart| cart.is_active()) {
            let existing = self
                .repository
                .find_active(&cart.user_email, cart.restaurant.clone())
                .await?;

            if existing.is_some_and(|existing| existing.uuid != cart.uuid) {
                return Err(SeedError::DuplicateActive {
                    user_email: cart.user_email.clone(),
                    restaurant: cart.restaurant.clone(),
                });
            }
        }

        let items = seed.menu.len();
        let carts = seed.carts.len();

        for item in seed.menu {
            self.menu.upsert(item).await;
        }

        for cart in seed.carts {
            self.repository.insert_or_replace(cart).await?;
        }

        info!(items, carts, "seed loaded");

        Ok(())
    }

    /// A sweeper over this context's store and clock.
    pub fn sweeper(&self) -> ExpirationSweeper {
        ExpirationSweeper::new(
            self.repository.clone(),
            self.clock.clone(),
            self.settings.sweeper,
        )
    }

    /// A rating cache in front of `backend`, on this context's clock.
    pub fn rating_cache(&self, backend: Arc<dyn CommentsBackend>) -> RatingCache {
        RatingCache::new(backend, self.clock.clone(), self.settings.ratings)
    }
}

impl Debug for AppContext {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("AppContext")
            .field("repository", &self.repository)
            .field("menu", &self.menu)
            .field("clock", &self.clock)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;
    use testresult::TestResult;

    use crate::{
        clock::ManualClock,
        domain::{
            carts::{CartsServiceError, data::NewCart, records::CartStatus, sweeper::SweepReport},
            menu::MenuResolver,
            ratings::backend::MockCommentsBackend,
        },
        test::{SUSHI, ana, price},
    };

    use super::*;

    const SEED: &str = r#"{
        "menu": [
            { "id": 1, "name": "Sushi", "price": "12.50", "restaurant": "tokyo" },
            { "id": 3, "name": "Gyoza", "price": "6.00" }
        ],
        "carts": [
            {
                "uuid": "01956e8a-7c00-7000-8000-000000000001",
                "user_email": "ana@example.com",
                "restaurant": "tokyo",
                "items": { "1": 2 },
                "status": "ACTIVE",
                "created_at": "2025-03-01T12:00:00Z",
                "expires_at": "2025-03-02T12:00:00Z",
                "total": "25.00"
            },
            {
                "uuid": "01956e8a-7c00-7000-8000-000000000002",
                "user_email": "ana@example.com",
                "restaurant": "tokyo",
                "items": { "3": 1 },
                "status": "CLOSED",
                "created_at": "2025-02-28T12:00:00Z",
                "expires_at": "2025-03-01T12:00:00Z",
                "total": "6.00"
            }
        ]
    }"#;

    fn seed_file(contents: &str) -> Result<NamedTempFile, io::Error> {
        let mut file = NamedTempFile::new()?;
        file.write_all(contents.as_bytes())?;

        Ok(file)
    }

    #[tokio::test]
    async fn seed_file_populates_menu_and_store() -> TestResult {
        let file = seed_file(SEED)?;
        let context = AppContext::from_seed_file(file.path(), AppSettings::default()).await?;

        assert_eq!(context.repository.len().await, 2);
        assert_eq!(context.menu.price_of(SUSHI).await, Some(price(12_50)));
        assert_eq!(
            context.menu.name_of(MenuItemId::new(3)).await.as_deref(),
            Some("Gyoza")
        );

        let active = context
            .carts
            .active_cart(&ana(), Some(RestaurantId::from("tokyo")))
            .await?;

        assert!(
            active.is_some_and(|cart| cart.quantity_of(SUSHI) == 2),
            "seeded active cart should be found"
        );

        Ok(())
    }

    #[tokio::test]
    async fn seeded_active_carts_block_new_ones() -> TestResult {
        let file = seed_file(SEED)?;
        let context = AppContext::from_seed_file(file.path(), AppSettings::default()).await?;

        let result = context
            .carts
            .create_cart(NewCart::empty(ana(), Some("tokyo".into())))
            .await;

        assert!(
            matches!(result, Err(CartsServiceError::AlreadyActive { .. })),
            "expected AlreadyActive, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn rejects_two_active_carts_in_one_scope() -> TestResult {
        let duplicated = SEED.replace(r#""status": "CLOSED""#, r#""status": "ACTIVE""#);
        let file = seed_file(&duplicated)?;

        let result = AppContext::from_seed_file(file.path(), AppSettings::default()).await;

        assert!(
            matches!(result, Err(SeedError::DuplicateActive { .. })),
            "expected DuplicateActive, got {result:?}"
        );

        Ok(())
    }

    fn manual_context() -> Result<(AppContext, Arc<ManualClock>), jiff::Error> {
        let clock = Arc::new(ManualClock::new("2025-03-01T12:00:00Z".parse()?));
        let context = AppContext::with_clock(AppSettings::default(), clock.clone());

        Ok((context, clock))
    }

    #[tokio::test]
    async fn seeded_cart_cannot_join_an_occupied_scope() -> TestResult {
        let (context, _) = manual_context()?;

        let existing = context
            .carts
            .create_cart(NewCart::empty(ana(), Some("tokyo".into())))
            .await?;

        let result = context.load(Seed::from_json(SEED)?).await;

        assert!(
            matches!(result, Err(SeedError::DuplicateActive { .. })),
            "expected DuplicateActive, got {result:?}"
        );
        assert_eq!(context.repository.len().await, 1, "nothing from the seed is stored");

        let active = context
            .carts
            .user_carts(&ana(), &[CartStatus::Active])
            .await?;

        assert_eq!(active.len(), 1);
        assert_eq!(active[0].uuid, existing.uuid);

        Ok(())
    }

    #[tokio::test]
    async fn seeds_built_in_code_are_validated_on_load() -> TestResult {
        let (context, _) = manual_context()?;
        let mut seed = Seed::from_json(SEED)?;

        seed.carts[1].status = CartStatus::Active;

        let result = context.load(seed).await;

        assert!(
            matches!(result, Err(SeedError::DuplicateActive { .. })),
            "expected DuplicateActive, got {result:?}"
        );
        assert!(context.repository.is_empty().await);

        Ok(())
    }

    #[tokio::test]
    async fn zero_quantities_are_rejected() -> TestResult {
        let (context, _) = manual_context()?;
        let result = context
            .load(Seed::from_json(&SEED.replace(r#"{ "1": 2 }"#, r#"{ "1": 0 }"#))?)
            .await;

        assert!(
            matches!(result, Err(SeedError::ZeroQuantity { item, .. }) if item == SUSHI),
            "expected ZeroQuantity, got {result:?}"
        );
        assert!(context.repository.is_empty().await);
        assert_eq!(context.menu.price_of(SUSHI).await, None, "menu is untouched too");

        Ok(())
    }

    #[tokio::test]
    async fn expiry_must_match_the_cart_ttl() -> TestResult {
        let (context, _) = manual_context()?;
        let seed = Seed::from_json(&SEED.replace("2025-03-02T12:00:00Z", "2025-03-09T12:00:00Z"))?;
        let cart = seed.carts[0].uuid;

        let result = context.load(seed).await;

        assert!(
            matches!(result, Err(SeedError::Expiry { cart: rejected }) if rejected == cart),
            "expected Expiry, got {result:?}"
        );
        assert!(context.repository.is_empty().await);

        Ok(())
    }

    #[tokio::test]
    async fn rating_cache_reuses_fresh_averages() -> TestResult {
        let (context, clock) = manual_context()?;
        let mut backend = MockCommentsBackend::new();

        backend
            .expect_average_rating()
            .times(2)
            .returning(|_| Ok(Some(4.5)));

        let cache = context.rating_cache(Arc::new(backend));

        assert_eq!(cache.rating(SUSHI).await?, Some(4.5));
        assert_eq!(cache.rating(SUSHI).await?, Some(4.5));

        clock.advance(context.settings.ratings.ttl + SignedDuration::from_secs(1))?;

        assert_eq!(cache.rating(SUSHI).await?, Some(4.5), "stale entry is refetched");

        Ok(())
    }

    #[tokio::test]
    async fn missing_and_malformed_files_are_reported() -> TestResult {
        let missing =
            AppContext::from_seed_file("/nonexistent/tablecart/seed.json", AppSettings::default())
                .await;

        assert!(
            matches!(missing, Err(SeedError::Io(_))),
            "expected Io, got {missing:?}"
        );

        let file = seed_file("{ not json")?;
        let malformed = AppContext::from_seed_file(file.path(), AppSettings::default()).await;

        assert!(
            matches!(malformed, Err(SeedError::Json(_))),
            "expected Json, got {malformed:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn sweeper_uses_the_context_clock() -> TestResult {
        let (context, clock) = manual_context()?;

        let cart = context.carts.create_cart(NewCart::empty(ana(), None)).await?;

        clock.advance(SignedDuration::from_hours(25))?;

        let report = context.sweeper().run_once().await?;

        assert_eq!(report, SweepReport { expired: 1, purged: 1 });
        assert!(
            context.repository.get_cart(cart.uuid).await?.is_none(),
            "zero retention purges in the same cycle"
        );

        Ok(())
    }
}
