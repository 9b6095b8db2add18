//! Reports service.
//!
//! Read-only summaries over closed-cart history, recomputed on every call.

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    sync::Arc,
};

use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::debug;

use crate::{
    domain::{
        carts::{
            records::{CartRecord, CartStatus},
            repositories::CartsRepository,
        },
        ids::{MenuItemId, RestaurantId},
        menu::MenuResolver,
        reports::errors::ReportsServiceError,
    },
    settings::DEFAULT_TOP_ITEMS_LIMIT,
};

/// One row of a "top items" report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopItem {
    pub item: MenuItemId,
    pub name: String,
    pub quantity: u64,
}

pub struct ReportsService {
    repository: Arc<dyn CartsRepository>,
    menu: Arc<dyn MenuResolver>,
}

impl ReportsService {
    pub fn new(repository: Arc<dyn CartsRepository>, menu: Arc<dyn MenuResolver>) -> Self {
        Self { repository, menu }
    }

    /// Five best-selling items across every restaurant.
    ///
    /// # Errors
    ///
    /// Returns [`ReportsServiceError::Store`] when the store fails.
    pub async fn top5_global(&self) -> Result<Vec<TopItem>, ReportsServiceError> {
        self.top_items(None, DEFAULT_TOP_ITEMS_LIMIT).await
    }

    /// Five best-selling items at one restaurant.
    ///
    /// # Errors
    ///
    /// Returns [`ReportsServiceError::Store`] when the store fails.
    pub async fn top5_for_restaurant(
        &self,
        restaurant: &RestaurantId,
    ) -> Result<Vec<TopItem>, ReportsServiceError> {
        self.top_items(Some(restaurant.clone()), DEFAULT_TOP_ITEMS_LIMIT)
            .await
    }

    /// Items ranked by units sold in closed carts, highest first, at most
    /// `limit` rows. Equal quantities keep the order in which the items were
    /// first seen, scanning carts newest first. Items the menu can no longer
    /// name are left out.
    ///
    /// # Errors
    ///
    /// Returns [`ReportsServiceError::Store`] when the store fails.
    pub async fn top_items(
        &self,
        restaurant: Option<RestaurantId>,
        limit: usize,
    ) -> Result<Vec<TopItem>, ReportsServiceError> {
        let carts = self
            .repository
            .find_by_statuses_and_restaurant(&[CartStatus::Closed], restaurant)
            .await?;

        let mut ranked = Vec::new();

        for (item, quantity) in tally(&carts) {
            let Some(name) = self.menu.name_of(item).await else {
                debug!(%item, "menu item no longer resolvable, leaving it out of the report");
                continue;
            };

            ranked.push(TopItem {
                item,
                name,
                quantity,
            });
        }

        // Stable, so ties stay in first-seen order.
        ranked.sort_by(|a, b| b.quantity.cmp(&a.quantity));
        ranked.truncate(limit);

        Ok(ranked)
    }
}

impl Debug for ReportsService {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ReportsService").finish_non_exhaustive()
    }
}

/// Units per item, in first-seen order.
fn tally(carts: &[CartRecord]) -> Vec<(MenuItemId, u64)> {
    let mut order: Vec<(MenuItemId, u64)> = Vec::new();
    let mut positions: FxHashMap<MenuItemId, usize> = FxHashMap::default();

    for (&item, &qty) in carts.iter().flat_map(|cart| &cart.items) {
        match positions.get(&item).and_then(|&index| order.get_mut(index)) {
            Some((_, total)) => *total += u64::from(qty),
            None => {
                positions.insert(item, order.len());
                order.push((item, u64::from(qty)));
            }
        }
    }

    order
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::{
        domain::carts::{data::NewCart, records::CartItems, service::CartsService},
        test::{GYOZA, MYSTERY, OSAKA, RAMEN, SUSHI, TOKYO, TestContext, ana, bo},
    };

    use super::*;

    async fn closed_cart(
        ctx: &TestContext,
        user: crate::domain::ids::UserEmail,
        restaurant: Option<&str>,
        items: CartItems,
    ) -> TestResult {
        let cart = ctx
            .carts
            .create_cart(NewCart::empty(user, restaurant.map(RestaurantId::from)).with_items(items))
            .await?;

        ctx.carts.close_cart(cart.uuid).await?;
        ctx.tick()?;

        Ok(())
    }

    #[tokio::test]
    async fn sums_across_carts_and_breaks_ties_newest_first() -> TestResult {
        let ctx = TestContext::new();

        closed_cart(&ctx, ana(), None, CartItems::from([(SUSHI, 3)])).await?;
        closed_cart(&ctx, ana(), None, CartItems::from([(SUSHI, 2)])).await?;
        closed_cart(&ctx, ana(), None, CartItems::from([(RAMEN, 5)])).await?;

        let top = ctx.reports.top5_global().await?;
        let rows: Vec<(&str, u64)> = top.iter().map(|t| (t.name.as_str(), t.quantity)).collect();

        assert_eq!(rows, vec![("Ramen", 5), ("Sushi", 5)]);

        Ok(())
    }

    #[tokio::test]
    async fn ignores_carts_still_open() -> TestResult {
        let ctx = TestContext::new();

        closed_cart(&ctx, ana(), None, CartItems::from([(GYOZA, 1)])).await?;
        ctx.carts
            .create_cart(NewCart::empty(bo(), None).with_items(CartItems::from([(SUSHI, 9)])))
            .await?;

        let top = ctx.reports.top5_global().await?;

        assert_eq!(top.len(), 1);
        assert!(top.first().is_some_and(|row| row.item == GYOZA));

        Ok(())
    }

    #[tokio::test]
    async fn scopes_to_one_restaurant() -> TestResult {
        let ctx = TestContext::new();

        closed_cart(&ctx, ana(), Some(TOKYO), CartItems::from([(SUSHI, 2)])).await?;
        closed_cart(&ctx, bo(), Some(OSAKA), CartItems::from([(RAMEN, 7)])).await?;

        let tokyo = ctx.reports.top5_for_restaurant(&TOKYO.into()).await?;

        assert_eq!(
            tokyo,
            vec![TopItem {
                item: SUSHI,
                name: "Sushi".to_string(),
                quantity: 2,
            }]
        );

        Ok(())
    }

    #[tokio::test]
    async fn truncates_to_limit_and_skips_unnamed_items() -> TestResult {
        let ctx = TestContext::new();

        closed_cart(
            &ctx,
            ana(),
            None,
            CartItems::from([(SUSHI, 1), (RAMEN, 2), (GYOZA, 3), (MYSTERY, 50)]),
        )
        .await?;

        let top = ctx.reports.top_items(None, 2).await?;
        let items: Vec<MenuItemId> = top.iter().map(|t| t.item).collect();

        assert_eq!(items, vec![GYOZA, RAMEN]);

        Ok(())
    }

    #[tokio::test]
    async fn empty_history_yields_empty_report() -> TestResult {
        let ctx = TestContext::new();

        assert!(ctx.reports.top5_global().await?.is_empty());

        Ok(())
    }
}
