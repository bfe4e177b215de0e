//! Funding target resolver.
//!
//! Turns a project's pledge configuration into the single canonical monthly
//! target shown everywhere in the UI. Pure and deterministic: the persisted
//! `monthly_target` column is only a cache of this function, so any consumer
//! recomputing it from the same inputs gets the same value.

use crate::types::{CostItem, Money, PledgeConfig};

/// Canonical monthly target for a pledge configuration.
///
/// The flat owner-stated amount and the summed cost items never add up or
/// average: when both are present the **maximum** wins, because the detail
/// view always displays one computed total. Blank form rows (no label, zero
/// unit price) are dropped before summing. An absent configuration resolves
/// to 0, which suppresses the achievement concept entirely.
pub fn resolve_monthly_target(pledge: &PledgeConfig) -> Money {
    let want = pledge.owner_want_monthly.unwrap_or(0);
    let itemized: Money = pledge
        .cost_items
        .iter()
        .filter(|item| !item.is_blank())
        .map(CostItem::monthly)
        .sum();
    want.max(itemized)
}
