use chrono::Utc;

use crate::errors::DomainError;
use crate::invariants;
use crate::target::resolve_monthly_target;
use crate::types::{CostItem, PledgeConfig, Project, ProjectStatus};

fn item(label: &str, unit_price: i64, quantity: u32) -> CostItem {
    CostItem {
        label: label.to_string(),
        unit_price,
        quantity,
    }
}

fn pledge(want: Option<i64>, items: Vec<CostItem>) -> PledgeConfig {
    PledgeConfig {
        owner_want_monthly: want,
        cost_items: items,
    }
}

fn project_with(pledge: PledgeConfig) -> Project {
    let now = Utc::now();
    let mut project = Project {
        id: "p-1".into(),
        owner_id: "u-owner".into(),
        name: "Test project".into(),
        description: String::new(),
        status: ProjectStatus::Active,
        pledge,
        monthly_target: 0,
        alerts: None,
        created_at: now,
        updated_at: now,
    };
    project.refresh_monthly_target();
    project
}

#[test]
fn test_flat_amount_wins_when_larger() {
    let config = pledge(Some(50_000), vec![item("server", 30_000, 1)]);
    assert_eq!(resolve_monthly_target(&config), 50_000);
}

#[test]
fn test_cost_items_win_when_larger() {
    let config = pledge(Some(30_000), vec![item("server", 50_000, 1)]);
    assert_eq!(resolve_monthly_target(&config), 50_000);
}

#[test]
fn test_empty_configuration_resolves_to_zero() {
    assert_eq!(resolve_monthly_target(&pledge(None, vec![])), 0);
}

#[test]
fn test_cost_items_multiply_price_by_quantity() {
    let config = pledge(
        None,
        vec![item("dev day", 40_000, 5), item("server", 8_000, 2)],
    );
    assert_eq!(resolve_monthly_target(&config), 216_000);
}

#[test]
fn test_blank_rows_are_dropped() {
    let config = pledge(None, vec![item("", 0, 1), item("server", 12_000, 1)]);
    assert_eq!(resolve_monthly_target(&config), 12_000);
}

#[test]
fn test_unlabelled_priced_row_is_kept() {
    // A price without a label is a real cost line, not an unfilled row.
    let config = pledge(None, vec![item("", 1_200, 2)]);
    assert_eq!(resolve_monthly_target(&config), 2_400);
}

#[test]
fn test_labelled_zero_price_row_is_kept_but_contributes_nothing() {
    let config = pledge(None, vec![item("volunteer time", 0, 10)]);
    assert_eq!(resolve_monthly_target(&config), 0);
}

#[test]
fn test_zero_quantity_contributes_nothing() {
    let config = pledge(None, vec![item("standby server", 9_000, 0)]);
    assert_eq!(resolve_monthly_target(&config), 0);
}

#[test]
fn test_resolution_is_idempotent() {
    let config = pledge(Some(35_000), vec![item("server", 20_000, 1)]);
    assert_eq!(
        resolve_monthly_target(&config),
        resolve_monthly_target(&config)
    );
}

#[test]
fn test_edit_and_revert_returns_original_target() {
    let mut config = pledge(Some(35_000), vec![item("server", 20_000, 1)]);
    let original = resolve_monthly_target(&config);

    config.cost_items.push(item("cdn", 15_000, 2));
    assert_ne!(resolve_monthly_target(&config), original);

    config.cost_items.pop();
    assert_eq!(resolve_monthly_target(&config), original);
}

#[test]
fn test_refresh_keeps_cache_coherent() {
    let mut project = project_with(pledge(Some(40_000), vec![]));
    invariants::assert_target_cache_coherent(&project);

    project.pledge.cost_items.push(item("server", 60_000, 1));
    project.refresh_monthly_target();
    invariants::assert_target_cache_coherent(&project);
    assert_eq!(project.monthly_target, 60_000);
}

#[test]
fn test_negative_unit_price_rejected() {
    let config = pledge(None, vec![item("refund", -500, 1)]);
    assert!(matches!(
        config.validate(),
        Err(DomainError::InvalidCostItem(_))
    ));
}

#[test]
fn test_negative_owner_want_rejected() {
    let config = pledge(Some(-1), vec![]);
    assert!(matches!(config.validate(), Err(DomainError::Validation(_))));
}
