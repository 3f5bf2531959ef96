//! Integration tests for the intrinsic valuation engine.

mod common;

use approx::assert_relative_eq;
use cavern_core::prelude::*;
use cavern_storage::prelude::*;

use common::{day, init_tracing};

fn simple_model(start: Period, periods: i64, max_inventory: f64, rate: f64) -> StorageModel {
    StorageModel::new(StorageSpec::new(
        start.granularity(),
        start,
        start.offset(periods),
        ConstraintSpec::independent(0.0, max_inventory, rate, rate),
    ))
    .unwrap()
}

// =============================================================================
// GAS CAVERN
// =============================================================================

#[test]
fn cavern_profile_is_consistent() {
    init_tracing();
    let model = common::cavern();
    let forward = common::cavern_forward();
    let rates = common::cavern_rates();
    let settlement = NextMonthOnDay::new(20);
    let market = MarketInputs::new(common::cavern_valuation_date(), &forward, &rates, &settlement);

    let result =
        intrinsic_value(&model, &market, common::CAVERN_INVENTORY, &ValuationConfig::default())
            .unwrap();

    assert_eq!(result.profile.len(), 23);
    assert_eq!(result.profile[0].period, day(2019, 9, 2));
    assert_relative_eq!(result.profile[0].inventory_at_start, 650.0);

    for pair in result.profile.windows(2) {
        let (row, next) = (&pair[0], &pair[1]);
        assert_relative_eq!(
            next.inventory_at_start,
            row.inventory_at_start - row.inventory_loss + row.inject_withdraw_volume,
            epsilon = 1e-9
        );
        assert_relative_eq!(row.inventory_loss, row.inventory_at_start * 0.001, epsilon = 1e-12);
        assert_relative_eq!(
            row.net_volume,
            -(row.inject_withdraw_volume + row.cmdty_consumed),
            epsilon = 1e-12
        );
    }

    for row in &result.profile {
        let range = model
            .inject_withdraw_bounds(&row.period, row.inventory_at_start)
            .unwrap();
        assert!(range.contains(row.inject_withdraw_volume, 1e-9));
    }
    assert!(result.terminal_inventory >= -1e-9 && result.terminal_inventory <= 1800.0 + 1e-9);

    // Doing nothing keeps roughly 635 units worth 59.89 at the end.
    assert!(result.npv > 37_000.0);
    assert!(result.npv.is_finite());
}

#[test]
fn cavern_value_stable_under_grid_refinement() {
    let model = common::cavern();
    let forward = common::cavern_forward();
    let rates = common::cavern_rates();
    let settlement = NextMonthOnDay::new(20);
    let market = MarketInputs::new(common::cavern_valuation_date(), &forward, &rates, &settlement);

    let coarse = intrinsic_value(&model, &market, 650.0, &ValuationConfig::default().with_num_grid_points(50))
        .unwrap();
    let fine = intrinsic_value(&model, &market, 650.0, &ValuationConfig::default().with_num_grid_points(200))
        .unwrap();
    assert_relative_eq!(coarse.npv, fine.npv, max_relative = 1e-2);
}

// =============================================================================
// DEGENERATE CONTRACTS
// =============================================================================

#[test]
fn expired_storage_is_worthless() {
    let model = common::cavern();
    // Wrong granularity and no coverage: irrelevant once expired.
    let forward = TimeSeries::new(Period::month(2019, 9).unwrap(), vec![60.0]);
    let curve = FlatRateCurve::new(0.03);

    // Nor does a config that would otherwise be rejected.
    let unusable = ValuationConfig::default().with_num_grid_points(0);

    for date in [Date::from_ymd(2019, 9, 25).unwrap(), Date::from_ymd(2020, 1, 1).unwrap()] {
        let market = MarketInputs::new(date, &forward, &curve, &PeriodStart);
        for config in [ValuationConfig::default(), unusable.clone()] {
            let result = intrinsic_value(&model, &market, 10_000.0, &config).unwrap();
            assert_eq!(result.npv, 0.0);
            assert!(result.profile.is_empty());
            assert_eq!(result.terminal_value, 0.0);
        }
    }
}

#[test]
fn single_period_contract_has_no_value() {
    let start = day(2019, 9, 1);
    let model = simple_model(start, 1, 1000.0, 100.0);
    let forward = TimeSeries::new(start, vec![45.0]);
    let curve = FlatRateCurve::new(0.05);
    let market = MarketInputs::new(start.start_date(), &forward, &curve, &PeriodStart);

    let result = intrinsic_value(&model, &market, 0.0, &ValuationConfig::default()).unwrap();
    assert_eq!(result.npv, 0.0);
    assert_eq!(result.profile.len(), 1);
    assert_eq!(result.profile[0].inject_withdraw_volume, 0.0);
}

#[test]
fn flat_curve_without_costs_has_no_value() {
    let start = day(2019, 9, 1);
    let model = simple_model(start, 10, 1000.0, 100.0);
    let forward = TimeSeries::new(start, vec![45.0; 10]);
    let curve = FlatRateCurve::new(0.0);
    let market = MarketInputs::new(start.start_date(), &forward, &curve, &PeriodStart);

    let result = intrinsic_value(&model, &market, 0.0, &ValuationConfig::default()).unwrap();
    assert_relative_eq!(result.npv, 0.0, epsilon = 1e-9);
    assert!(result.profile.iter().all(|r| r.inject_withdraw_volume == 0.0));
}

// =============================================================================
// RECONCILIATION
// =============================================================================

#[test]
fn profile_reconciles_to_npv() {
    init_tracing();
    let start = day(2019, 9, 1);
    let spec = StorageSpec::new(
        Granularity::Daily,
        start,
        start.offset(12),
        ConstraintSpec::independent(0.0, 1000.0, 100.0, 200.0),
    )
    .with_injection_cost(PerUnitCost::new(0.05))
    .with_withdrawal_cost(PerUnitCost::new(0.03).with_settlement(NextMonthOnDay::new(10)))
    .with_cmdty_consumed_on_inject(0.001)
    .with_inventory_cost(PerUnitCost::new(0.004));
    let model = StorageModel::new(spec).unwrap();

    let prices = [20.0, 19.0, 18.5, 18.0, 21.0, 23.0, 22.0, 19.0, 18.0, 24.0, 25.0, 22.0];
    let forward = TimeSeries::new(start, prices.to_vec());
    let curve = FlatRateCurve::new(0.04);
    let settlement = NextMonthOnDay::new(20);
    let valuation_date = Date::from_ymd(2019, 8, 25).unwrap();
    let market = MarketInputs::new(valuation_date, &forward, &curve, &settlement);

    // Rates are multiples of the spacing, so every realised inventory is a
    // grid point.
    let config = ValuationConfig::default().with_grid(GridSpec::Spacing(100.0));
    let result = intrinsic_value(&model, &market, 0.0, &config).unwrap();

    let summed: f64 = result.profile.iter().map(|r| r.period_pv).sum::<f64>() + result.terminal_value;
    assert!(result.npv > 0.0);
    assert_relative_eq!(result.npv, summed, epsilon = 1e-8);
    assert_relative_eq!(result.terminal_inventory, 0.0, epsilon = 1e-9);

    // Undiscounted position checks against the price and costs directly.
    let row = result
        .profile
        .iter()
        .find(|r| r.inject_withdraw_volume > 0.0)
        .unwrap();
    let v = row.inject_withdraw_volume;
    let price = prices[row.period.offset_from(&start).unwrap() as usize];
    let expected = -(v * 1.001) * price - v * 0.05 - row.inventory_at_start * 0.004;
    assert_relative_eq!(row.net_cash_position, expected, epsilon = 1e-9);
}

#[test]
fn off_grid_reconciliation_gap_shrinks_with_refinement() {
    // Inventory loss moves realised inventories off the grid, so the replayed
    // profile only approximates the swept value.
    let model = common::cavern();
    let forward = common::cavern_forward();
    let rates = common::cavern_rates();
    let settlement = NextMonthOnDay::new(20);
    let market = MarketInputs::new(common::cavern_valuation_date(), &forward, &rates, &settlement);

    let gap = |points: usize| {
        let config = ValuationConfig::default().with_num_grid_points(points);
        let result = intrinsic_value(&model, &market, common::CAVERN_INVENTORY, &config).unwrap();
        let summed: f64 =
            result.profile.iter().map(|r| r.period_pv).sum::<f64>() + result.terminal_value;
        (result.npv - summed).abs()
    };

    let (coarse, medium, fine) = (gap(20), gap(100), gap(400));
    assert!(medium < coarse, "gap {medium} at 100 points vs {coarse} at 20");
    assert!(fine < medium, "gap {fine} at 400 points vs {medium} at 100");
    assert!(fine < 1.0);
}

#[test]
fn valuation_before_start_discounts_to_valuation_date() {
    let start = day(2019, 9, 1);
    let model = simple_model(start, 2, 100.0, 100.0);
    let forward = TimeSeries::from_fn(day(2019, 8, 1), day(2019, 9, 2), |p| {
        if p == start.next() { 12.0 } else { 10.0 }
    })
    .unwrap();
    let curve = FlatRateCurve::new(0.0);
    let early = Date::from_ymd(2019, 8, 10).unwrap();
    let market = MarketInputs::new(early, &forward, &curve, &PeriodStart);

    let result = intrinsic_value(&model, &market, 0.0, &ValuationConfig::default()).unwrap();
    assert_eq!(result.profile.len(), 2);
    assert_eq!(result.profile[0].period, start);
    assert_relative_eq!(result.npv, 200.0, epsilon = 1e-9);

    let discounted = FlatRateCurve::new(0.10);
    let market = MarketInputs::new(early, &forward, &discounted, &PeriodStart);
    let result = intrinsic_value(&model, &market, 0.0, &ValuationConfig::default()).unwrap();
    let df1 = discounted.discount_factor(early, start.start_date()).unwrap();
    let df2 = discounted.discount_factor(early, start.next().start_date()).unwrap();
    assert_relative_eq!(result.npv, 100.0 * (12.0 * df2 - 10.0 * df1), epsilon = 1e-9);
}

#[test]
fn monthly_storage() -> anyhow::Result<()> {
    let start = Period::month(2020, 4)?;
    let model = simple_model(start, 9, 1000.0, 250.0);
    let prices = [10.0, 9.5, 9.8, 10.2, 10.8, 11.5, 13.0, 14.0, 13.5];
    let forward = TimeSeries::new(start, prices.to_vec());
    let curve = FlatRateCurve::new(0.02);
    let settlement = NextMonthOnDay::new(20);
    let market = MarketInputs::new(Date::from_ymd(2020, 3, 15)?, &forward, &curve, &settlement);

    let result = intrinsic_value(&model, &market, 0.0, &ValuationConfig::default())?;
    assert_eq!(result.profile.len(), 9);
    assert!(result.npv > 0.0);
    // Injects in the cheap summer, withdraws in the winter.
    assert!(result.profile[1].inject_withdraw_volume > 0.0);
    assert!(result.profile[7].inject_withdraw_volume < 0.0);
    Ok(())
}

#[test]
fn spacing_and_point_grids_agree_on_aligned_problem() {
    let start = day(2019, 9, 1);
    let model = simple_model(start, 6, 400.0, 100.0);
    let forward = TimeSeries::new(start, vec![10.0, 9.0, 11.0, 8.0, 12.0, 10.0]);
    let curve = FlatRateCurve::new(0.0);
    let market = MarketInputs::new(start.start_date(), &forward, &curve, &PeriodStart);

    let by_spacing = intrinsic_value(&model, &market, 0.0, &ValuationConfig::default().with_grid(GridSpec::Spacing(50.0))).unwrap();
    // Seven points put every multiple of 100 on each period's grid.
    let by_points = intrinsic_value(&model, &market, 0.0, &ValuationConfig::default().with_num_grid_points(7)).unwrap();
    assert_relative_eq!(by_spacing.npv, by_points.npv, epsilon = 1e-9);
    // Buy 100 at 9, sell at 11, buy 100 at 8 and sell at 12: 2 + 4 per unit.
    assert_relative_eq!(by_spacing.npv, 600.0, epsilon = 1e-9);
}

// =============================================================================
// FAILURES
// =============================================================================

#[test]
fn forward_frequency_mismatch() {
    let model = common::cavern();
    let forward = TimeSeries::new(Period::month(2019, 9).unwrap(), vec![60.0]);
    let curve = FlatRateCurve::new(0.03);
    let market = MarketInputs::new(common::cavern_valuation_date(), &forward, &curve, &PeriodStart);

    let err = intrinsic_value(&model, &market, 650.0, &ValuationConfig::default()).unwrap_err();
    assert!(matches!(err, StorageError::FrequencyMismatch { .. }));
}

#[test]
fn forward_curve_must_cover_horizon() {
    let model = common::cavern();
    // Terminal value needs the price at the end period as well.
    let forward = TimeSeries::new(day(2019, 9, 2), vec![60.0; 23]);
    let curve = FlatRateCurve::new(0.03);
    let market = MarketInputs::new(common::cavern_valuation_date(), &forward, &curve, &PeriodStart);

    let err = intrinsic_value(&model, &market, 650.0, &ValuationConfig::default()).unwrap_err();
    assert!(matches!(err, StorageError::OutOfRange { .. }));
}

#[test]
fn starting_inventory_out_of_bounds() {
    let model = common::cavern();
    let forward = common::cavern_forward();
    let curve = FlatRateCurve::new(0.03);
    let market = MarketInputs::new(common::cavern_valuation_date(), &forward, &curve, &PeriodStart);

    let err = intrinsic_value(&model, &market, 2500.0, &ValuationConfig::default()).unwrap_err();
    assert!(matches!(err, StorageError::OutOfRange { .. }));
}

#[test]
fn cannot_empty_before_end() {
    let start = day(2019, 9, 1);
    let model = simple_model(start, 3, 1000.0, 100.0);
    let forward = TimeSeries::new(start, vec![10.0; 3]);
    let curve = FlatRateCurve::new(0.0);
    let market = MarketInputs::new(start.start_date(), &forward, &curve, &PeriodStart);

    let err = intrinsic_value(&model, &market, 900.0, &ValuationConfig::default()).unwrap_err();
    assert!(matches!(err, StorageError::InfeasibleState { .. }));
}

#[test]
fn invalid_config_rejected_before_sweep() {
    let start = day(2019, 9, 1);
    let model = simple_model(start, 3, 1000.0, 100.0);
    let forward = TimeSeries::new(start, vec![10.0; 3]);
    let curve = FlatRateCurve::new(0.0);
    let market = MarketInputs::new(start.start_date(), &forward, &curve, &PeriodStart);

    let config = ValuationConfig::default().with_num_grid_points(0);
    let err = intrinsic_value(&model, &market, 0.0, &config).unwrap_err();
    assert!(err.is_configuration());
}
