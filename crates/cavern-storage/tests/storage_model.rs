//! Property tests for storage model queries.

mod common;

use approx::assert_relative_eq;
use cavern_core::prelude::*;
use cavern_storage::prelude::*;
use proptest::prelude::*;

use common::day;

fn two_row_model(lo: InventoryPillar, hi: InventoryPillar) -> StorageModel {
    let rows = vec![
        PillarRow::new(day(2020, 1, 1), vec![lo, hi]),
        PillarRow::new(
            day(2020, 3, 1),
            vec![
                InventoryPillar::new(lo.inventory, -1.0, 1.0),
                InventoryPillar::new(hi.inventory, -1.0, 1.0),
            ],
        ),
    ];
    let spec = StorageSpec::new(
        Granularity::Daily,
        day(2020, 1, 1),
        day(2020, 4, 1),
        ConstraintSpec::pillar_table(rows),
    )
    .with_terminal_value(TerminalValue::function(|_, _| 0.0));
    StorageModel::new(spec).unwrap()
}

prop_compose! {
    fn pillar_pair()(
        lo_inv in 0.0..5_000.0f64,
        width in 1.0..10_000.0f64,
        lo_min in -500.0..0.0f64,
        lo_max in 0.0..500.0f64,
        hi_min in -500.0..0.0f64,
        hi_max in 0.0..500.0f64,
    ) -> (InventoryPillar, InventoryPillar) {
        (
            InventoryPillar::new(lo_inv, lo_min, lo_max),
            InventoryPillar::new(lo_inv + width, hi_min, hi_max),
        )
    }
}

proptest! {
    #[test]
    fn midpoint_bounds_are_mean_of_pillars((lo, hi) in pillar_pair(), offset in 0i64..60) {
        let model = two_row_model(lo, hi);
        let period = day(2020, 1, 1).offset(offset);
        let mid = 0.5 * (lo.inventory + hi.inventory);

        let range = model.inject_withdraw_bounds(&period, mid).unwrap();
        prop_assert!((range.min_rate - 0.5 * (lo.min_rate + hi.min_rate)).abs() < 1e-9);
        prop_assert!((range.max_rate - 0.5 * (lo.max_rate + hi.max_rate)).abs() < 1e-9);
    }

    #[test]
    fn inventory_bounds_round_trip(
        min in 0.0..1_000.0f64,
        extra in 0.0..1_000.0f64,
        values in prop::collection::vec(1_000.0..5_000.0f64, 31),
        offset in 0i64..31,
    ) {
        let start = day(2021, 1, 1);
        let end = start.offset(30);
        let max_series = TimeSeries::new(start, values.clone());
        let spec = StorageSpec::new(
            Granularity::Daily,
            start,
            end,
            ConstraintSpec::independent(min, max_series, 10.0 + extra, 10.0),
        )
        .with_terminal_value(TerminalValue::function(|_, _| 0.0));
        let model = StorageModel::new(spec).unwrap();

        let period = start.offset(offset);
        prop_assert_eq!(model.min_inventory(&period).unwrap(), min);
        prop_assert_eq!(model.max_inventory(&period).unwrap(), values[offset as usize]);
    }

    #[test]
    fn scalar_costs_are_linear_in_volume(
        rate in 0.0..1.0f64,
        inventory in 0.0..1_000.0f64,
        volume in 0.0..500.0f64,
    ) {
        let start = day(2021, 1, 1);
        let spec = StorageSpec::new(
            Granularity::Daily,
            start,
            start.offset(10),
            ConstraintSpec::independent(0.0, 1_000.0, 100.0, 100.0),
        )
        .with_injection_cost(PerUnitCost::new(rate))
        .with_withdrawal_cost(PerUnitCost::new(rate));
        let model = StorageModel::new(spec).unwrap();
        let period = start.offset(3);

        let injection: f64 = model
            .injection_cost(&period, inventory, volume)
            .unwrap()
            .iter()
            .map(|c| c.amount)
            .sum();
        let withdrawal: f64 = model
            .withdrawal_cost(&period, inventory, volume)
            .unwrap()
            .iter()
            .map(|c| c.amount)
            .sum();
        prop_assert!((injection - volume * rate).abs() < 1e-9);
        prop_assert!((withdrawal - volume * rate).abs() < 1e-9);
    }
}

#[test]
fn cavern_fixture_queries() {
    let model = common::cavern();

    let range = model.inject_withdraw_bounds(&day(2019, 9, 1), 1000.0).unwrap();
    assert_relative_eq!(range.min_rate, -175.0, epsilon = 1e-12);
    assert_relative_eq!(range.max_rate, 215.1, epsilon = 1e-12);

    assert_relative_eq!(model.inventory_loss_pct(&day(2019, 9, 1)).unwrap(), 0.001);
    assert_relative_eq!(model.max_inventory(&model.end()).unwrap(), 1800.0);
    assert!(model.inventory_loss_pct(&model.end()).is_err());
}

#[test]
fn stacked_costs_with_own_settlement() {
    let spec = common::cavern_spec().with_injection_cost(
        PerUnitCost::new(0.01).with_settlement(NextMonthOnDay::new(5)),
    );
    let model = StorageModel::new(spec).unwrap();

    let costs = model.injection_cost(&day(2019, 9, 3), 500.0, 100.0).unwrap();
    assert_eq!(costs.len(), 2);
    assert_eq!(costs[0].date, Date::from_ymd(2019, 9, 3).unwrap());
    assert_eq!(costs[1].date, Date::from_ymd(2019, 10, 5).unwrap());
    assert_relative_eq!(costs[1].amount, 1.0, epsilon = 1e-12);
}

#[test]
fn polynomial_pillar_interpolation() {
    let mut spec = common::cavern_spec();
    if let ConstraintSpec::PillarTable { interpolation, .. } = &mut spec.constraints {
        *interpolation = PillarInterpolation::Polynomial;
    }
    let model = StorageModel::new(spec).unwrap();

    let at_pillar = model.inject_withdraw_bounds(&day(2019, 9, 12), 700.0).unwrap();
    assert_relative_eq!(at_pillar.max_rate, 200.77, epsilon = 1e-8);

    let linear = common::cavern();
    let between_poly = model.inject_withdraw_bounds(&day(2019, 9, 12), 1200.0).unwrap();
    let between_linear = linear.inject_withdraw_bounds(&day(2019, 9, 12), 1200.0).unwrap();
    assert!((between_poly.max_rate - between_linear.max_rate).abs() > 1e-6);
}
