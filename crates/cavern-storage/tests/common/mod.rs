//! Shared fixtures for the storage integration tests.

#![allow(dead_code)]

use cavern_core::prelude::*;
use cavern_storage::prelude::*;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn day(y: i32, m: u32, d: u32) -> Period {
    Period::day(y, m, d).unwrap()
}

// =============================================================================
// GAS CAVERN FIXTURE
// =============================================================================

/// Daily cavern with two pillar rows, a ratchet change on 2019-09-10 and a
/// terminal value linear in inventory.
pub fn cavern_spec() -> StorageSpec {
    let rows = vec![
        PillarRow::new(
            day(2019, 8, 28),
            vec![
                InventoryPillar::new(0.0, -150.0, 255.2),
                InventoryPillar::new(2000.0, -200.0, 175.0),
            ],
        ),
        PillarRow::new(
            day(2019, 9, 10),
            vec![
                InventoryPillar::new(0.0, -170.5, 235.8),
                InventoryPillar::new(700.0, -180.2, 200.77),
                InventoryPillar::new(1800.0, -190.5, 174.45),
            ],
        ),
    ];

    StorageSpec::new(
        Granularity::Daily,
        day(2019, 8, 28),
        day(2019, 9, 25),
        ConstraintSpec::pillar_table(rows),
    )
    .with_injection_cost(PerUnitCost::new(0.015))
    .with_withdrawal_cost(PerUnitCost::new(0.02))
    .with_cmdty_consumed_on_inject(0.0001)
    .with_cmdty_consumed_on_withdraw(0.000088)
    .with_inventory_loss(0.001)
    .with_inventory_cost(PerUnitCost::new(0.002))
    .with_terminal_value(TerminalValue::function(|price, inventory| {
        price * inventory - 15.4
    }))
}

pub fn cavern() -> StorageModel {
    StorageModel::new(cavern_spec()).unwrap()
}

pub const CAVERN_INVENTORY: f64 = 650.0;

pub fn cavern_valuation_date() -> Date {
    Date::from_ymd(2019, 9, 2).unwrap()
}

/// Forward curve from the valuation date through the storage end.
pub fn cavern_forward() -> TimeSeries<f64> {
    TimeSeries::from_fn(day(2019, 9, 2), day(2019, 9, 25), |p| {
        if p < day(2019, 9, 12) {
            58.89
        } else if p < day(2019, 9, 18) {
            61.41
        } else {
            59.89
        }
    })
    .unwrap()
}

/// Spot volatility by period.
pub fn cavern_volatility() -> TimeSeries<f64> {
    TimeSeries::from_fn(day(2019, 9, 2), day(2019, 9, 25), |p| {
        if p < day(2019, 9, 12) {
            1.35
        } else if p < day(2019, 9, 18) {
            1.13
        } else {
            1.24
        }
    })
    .unwrap()
}

/// Flat 3% daily rates covering every settlement date of the fixture.
pub fn cavern_rates() -> RateCurve {
    let rates = TimeSeries::from_fn(day(2019, 8, 1), day(2019, 12, 31), |_| 0.03).unwrap();
    RateCurve::new(rates).unwrap()
}

pub const CAVERN_MEAN_REVERSION: f64 = 14.5;
