//! End-to-end scenarios exercising a full caller-facing workflow: quote
//! normalisation (possibly at mixed granularities) followed by one of the
//! three solvers.

use chrono::Datelike;
use chrono_tz::Europe::London;
use fcurve_core::{Contract, Date, Granularity, Period};
use fcurve_curves::calendar::expand_day_intraday;
use fcurve_curves::contracts::{normalise, ContractQuote};
use fcurve_curves::{bootstrap_contracts, hyperbolic_tension_spline, BootstrapArgs, Coefficients, TensionSplineArgs};

fn month(y: i32, m: u32) -> Period {
    Period::month(Date::from_ymd(y, m, 1).unwrap())
}

fn quarter(y: i32, m: u32) -> Period {
    Period::quarter(Date::from_ymd(y, m, 1).unwrap())
}

/// Monthly bootstrap with a redundant quarter contract: default policy
/// raises a redundancy error; opting in drops it and yields exactly 3
/// non-overlapping months.
#[test]
fn scenario_monthly_bootstrap_with_redundancy() {
    let jan = Contract::single(month(2024, 1), 68.64).unwrap();
    let feb = Contract::single(month(2024, 2), 59.01).unwrap();
    let mar = Contract::single(month(2024, 3), 55.48).unwrap();
    let q1 = Contract::new(month(2024, 1), month(2024, 3), 62.64).unwrap();

    let err = bootstrap_contracts(&[jan, feb, mar, q1], BootstrapArgs::default()).unwrap_err();
    assert!(err.to_string().to_lowercase().contains("redundant"));

    let args = BootstrapArgs { allow_redundancy: true, ..BootstrapArgs::default() };
    let out = bootstrap_contracts(&[jan, feb, mar, q1], args).unwrap();
    assert_eq!(out.contracts.len(), 3);
    for (c, expected) in out.contracts.iter().zip([68.64, 59.01, 55.48]) {
        assert!((c.price() - expected).abs() < 1e-6);
    }
}

/// A tension spline built from quotes at mixed source granularities
/// (quarter, month, year), all normalised down to daily before solving, all
/// priced identically: the output must be flat regardless of tension.
#[test]
fn scenario_flat_price_tension_spline_from_mixed_granularity_quotes() {
    let price = 32.87;
    let quotes = vec![
        ContractQuote::single(quarter(2020, 1), price),
        ContractQuote::single(quarter(2020, 4), price),
        ContractQuote::single(month(2020, 7), price),
        ContractQuote::single(Period::year(Date::from_ymd(2020, 1, 1).unwrap()), price),
    ];
    let contracts = normalise(&quotes, Granularity::Day, None).unwrap();

    for tension_value in [0.0001, 0.1, 1.0, 100.0] {
        let args = TensionSplineArgs {
            tension: Box::new(move |_| Ok(tension_value)),
            explicit_knots: Some(contracts.iter().map(Contract::start).collect()),
            ..TensionSplineArgs::default()
        };
        let out = hyperbolic_tension_spline(&contracts, args).unwrap();
        for (_, v) in &out.forward_curve {
            assert!((v - price).abs() < 1e-6, "tension {tension_value}: value {v}");
        }
    }
}

/// London, 2019-03-31: the clocks-forward day has 23 hours (46 half-hours,
/// not 48). A contract spanning the whole day must average correctly over
/// the true fine-period count.
#[test]
fn scenario_half_hour_clock_change_day_averages_correctly() {
    let date = Date::from_ymd(2019, 3, 31).unwrap();
    let periods = expand_day_intraday(date, London, Granularity::HalfHour).unwrap();
    assert_eq!(periods.len(), 46, "clocks-forward day should have 46 half-hours, not 48");

    let price = 57.05;
    let contract = Contract::new(periods[0], periods[periods.len() - 1], price).unwrap();
    let out = bootstrap_contracts(&[contract], BootstrapArgs::default()).unwrap();
    assert_eq!(out.forward_curve.len(), 46);
    for (_, v) in &out.forward_curve {
        assert!((v - price).abs() < 1e-10);
    }
}

/// A day-of-week `add_adjust` callback returns exactly the configured value
/// for each weekday across a full month of daily periods, and is confirmed
/// inert when wired into the bootstrapper rather than a spline solver.
#[test]
fn scenario_weekday_adjust_callback_applies_named_offsets() {
    let offsets = |period: Period| -> f64 {
        match period.start_date().as_naive_date().weekday() {
            chrono::Weekday::Mon => 3.4,
            chrono::Weekday::Tue => 2.2,
            chrono::Weekday::Wed => 1.1,
            chrono::Weekday::Thu => 0.9,
            chrono::Weekday::Fri => 0.7,
            chrono::Weekday::Sat => 0.2,
            chrono::Weekday::Sun => 0.1,
        }
    };

    // The callback is keyed purely on weekday, so walking every day of May
    // 2019 must reproduce the same seven named offsets on a fixed cycle.
    let start = Date::from_ymd(2019, 5, 1).unwrap();
    for day_index in 0..31 {
        let date = start.add_days(day_index);
        let period = Period::day(date);
        let expected = match date.as_naive_date().weekday() {
            chrono::Weekday::Mon => 3.4,
            chrono::Weekday::Tue => 2.2,
            chrono::Weekday::Wed => 1.1,
            chrono::Weekday::Thu => 0.9,
            chrono::Weekday::Fri => 0.7,
            chrono::Weekday::Sat => 0.2,
            chrono::Weekday::Sun => 0.1,
        };
        assert_eq!(offsets(period), expected, "{period} ({:?})", date.as_naive_date().weekday());
    }

    // The bootstrapper only ever reads discount/weight off `Coefficients`;
    // `add_adjust` is inert there. Wiring the same callback through
    // `BootstrapArgs` must therefore leave the bootstrapped average
    // untouched, unlike its effect on the spline solvers.
    let jan = month(2024, 1);
    let contracts = vec![Contract::single(jan, 10.0).unwrap()];
    let coeffs = Coefficients { add_adjust: Box::new(offsets), ..Coefficients::default() };
    let args = BootstrapArgs { coefficients: coeffs, ..BootstrapArgs::default() };
    let out = bootstrap_contracts(&contracts, args).unwrap();
    let values: Vec<f64> = out
        .forward_curve
        .iter()
        .filter(|(p, _)| *p >= jan && *p <= jan)
        .map(|(_, v)| *v)
        .collect();
    assert!(!values.is_empty());
    let avg = values.iter().sum::<f64>() / values.len() as f64;
    assert!((avg - 10.0).abs() < 1e-8, "average was {avg}");
}
