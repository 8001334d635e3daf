use super::*;
use time::macros::datetime;

#[test]
fn strength_increase_basic() {
    assert!((strength_increase_pct(185.0, 215.0) - 16.216_216).abs() < 1e-4);
    assert!((strength_increase_pct(200.0, 150.0) + 25.0).abs() < f64::EPSILON);
}

#[test]
fn strength_increase_zero_baseline_is_zero() {
    assert!(strength_increase_pct(0.0, 100.0).abs() < f64::EPSILON);
}

#[test]
fn series_increase_uses_first_and_last() {
    let squat = [225.0, 245.0, 265.0, 275.0, 295.0];
    assert_eq!(series_increase_pct(&squat).round(), 31.0);
}

#[test]
fn series_increase_needs_two_points() {
    assert!(series_increase_pct(&[]).abs() < f64::EPSILON);
    assert!(series_increase_pct(&[185.0]).abs() < f64::EPSILON);
}

#[test]
fn set_completion_pct_counts_sets() {
    assert!((set_completion_pct(7, 14) - 50.0).abs() < f64::EPSILON);
    assert!((set_completion_pct(14, 14) - 100.0).abs() < f64::EPSILON);
    assert!(set_completion_pct(0, 0).abs() < f64::EPSILON);
    assert!((set_completion_pct(20, 14) - 100.0).abs() < f64::EPSILON);
}

#[test]
fn suggested_working_weight_is_three_quarters_rounded() {
    assert!((suggested_working_weight(135.0) - 101.0).abs() < f64::EPSILON);
    assert!((suggested_working_weight(185.0) - 139.0).abs() < f64::EPSILON);
    assert!((suggested_working_weight(200.0) - 150.0).abs() < f64::EPSILON);
}

#[test]
fn start_of_month_truncates_to_first_midnight() {
    let now = datetime!(2024-02-29 18:45:12 +02:00);
    assert_eq!(start_of_month(now), datetime!(2024-02-01 00:00 +02:00));
    let first = datetime!(2024-03-01 00:00 UTC);
    assert_eq!(start_of_month(first), first);
}
