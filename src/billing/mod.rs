//! Fee calculation for completed parking sessions. Pure functions over
//! timestamps and the hourly rate table; no storage or I/O concerns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::VehicleCategory;

pub const DEFAULT_CAR_RATE_CENTS: u64 = 200;
pub const DEFAULT_MOTORCYCLE_RATE_CENTS: u64 = 100;
pub const DEFAULT_BICYCLE_RATE_CENTS: u64 = 50;

/// Monetary amount in integer cents. Never a float.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fee(u64);

impl Fee {
    pub const ZERO: Fee = Fee(0);

    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    pub const fn cents(self) -> u64 {
        self.0
    }

    pub const fn saturating_add(self, other: Fee) -> Fee {
        Fee(self.0.saturating_add(other.0))
    }

    const fn saturating_mul(self, factor: u64) -> Fee {
        Fee(self.0.saturating_mul(factor))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BillingError {
    #[error("exit timestamp {exit} precedes entry timestamp {entry}")]
    InvalidInterval {
        entry: DateTime<Utc>,
        exit: DateTime<Utc>,
    },
}

/// Hourly rates per vehicle category, in cents.
#[derive(Debug, Clone)]
pub struct RateTable {
    car: Fee,
    motorcycle: Fee,
    bicycle: Fee,
}

impl RateTable {
    pub fn new(car_cents: u64, motorcycle_cents: u64, bicycle_cents: u64) -> Self {
        Self {
            car: Fee::from_cents(car_cents),
            motorcycle: Fee::from_cents(motorcycle_cents),
            bicycle: Fee::from_cents(bicycle_cents),
        }
    }

    pub fn rate_for(&self, category: VehicleCategory) -> Fee {
        match category {
            VehicleCategory::Car => self.car,
            VehicleCategory::Motorcycle => self.motorcycle,
            VehicleCategory::Bicycle => self.bicycle,
        }
    }
}

impl Default for RateTable {
    fn default() -> Self {
        Self::new(
            DEFAULT_CAR_RATE_CENTS,
            DEFAULT_MOTORCYCLE_RATE_CENTS,
            DEFAULT_BICYCLE_RATE_CENTS,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BillingBreakdown {
    pub minutes: u64,
    pub hours: u64,
    pub fee: Fee,
}

/// Minutes billed for an occupancy interval: seconds rounded up to the
/// next minute, with a one minute floor so a same-minute exit still bills.
pub fn billable_minutes(entry: DateTime<Utc>, exit: DateTime<Utc>) -> u64 {
    let seconds = (exit - entry).num_seconds().max(0) as u64;
    seconds.div_ceil(60).max(1)
}

/// Hours billed for a number of billable minutes: rounded up, one hour
/// minimum.
pub fn billable_hours(minutes: u64) -> u64 {
    minutes.div_ceil(60).max(1)
}

/// Whole minutes elapsed, rounded down. Display quantity only, never
/// used for billing.
pub fn elapsed_minutes(from: DateTime<Utc>, to: DateTime<Utc>) -> u64 {
    ((to - from).num_seconds().max(0) as u64) / 60
}

/// Settles an interval against an hourly rate. Partial hours round up,
/// with a one hour minimum. Rejects intervals that run backwards instead
/// of clamping them.
pub fn compute_fee(
    entry: DateTime<Utc>,
    exit: DateTime<Utc>,
    rate: Fee,
) -> Result<BillingBreakdown, BillingError> {
    if exit < entry {
        return Err(BillingError::InvalidInterval { entry, exit });
    }

    let minutes = billable_minutes(entry, exit);
    let hours = billable_hours(minutes);

    Ok(BillingBreakdown {
        minutes,
        hours,
        fee: rate.saturating_mul(hours),
    })
}

/// Fee the session would settle at if it ended now. `None` when the
/// interval is invalid; estimates never fail a request.
pub fn estimate_fee(entry: DateTime<Utc>, now: DateTime<Utc>, rate: Fee) -> Option<Fee> {
    compute_fee(entry, now, rate).ok().map(|breakdown| breakdown.fee)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn entry() -> DateTime<Utc> {
        "2026-03-01T08:00:00Z".parse().unwrap()
    }

    #[test]
    fn test_immediate_exit_bills_one_hour() {
        let rates = RateTable::default();
        let breakdown = compute_fee(entry(), entry(), rates.rate_for(VehicleCategory::Car)).unwrap();

        assert_eq!(breakdown.minutes, 1);
        assert_eq!(breakdown.hours, 1);
        assert_eq!(breakdown.fee, Fee::from_cents(200));
    }

    #[test]
    fn test_sixty_one_minutes_bills_two_hours() {
        let rates = RateTable::default();
        let exit = entry() + Duration::minutes(61);
        let breakdown = compute_fee(entry(), exit, rates.rate_for(VehicleCategory::Car)).unwrap();

        assert_eq!(breakdown.minutes, 61);
        assert_eq!(breakdown.hours, 2);
    }

    #[test]
    fn test_exact_hour_does_not_round_up() {
        let rates = RateTable::default();
        let exit = entry() + Duration::minutes(120);
        let breakdown =
            compute_fee(entry(), exit, rates.rate_for(VehicleCategory::Bicycle)).unwrap();

        assert_eq!(breakdown.hours, 2);
        assert_eq!(breakdown.fee, Fee::from_cents(100));
    }

    #[test]
    fn test_car_125_minutes_bills_three_hours() {
        let rates = RateTable::default();
        let exit = entry() + Duration::minutes(125);
        let breakdown = compute_fee(entry(), exit, rates.rate_for(VehicleCategory::Car)).unwrap();

        assert_eq!(breakdown.hours, 3);
        assert_eq!(breakdown.fee, Fee::from_cents(600));
    }

    #[test]
    fn test_motorcycle_half_hour_bills_one_hour() {
        let rates = RateTable::default();
        let exit = entry() + Duration::minutes(30);
        let breakdown =
            compute_fee(entry(), exit, rates.rate_for(VehicleCategory::Motorcycle)).unwrap();

        assert_eq!(breakdown.hours, 1);
        assert_eq!(breakdown.fee, Fee::from_cents(100));
    }

    #[test]
    fn test_partial_minute_rounds_up() {
        let exit = entry() + Duration::seconds(90);
        assert_eq!(billable_minutes(entry(), exit), 2);
        // Display elapsed rounds down instead.
        assert_eq!(elapsed_minutes(entry(), exit), 1);
    }

    #[test]
    fn test_backwards_interval_is_rejected() {
        let rates = RateTable::default();
        let exit = entry() - Duration::seconds(1);
        let result = compute_fee(entry(), exit, rates.rate_for(VehicleCategory::Car));

        assert!(matches!(result, Err(BillingError::InvalidInterval { .. })));
        assert_eq!(estimate_fee(entry(), exit, Fee::from_cents(200)), None);
    }

    #[test]
    fn test_rate_table_overrides() {
        let rates = RateTable::new(300, 150, 75);
        assert_eq!(rates.rate_for(VehicleCategory::Car), Fee::from_cents(300));
        assert_eq!(
            rates.rate_for(VehicleCategory::Motorcycle),
            Fee::from_cents(150)
        );
        assert_eq!(rates.rate_for(VehicleCategory::Bicycle), Fee::from_cents(75));
    }
}
