/// Economics module: balance units and staking reward arithmetic

/// Seconds in a (non-leap) year; APR is spread evenly over it.
pub const SECONDS_PER_YEAR: f64 = 365.0 * 24.0 * 60.0 * 60.0;

/// Base units per coin. Balances are debited and credited in whole units so
/// that a spend accepted against the pending total is still funded when its
/// block confirms.
pub const UNITS_PER_COIN: f64 = 100_000_000.0;

/// Smallest transaction amount.
pub const MIN_AMOUNT: f64 = 0.000_001;

/// Transaction amounts must stay below this.
pub const MAX_AMOUNT: f64 = 1e21;

/// Whether `amount` may appear in a transaction.
///
/// The bounds keep the decimal rendering used in the transaction hash free of
/// exponent notation.
pub fn is_valid_amount(amount: f64) -> bool {
    amount.is_finite() && (MIN_AMOUNT..MAX_AMOUNT).contains(&amount)
}

/// `amount` in whole base units, rounded to the nearest unit.
pub fn to_units(amount: f64) -> i128 {
    (amount * UNITS_PER_COIN).round() as i128
}

pub fn from_units(units: i128) -> f64 {
    units as f64 / UNITS_PER_COIN
}

/// `balance + amount`, computed in base units.
pub fn credit(balance: f64, amount: f64) -> f64 {
    from_units(to_units(balance) + to_units(amount))
}

/// `balance - amount`, computed in base units.
pub fn debit(balance: f64, amount: f64) -> f64 {
    from_units(to_units(balance) - to_units(amount))
}

/// Reward accrued per second by `amount` staked at `apr` percent.
pub fn reward_per_second(amount: f64, apr: f64) -> f64 {
    amount * (apr / 100.0) / SECONDS_PER_YEAR
}

/// Reward added to a position by one accrual cycle of `cycle_secs` seconds.
pub fn reward_for_cycle(amount: f64, apr: f64, cycle_secs: f64) -> f64 {
    reward_per_second(amount, apr) * cycle_secs
}
