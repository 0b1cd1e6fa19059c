//! # Currency Conversion
//!
//! Converts import invoice amounts into New Taiwan Dollars.
//!
//! ## Rate Resolution
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Which rate is used?                                  │
//! │                                                                         │
//! │  1. Source currency is TWD  ──► identity rate, nothing to look up      │
//! │  2. Rate typed into the form ──► manual rate                           │
//! │  3. Tenant's stored rate     ──► exchange_rates table                  │
//! │  4. None of the above        ──► CoreError::ExchangeRateMissing         │
//! │                                                                         │
//! │  No live-rate fetching, no caching.                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rates are stored in millionths: 0.21 TWD per JPY is `210_000`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::{div_round, Money};

/// Scale of [`ExchangeRate`] (one unit = 1/1,000,000).
pub const RATE_SCALE: i128 = 1_000_000;

// =============================================================================
// Currency
// =============================================================================

/// Currencies the import desk invoices in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    /// New Taiwan Dollar (home currency).
    Twd,
    Jpy,
    Usd,
    Eur,
    Gbp,
    Aud,
    Krw,
    Cny,
}

impl Currency {
    /// Every supported currency.
    pub const ALL: [Currency; 8] = [
        Currency::Twd,
        Currency::Jpy,
        Currency::Usd,
        Currency::Eur,
        Currency::Gbp,
        Currency::Aud,
        Currency::Krw,
        Currency::Cny,
    ];

    /// ISO 4217 code.
    pub const fn code(&self) -> &'static str {
        match self {
            Currency::Twd => "TWD",
            Currency::Jpy => "JPY",
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
            Currency::Aud => "AUD",
            Currency::Krw => "KRW",
            Currency::Cny => "CNY",
        }
    }

    /// True for the home currency.
    pub const fn is_home(&self) -> bool {
        matches!(self, Currency::Twd)
    }

    /// Formats an amount with the currency code, e.g. `JPY 80000.00`.
    pub fn format(&self, amount: Money) -> String {
        format!("{} {}", self.code(), amount)
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_uppercase();
        // Common desk shorthand
        let wanted = match wanted.as_str() {
            "NTD" | "NT$" => "TWD".to_string(),
            "YEN" | "円" => "JPY".to_string(),
            "RMB" => "CNY".to_string(),
            _ => wanted,
        };

        Currency::ALL
            .into_iter()
            .find(|c| c.code() == wanted)
            .ok_or_else(|| {
                let codes: Vec<&str> = Currency::ALL.iter().map(Currency::code).collect();
                ValidationError::not_allowed("currency", &codes)
            })
    }
}

// =============================================================================
// Exchange Rate
// =============================================================================

/// TWD per one unit of a foreign currency, in millionths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ExchangeRate(u64);

impl ExchangeRate {
    /// Creates a rate from millionths (`210_000` = 0.21).
    #[inline]
    pub const fn from_micros(micros: u64) -> Self {
        ExchangeRate(micros)
    }

    /// The 1:1 rate used for TWD amounts.
    #[inline]
    pub const fn identity() -> Self {
        ExchangeRate(RATE_SCALE as u64)
    }

    /// Creates a rate from a decimal as typed into a form.
    ///
    /// ## Rules
    /// - Must be a finite number (NaN and infinities are rejected)
    /// - Must be greater than zero
    /// - Rounded to six decimal places
    ///
    /// ## Example
    /// ```rust
    /// use cellar_core::currency::ExchangeRate;
    ///
    /// assert_eq!(ExchangeRate::from_decimal(0.21).unwrap().micros(), 210_000);
    /// assert!(ExchangeRate::from_decimal(f64::NAN).is_err());
    /// assert!(ExchangeRate::from_decimal(0.0).is_err());
    /// ```
    pub fn from_decimal(rate: f64) -> Result<Self, ValidationError> {
        if !rate.is_finite() {
            return Err(ValidationError::InvalidFormat {
                field: "exchange_rate".to_string(),
                reason: "must be a finite number".to_string(),
            });
        }

        let micros = (rate * RATE_SCALE as f64).round();
        if micros <= 0.0 {
            return Err(ValidationError::MustBePositive {
                field: "exchange_rate".to_string(),
            });
        }
        if micros > u32::MAX as f64 {
            return Err(ValidationError::OutOfRange {
                field: "exchange_rate".to_string(),
                min: 0,
                max: (u32::MAX as i128 / RATE_SCALE) as i64,
            });
        }

        Ok(ExchangeRate(micros as u64))
    }

    /// Returns the rate in millionths.
    #[inline]
    pub const fn micros(&self) -> u64 {
        self.0
    }
}

// =============================================================================
// Conversion
// =============================================================================

/// Converts `amount` (minor units of the source currency) to TWD cents.
///
/// `amount × micros / 1_000_000`, rounded half away from zero.
///
/// ## Example
/// ```rust
/// use cellar_core::currency::{convert, ExchangeRate};
/// use cellar_core::money::Money;
///
/// let invoice = Money::from_major_minor(80_000, 0); // JPY 80,000
/// let twd = convert(invoice, ExchangeRate::from_micros(210_000)).unwrap();
/// assert_eq!(twd.cents(), 1_680_000); // NT$16,800.00
/// ```
pub fn convert(amount: Money, rate: ExchangeRate) -> CoreResult<Money> {
    let converted = div_round(amount.cents() as i128 * rate.micros() as i128, RATE_SCALE);
    i64::try_from(converted)
        .map(Money::from_cents)
        .map_err(|_| CoreError::AmountOverflow("currency conversion"))
}

/// Picks the rate for `currency` following the resolution order above.
pub fn resolve_rate(
    currency: Currency,
    manual: Option<ExchangeRate>,
    stored: Option<ExchangeRate>,
) -> CoreResult<ExchangeRate> {
    if currency.is_home() {
        return Ok(ExchangeRate::identity());
    }

    manual
        .or(stored)
        .ok_or_else(|| CoreError::ExchangeRateMissing(currency.code().to_string()))
}

/// Result of a conversion, as returned to the convert endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Conversion {
    pub currency: Currency,
    pub source_amount_cents: i64,
    pub rate_micros: u64,
    pub twd_amount_cents: i64,
}

/// Resolves the rate and converts in one step.
pub fn convert_to_twd(
    amount: Money,
    currency: Currency,
    manual: Option<ExchangeRate>,
    stored: Option<ExchangeRate>,
) -> CoreResult<Conversion> {
    let rate = resolve_rate(currency, manual, stored)?;
    let twd = convert(amount, rate)?;

    Ok(Conversion {
        currency,
        source_amount_cents: amount.cents(),
        rate_micros: rate.micros(),
        twd_amount_cents: twd.cents(),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
