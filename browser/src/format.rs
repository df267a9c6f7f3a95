//! Rate labels for markers, popups and list rows.

use crate::constants::CURRENCY_SYMBOL;
use serde::{Deserialize, Serialize};

/// How rates are rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurrencyFormat {
    /// Symbol placed before the amount.
    pub symbol: String,
    /// Insert `,` between thousands in full-precision labels.
    pub group_thousands: bool,
}

impl Default for CurrencyFormat {
    fn default() -> Self {
        Self {
            symbol: CURRENCY_SYMBOL.to_string(),
            group_thousands: true,
        }
    }
}

impl CurrencyFormat {
    /// Marker label: whole currency units, truncated, e.g. `$75`.
    #[must_use]
    pub fn marker_label(&self, rate: f64) -> String {
        // Sanitized rates are finite and non-negative, truncation is the intent
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let whole = sanitize(rate).trunc() as u64;
        format!("{}{whole}", self.symbol)
    }

    /// Full-precision label with two decimals, e.g. `$1,234.50`.
    #[must_use]
    pub fn full(&self, rate: f64) -> String {
        let fixed = format!("{:.2}", sanitize(rate));
        let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
        let whole = if self.group_thousands {
            group(whole)
        } else {
            whole.to_string()
        };
        format!("{}{whole}.{cents}", self.symbol)
    }

    /// Popup rate line, e.g. `$75.00/hr`.
    #[must_use]
    pub fn hourly(&self, rate: f64) -> String {
        format!("{}/hr", self.full(rate))
    }
}

/// Rates are non-negative by contract; anything else renders as zero.
fn sanitize(rate: f64) -> f64 {
    if rate.is_finite() && rate > 0.0 { rate } else { 0.0 }
}

fn group(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, digit) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}
