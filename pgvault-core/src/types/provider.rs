//! Payment-gateway providers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ValidationError;

/// A payment-gateway provider a tenant can register credentials for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PgProvider {
    /// Toss Payments.
    Toss,
    /// Iamport (`PortOne` v1).
    Iamport,
    /// Kakao Pay.
    Kakao,
    /// Naver Pay.
    Naver,
    /// `PayPal`.
    Paypal,
    /// Stripe.
    Stripe,
}

impl PgProvider {
    /// All providers, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Toss,
        Self::Iamport,
        Self::Kakao,
        Self::Naver,
        Self::Paypal,
        Self::Stripe,
    ];

    /// Returns the wire name (`TOSS`, `IAMPORT`, ...).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Toss => "TOSS",
            Self::Iamport => "IAMPORT",
            Self::Kakao => "KAKAO",
            Self::Naver => "NAVER",
            Self::Paypal => "PAYPAL",
            Self::Stripe => "STRIPE",
        }
    }

    /// Returns a human-readable provider name.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Toss => "Toss Payments",
            Self::Iamport => "Iamport (PortOne)",
            Self::Kakao => "Kakao Pay",
            Self::Naver => "Naver Pay",
            Self::Paypal => "PayPal",
            Self::Stripe => "Stripe",
        }
    }
}

impl fmt::Display for PgProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PgProvider {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::UnknownProvider(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!("toss".parse::<PgProvider>().unwrap(), PgProvider::Toss);
        assert_eq!(" PAYPAL ".parse::<PgProvider>().unwrap(), PgProvider::Paypal);
        assert!(matches!(
            "bitpay".parse::<PgProvider>(),
            Err(ValidationError::UnknownProvider(_))
        ));
    }

    #[test]
    fn test_serde_uses_wire_names() {
        let json = serde_json::to_string(&PgProvider::Iamport).unwrap();
        assert_eq!(json, "\"IAMPORT\"");
        let parsed: PgProvider = serde_json::from_str("\"STRIPE\"").unwrap();
        assert_eq!(parsed, PgProvider::Stripe);
    }
}
