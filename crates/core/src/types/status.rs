//! Status and kind enums for ledger entities.
//!
//! Serialized names match the stored ledger format: lowercase words, with
//! `one-time` in kebab case.

use serde::{Deserialize, Serialize};

/// What a wallet transaction did to the balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Money added to the wallet.
    Topup,
    /// Money spent on prompts or renewals.
    Purchase,
    /// Money returned to the wallet.
    Refund,
}

/// Settlement state of a wallet transaction.
///
/// Only `Completed` transactions count toward the wallet balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    #[default]
    Pending,
    Completed,
    Failed,
}

/// How a purchased product was bought.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PurchaseKind {
    /// Bought outright, never expires.
    OneTime,
    /// Bought under a subscription plan, expires and can be renewed.
    Subscription,
}

/// Access state of a purchased product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseStatus {
    #[default]
    Active,
    Expired,
}

/// How a checkout is paid for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Debit the in-app wallet.
    #[default]
    Wallet,
    /// External card payment (mocked, always succeeds).
    Card,
}

impl PaymentMethod {
    /// Whether this method draws on the wallet balance.
    #[must_use]
    pub const fn is_wallet(&self) -> bool {
        matches!(self, Self::Wallet)
    }
}

macro_rules! impl_display_from_str {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => f.write_str($text),)+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(format!(concat!("invalid ", stringify!($name), ": {}"), s)),
                }
            }
        }
    };
}

impl_display_from_str!(TransactionKind {
    Topup => "topup",
    Purchase => "purchase",
    Refund => "refund",
});

impl_display_from_str!(TransactionStatus {
    Pending => "pending",
    Completed => "completed",
    Failed => "failed",
});

impl_display_from_str!(PurchaseKind {
    OneTime => "one-time",
    Subscription => "subscription",
});

impl_display_from_str!(PurchaseStatus {
    Active => "active",
    Expired => "expired",
});

impl_display_from_str!(PaymentMethod {
    Wallet => "wallet",
    Card => "card",
});
