//! Newtype IDs for type-safe entity references.
//!
//! Use the `define_id!` macro to create type-safe ID wrappers that prevent
//! accidentally mixing IDs from different entity types.
//!
//! # Uniqueness
//!
//! Locally generated IDs come from [`next_opaque_id`]: a per-process random
//! prefix followed by a process-wide monotonic counter, both in base 36. IDs
//! are unique for the lifetime of one process. Two processes may (rarely) draw
//! the same prefix, so IDs are not globally unique across processes.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};

use rand::Rng;

/// Width of the per-process prefix (`u32::MAX` is 7 digits in base 36).
const PREFIX_WIDTH: usize = 7;

static PREFIX: OnceLock<String> = OnceLock::new();
static COUNTER: AtomicU64 = AtomicU64::new(0);

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `as_str()`, `into_inner()`
/// - `From<String>`, `From<&str>`, `Display` and `AsRef<str>` implementations
///
/// Passing `generated` as a second argument also adds `generate()`, which
/// draws a fresh ID from [`next_opaque_id`]. IDs issued by the content API
/// (prompts, categories, plans) are defined without it.
///
/// # Example
///
/// ```rust
/// # use promptos_core::define_id;
/// define_id!(OrderId, generated);
/// define_id!(SkuId);
///
/// let order_id = OrderId::generate();
/// let sku_id = SkuId::new("sku-1");
///
/// // These are different types, so this won't compile:
/// // let _: OrderId = sku_id;
/// # let _ = (order_id, sku_id);
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create an ID from an existing string value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the underlying string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the ID and return the underlying string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
    ($name:ident, generated) => {
        $crate::define_id!($name);

        impl $name {
            /// Generate a fresh ID, unique within this process.
            #[must_use]
            pub fn generate() -> Self {
                Self($crate::types::id::next_opaque_id())
            }
        }
    };
}

// IDs issued by the content API
define_id!(PromptId);
define_id!(CategoryId);
define_id!(PlanId);

// IDs generated locally by the ledger
define_id!(UserId, generated);
define_id!(CartItemId, generated);
define_id!(TransactionId, generated);
define_id!(PurchaseId, generated);

/// Generate a short opaque identifier, unique within this process.
#[must_use]
pub fn next_opaque_id() -> String {
    let prefix = PREFIX.get_or_init(|| {
        let seed = u64::from(rand::rng().random::<u32>());
        format!("{:0>width$}", to_base36(seed), width = PREFIX_WIDTH)
    });
    let sequence = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}{}", to_base36(sequence))
}

/// Generate `len` random characters from `[0-9a-z]`.
///
/// Used for access keys and URLs, which only need to be unguessable enough
/// for a mock storefront, not cryptographically strong.
#[must_use]
pub fn random_token(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| char::from_digit(rng.random_range(0..36), 36).unwrap_or('0'))
        .collect()
}

fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_owned();
    }

    let mut digits = Vec::new();
    while value > 0 {
        let digit = u32::try_from(value % 36).unwrap_or(0);
        digits.push(char::from_digit(digit, 36).unwrap_or('0'));
        value /= 36;
    }
    digits.iter().rev().collect()
}
