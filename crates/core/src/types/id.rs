//! Newtype IDs for type-safe entity references.
//!
//! Use the `define_id!` macro to create type-safe ID wrappers that prevent
//! accidentally mixing IDs from different entity types. A wholesale site ID
//! and a retail site ID are both plain integers in storage, and swapping them
//! in a natural key silently matches the wrong order.

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `i32` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`, `Ord`
/// - Conversion methods: `new()`, `as_i32()`
/// - `From<i32>` and `Into<i32>` implementations
///
/// # Example
///
/// ```rust
/// # use retail_sync_core::define_id;
/// define_id!(WarehouseId);
/// define_id!(ChannelId);
///
/// let warehouse = WarehouseId::new(1);
/// let channel = ChannelId::new(1);
///
/// // These are different types, so this won't compile:
/// // let _: WarehouseId = channel;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(i32);

        impl $name {
            /// Create a new ID from an i32 value.
            #[must_use]
            pub const fn new(id: i32) -> Self {
                Self(id)
            }

            /// Get the underlying i32 value.
            #[must_use]
            pub const fn as_i32(&self) -> i32 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i32> for $name {
            fn from(id: i32) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

// The site that owns the synced orders (our side of the integration).
define_id!(WhslSiteId);
// The remote marketplace or storefront the orders come from.
define_id!(RetailSiteId);
// Local surrogate key of a stored order row.
define_id!(RetailOrderId);
// Entry in the external order-status vocabulary.
define_id!(StatusId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_round_trips_through_i32() {
        let id = RetailOrderId::new(42);
        assert_eq!(id.as_i32(), 42);
        assert_eq!(i32::from(id), 42);
        assert_eq!(RetailOrderId::from(42), id);
    }

    #[test]
    fn test_id_display() {
        assert_eq!(WhslSiteId::new(7).to_string(), "7");
    }

    #[test]
    fn test_id_serializes_transparently() {
        let json = serde_json::to_string(&StatusId::new(3)).ok();
        assert_eq!(json.as_deref(), Some("3"));
    }
}
