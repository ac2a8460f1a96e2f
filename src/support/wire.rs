//! Bidirectional enum ↔ wire-token tables
//!
//! One table per enum, declared next to the enum itself. The generated
//! `ALL` slice lets tests prove every variant has a unique token.

/// Declare a fieldless enum together with its wire tokens.
///
/// Generates `ALL`, `as_wire`, `from_wire` (ASCII case-insensitive),
/// `Display`, and string-based serde impls.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$vmeta:meta])*
                $variant:ident => $wire:literal
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        $vis enum $name {
            $(
                $(#[$vmeta])*
                $variant
            ),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_wire(&self) -> &'static str {
                match self {
                    $(Self::$variant => $wire),+
                }
            }

            pub fn from_wire(text: &str) -> Option<Self> {
                let text = text.trim();
                $(
                    if text.eq_ignore_ascii_case($wire) {
                        return Some(Self::$variant);
                    }
                )+
                None
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_wire())
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_wire())
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let text = <String as serde::Deserialize>::deserialize(deserializer)?;
                Self::from_wire(&text).ok_or_else(|| {
                    serde::de::Error::custom(format!(
                        "unknown {} '{}'",
                        stringify!($name),
                        text
                    ))
                })
            }
        }
    };
}

pub(crate) use wire_enum;

/// Assert that an enum's wire table is complete and unambiguous.
#[cfg(test)]
macro_rules! assert_wire_table {
    ($name:ty) => {{
        let mut seen = std::collections::HashSet::new();
        for variant in <$name>::ALL {
            let wire = variant.as_wire();
            assert!(seen.insert(wire.to_ascii_lowercase()), "duplicate token {wire}");
            assert_eq!(<$name>::from_wire(wire), Some(*variant), "token {wire} does not map back");
        }
    }};
}

#[cfg(test)]
pub(crate) use assert_wire_table;
