//! Macro for implementing Display and FromStr for status enums
//!
//! Status values travel as upper-case strings (`NEW`, `IN_PROGRESS`, ...)
//! through the database and the HTTP API. Parsing is case-insensitive so
//! that third-party webhook payloads sending `contacted` still map.
//!
//! # Example
//!
//! ```rust
//! use leadflow_domain::impl_domain_status_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Stage {
//!     Open,
//!     Closed,
//! }
//!
//! impl_domain_status_conversions!(Stage {
//!     Open => "OPEN",
//!     Closed => "CLOSED",
//! });
//!
//! assert_eq!(Stage::Open.to_string(), "OPEN");
//! assert_eq!("closed".parse::<Stage>(), Ok(Stage::Closed));
//! ```

/// Implements Display, FromStr and `as_str` for status enums
///
/// # Arguments
///
/// * `$enum_name` - The name of the enum type
/// * `$variant => $str` - Mapping of enum variants to their canonical string
///   representations
#[macro_export]
macro_rules! impl_domain_status_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl $enum_name {
            /// Canonical string form used for storage and the wire.
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $str,)+
                }
            }
        }

        impl ::std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::std::str::FromStr for $enum_name {
            type Err = ::std::string::String;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                let candidate = s.trim();
                $(
                    if candidate.eq_ignore_ascii_case($str) {
                        return ::std::result::Result::Ok(Self::$variant);
                    }
                )+
                ::std::result::Result::Err(::std::format!(
                    "Invalid {}: {}",
                    ::std::stringify!($enum_name),
                    s
                ))
            }
        }
    };
}
