//! Bound route values and typed binding.
//!
//! A matched route hands its handler a plain name → raw-value map. Values are
//! the exact path substrings; nothing is decoded. [`RouteValues::unmarshal`]
//! turns the map into any `serde::Deserialize` type, parsing numbers and
//! booleans out of the raw strings on demand:
//!
//! ```rust
//! # use gantry::RouteValues;
//! #[derive(serde::Deserialize)]
//! struct PostPath { user: String, post: u64 }
//!
//! let values: RouteValues = [("user", "ana"), ("post", "42")]
//!     .into_iter()
//!     .map(|(k, v)| (k.to_owned(), v.to_owned()))
//!     .collect();
//!
//! let path: PostPath = values.unmarshal().unwrap();
//! assert_eq!(path.post, 42);
//! ```

use std::collections::HashMap;
use std::fmt;

use serde::de::value::{MapDeserializer, StrDeserializer};
use serde::de::{DeserializeOwned, Deserializer, IntoDeserializer, Visitor};
use serde::forward_to_deserialize_any;

/// Capture name → raw path substring.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RouteValues(HashMap<String, String>);

impl RouteValues {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn into_inner(self) -> HashMap<String, String> {
        self.0
    }

    /// Deserializes the bound values into `T`, one field per capture name.
    pub fn unmarshal<T: DeserializeOwned>(&self) -> Result<T, BindError> {
        let pairs = self.0.iter().map(|(k, v)| (k.as_str(), RawValue(v.as_str())));
        T::deserialize(MapDeserializer::new(pairs))
    }
}

impl FromIterator<(String, String)> for RouteValues {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<HashMap<String, String>> for RouteValues {
    fn from(map: HashMap<String, String>) -> Self {
        Self(map)
    }
}

/// Why a set of route values could not be bound to the requested type.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct BindError(String);

impl serde::de::Error for BindError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Self(msg.to_string())
    }
}

/// One raw path substring, parsed into whatever the target field asks for.
struct RawValue<'de>(&'de str);

macro_rules! parse_raw {
    ($($method:ident => $visit:ident as $ty:ty),* $(,)?) => {$(
        fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
            match self.0.parse::<$ty>() {
                Ok(parsed) => visitor.$visit(parsed),
                Err(_) => Err(BindError(format!(
                    "cannot parse `{}` as {}", self.0, stringify!($ty)
                ))),
            }
        }
    )*};
}

impl<'de> Deserializer<'de> for RawValue<'de> {
    type Error = BindError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        visitor.visit_borrowed_str(self.0)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        visitor.visit_some(self)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, BindError> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, BindError> {
        let variant: StrDeserializer<'de, BindError> = self.0.into_deserializer();
        visitor.visit_enum(variant)
    }

    parse_raw! {
        deserialize_bool => visit_bool as bool,
        deserialize_i8 => visit_i8 as i8,
        deserialize_i16 => visit_i16 as i16,
        deserialize_i32 => visit_i32 as i32,
        deserialize_i64 => visit_i64 as i64,
        deserialize_u8 => visit_u8 as u8,
        deserialize_u16 => visit_u16 as u16,
        deserialize_u32 => visit_u32 as u32,
        deserialize_u64 => visit_u64 as u64,
        deserialize_f32 => visit_f32 as f32,
        deserialize_f64 => visit_f64 as f64,
        deserialize_char => visit_char as char,
    }

    forward_to_deserialize_any! {
        str string bytes byte_buf unit unit_struct seq tuple
        tuple_struct map struct identifier ignored_any
    }
}

impl<'de> IntoDeserializer<'de, BindError> for RawValue<'de> {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}
