use std::{fmt, sync::Arc};
use std::collections::BTreeMap;

use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::{Serialize, Serializer};

use crate::value::Date;

pub type Dict<K = Arc<str>, V = Value> = BTreeMap<K, V>;

/// The key `toml` uses to smuggle datetimes through `serde`.
const TOML_DATETIME_KEY: &str = "$__toml_private_datetime";

/// Represents any value that can appear in front matter, configuration, or
/// data files.
///
/// Strings that look like dates deserialize as [`Value::Date`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Num(Num),
    String(Arc<str>),
    Date(Date),
    Array(Arc<Vec<Value>>),
    Dict(Arc<Dict>),
}

impl Value {
    /// Interprets free text: a parseable date becomes a [`Value::Date`],
    /// anything else a [`Value::String`].
    pub fn from_text(text: &str) -> Value {
        Date::parse(text).map(Value::Date).unwrap_or_else(|| Value::String(text.into()))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn to_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None
        }
    }

    pub fn to_num(&self) -> Option<Num> {
        match self {
            Value::Num(n) => Some(*n),
            _ => None
        }
    }

    pub fn to_date(&self) -> Option<Date> {
        match self {
            Value::Date(d) => Some(*d),
            Value::String(s) => Date::parse(s),
            _ => None
        }
    }

    pub fn into_str(self) -> Result<Arc<str>, Value> {
        match self {
            Value::String(s) => Ok(s),
            _ => Err(self),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(&**s),
            _ => None
        }
    }

    pub fn into_vec(self) -> Result<Arc<Vec<Value>>, Value> {
        match self {
            Value::Array(v) => Ok(v),
            _ => Err(self)
        }
    }

    pub fn as_slice(&self) -> Option<&[Value]> {
        match self {
            Value::Array(v) => Some(v.as_slice()),
            _ => None
        }
    }

    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            Value::Dict(v) => Some(&**v),
            _ => None
        }
    }

    pub fn into_dict(self) -> Result<Arc<Dict>, Value> {
        match self {
            Value::Dict(v) => Ok(v),
            _ => Err(self)
        }
    }

    /// Renders scalars as plain text: strings verbatim, dates and numbers via
    /// their `Display`. Arrays, dicts, and null have no scalar text.
    pub fn to_scalar_string(&self) -> Option<String> {
        match self {
            Value::Bool(b) => Some(b.to_string()),
            Value::Num(n) => Some(n.to_string()),
            Value::String(s) => Some(s.to_string()),
            Value::Date(d) => Some(d.to_string()),
            Value::Null | Value::Array(_) | Value::Dict(_) => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Num(_) => "number",
            Value::String(_) => "string",
            Value::Date(_) => "date",
            Value::Array(_) => "array",
            Value::Dict(_) => "dict",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_scalar_string() {
            Some(string) => string.fmt(f),
            None if self.is_null() => Ok(()),
            None => serde_json::to_string(self).map_err(|_| fmt::Error)?.fmt(f),
        }
    }
}

macro_rules! impl_from_primitive {
    ($($T:ty),+ => $E:ident::$kind:ident) => {
        $(
            impl From<$T> for $E {
                fn from(value: $T) -> Self {
                    $E::$kind(value.into())
                }
            }
        )+
    };
}

impl_from_primitive!(bool => Value::Bool);
impl_from_primitive!(&str => Value::String);
impl_from_primitive!(std::borrow::Cow<'_, str> => Value::String);
impl_from_primitive!(String => Value::String);
impl_from_primitive!(Arc<str> => Value::String);
impl_from_primitive!(Date => Value::Date);
impl_from_primitive!(Arc<Vec<Value>> => Value::Array);
impl_from_primitive!(Arc<Dict> => Value::Dict);
impl_from_primitive!(u8, u16, u32, u64, usize => Value::Num);
impl_from_primitive!(i8, i16, i32, i64, isize => Value::Num);
impl_from_primitive!(f32, f64 => Value::Num);

impl From<()> for Value  {
    fn from(_: ()) -> Self {
        Value::Null
    }
}

impl<T> From<Option<T>> for Value where Value: From<T> {
    fn from(value: Option<T>) -> Self {
        value.map(Value::from).unwrap_or(Value::Null)
    }
}

impl<T> From<Vec<T>> for Value where Value: From<T> {
    fn from(value: Vec<T>) -> Self {
        value.into_iter()
            .map(Value::from)
            .collect()
    }
}

impl<K, V> From<Dict<K, V>> for Value where Arc<str>: From<K>, Value: From<V> {
    fn from(value: Dict<K, V>) -> Self {
        let dict = value.into_iter()
            .map(|(k, v)| (<Arc::<str>>::from(k), Value::from(v)))
            .collect::<Dict>();

        Value::Dict(Arc::new(dict))
    }
}

impl FromIterator<Value> for Value {
    fn from_iter<T: IntoIterator<Item = Value>>(iter: T) -> Self {
        let vec = iter.into_iter().collect::<Vec<Value>>();
        Value::Array(Arc::new(vec))
    }
}

/// A signed, unsigned, or floating point number.
///
/// Unsigned values that fit in an `i64` are always stored as [`Num::Int`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Num {
    Int(i64),
    UInt(u64),
    Float(f64),
}

impl Num {
    pub fn to_i64(self) -> Option<i64> {
        match self {
            Num::Int(v) => Some(v),
            Num::UInt(v) => v.try_into().ok(),
            Num::Float(_) => None,
        }
    }

    pub fn to_f64(self) -> f64 {
        match self {
            Num::Int(v) => v as f64,
            Num::UInt(v) => v as f64,
            Num::Float(v) => v,
        }
    }
}

impl fmt::Display for Num {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Num::Int(v) => v.fmt(f),
            Num::UInt(v) => v.fmt(f),
            Num::Float(v) => v.fmt(f),
        }
    }
}

macro_rules! impl_from_for_num {
    ($($T:ty => |$v:ident| $e:expr),* $(,)?) => ($(
        impl From<$T> for Num {
            fn from($v: $T) -> Num {
                $e
            }
        }
    )*)
}

impl_from_for_num! {
    u8 => |v| Num::Int(v.into()),
    u16 => |v| Num::Int(v.into()),
    u32 => |v| Num::Int(v.into()),
    u64 => |v| i64::try_from(v).map(Num::Int).unwrap_or(Num::UInt(v)),
    usize => |v| Num::from(v as u64),
    i8 => |v| Num::Int(v.into()),
    i16 => |v| Num::Int(v.into()),
    i32 => |v| Num::Int(v.into()),
    i64 => |v| Num::Int(v),
    isize => |v| Num::Int(v as i64),
    f32 => |v| Num::Float(v.into()),
    f64 => |v| Num::Float(v),
}

macro_rules! impl_try_from_value {
    ($($T:ty),+ => | $v:ident | $e:expr) => {
        $(
            impl TryFrom<$crate::value::Value> for $T {
                type Error = Value;

                fn try_from($v: $crate::value::Value) -> Result<Self, Self::Error> {
                    (|| $e)()
                }
            }
        )+
    };
}

impl_try_from_value!(bool => |v| v.to_bool().ok_or(v));
impl_try_from_value!(Arc<str> => |v| v.into_str());
impl_try_from_value!(Arc<Dict> => |v| v.into_dict());
impl_try_from_value!(Date => |v| v.to_date().ok_or(v));
impl_try_from_value!(Num => |v| v.to_num().ok_or(v));
impl_try_from_value!(i64, u32, usize =>
    |v| v.to_num().and_then(|n| n.to_i64()?.try_into().ok()).ok_or(v));

impl<T: TryFrom<Value, Error = Value>> TryFrom<Value> for Vec<T> {
    type Error = Value;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let arc = value.into_vec()?;
        match Arc::try_unwrap(arc) {
            Ok(vec) => vec.into_iter().map(|v| v.try_into()).collect(),
            Err(arc) => arc.iter().cloned().map(|v| v.try_into()).collect()
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(v) => serializer.serialize_bool(*v),
            Value::Num(Num::Int(v)) => serializer.serialize_i64(*v),
            Value::Num(Num::UInt(v)) => serializer.serialize_u64(*v),
            Value::Num(Num::Float(v)) => serializer.serialize_f64(*v),
            Value::String(v) => serializer.serialize_str(v),
            Value::Date(v) => v.serialize(serializer),
            Value::Array(v) => serializer.collect_seq(v.iter()),
            Value::Dict(v) => serializer.collect_map(v.iter()),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
        de.deserialize_any(ValueVisitor)
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any scalar, sequence, or mapping")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
        Ok(Value::Num(v.into()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
        Ok(Value::Num(v.into()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> {
        Ok(Value::Num(v.into()))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
        Ok(Value::from_text(v))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, de: D) -> Result<Value, D::Error> {
        Value::deserialize(de)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut vec = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(value) = seq.next_element::<Value>()? {
            vec.push(value);
        }

        Ok(Value::Array(Arc::new(vec)))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Value, A::Error> {
        let mut dict = Dict::new();
        while let Some((MapKey(key), value)) = map.next_entry::<MapKey, Value>()? {
            dict.insert(key, value);
        }

        if dict.len() == 1 {
            if let Some(datetime) = dict.get(TOML_DATETIME_KEY) {
                return Ok(datetime.clone());
            }
        }

        Ok(Value::Dict(Arc::new(dict)))
    }
}

/// A mapping key. Scalar keys of any type are stringified.
struct MapKey(Arc<str>);

impl<'de> Deserialize<'de> for MapKey {
    fn deserialize<D: Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
        struct KeyVisitor;

        impl<'de> Visitor<'de> for KeyVisitor {
            type Value = MapKey;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a scalar mapping key")
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<MapKey, E> {
                Ok(MapKey(v.to_string().into()))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<MapKey, E> {
                Ok(MapKey(v.to_string().into()))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<MapKey, E> {
                Ok(MapKey(v.to_string().into()))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<MapKey, E> {
                Ok(MapKey(v.to_string().into()))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<MapKey, E> {
                Ok(MapKey(v.into()))
            }

            fn visit_unit<E: de::Error>(self) -> Result<MapKey, E> {
                Ok(MapKey("null".into()))
            }
        }

        de.deserialize_any(KeyVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_scalars_and_dates() {
        let value: Value = serde_yaml::from_str("\
title: Hello
date: 2024-01-31
count: 3
big: 18446744073709551615
ratio: 0.5
draft: false
tags: [a, b]
1: one
").unwrap();

        let dict = value.as_dict().unwrap();
        assert_eq!(dict["title"].as_str(), Some("Hello"));
        assert_eq!(dict["date"], Value::Date(Date::from_ymd(2024, 1, 31).unwrap()));
        assert_eq!(dict["count"], Value::Num(Num::Int(3)));
        assert_eq!(dict["big"], Value::Num(Num::UInt(u64::MAX)));
        assert_eq!(dict["ratio"], Value::Num(Num::Float(0.5)));
        assert_eq!(dict["draft"].to_bool(), Some(false));
        assert_eq!(dict["tags"].as_slice().map(|s| s.len()), Some(2));
        assert_eq!(dict["1"].as_str(), Some("one"));
    }

    #[test]
    fn toml_datetimes_become_dates() {
        let value: Value = toml::from_str("
            published = 1979-05-27T07:32:00Z
            day = 1979-05-27
            alarm = 07:32:00
        ").unwrap();

        let dict = value.as_dict().unwrap();
        assert_eq!(dict["published"].to_string(), "1979-05-27 07:32:00");
        assert_eq!(dict["day"], Value::Date(Date::from_ymd(1979, 5, 27).unwrap()));
        assert_eq!(dict["alarm"].as_str(), Some("07:32:00"));
    }

    #[test]
    fn serializes_dates_as_strings() {
        let value = Value::from(Date::from_ymd(2020, 2, 2).unwrap());
        assert_eq!(serde_json::to_string(&value).unwrap(), "\"2020-02-02\"");
        assert_eq!(value.kind(), "date");
    }
}
