use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};

use crate::error::Result;
use crate::value::{Dict, Value};

pub trait MetaKey: 'static {
    const KEY: &'static str;

    type Value: TryFrom<Value> + Into<Value> + fmt::Debug;
}

#[macro_export]
macro_rules! define_meta_key {
    ($($v:vis $T:ident : $key:literal => $V:ty),+ $(,)?) => {
        $(
            $v struct $T;

            impl $crate::MetaKey for $T {
                const KEY: &'static str = $key;
                type Value = $V;
            }
        )+
    }
}

/// Keys with a meaning to every site.
pub mod keys {
    use std::sync::Arc;

    use crate::value::{Date as DateValue, Value};

    define_meta_key! {
        pub Title: "title" => Arc<str>,
        pub Date: "date" => DateValue,
        pub Layout: "layout" => Value,
        pub Permalink: "permalink" => Arc<str>,
        pub Published: "published" => bool,
    }
}

/// An immutable front matter mapping.
///
/// Cloning is cheap; "modifying" operations return a new `Metadata`.
#[derive(Clone, Default, PartialEq)]
pub struct Metadata {
    map: Arc<Dict>,
}

impl Metadata {
    #[inline(always)]
    pub fn new(map: Arc<Dict>) -> Self {
        Metadata { map }
    }

    #[inline(always)]
    pub fn get_raw(&self, key: &str) -> Option<&Value> {
        self.map.get(key)
    }

    #[inline(always)]
    pub fn contains_key(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    #[inline(always)]
    pub fn keys(&self) -> impl Iterator<Item = &Arc<str>> + '_ {
        self.map.keys()
    }

    pub fn as_dict(&self) -> &Arc<Dict> {
        &self.map
    }

    #[inline]
    pub fn get<K: MetaKey>(&self, _: K) -> Option<Result<K::Value, Value>> {
        let value = self.get_raw(K::KEY)?;
        Some(value.clone().try_into().map_err(|_| value.clone()))
    }

    #[inline(always)]
    pub fn contains<K: MetaKey>(&self, _: K) -> bool {
        self.contains_key(K::KEY)
    }

    /// Reads `K`, failing if the value has the wrong type.
    pub fn read<K: MetaKey>(&self, key: K) -> Result<Option<K::Value>> {
        match self.get(key) {
            None => Ok(None),
            Some(Ok(value)) => Ok(Some(value)),
            Some(Err(value)) => err! {
                "unexpected metadata value type",
                "key" => K::KEY,
                "expected" => std::any::type_name::<K::Value>(),
                "actual type" => value.kind(),
            }
        }
    }

    /// Returns a copy with `value` set for `K` if no value for `K` exists.
    pub fn with_default<K, V>(&self, _: K, value: V) -> Metadata
        where K: MetaKey, V: Into<K::Value>
    {
        if self.contains_key(K::KEY) {
            return self.clone();
        }

        let mut map = Dict::clone(&self.map);
        map.insert(K::KEY.into(), value.into().into());
        Metadata::new(Arc::new(map))
    }

    /// Returns a copy with every entry in `entries` set, overwriting existing
    /// values.
    pub fn with_all<I, K, V>(&self, entries: I) -> Metadata
        where I: IntoIterator<Item = (K, V)>, K: Into<Arc<str>>, V: Into<Value>
    {
        let mut map = Dict::clone(&self.map);
        map.extend(entries.into_iter().map(|(k, v)| (k.into(), v.into())));
        Metadata::new(Arc::new(map))
    }
}

impl From<Dict> for Metadata {
    fn from(map: Dict) -> Self {
        Metadata::new(Arc::new(map))
    }
}

impl fmt::Debug for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.map.fmt(f)
    }
}

impl fmt::Display for Metadata {
    #[inline(always)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#?}", self.map)
    }
}

impl Serialize for Metadata {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.map.serialize(serializer)
    }
}
