use std::collections::HashMap;

use chrono::{DateTime, Utc};

/// Complete set of resolved flag values at one point in time.
///
/// Never mutated after construction; the store swaps whole snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FlagSnapshot {
    values: HashMap<String, String>,
    generation: u64,
    activated_at: Option<DateTime<Utc>>,
}

impl FlagSnapshot {
    /// Snapshot holding only local defaults; nothing has been activated yet.
    pub fn with_defaults(defaults: HashMap<String, String>) -> Self {
        Self {
            values: defaults,
            generation: 0,
            activated_at: None,
        }
    }

    pub(crate) fn activated(
        defaults: &HashMap<String, String>,
        fetched: HashMap<String, String>,
        generation: u64,
        activated_at: DateTime<Utc>,
    ) -> Self {
        let mut values = defaults.clone();
        values.extend(fetched);
        Self {
            values,
            generation,
            activated_at: Some(activated_at),
        }
    }

    /// Value for `key`, or `fallback` when the key is absent.
    pub fn get<'a>(&'a self, key: &str, fallback: &'a str) -> &'a str {
        self.values.get(key).map_or(fallback, String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn activated_at(&self) -> Option<DateTime<Utc>> {
        self.activated_at
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for FlagSnapshot
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self::with_defaults(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
