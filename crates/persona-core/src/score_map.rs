//! Insertion-ordered map of named scores bounded to `0..=100`.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub const MAX_SCORE: u8 = 100;

/// Named 0–100 scores in insertion order.
///
/// Serializes as a JSON object. Re-inserting an existing name replaces the
/// score in place, so ordering always reflects first insertion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoreMap(Vec<(String, u8)>);

impl ScoreMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `score` under `name`, clamping it to `0..=100`.
    pub fn insert(&mut self, name: impl Into<String>, score: u8) {
        let name = name.into();
        let score = score.min(MAX_SCORE);
        if let Some(slot) = self.0.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = score;
        } else {
            self.0.push((name, score));
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<u8> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, s)| *s)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u8)> {
        self.0.iter().map(|(n, s)| (n.as_str(), *s))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, u8)> for ScoreMap {
    fn from_iter<I: IntoIterator<Item = (S, u8)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (name, score) in iter {
            map.insert(name, score);
        }
        map
    }
}

impl Serialize for ScoreMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, score) in &self.0 {
            map.serialize_entry(name, score)?;
        }
        map.end()
    }
}

struct ScoreMapVisitor;

impl<'de> Visitor<'de> for ScoreMapVisitor {
    type Value = ScoreMap;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of names to scores between 0 and 100")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<ScoreMap, A::Error> {
        let mut map = ScoreMap::new();
        while let Some((name, score)) = access.next_entry::<String, u8>()? {
            map.insert(name, score);
        }
        Ok(map)
    }
}

impl<'de> Deserialize<'de> for ScoreMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(ScoreMapVisitor)
    }
}
