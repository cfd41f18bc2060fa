//! First-seen ordered histogram
//!
//! Serializes as a sequence of `{<label>: value, "count": n}` objects in the
//! order values were first recorded.

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Histogram {
    label: &'static str,
    entries: Vec<(String, u64)>,
    index: HashMap<String, usize>,
}

impl Histogram {
    /// `label` names the value field of each serialized entry (e.g. `"type"`).
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn increment(&mut self, value: impl Into<String>) {
        self.add(value, 1);
    }

    pub fn add(&mut self, value: impl Into<String>, count: u64) {
        let value = value.into();
        match self.index.get(&value) {
            Some(&slot) => self.entries[slot].1 += count,
            None => {
                self.index.insert(value.clone(), self.entries.len());
                self.entries.push((value, count));
            }
        }
    }

    pub fn count(&self, value: &str) -> u64 {
        self.index.get(value).map_or(0, |&slot| self.entries[slot].1)
    }

    /// Sum of all counts
    pub fn total(&self) -> u64 {
        self.entries.iter().map(|(_, count)| count).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.entries.iter().map(|(value, count)| (value.as_str(), *count))
    }
}

struct Entry<'a> {
    label: &'static str,
    value: &'a str,
    count: u64,
}

impl Serialize for Entry<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry(self.label, self.value)?;
        map.serialize_entry("count", &self.count)?;
        map.end()
    }
}

impl Serialize for Histogram {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.entries.len()))?;
        for (value, count) in self.iter() {
            seq.serialize_element(&Entry {
                label: self.label,
                value,
                count,
            })?;
        }
        seq.end()
    }
}
