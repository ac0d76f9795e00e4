//! Physical key to logical input table

use crate::controller::input::{KeyId, LogicalInput};
use crate::mapping::MappingError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

macro_rules! map_insert {
    ($map:expr, $key:expr, $input:ident) => {
        $map.insert($key, LogicalInput::$input);
    };
}

/// Editable association between physical keys and logical inputs.
///
/// Keys are unique, several keys may drive the same input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMapTable {
    entries: BTreeMap<KeyId, LogicalInput>,
}

impl KeyMapTable {
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Built-in layout: WASD / IJKL sticks, arrow keys on the d-pad.
    pub fn default_table() -> Self {
        let mut entries = BTreeMap::new();

        // Left stick (WASD)
        map_insert!(entries, 87, AnalogLeftUp);
        map_insert!(entries, 83, AnalogLeftDown);
        map_insert!(entries, 65, AnalogLeftLeft);
        map_insert!(entries, 68, AnalogLeftRight);

        // Right stick (IJKL)
        map_insert!(entries, 73, AnalogRightUp);
        map_insert!(entries, 75, AnalogRightDown);
        map_insert!(entries, 74, AnalogRightLeft);
        map_insert!(entries, 76, AnalogRightRight);

        // Face buttons: Space, Ctrl/Esc/C, R/F, 1
        map_insert!(entries, 32, A);
        map_insert!(entries, 17, B);
        map_insert!(entries, 27, B);
        map_insert!(entries, 67, B);
        map_insert!(entries, 82, X);
        map_insert!(entries, 70, X);
        map_insert!(entries, 49, Y);

        // Shoulders: E, Q, Z, X
        map_insert!(entries, 69, RightTrigger);
        map_insert!(entries, 81, LeftTrigger);
        map_insert!(entries, 90, LeftBumper);
        map_insert!(entries, 88, RightBumper);

        // Stick clicks: Shift, V
        map_insert!(entries, 16, LeftStick);
        map_insert!(entries, 86, RightStick);

        // Menu: Enter, Tab
        map_insert!(entries, 13, Start);
        map_insert!(entries, 9, Select);

        // D-pad (arrow keys)
        map_insert!(entries, 38, DPadUp);
        map_insert!(entries, 40, DPadDown);
        map_insert!(entries, 37, DPadLeft);
        map_insert!(entries, 39, DPadRight);

        Self { entries }
    }

    /// Inserts or overwrites a mapping.
    pub fn set(&mut self, key: KeyId, input: LogicalInput) {
        debug!("Mapping key {} to {}", key, input);
        self.entries.insert(key, input);
    }

    /// Validating variant of [`KeyMapTable::set`] for string tags. Nothing changes on error.
    pub fn set_tag(&mut self, key: KeyId, tag: &str) -> Result<LogicalInput, MappingError> {
        let input: LogicalInput = tag.parse()?;
        self.set(key, input);
        Ok(input)
    }

    /// Removes a mapping, reporting whether one existed.
    pub fn remove(&mut self, key: KeyId) -> bool {
        self.entries.remove(&key).is_some()
    }

    pub fn lookup(&self, key: KeyId) -> Option<LogicalInput> {
        self.entries.get(&key).copied()
    }

    pub fn contains(&self, key: KeyId) -> bool {
        self.entries.contains_key(&key)
    }

    /// Atomic bulk replace
    pub fn replace_all(&mut self, mapping: KeyMapTable) {
        self.entries = mapping.entries;
    }

    pub fn reset_to_defaults(&mut self) {
        *self = Self::default_table();
    }

    /// Mapped keys in ascending order
    pub fn keys(&self) -> Vec<KeyId> {
        self.entries.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (KeyId, LogicalInput)> + '_ {
        self.entries.iter().map(|(k, v)| (*k, *v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Builds a table from string tags, rejecting the whole set if any entry is invalid.
    pub fn from_tags<'a, I>(tags: I) -> Result<Self, MappingError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut entries = BTreeMap::new();
        for (key, tag) in tags {
            let key: KeyId = key
                .trim()
                .parse()
                .map_err(|_| MappingError::InvalidKeyCode(key.to_string()))?;
            entries.insert(key, tag.parse()?);
        }
        Ok(Self { entries })
    }
}

impl Default for KeyMapTable {
    fn default() -> Self {
        Self::default_table()
    }
}

impl FromIterator<(KeyId, LogicalInput)> for KeyMapTable {
    fn from_iter<T: IntoIterator<Item = (KeyId, LogicalInput)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

// Keys are written as decimal strings so the table fits both TOML and JSON maps
impl Serialize for KeyMapTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.entries.iter().map(|(k, v)| (k.to_string(), v)))
    }
}

impl<'de> Deserialize<'de> for KeyMapTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw: HashMap<String, String> = HashMap::deserialize(deserializer)?;
        KeyMapTable::from_tags(raw.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .map_err(serde::de::Error::custom)
    }
}
