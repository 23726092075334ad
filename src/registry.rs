//! Key-equivalence registry.
//!
//! Partitions the 24-key space into classes of keys that are interchangeable
//! for matching. The partition is validated once, when the registry is built,
//! so lookups afterwards cannot fail for any representable key.

use crate::music::{Key, Mode, UnknownKey};
use crate::normalizer;
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

/// Relative major/minor pairs, the partition used when nothing else is configured.
pub const DEFAULT_KEY_GROUPS: &str =
    "C|Am,G|Em,D|Bm,A|F#m,E|C#m,B|G#m,F#|D#m,Db|Bbm,Ab|Fm,Eb|Cm,Bb|Gm,F|Dm";

const GROUP_SEPARATOR: char = ',';
const KEY_SEPARATOR: char = '|';

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("key group {0} is empty")]
    EmptyGroup(usize),

    #[error("invalid key in key groups: {0}")]
    UnknownKey(#[from] UnknownKey),

    #[error("key {key} appears in more than one group (groups {first} and {second})")]
    DuplicateKey {
        key: Key,
        first: usize,
        second: usize,
    },

    #[error("key groups leave {} key(s) uncovered: {}", .0.len(), format_keys(.0))]
    MissingKeys(Vec<Key>),
}

fn format_keys(keys: &[Key]) -> String {
    keys.iter()
        .map(|k| k.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// A set of keys considered interchangeable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyEquivalenceClass {
    pub id: usize,
    keys: Vec<Key>,
}

impl KeyEquivalenceClass {
    /// The key every member is measured against: the first listed major key,
    /// or the first listed key when the class has no major key. Listing order
    /// of mixed-mode groups therefore cannot change a song's offset.
    pub fn anchor(&self) -> Key {
        self.keys
            .iter()
            .copied()
            .find(|k| k.mode == Mode::Major)
            .unwrap_or(self.keys[0])
    }

    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    pub fn contains(&self, key: Key) -> bool {
        self.keys.contains(&key)
    }
}

#[derive(Debug, Clone)]
pub struct KeyEquivalenceRegistry {
    classes: Vec<KeyEquivalenceClass>,
    class_by_key: [usize; Key::COUNT],
}

impl KeyEquivalenceRegistry {
    /// Parses and validates a group configuration such as `C|Am,G|Em,...`.
    pub fn parse(config: &str) -> Result<KeyEquivalenceRegistry, RegistryError> {
        let mut groups = vec![];
        for (position, group) in config.split(GROUP_SEPARATOR).enumerate() {
            let keys = group
                .split(KEY_SEPARATOR)
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::parse::<Key>)
                .collect::<Result<Vec<Key>, UnknownKey>>()?;
            if keys.is_empty() {
                return Err(RegistryError::EmptyGroup(position));
            }
            groups.push(keys);
        }
        Self::from_groups(groups)
    }

    pub fn from_groups(groups: Vec<Vec<Key>>) -> Result<KeyEquivalenceRegistry, RegistryError> {
        let mut seen: HashMap<Key, usize> = HashMap::new();
        let mut classes = Vec::with_capacity(groups.len());

        for (id, keys) in groups.into_iter().enumerate() {
            if keys.is_empty() {
                return Err(RegistryError::EmptyGroup(id));
            }
            for key in keys.iter() {
                if let Some(first) = seen.insert(*key, id) {
                    return Err(RegistryError::DuplicateKey {
                        key: *key,
                        first,
                        second: id,
                    });
                }
            }
            classes.push(KeyEquivalenceClass { id, keys });
        }

        let missing: Vec<Key> = Key::all().filter(|k| !seen.contains_key(k)).collect();
        if !missing.is_empty() {
            return Err(RegistryError::MissingKeys(missing));
        }

        let mut class_by_key = [0usize; Key::COUNT];
        for (key, id) in seen {
            class_by_key[key.index()] = id;
        }

        Ok(KeyEquivalenceRegistry {
            classes,
            class_by_key,
        })
    }

    pub fn relative_pairs() -> KeyEquivalenceRegistry {
        Self::parse(DEFAULT_KEY_GROUPS).expect("Default key groups must form a partition")
    }

    pub fn class_of(&self, key: Key) -> &KeyEquivalenceClass {
        &self.classes[self.class_by_key[key.index()]]
    }

    /// Looks up the class of a key given by name.
    pub fn lookup(&self, key_name: &str) -> Result<&KeyEquivalenceClass, UnknownKey> {
        let key: Key = key_name.parse()?;
        Ok(self.class_of(key))
    }

    pub fn classes(&self) -> &[KeyEquivalenceClass] {
        &self.classes
    }

    /// Semitones to shift a progression written in `key` so that it lands in
    /// the class of `reference`. Decided by class anchors only.
    pub fn canonical_offset(&self, key: Key, reference: Key) -> u8 {
        normalizer::interval(
            self.class_of(key).anchor(),
            self.class_of(reference).anchor(),
        )
    }
}
