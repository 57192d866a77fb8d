use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Identity of one key entry inside a document.
///
/// Ids are allocated by a [`KeyCounter`] owned by the document, so they are
/// unique and strictly increasing across every directory of that document.
/// A subdirectory uses the id of its own key entry as its self-identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KeyId(u64);

impl KeyId {
    /// Wrap a raw id value.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw id value.
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyId({})", self.0)
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic allocator for [`KeyId`]s.
///
/// The first id handed out is 1. Ids are never reused, even after the entry
/// that held one is deleted.
#[derive(Clone, Debug, Default)]
pub struct KeyCounter {
    last: u64,
}

impl KeyCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next id.
    pub fn next_id(&mut self) -> KeyId {
        self.last += 1;
        KeyId(self.last)
    }

    /// The most recently allocated id, if any.
    pub fn last(&self) -> Option<KeyId> {
        (self.last > 0).then_some(KeyId(self.last))
    }

    /// Number of ids allocated so far.
    pub fn allocated(&self) -> u64 {
        self.last
    }
}

/// Per-(directory, name) write sequence number.
///
/// The first write of a name in a directory gets cycle 1; every further write
/// of the same name gets the highest live cycle plus one.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cycle(u32);

impl Cycle {
    pub const FIRST: Cycle = Cycle(1);

    /// Create a cycle from a raw value. Zero is not a valid cycle.
    pub fn new(raw: u32) -> Result<Self, TypeError> {
        if raw == 0 {
            return Err(TypeError::InvalidCycle("cycle numbers start at 1".into()));
        }
        Ok(Self(raw))
    }

    pub fn get(&self) -> u32 {
        self.0
    }

    /// The cycle following this one. Fails once `u32::MAX` is reached.
    pub fn next(&self) -> Result<Self, TypeError> {
        self.0
            .checked_add(1)
            .map(Self)
            .ok_or(TypeError::CycleOverflow(self.0))
    }

    /// Cycle for a new write given the cycles already present for that name.
    pub fn after<I>(existing: I) -> Result<Self, TypeError>
    where
        I: IntoIterator<Item = Cycle>,
    {
        match existing.into_iter().max() {
            Some(highest) => highest.next(),
            None => Ok(Self::FIRST),
        }
    }
}

impl fmt::Debug for Cycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cycle({})", self.0)
    }
}

impl fmt::Display for Cycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Cycle {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw: u32 = s
            .trim()
            .parse()
            .map_err(|_| TypeError::InvalidCycle(s.to_string()))?;
        Self::new(raw)
    }
}

/// A key name with an optional cycle selector, written `name` or `name;cycle`.
///
/// Without a cycle, lookups select the highest cycle of that name.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct KeyName {
    pub name: String,
    pub cycle: Option<Cycle>,
}

impl KeyName {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cycle: None,
        }
    }

    pub fn with_cycle(name: impl Into<String>, cycle: Cycle) -> Self {
        Self {
            name: name.into(),
            cycle: Some(cycle),
        }
    }

    /// Parse `name` or `name;cycle`.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        match s.rsplit_once(';') {
            Some((name, cycle)) => Ok(Self::with_cycle(name, cycle.parse()?)),
            None => Ok(Self::new(s)),
        }
    }
}

impl fmt::Display for KeyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cycle {
            Some(cycle) => write!(f, "{};{}", self.name, cycle),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Stable identity of one persisted document.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentUuid(uuid::Uuid);

impl DocumentUuid {
    /// Generate a new time-ordered document UUID (UUID v7).
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7())
    }

    /// The all-zero UUID, used for reproducible output.
    pub const fn nil() -> Self {
        Self(uuid::Uuid::nil())
    }

    pub fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }

    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl Default for DocumentUuid {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DocumentUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DocumentUuid({})", self.0)
    }
}

impl fmt::Display for DocumentUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DocumentUuid {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| TypeError::InvalidUuid(e.to_string()))
    }
}
