//! Block-states (spec.md §3) and the registry that assigns them dense ids.

use std::collections::HashMap;
use std::fmt::{self, Display};

use parking_lot::RwLock;

/// A concrete `(name, properties)` pair, e.g.
/// `minecraft:oak_stairs {facing=east,half=top,waterlogged=false}`.
/// Equality and hashing are structural; property order is preserved as
/// parsed since the data model calls for an ordered mapping, but lookups
/// only ever go through the registry so insertion order never affects
/// correctness, only display.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct BlockState {
    pub name: String,
    pub properties: Vec<(String, String)>,
}

impl BlockState {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: Vec::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_property(key, value);
        self
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if let Some(existing) = self.properties.iter_mut().find(|(k, _)| *k == key) {
            existing.1 = value;
        } else {
            self.properties.push((key, value));
        }
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Parses `"key=value;key2=value2"`-style properties (spec.md §4.2's
    /// index-file property syntax) onto `name`.
    pub fn parse(name: impl Into<String>, properties: &str) -> Self {
        Self::parse_sep(name, properties, ';')
    }

    /// Parses the index file's `variant` column, a comma-separated
    /// `key=value` descriptor (spec.md §6: "variant is a `key=value,…`
    /// descriptor").
    pub fn parse_variant(name: impl Into<String>, variant: &str) -> Self {
        Self::parse_sep(name, variant, ',')
    }

    fn parse_sep(name: impl Into<String>, properties: &str, sep: char) -> Self {
        let mut state = BlockState::new(name);
        for part in properties.split(sep) {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            if let Some((k, v)) = part.split_once('=') {
                state.set_property(k.trim(), v.trim());
            }
        }
        state
    }
}

impl Display for BlockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.properties.is_empty() {
            write!(f, "[")?;
            for (i, (k, v)) in self.properties.iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                write!(f, "{}={}", k, v)?;
            }
            write!(f, "]")?;
        }
        Ok(())
    }
}

pub const AIR: &str = "minecraft:air";

struct RegistryInner {
    by_state: HashMap<BlockState, u16>,
    by_id: Vec<BlockState>,
    known_properties: HashMap<String, std::collections::HashSet<String>>,
    warned_unknown: std::collections::HashSet<u16>,
}

/// Maps `(name, properties)` block-states to dense `u16` ids, and tracks
/// which property keys are recognized for a given block name so the chunk
/// decoder can drop stray palette properties (spec.md §4.1).
///
/// Lives for the process; shared read-only by renderer workers once the
/// catalog has finished populating known properties (spec.md §3, §5).
pub struct BlockStateRegistry {
    inner: RwLock<RegistryInner>,
}

impl Default for BlockStateRegistry {
    fn default() -> Self {
        let registry = Self {
            inner: RwLock::new(RegistryInner {
                by_state: HashMap::new(),
                by_id: Vec::new(),
                known_properties: HashMap::new(),
                warned_unknown: std::collections::HashSet::new(),
            }),
        };
        registry.get_or_insert(BlockState::new(AIR));
        registry
    }
}

impl BlockStateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The dense id for `"minecraft:air"`, used as the no-op sentinel.
    pub fn air_id(&self) -> u16 {
        0
    }

    /// Fetches the id for `state`, allocating a new dense id on first sight.
    pub fn get_or_insert(&self, state: BlockState) -> u16 {
        {
            let inner = self.inner.read();
            if let Some(id) = inner.by_state.get(&state) {
                return *id;
            }
        }
        let mut inner = self.inner.write();
        // Another writer may have inserted the same state while we waited.
        if let Some(id) = inner.by_state.get(&state) {
            return *id;
        }
        let id = inner.by_id.len() as u16;
        inner.by_id.push(state.clone());
        inner.by_state.insert(state, id);
        id
    }

    /// Looks up an already-registered id, without inserting.
    pub fn id_for(&self, state: &BlockState) -> Option<u16> {
        self.inner.read().by_state.get(state).copied()
    }

    pub fn state_for(&self, id: u16) -> Option<BlockState> {
        self.inner.read().by_id.get(id as usize).cloned()
    }

    pub fn size(&self) -> usize {
        self.inner.read().by_id.len()
    }

    /// Registers `key` as a known property of `block_name` (called while
    /// loading the block image catalog).
    pub fn register_known_property(&self, block_name: &str, key: &str) {
        let mut inner = self.inner.write();
        inner
            .known_properties
            .entry(block_name.to_string())
            .or_default()
            .insert(key.to_string());
    }

    pub fn is_known_property(&self, block_name: &str, key: &str) -> bool {
        self.inner
            .read()
            .known_properties
            .get(block_name)
            .is_some_and(|keys| keys.contains(key))
    }

    /// Records that `id` was logged once already as unknown; returns `true`
    /// the first time this is called for a given id (spec.md §7
    /// *UnknownBlockState*: "log once").
    pub fn mark_unknown_logged(&self, id: u16) -> bool {
        self.inner.write().warned_unknown.insert(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_get_or_insert_and_state_for() {
        let registry = BlockStateRegistry::new();
        let state = BlockState::new("minecraft:oak_stairs")
            .with_property("facing", "east")
            .with_property("half", "top");
        let id = registry.get_or_insert(state.clone());
        assert_eq!(registry.state_for(id), Some(state.clone()));
        assert_eq!(registry.id_for(&state), Some(id));
    }

    #[test]
    fn air_is_preregistered_at_id_zero() {
        let registry = BlockStateRegistry::new();
        assert_eq!(registry.air_id(), 0);
        assert_eq!(registry.state_for(0).unwrap().name, AIR);
    }

    #[test]
    fn repeated_insert_is_dense_and_stable() {
        let registry = BlockStateRegistry::new();
        let a = registry.get_or_insert(BlockState::new("minecraft:stone"));
        let b = registry.get_or_insert(BlockState::new("minecraft:stone"));
        let c = registry.get_or_insert(BlockState::new("minecraft:dirt"));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(registry.size(), 3); // air, stone, dirt
    }

    #[test]
    fn parse_reads_semicolon_properties() {
        let state = BlockState::parse("minecraft:water", "level=0;falling=false");
        assert_eq!(state.property("level"), Some("0"));
        assert_eq!(state.property("falling"), Some("false"));
    }
}
