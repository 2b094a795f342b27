//! Keyed macro storage, one registry per effect kind

use super::{EffectKind, ParamList, ParamValue};
use crate::error::{Error, Result};
use std::collections::BTreeMap;

/// Largest key a registry hands out. Keys share their operand byte with the
/// per-note stepping flag.
pub const MAX_KEY: u32 = 0x7F;

/// One registered macro
#[derive(Debug, Clone)]
pub struct EffectEntry {
    pub key: u32,
    pub params: ParamList,
    /// Number of channel commands that reference this macro
    pub ref_count: u32,
    /// Side-channel metadata (sample rates, file names, ...)
    pub extra: BTreeMap<String, ParamValue>,
}

impl EffectEntry {
    fn new(key: u32, params: ParamList) -> Self {
        Self {
            key,
            params,
            ref_count: 0,
            extra: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EffectRegistry {
    kind: EffectKind,
    entries: BTreeMap<u32, EffectEntry>,
    next_key: u32,
    packed: bool,
}

impl EffectRegistry {
    pub fn new(kind: EffectKind) -> Self {
        Self {
            kind,
            entries: BTreeMap::new(),
            next_key: 0,
            packed: false,
        }
    }

    pub fn kind(&self) -> EffectKind {
        self.kind
    }

    /// Store a macro under an explicit key, replacing any previous definition
    pub fn define(&mut self, key: u32, mut params: ParamList) -> Result<u32> {
        if key > MAX_KEY {
            return Err(Error::RegistryFull(self.kind));
        }
        params.rewind();
        match self.entries.get_mut(&key) {
            Some(entry) => entry.params = params,
            None => {
                self.entries.insert(key, EffectEntry::new(key, params));
            }
        }
        self.next_key = self.next_key.max(key + 1);
        Ok(key)
    }

    /// Store a macro under a fresh key, or return the key of an equal one
    pub fn register(&mut self, params: ParamList) -> Result<u32> {
        if let Some(key) = self.find(&params) {
            return Ok(key);
        }
        let key = self.next_key;
        self.define(key, params)
    }

    /// Key of a structurally equal macro, if any
    pub fn find(&self, params: &ParamList) -> Option<u32> {
        self.entries
            .values()
            .find(|e| e.params == *params)
            .map(|e| e.key)
    }

    pub fn contains(&self, key: u32) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn get(&self, key: u32) -> Option<&EffectEntry> {
        self.entries.get(&key)
    }

    pub fn get_mut(&mut self, key: u32) -> Option<&mut EffectEntry> {
        self.entries.get_mut(&key)
    }

    pub fn add_ref(&mut self, key: u32) -> Result<()> {
        let kind = self.kind;
        let entry = self
            .entries
            .get_mut(&key)
            .ok_or(Error::UndefinedEffect { kind, key })?;
        entry.ref_count += 1;
        Ok(())
    }

    pub fn ref_count(&self, key: u32) -> u32 {
        self.entries.get(&key).map_or(0, |e| e.ref_count)
    }

    pub fn set_extra(&mut self, key: u32, name: &str, value: ParamValue) -> Result<()> {
        let kind = self.kind;
        let entry = self
            .entries
            .get_mut(&key)
            .ok_or(Error::UndefinedEffect { kind, key })?;
        entry.extra.insert(name.to_string(), value);
        Ok(())
    }

    pub fn extra(&self, key: u32, name: &str) -> Option<&ParamValue> {
        self.entries.get(&key).and_then(|e| e.extra.get(name))
    }

    /// Position of a key in output table order
    pub fn position(&self, key: u32) -> Option<usize> {
        self.entries.keys().position(|k| *k == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EffectEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_packed(&self) -> bool {
        self.packed
    }

    /// Rewrite every entry into its output form. Can only happen once.
    pub fn pack_with<F>(&mut self, mut pack: F) -> Result<()>
    where
        F: FnMut(&ParamList) -> Result<ParamList>,
    {
        if self.packed {
            return Err(Error::AlreadyPacked { kind: self.kind });
        }
        for entry in self.entries.values_mut() {
            entry.params = pack(&entry.params)?;
        }
        self.packed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_dedups_equal_lists() {
        let mut reg = EffectRegistry::new(EffectKind::Arpeggio);
        let a = reg.register(ParamList::from_ints(&[0, 4, 7], &[])).unwrap();
        let b = reg.register(ParamList::from_ints(&[0, 3, 7], &[])).unwrap();
        let c = reg.register(ParamList::from_ints(&[0, 4, 7], &[])).unwrap();
        assert_eq!(a, 0);
        assert_eq!(b, 1);
        assert_eq!(a, c);
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn test_loop_part_distinguishes_lists() {
        let mut reg = EffectRegistry::new(EffectKind::VolumeMacro);
        let a = reg.register(ParamList::from_ints(&[15, 14], &[13])).unwrap();
        let b = reg.register(ParamList::from_ints(&[15, 14, 13], &[])).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_define_moves_next_key_past_explicit() {
        let mut reg = EffectRegistry::new(EffectKind::Vibrato);
        reg.define(5, ParamList::from_ints(&[1], &[])).unwrap();
        let key = reg.register(ParamList::from_ints(&[2], &[])).unwrap();
        assert_eq!(key, 6);
        assert_eq!(reg.position(6), Some(1));
    }

    #[test]
    fn test_key_overflow() {
        let mut reg = EffectRegistry::new(EffectKind::Arpeggio);
        assert!(matches!(
            reg.define(128, ParamList::default()),
            Err(Error::RegistryFull(EffectKind::Arpeggio))
        ));
    }

    #[test]
    fn test_ref_counts_and_extra() {
        let mut reg = EffectRegistry::new(EffectKind::PcmSample);
        let key = reg.register(ParamList::new(vec!["kick.wav".into()], vec![])).unwrap();
        reg.add_ref(key).unwrap();
        reg.add_ref(key).unwrap();
        assert_eq!(reg.ref_count(key), 2);
        assert!(reg.add_ref(9).is_err());

        reg.set_extra(key, "rate", ParamValue::Int(8000)).unwrap();
        assert_eq!(reg.extra(key, "rate"), Some(&ParamValue::Int(8000)));
    }

    #[test]
    fn test_pack_only_once() {
        let mut reg = EffectRegistry::new(EffectKind::Adsr);
        reg.register(ParamList::from_ints(&[1, 2], &[])).unwrap();
        reg.pack_with(|_| Ok(ParamList::from_ints(&[0x12], &[]))).unwrap();
        assert_eq!(reg.get(0).unwrap().params, ParamList::from_ints(&[0x12], &[]));
        assert!(matches!(
            reg.pack_with(|p| Ok(p.clone())),
            Err(Error::AlreadyPacked { .. })
        ));
    }
}
