//! Typed bags of analysis facts attached to CFG nodes and methods.
//!
//! Analyses store their per-node or per-method results here without the CFG or the
//! method model knowing about them. Keys carry the type of the value they index, so a
//! mismatch between writer and reader is reported instead of producing garbage.
//!
//! # Example
//!
//! ```rust
//! use flowscope::analysis::{AnalysisInfoMap, InfoKey};
//! use flowscope::utils::graph::NodeId;
//!
//! const VISITS: InfoKey<usize> = InfoKey::new("visits");
//!
//! let mut facts: AnalysisInfoMap<NodeId> = AnalysisInfoMap::new();
//! facts.info_mut(NodeId::new(2)).set(VISITS, 3);
//! assert_eq!(facts.get(&NodeId::new(2), VISITS)?, &3);
//! assert!(facts.get(&NodeId::new(5), VISITS).is_err());
//! # Ok::<(), flowscope::Error>(())
//! ```

use std::{
    any::Any,
    collections::{hash_map, HashMap},
    fmt,
    hash::Hash,
    marker::PhantomData,
};

use crate::{model::MethodRef, Error, Result};

/// A named key for values of type `T`.
pub struct InfoKey<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> InfoKey<T> {
    /// Creates a key. Keys with the same name address the same slot.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        InfoKey {
            name,
            _marker: PhantomData,
        }
    }

    /// Returns the key name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for InfoKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for InfoKey<T> {}

impl<T> fmt::Debug for InfoKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InfoKey({})", self.name)
    }
}

/// Facts about a single subject, keyed by [`InfoKey`].
#[derive(Default)]
pub struct AnalysisInfo {
    values: HashMap<&'static str, Box<dyn Any + Send + Sync>>,
}

impl AnalysisInfo {
    /// Creates an empty bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `key`, replacing any previous value.
    pub fn set<T: Any + Send + Sync>(&mut self, key: InfoKey<T>, value: T) {
        self.values.insert(key.name, Box::new(value));
    }

    /// Reads the value stored under `key`.
    ///
    /// # Errors
    ///
    /// - [`Error::InfoKeyMissing`] if nothing was stored under the key
    /// - [`Error::InfoTypeMismatch`] if the stored value has another type
    pub fn get<T: Any>(&self, key: InfoKey<T>) -> Result<&T> {
        self.values
            .get(key.name)
            .ok_or(Error::InfoKeyMissing(key.name))?
            .downcast_ref::<T>()
            .ok_or(Error::InfoTypeMismatch(key.name))
    }

    /// Mutable variant of [`get`](Self::get).
    ///
    /// # Errors
    ///
    /// Same as [`get`](Self::get).
    pub fn get_mut<T: Any>(&mut self, key: InfoKey<T>) -> Result<&mut T> {
        self.values
            .get_mut(key.name)
            .ok_or(Error::InfoKeyMissing(key.name))?
            .downcast_mut::<T>()
            .ok_or(Error::InfoTypeMismatch(key.name))
    }

    /// Reads the value under `key`, treating absence and type mismatch as `None`.
    #[must_use]
    pub fn try_get<T: Any>(&self, key: InfoKey<T>) -> Option<&T> {
        self.values.get(key.name)?.downcast_ref::<T>()
    }

    /// Returns `true` if any value is stored under `key`.
    #[must_use]
    pub fn contains<T>(&self, key: InfoKey<T>) -> bool {
        self.values.contains_key(key.name)
    }

    /// Removes and returns the value under `key` if it has type `T`.
    pub fn remove<T: Any>(&mut self, key: InfoKey<T>) -> Option<T> {
        let boxed = self.values.remove(key.name)?;
        match boxed.downcast::<T>() {
            Ok(value) => Some(*value),
            Err(other) => {
                self.values.insert(key.name, other);
                None
            }
        }
    }

    /// Returns the number of stored facts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if no fact is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for AnalysisInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&&str> = self.values.keys().collect();
        keys.sort();
        f.debug_struct("AnalysisInfo").field("keys", &keys).finish()
    }
}

/// One [`AnalysisInfo`] per subject, created on first touch.
#[derive(Debug)]
pub struct AnalysisInfoMap<S> {
    infos: HashMap<S, AnalysisInfo>,
}

/// Facts attached to methods.
pub type MethodAnalysisInfo = AnalysisInfoMap<MethodRef>;

impl<S> Default for AnalysisInfoMap<S> {
    fn default() -> Self {
        AnalysisInfoMap {
            infos: HashMap::new(),
        }
    }
}

impl<S: Eq + Hash> AnalysisInfoMap<S> {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the bag of `subject`, creating an empty one if needed.
    pub fn info_mut(&mut self, subject: S) -> &mut AnalysisInfo {
        self.infos.entry(subject).or_default()
    }

    /// Returns the bag of `subject` if it was ever touched.
    #[must_use]
    pub fn info(&self, subject: &S) -> Option<&AnalysisInfo> {
        self.infos.get(subject)
    }

    /// Stores a fact about `subject`.
    pub fn set<T: Any + Send + Sync>(&mut self, subject: S, key: InfoKey<T>, value: T) {
        self.info_mut(subject).set(key, value);
    }

    /// Reads a fact about `subject`.
    ///
    /// # Errors
    ///
    /// [`Error::InfoKeyMissing`] if the subject was never touched or has no such fact,
    /// [`Error::InfoTypeMismatch`] if the fact has another type.
    pub fn get<T: Any>(&self, subject: &S, key: InfoKey<T>) -> Result<&T> {
        self.infos
            .get(subject)
            .ok_or(Error::InfoKeyMissing(key.name))?
            .get(key)
    }

    /// Iterates over all touched subjects and their bags.
    pub fn iter(&self) -> hash_map::Iter<'_, S, AnalysisInfo> {
        self.infos.iter()
    }

    /// Drops the bag of `subject`.
    pub fn remove(&mut self, subject: &S) -> Option<AnalysisInfo> {
        self.infos.remove(subject)
    }

    /// Returns the number of touched subjects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.infos.len()
    }

    /// Returns `true` if no subject was touched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COUNT: InfoKey<u32> = InfoKey::new("count");
    const COUNT_AS_TEXT: InfoKey<String> = InfoKey::new("count");
    const LABELS: InfoKey<Vec<String>> = InfoKey::new("labels");

    #[test]
    fn test_set_get_overwrite() {
        let mut info = AnalysisInfo::new();
        info.set(COUNT, 1);
        info.set(COUNT, 2);
        assert_eq!(info.get(COUNT).unwrap(), &2);
        assert_eq!(info.len(), 1);

        info.get_mut(COUNT).map(|c| *c += 1).unwrap();
        assert_eq!(info.try_get(COUNT), Some(&3));
    }

    #[test]
    fn test_missing_key_is_error() {
        let info = AnalysisInfo::new();
        assert!(matches!(info.get(LABELS), Err(Error::InfoKeyMissing("labels"))));
        assert!(info.try_get(LABELS).is_none());
    }

    #[test]
    fn test_type_mismatch_is_error() {
        let mut info = AnalysisInfo::new();
        info.set(COUNT, 7);
        assert!(matches!(
            info.get(COUNT_AS_TEXT),
            Err(Error::InfoTypeMismatch("count"))
        ));
        assert_eq!(info.remove(COUNT_AS_TEXT), None);
        assert!(info.contains(COUNT));
        assert_eq!(info.remove(COUNT), Some(7));
        assert!(info.is_empty());
    }

    #[test]
    fn test_map_creates_on_first_touch() {
        let mut map: MethodAnalysisInfo = AnalysisInfoMap::new();
        let method = MethodRef::from("A::M()");
        assert!(map.info(&method).is_none());

        assert!(map.info_mut(method.clone()).is_empty());
        assert_eq!(map.len(), 1);

        map.set(method.clone(), LABELS, vec!["L_0000".to_string()]);
        assert_eq!(map.get(&method, LABELS).unwrap().len(), 1);
        assert!(matches!(
            map.get(&MethodRef::from("B::M()"), LABELS),
            Err(Error::InfoKeyMissing(_))
        ));
    }
}
