//! The parameter container shared by generation, execution and shrinking.
//!
//! A [`ParameterSet`] holds the positional ("direct") parameters declared by a
//! property plus the named ("dynamic") parameters a trial introduces while it
//! runs. A [`ParameterReference`] addresses either kind, so shrinkers can walk
//! "the same logical parameter" without caring where it came from.

use std::collections::BTreeMap;
use std::fmt;

/// Address of one parameter inside a [`ParameterSet`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParameterReference {
    Direct(usize),
    Dynamic(String),
}

impl ParameterReference {
    /// Read the referenced element out of `set`.
    pub fn from<'a, V>(&self, set: &'a ParameterSet<V>) -> Option<&'a V> {
        match self {
            ParameterReference::Direct(index) => set.get(*index),
            ParameterReference::Dynamic(name) => set.get_dynamic(name),
        }
    }

    /// Write `value` into `set` at the referenced position.
    pub fn update<V>(&self, set: &mut ParameterSet<V>, value: V) {
        match self {
            ParameterReference::Direct(index) => set.set(*index, value),
            ParameterReference::Dynamic(name) => set.set_dynamic(name.clone(), value),
        }
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self, ParameterReference::Dynamic(_))
    }
}

impl fmt::Display for ParameterReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterReference::Direct(index) => write!(f, "#{}", index),
            ParameterReference::Dynamic(name) => write!(f, "{}", name),
        }
    }
}

/// Positional parameters plus named parameters kept in sorted key order.
///
/// Direct order never changes after construction except by index-preserving
/// replacement. Cloning (see [`ParameterSet::copy`]) creates new backing
/// containers; the elements themselves are cloned, which for shared handles
/// such as `Arc<dyn Shrinkable>` means the copies point at the same values.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParameterSet<V> {
    direct: Vec<V>,
    dynamic: BTreeMap<String, V>,
}

impl<V> Default for ParameterSet<V> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<V> ParameterSet<V> {
    pub fn empty() -> Self {
        Self {
            direct: Vec::new(),
            dynamic: BTreeMap::new(),
        }
    }

    pub fn direct(direct: Vec<V>) -> Self {
        Self {
            direct,
            dynamic: BTreeMap::new(),
        }
    }

    pub fn new(direct: Vec<V>, dynamic: BTreeMap<String, V>) -> Self {
        Self { direct, dynamic }
    }

    pub fn get(&self, index: usize) -> Option<&V> {
        self.direct.get(index)
    }

    /// Replace the direct element at `index`. Out-of-range indices are ignored.
    pub fn set(&mut self, index: usize, value: V) {
        if let Some(slot) = self.direct.get_mut(index) {
            *slot = value;
        }
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut V> {
        self.direct.get_mut(index)
    }

    pub fn get_dynamic(&self, name: &str) -> Option<&V> {
        self.dynamic.get(name)
    }

    pub fn get_dynamic_mut(&mut self, name: &str) -> Option<&mut V> {
        self.dynamic.get_mut(name)
    }

    pub fn set_dynamic(&mut self, name: impl Into<String>, value: V) {
        self.dynamic.insert(name.into(), value);
    }

    pub fn has_dynamic(&self, name: &str) -> bool {
        self.dynamic.contains_key(name)
    }

    pub fn get_by(&self, reference: &ParameterReference) -> Option<&V> {
        reference.from(self)
    }

    pub fn get_by_mut(&mut self, reference: &ParameterReference) -> Option<&mut V> {
        match reference {
            ParameterReference::Direct(index) => self.get_mut(*index),
            ParameterReference::Dynamic(name) => self.get_dynamic_mut(name),
        }
    }

    pub fn set_by(&mut self, reference: &ParameterReference, value: V) {
        reference.update(self, value)
    }

    pub fn direct_values(&self) -> &[V] {
        &self.direct
    }

    pub fn dynamic_values(&self) -> &BTreeMap<String, V> {
        &self.dynamic
    }

    /// Number of direct plus dynamic parameters
    pub fn size(&self) -> usize {
        self.direct.len() + self.dynamic.len()
    }

    pub fn is_empty(&self) -> bool {
        self.direct.is_empty() && self.dynamic.is_empty()
    }

    /// References to every element: direct ones by index, then dynamic ones by key.
    pub fn references(&self) -> Vec<ParameterReference> {
        (0..self.direct.len())
            .map(ParameterReference::Direct)
            .chain(self.dynamic.keys().cloned().map(ParameterReference::Dynamic))
            .collect()
    }

    /// All elements in reference order
    pub fn all(&self) -> Vec<&V> {
        self.direct.iter().chain(self.dynamic.values()).collect()
    }

    pub fn all_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.direct.iter_mut().chain(self.dynamic.values_mut())
    }

    pub fn map<W, F>(&self, mut f: F) -> ParameterSet<W>
    where
        F: FnMut(&V) -> W,
    {
        ParameterSet {
            direct: self.direct.iter().map(&mut f).collect(),
            dynamic: self
                .dynamic
                .iter()
                .map(|(name, value)| (name.clone(), f(value)))
                .collect(),
        }
    }

    pub fn into_parts(self) -> (Vec<V>, BTreeMap<String, V>) {
        (self.direct, self.dynamic)
    }
}

impl<V: Clone> ParameterSet<V> {
    pub fn copy(&self) -> Self {
        self.clone()
    }

    /// A copy with the referenced element replaced.
    pub fn with(&self, reference: &ParameterReference, value: V) -> Self {
        let mut copy = self.copy();
        copy.set_by(reference, value);
        copy
    }
}

impl<V: fmt::Display> fmt::Display for ParameterSet<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, value) in self.direct.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", value)?;
        }
        write!(f, "]")?;
        if !self.dynamic.is_empty() {
            write!(f, " {{")?;
            for (i, (name, value)) in self.dynamic.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}: {}", name, value)?;
            }
            write!(f, "}}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_references_list_direct_before_sorted_dynamic() {
        for n in 0..5 {
            let mut set = ParameterSet::direct((0..n).collect::<Vec<_>>());
            set.set_dynamic("zeta", 100);
            set.set_dynamic("alpha", 101);
            set.set_dynamic("mid", 102);

            let references = set.references();
            assert_eq!(references.len(), n + 3);
            for (i, reference) in references.iter().take(n).enumerate() {
                assert_eq!(reference, &ParameterReference::Direct(i));
            }
            assert_eq!(
                &references[n..],
                &[
                    ParameterReference::Dynamic("alpha".to_string()),
                    ParameterReference::Dynamic("mid".to_string()),
                    ParameterReference::Dynamic("zeta".to_string()),
                ]
            );
        }
    }

    #[test]
    fn test_empty_set_has_no_references() {
        let set: ParameterSet<i32> = ParameterSet::empty();
        assert!(set.references().is_empty());
        assert!(set.is_empty());
        assert_eq!(set.size(), 0);
    }

    #[test]
    fn test_reference_get_and_update() {
        let mut set = ParameterSet::direct(vec!["a", "b"]);
        set.set_dynamic("x", "c");

        let direct = ParameterReference::Direct(1);
        let dynamic = ParameterReference::Dynamic("x".to_string());
        assert_eq!(direct.from(&set), Some(&"b"));
        assert_eq!(dynamic.from(&set), Some(&"c"));

        direct.update(&mut set, "B");
        dynamic.update(&mut set, "C");
        assert_eq!(set.get(1), Some(&"B"));
        assert_eq!(set.get_dynamic("x"), Some(&"C"));
        assert_eq!(
            ParameterReference::Dynamic("missing".to_string()).from(&set),
            None
        );
    }

    #[test]
    fn test_with_does_not_alias_original() {
        let mut set = ParameterSet::direct(vec![1, 2, 3]);
        set.set_dynamic("d", 4);

        let changed = set.with(&ParameterReference::Direct(0), 10);
        let changed = changed.with(&ParameterReference::Dynamic("d".to_string()), 40);

        assert_eq!(set.direct_values(), &[1, 2, 3]);
        assert_eq!(set.get_dynamic("d"), Some(&4));
        assert_eq!(changed.direct_values(), &[10, 2, 3]);
        assert_eq!(changed.get_dynamic("d"), Some(&40));
    }

    #[test]
    fn test_map_preserves_shape() {
        let mut set = ParameterSet::direct(vec![1, 2]);
        set.set_dynamic("b", 3);
        set.set_dynamic("a", 4);

        let mapped = set.map(|n| n * 10);
        assert_eq!(mapped.direct_values(), &[10, 20]);
        assert_eq!(mapped.get_dynamic("a"), Some(&40));
        assert_eq!(mapped.references(), set.references());
        assert_eq!(mapped.all(), vec![&10, &20, &40, &30]);
    }

    #[test]
    fn test_value_equality_and_display() {
        let mut left = ParameterSet::direct(vec![1, 2]);
        left.set_dynamic("k", 3);
        let mut right = ParameterSet::direct(vec![1, 2]);
        right.set_dynamic("k", 3);
        assert_eq!(left, right);
        assert_eq!(left.to_string(), "[1, 2] {k: 3}");

        right.set(0, 5);
        assert_ne!(left, right);
    }
}
