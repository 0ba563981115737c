//! Test matrix generation.
//!
//! The matrix is the Cartesian product key × modifiers × locks × protocol
//! flags, enumerated in that nesting order (key outermost, flags
//! innermost). Cases are produced lazily by index, so a resume offset is an
//! O(1) skip and enumeration is identical across runs with the same
//! configuration.

use std::fmt;
use std::ops::Range;

use serde::Serialize;

use crate::keys::{KeyCatalog, KeyDescriptor};

/// Number of distinct protocol flag values (a 5-bit mask).
pub const PROTOCOL_FLAG_SPACE: u8 = 32;

/// Modifier vocabulary, in combination order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Modifier {
    Shift,
    Ctrl,
    Alt,
}

impl Modifier {
    pub const ALL: [Self; 3] = [Self::Shift, Self::Ctrl, Self::Alt];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Shift => "shift",
            Self::Ctrl => "ctrl",
            Self::Alt => "alt",
        }
    }

    #[must_use]
    pub const fn flag(self) -> &'static str {
        match self {
            Self::Shift => "--shift",
            Self::Ctrl => "--ctrl",
            Self::Alt => "--alt",
        }
    }
}

/// Lock-key vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Lock {
    Caps,
    Num,
}

impl Lock {
    pub const ALL: [Self; 2] = [Self::Caps, Self::Num];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Caps => "caps",
            Self::Num => "num",
        }
    }

    #[must_use]
    pub const fn flag(self) -> &'static str {
        match self {
            Self::Caps => "--caps",
            Self::Num => "--num",
        }
    }
}

pub type ModifierSet = Vec<Modifier>;
pub type LockSet = Vec<Lock>;

/// Protocol flag bitmask in `[0, 32)`, passed through opaquely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ProtocolFlags(u8);

impl ProtocolFlags {
    #[must_use]
    pub fn new(bits: u8) -> Option<Self> {
        (bits < PROTOCOL_FLAG_SPACE).then_some(Self(bits))
    }

    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Every flag value, ascending.
    pub fn all() -> impl Iterator<Item = Self> {
        (0..PROTOCOL_FLAG_SPACE).map(Self)
    }
}

impl fmt::Display for ProtocolFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One point of the matrix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TestCase {
    pub key: KeyDescriptor,
    pub modifiers: ModifierSet,
    pub locks: LockSet,
    pub flags: ProtocolFlags,
}

impl TestCase {
    /// Arguments shared by every tester: `--key`, modifiers, then locks.
    #[must_use]
    pub fn base_args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(2 + self.modifiers.len() + self.locks.len());
        args.push("--key".to_string());
        args.push(self.key.name.clone());
        args.extend(self.modifiers.iter().map(|m| m.flag().to_string()));
        args.extend(self.locks.iter().map(|l| l.flag().to_string()));
        args
    }

    /// Human-readable combo, e.g. `Key: ctrl+caps+a, Flags: 3`.
    #[must_use]
    pub fn describe(&self) -> String {
        let mut parts: Vec<&str> = self.modifiers.iter().map(|m| m.label()).collect();
        parts.extend(self.locks.iter().map(|l| l.label()));
        parts.push(&self.key.name);
        format!("Key: {}, Flags: {}", parts.join("+"), self.flags)
    }
}

/// All `k`-element combinations of `items`, in lexicographic index order.
fn combinations<T: Copy>(items: &[T], k: usize) -> Vec<Vec<T>> {
    if k == 0 {
        return vec![Vec::new()];
    }
    let mut out = Vec::new();
    for (i, &first) in items.iter().enumerate() {
        for rest in combinations(&items[i + 1..], k - 1) {
            let mut combo = Vec::with_capacity(k);
            combo.push(first);
            combo.extend(rest);
            out.push(combo);
        }
    }
    out
}

/// The empty set followed by every non-empty subset of the modifier
/// vocabulary, by size then position.
#[must_use]
pub fn modifier_combinations() -> Vec<ModifierSet> {
    (0..=Modifier::ALL.len())
        .flat_map(|k| combinations(&Modifier::ALL, k))
        .collect()
}

#[must_use]
pub fn lock_combinations() -> Vec<LockSet> {
    vec![
        Vec::new(),
        vec![Lock::Caps],
        vec![Lock::Num],
        vec![Lock::Caps, Lock::Num],
    ]
}

/// Index range covered by a run.
///
/// The start offset is computed against the unbounded `total`; `limit`
/// (when positive) truncates after the offset is applied.
#[must_use]
pub fn case_window(total: usize, limit: Option<usize>, start_percent: Option<u8>) -> Range<usize> {
    let start = match start_percent {
        Some(p) if p > 0 && p < 100 => (total as u128 * u128::from(p) / 100) as usize,
        _ => 0,
    };
    let end = match limit {
        Some(limit) if limit > 0 => start.saturating_add(limit).min(total),
        _ => total,
    };
    start..end
}

/// The four vocabularies that span the matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matrix {
    keys: Vec<KeyDescriptor>,
    modifiers: Vec<ModifierSet>,
    locks: Vec<LockSet>,
    flags: Vec<ProtocolFlags>,
}

impl Matrix {
    /// Full matrix: every key, all modifier and lock combinations, all flags.
    #[must_use]
    pub fn standard(catalog: &KeyCatalog) -> Self {
        Self::new(
            catalog,
            modifier_combinations(),
            lock_combinations(),
            ProtocolFlags::all().collect(),
        )
    }

    #[must_use]
    pub fn new(
        catalog: &KeyCatalog,
        modifiers: Vec<ModifierSet>,
        locks: Vec<LockSet>,
        flags: Vec<ProtocolFlags>,
    ) -> Self {
        Self {
            keys: catalog.iter().cloned().collect(),
            modifiers,
            locks,
            flags,
        }
    }

    /// Unbounded case count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len() * self.modifiers.len() * self.locks.len() * self.flags.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The case at `index` in enumeration order.
    #[must_use]
    pub fn case_at(&self, index: usize) -> Option<TestCase> {
        if index >= self.len() {
            return None;
        }
        let flag_idx = index % self.flags.len();
        let rest = index / self.flags.len();
        let lock_idx = rest % self.locks.len();
        let rest = rest / self.locks.len();
        let mod_idx = rest % self.modifiers.len();
        let key_idx = rest / self.modifiers.len();

        Some(TestCase {
            key: self.keys[key_idx].clone(),
            modifiers: self.modifiers[mod_idx].clone(),
            locks: self.locks[lock_idx].clone(),
            flags: self.flags[flag_idx],
        })
    }

    /// Ordered cases for a run, honouring `limit` and `start_percent`.
    #[must_use]
    pub fn generate(&self, limit: Option<usize>, start_percent: Option<u8>) -> MatrixIter {
        self.clone().into_cases(limit, start_percent)
    }

    #[must_use]
    pub fn into_cases(self, limit: Option<usize>, start_percent: Option<u8>) -> MatrixIter {
        let window = case_window(self.len(), limit, start_percent);
        MatrixIter {
            matrix: self,
            next: window.start,
            start: window.start,
            end: window.end,
        }
    }
}

/// `generate(catalog, limit?, startPercent?)` over the standard vocabularies.
#[must_use]
pub fn generate(
    catalog: &KeyCatalog,
    limit: Option<usize>,
    start_percent: Option<u8>,
) -> MatrixIter {
    Matrix::standard(catalog).into_cases(limit, start_percent)
}

/// Lazy iterator over a window of the matrix.
#[derive(Debug, Clone)]
pub struct MatrixIter {
    matrix: Matrix,
    next: usize,
    start: usize,
    end: usize,
}

impl MatrixIter {
    /// Global index of the first case of this window.
    #[must_use]
    pub fn start_index(&self) -> usize {
        self.start
    }

    /// Global index the next call to `next()` will yield.
    #[must_use]
    pub fn position(&self) -> usize {
        self.next
    }

    /// Unbounded size of the underlying matrix.
    #[must_use]
    pub fn matrix_len(&self) -> usize {
        self.matrix.len()
    }
}

impl Iterator for MatrixIter {
    type Item = TestCase;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }
        let case = self.matrix.case_at(self.next);
        self.next += 1;
        case
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end.saturating_sub(self.next);
        (remaining, Some(remaining))
    }

    fn nth(&mut self, n: usize) -> Option<Self::Item> {
        self.next = self.next.saturating_add(n).min(self.end);
        self.next()
    }
}

impl ExactSizeIterator for MatrixIter {}
