//! Per-game membership state for a filter.
//!
//! A `MembershipVector` holds one match value per game index and a running
//! count of how many entries are included. The count is maintained
//! incrementally on every mutation; only construction, `fill`, and `invert`
//! set it wholesale.

/// Match strength for one game. 0 = excluded, 1 = plain match, values above 1
/// carry the match quality a search reported.
pub type MatchValue = u8;

/// Inclusion state for every game in a collection, plus the maintained count
/// of included games.
///
/// Out-of-range access is absorbed rather than signaled: reads yield 0
/// ("not included") and writes are no-ops. A filter may briefly be re-read
/// against a stale size while its collection grows or shrinks, and that must
/// not take the engine down.
#[derive(Debug, Clone)]
pub struct MembershipVector {
    values: Vec<MatchValue>,
    included: usize,
}

impl MembershipVector {
    /// Creates a vector of `size` entries, all set to `initial`.
    pub fn new(size: usize, initial: MatchValue) -> Self {
        Self {
            values: vec![initial; size],
            included: if initial != 0 { size } else { 0 },
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of entries with a nonzero match value.
    pub fn included(&self) -> usize {
        self.included
    }

    /// Raw match value at `index`; 0 when out of range.
    pub fn get(&self, index: usize) -> MatchValue {
        self.values.get(index).copied().unwrap_or(0)
    }

    /// Whether the entry at `index` is included.
    pub fn contains(&self, index: usize) -> bool {
        self.get(index) != 0
    }

    /// Stores `value` at `index`, keeping the included count in step.
    ///
    /// No-op when `index` is out of range or the value is unchanged. The
    /// count moves only on excluded<->included transitions, never on
    /// quality-only changes between two nonzero values.
    pub fn set(&mut self, index: usize, value: MatchValue) {
        let Some(slot) = self.values.get_mut(index) else {
            return;
        };
        if *slot == value {
            return;
        }
        if value != 0 && *slot == 0 {
            self.included += 1;
        } else if value == 0 && *slot != 0 {
            self.included -= 1;
        }
        *slot = value;
    }

    /// Sets every entry to `value`.
    pub fn fill(&mut self, value: MatchValue) {
        self.values.fill(value);
        self.included = if value != 0 { self.values.len() } else { 0 };
    }

    /// Flips included<->excluded for every entry. Any nonzero value maps to
    /// 0, any 0 maps to 1; quality information does not survive an inversion.
    pub fn invert(&mut self) {
        self.included = self.values.len() - self.included;
        for value in &mut self.values {
            *value = if *value != 0 { 0 } else { 1 };
        }
    }

    /// Grows or shrinks the vector to `new_size`.
    ///
    /// Shrinking drops the tail and decrements the count for every removed
    /// entry that was included. Growing appends entries set to 1 or 0
    /// depending on `include_new`. Surviving entries are untouched.
    pub fn resize(&mut self, new_size: usize, include_new: bool) {
        for index in new_size..self.values.len() {
            if self.values[index] != 0 {
                self.included -= 1;
            }
        }
        let old_size = self.values.len();
        self.values.resize(new_size, if include_new { 1 } else { 0 });
        if include_new && new_size > old_size {
            self.included += new_size - old_size;
        }
    }
}
