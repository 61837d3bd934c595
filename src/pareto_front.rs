use std::fmt::{self, Display, Formatter};
use std::slice::Iter as SliceIter;

use crate::packed::Criteria;

/// An immutable Pareto frontier: a set of criteria tuples none of which
/// dominates another, kept in ascending numeric order of the packed words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParetoFront {
    tuples: Box<[Criteria]>,
}

impl ParetoFront {
    pub fn empty() -> Self {
        ParetoFront { tuples: Box::new([]) }
    }

    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    /// The tuple with exactly this arrival time and change count, if any.
    pub fn get(&self, arr_mins: i32, changes: u32) -> Option<Criteria> {
        self.tuples
            .iter()
            .find(|tuple| tuple.arr_mins() == arr_mins && tuple.changes() == changes)
            .copied()
    }

    pub fn iter(&self) -> SliceIter<'_, Criteria> {
        self.tuples.iter()
    }
}

impl<'a> IntoIterator for &'a ParetoFront {
    type Item = &'a Criteria;
    type IntoIter = SliceIter<'a, Criteria>;

    fn into_iter(self) -> Self::IntoIter {
        self.tuples.iter()
    }
}

impl Display for ParetoFront {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "ParetoFront[")?;
        for tuple in self.iter() {
            writeln!(f, "  {:?}", tuple)?;
        }
        write!(f, "] ({} tuples)", self.len())
    }
}

/// A mutable Pareto frontier under construction.
///
/// The working set of the router: tuples are kept in ascending numeric
/// order, so the insertion point of a new tuple splits the array into the
/// region that may dominate it and the region it may dominate.
#[derive(Debug, Clone, Default)]
pub struct ParetoFrontBuilder {
    tuples: Vec<Criteria>,
}

impl ParetoFrontBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    pub fn clear(&mut self) {
        self.tuples.clear();
    }

    /// Inserts `tuple` unless an existing tuple dominates it; drops every
    /// existing tuple it dominates.
    ///
    /// All tuples of one builder must agree on departure time presence.
    pub fn add(&mut self, tuple: Criteria) {
        // Elements numerically below the insertion point are the only ones
        // that can dominate the new tuple, and the ones it can drop all sit
        // at or above it.
        let pos = self.tuples.partition_point(|existing| *existing < tuple);
        if self.tuples[..pos]
            .iter()
            .any(|existing| existing.dominates_or_equal(tuple))
        {
            return;
        }

        let mut kept = pos;
        for i in pos..self.tuples.len() {
            if !tuple.dominates_or_equal(self.tuples[i]) {
                self.tuples[kept] = self.tuples[i];
                kept += 1;
            }
        }
        self.tuples.truncate(kept);
        self.tuples.insert(pos, tuple);
    }

    /// Packs and inserts `(arr_mins, changes, payload)`.
    pub fn add_packed(&mut self, arr_mins: i32, changes: u32, payload: u32) {
        self.add(Criteria::pack(arr_mins, changes, payload));
    }

    /// Inserts every tuple of `other`, honoring dominance.
    pub fn add_all(&mut self, other: &ParetoFrontBuilder) {
        for &tuple in &other.tuples {
            self.add(tuple);
        }
    }

    /// Whether every tuple of `other`, once given the departure time
    /// `dep_mins`, is dominated by some tuple of this builder.
    ///
    /// Lets the router skip propagating a candidate front that the
    /// departure station already beats.
    pub fn fully_dominates(&self, other: &ParetoFrontBuilder, dep_mins: i32) -> bool {
        other.tuples.iter().all(|&tuple| {
            let timed = tuple.with_dep_mins(dep_mins);
            self.tuples
                .iter()
                .any(|mine| mine.dominates_or_equal(timed))
        })
    }

    pub fn iter(&self) -> SliceIter<'_, Criteria> {
        self.tuples.iter()
    }

    pub fn build(&self) -> ParetoFront {
        ParetoFront {
            tuples: self.tuples.clone().into_boxed_slice(),
        }
    }
}
