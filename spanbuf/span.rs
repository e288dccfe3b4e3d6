//! Span records and the per-buffer span table.
//!
//! A span is a `(tag, start, end, flags)` record attached to a
//! [`SpanBuffer`](crate::buffer::SpanBuffer). Tags are caller-owned trait
//! objects held behind `Rc` and compared by pointer identity, never by value:
//! attaching the same `Rc` twice updates the existing record in place, while
//! two value-equal but distinct allocations are two distinct spans.
//!
//! The table preserves insertion order, which is the tie-break order for
//! overlap queries.

use std::{
  any::{
    Any,
    TypeId,
  },
  rc::Rc,
};

use bitflags::bitflags;

use crate::watch::SpanWatcher;

bitflags! {
  /// Per-boundary anchoring policy for a span.
  ///
  /// Each boundary is either *inclusive* (adopts text inserted exactly at it)
  /// or *exclusive* (lets such text fall outside the span). The four
  /// conventional combinations are provided as presets; `EXCLUSIVE_EXCLUSIVE`
  /// is the empty set.
  #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
  pub struct SpanFlags: u32 {
    /// The start boundary adopts text inserted exactly at it.
    const START_INCLUSIVE = 1 << 0;
    /// The end boundary adopts text inserted exactly at it.
    const END_INCLUSIVE   = 1 << 1;
  }
}

impl SpanFlags {
  pub const EXCLUSIVE_EXCLUSIVE: Self = Self::empty();
  pub const EXCLUSIVE_INCLUSIVE: Self = Self::END_INCLUSIVE;
  pub const INCLUSIVE_EXCLUSIVE: Self = Self::START_INCLUSIVE;
  pub const INCLUSIVE_INCLUSIVE: Self = Self::START_INCLUSIVE.union(Self::END_INCLUSIVE);

  pub fn start_anchor(self) -> Anchor {
    if self.contains(Self::START_INCLUSIVE) {
      Anchor::Mark
    } else {
      Anchor::Point
    }
  }

  pub fn end_anchor(self) -> Anchor {
    if self.contains(Self::END_INCLUSIVE) {
      Anchor::Point
    } else {
      Anchor::Mark
    }
  }

  /// A zero-length span with these flags is never a valid state.
  pub fn forbids_zero_length(self) -> bool {
    self == Self::EXCLUSIVE_EXCLUSIVE
  }
}

/// How a single span boundary reacts to text inserted exactly at it.
///
/// A `Point` boundary does not adopt freshly inserted text at its position;
/// a `Mark` boundary does. An exclusive start and an inclusive end are both
/// `Point`; an inclusive start and an exclusive end are both `Mark`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
  Point,
  Mark,
}

/// A caller-owned object a span can be attached to.
///
/// The buffer holds a non-owning `Rc` purely for identity comparison, type
/// filtering, and callback dispatch; the underlying object's lifetime is the
/// caller's business.
pub trait SpanTag: Any {
  fn as_any(&self) -> &dyn Any;

  /// Watcher capability, resolved once when the span is attached.
  fn as_watcher(&self) -> Option<&dyn SpanWatcher> {
    None
  }
}

#[derive(Clone)]
pub(crate) struct SpanRecord {
  pub tag:     Rc<dyn SpanTag>,
  pub start:   usize,
  pub end:     usize,
  pub flags:   SpanFlags,
  /// Cached `as_watcher().is_some()`, so edits never re-query the capability.
  pub watcher: bool,
}

impl SpanRecord {
  pub fn matches_kind(&self, kind: Option<TypeId>) -> bool {
    match kind {
      Some(kind) => self.tag.as_any().type_id() == kind,
      None => true,
    }
  }
}

/// Inclusive-touch overlap used by span queries: a zero-length span sitting
/// exactly on a query boundary still counts as overlapping.
pub(crate) fn overlaps(span_start: usize, span_end: usize, start: usize, end: usize) -> bool {
  span_start <= end && span_end >= start
}

/// Insertion-ordered collection of span records, keyed by tag identity.
#[derive(Default)]
pub(crate) struct SpanTable {
  records: Vec<SpanRecord>,
}

impl SpanTable {
  pub fn len(&self) -> usize {
    self.records.len()
  }

  pub fn is_empty(&self) -> bool {
    self.records.is_empty()
  }

  pub fn iter(&self) -> std::slice::Iter<'_, SpanRecord> {
    self.records.iter()
  }

  pub fn get(&self, index: usize) -> &SpanRecord {
    &self.records[index]
  }

  pub fn get_mut(&mut self, index: usize) -> &mut SpanRecord {
    &mut self.records[index]
  }

  /// Identity lookup. Value equality of two distinct allocations never
  /// matches.
  pub fn index_of(&self, tag: &Rc<dyn SpanTag>) -> Option<usize> {
    self
      .records
      .iter()
      .position(|record| Rc::ptr_eq(&record.tag, tag))
  }

  pub fn push(&mut self, tag: Rc<dyn SpanTag>, start: usize, end: usize, flags: SpanFlags) {
    let watcher = tag.as_watcher().is_some();
    self.records.push(SpanRecord {
      tag,
      start,
      end,
      flags,
      watcher,
    });
  }

  pub fn remove(&mut self, index: usize) -> SpanRecord {
    self.records.remove(index)
  }
}

#[cfg(test)]
mod test {
  use super::*;

  struct Marker(u32);

  impl SpanTag for Marker {
    fn as_any(&self) -> &dyn Any {
      self
    }
  }

  #[test]
  fn flag_presets() {
    assert_eq!(SpanFlags::EXCLUSIVE_EXCLUSIVE, SpanFlags::empty());
    assert_eq!(
      SpanFlags::INCLUSIVE_INCLUSIVE,
      SpanFlags::START_INCLUSIVE | SpanFlags::END_INCLUSIVE
    );

    assert_eq!(
      SpanFlags::EXCLUSIVE_EXCLUSIVE.start_anchor(),
      Anchor::Point
    );
    assert_eq!(SpanFlags::EXCLUSIVE_EXCLUSIVE.end_anchor(), Anchor::Mark);
    assert_eq!(SpanFlags::INCLUSIVE_INCLUSIVE.start_anchor(), Anchor::Mark);
    assert_eq!(SpanFlags::INCLUSIVE_INCLUSIVE.end_anchor(), Anchor::Point);

    assert!(SpanFlags::EXCLUSIVE_EXCLUSIVE.forbids_zero_length());
    assert!(!SpanFlags::INCLUSIVE_EXCLUSIVE.forbids_zero_length());
  }

  #[test]
  fn identity_not_value_equality() {
    let mut table = SpanTable::default();
    let a: Rc<dyn SpanTag> = Rc::new(Marker(7));
    let b: Rc<dyn SpanTag> = Rc::new(Marker(7));

    table.push(a.clone(), 0, 1, SpanFlags::INCLUSIVE_INCLUSIVE);
    assert_eq!(table.index_of(&a), Some(0));
    assert_eq!(table.index_of(&b), None);

    table.push(b.clone(), 2, 3, SpanFlags::INCLUSIVE_INCLUSIVE);
    assert_eq!(table.index_of(&b), Some(1));
    assert_eq!(table.len(), 2);
  }

  #[test]
  fn zero_length_touch_overlaps() {
    assert!(overlaps(3, 3, 0, 3));
    assert!(overlaps(3, 3, 3, 8));
    assert!(!overlaps(4, 6, 0, 3));
    assert!(overlaps(0, 0, 0, 0));
  }
}
