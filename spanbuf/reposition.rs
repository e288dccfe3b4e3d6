//! Boundary arithmetic for carrying spans across an edit.
//!
//! A single mutating call replaces the half-open region
//! `[region.start, region.end)` with `region.inserted` new characters. Every
//! span boundary is classified against that region:
//!
//! - **before** (`p < start`): unchanged.
//! - **after** (`p > end`): shifted by the edit's net length delta.
//! - **inside** (`start <= p <= end`): resolved by the boundary's
//!   [`Anchor`]:
//!   - `Point` moves to the end of the inserted text, except when it sits
//!     exactly at the region start of a replacement (text both removed and
//!     inserted), where it stays put.
//!   - `Mark` collapses to the region start, except when it sits exactly at
//!     the region end of a replacement, where it moves to the end of the
//!     inserted text.
//!
//! Spans whose flags forbid zero length (exclusive-exclusive) and whose
//! boundaries were both inside the region are removed rather than collapsed
//! whenever the edit inserted nothing or the span was strictly interior to
//! the region. Spans entirely before or after an edit are always kept.
//!
//! Everything here is pure arithmetic; [`SpanBuffer`](crate::buffer) owns the
//! table walk and event reporting.

use crate::span::{
  Anchor,
  SpanFlags,
};

/// One edit: `[start, end)` replaced by `inserted` characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditRegion {
  pub start:    usize,
  pub end:      usize,
  pub inserted: usize,
}

impl EditRegion {
  pub fn new(start: usize, end: usize, inserted: usize) -> Self {
    debug_assert!(start <= end);
    Self {
      start,
      end,
      inserted,
    }
  }

  /// Characters removed by the edit.
  pub fn removed(&self) -> usize {
    self.end - self.start
  }

  /// Whether the edit both removed and inserted text, as opposed to a pure
  /// insertion or pure deletion. Anchors at the exact region boundaries
  /// behave differently in this case.
  pub fn text_is_replaced(&self) -> bool {
    self.removed() > 0 && self.inserted > 0
  }

  /// End of the inserted text in post-edit coordinates.
  pub fn new_end(&self) -> usize {
    self.start + self.inserted
  }

  /// Shift a position sitting after the region by the net length delta.
  fn shift_after(&self, pos: usize) -> usize {
    pos - self.removed() + self.inserted
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
  Before,
  Inside,
  After,
}

pub fn classify(pos: usize, region: EditRegion) -> Boundary {
  if pos < region.start {
    Boundary::Before
  } else if pos > region.end {
    Boundary::After
  } else {
    Boundary::Inside
  }
}

/// Map one span boundary through an edit.
pub fn reposition_boundary(pos: usize, anchor: Anchor, region: EditRegion) -> usize {
  match classify(pos, region) {
    Boundary::Before => pos,
    Boundary::After => region.shift_after(pos),
    Boundary::Inside => {
      match anchor {
        Anchor::Point => {
          if pos == region.start && region.text_is_replaced() {
            region.start
          } else {
            region.new_end()
          }
        },
        Anchor::Mark => {
          if pos == region.end && region.text_is_replaced() {
            region.new_end()
          } else {
            region.start
          }
        },
      }
    },
  }
}

/// What became of a span after an edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
  Keep { start: usize, end: usize },
  Remove,
}

/// Map a whole span through an edit, applying the removal rule for spans
/// that may not collapse to zero length.
pub fn reposition_span(start: usize, end: usize, flags: SpanFlags, region: EditRegion) -> Outcome {
  debug_assert!(start <= end);

  let start_inside = classify(start, region) == Boundary::Inside;
  let end_inside = classify(end, region) == Boundary::Inside;

  if start_inside
    && end_inside
    && flags.forbids_zero_length()
    && (region.inserted == 0 || start > region.start || end < region.end)
  {
    return Outcome::Remove;
  }

  let new_start = reposition_boundary(start, flags.start_anchor(), region);
  let new_end = reposition_boundary(end, flags.end_anchor(), region);

  debug_assert!(new_start <= new_end);
  debug_assert!(!flags.forbids_zero_length() || new_start < new_end);

  Outcome::Keep {
    start: new_start,
    end:   new_end,
  }
}

#[cfg(test)]
mod test {
  use super::*;

  fn keep(start: usize, end: usize) -> Outcome {
    Outcome::Keep { start, end }
  }

  #[test]
  fn boundaries_outside_the_region() {
    // "hello" -> replace [2, 4) with three chars, delta = +1.
    let region = EditRegion::new(2, 4, 3);

    for anchor in [Anchor::Point, Anchor::Mark] {
      assert_eq!(reposition_boundary(0, anchor, region), 0);
      assert_eq!(reposition_boundary(1, anchor, region), 1);
      assert_eq!(reposition_boundary(5, anchor, region), 6);
    }
  }

  #[test]
  fn inside_pure_insertion() {
    // Insert 4 chars at 1; the only inside position is 1 itself.
    let region = EditRegion::new(1, 1, 4);
    assert!(!region.text_is_replaced());

    // Point does not adopt the insertion, mark does.
    assert_eq!(reposition_boundary(1, Anchor::Point, region), 5);
    assert_eq!(reposition_boundary(1, Anchor::Mark, region), 1);
  }

  #[test]
  fn inside_replacement_edges() {
    // Replace [2, 5) with "xy".
    let region = EditRegion::new(2, 5, 2);
    assert!(region.text_is_replaced());

    // Point pinned at the region start stays; anywhere else inside it moves
    // to the end of the insertion.
    assert_eq!(reposition_boundary(2, Anchor::Point, region), 2);
    assert_eq!(reposition_boundary(3, Anchor::Point, region), 4);
    assert_eq!(reposition_boundary(5, Anchor::Point, region), 4);

    // Mark pinned at the region end rides to the insertion end; anywhere
    // else inside it collapses to the region start.
    assert_eq!(reposition_boundary(5, Anchor::Mark, region), 4);
    assert_eq!(reposition_boundary(3, Anchor::Mark, region), 2);
    assert_eq!(reposition_boundary(2, Anchor::Mark, region), 2);
  }

  #[test]
  fn inclusive_inclusive_collapses_into_replacement() {
    // [1, 3) inclusive-inclusive over replace(0, 5, "hi").
    let region = EditRegion::new(0, 5, 2);
    assert_eq!(
      reposition_span(1, 3, SpanFlags::INCLUSIVE_INCLUSIVE, region),
      keep(0, 2)
    );
  }

  #[test]
  fn inclusive_inclusive_tolerates_zero_length() {
    // Pure deletion of exactly the span.
    let region = EditRegion::new(2, 4, 0);
    assert_eq!(
      reposition_span(2, 4, SpanFlags::INCLUSIVE_INCLUSIVE, region),
      keep(2, 2)
    );
  }

  #[test]
  fn exclusive_exclusive_removed_on_deletion() {
    let region = EditRegion::new(2, 4, 0);
    assert_eq!(
      reposition_span(2, 4, SpanFlags::EXCLUSIVE_EXCLUSIVE, region),
      Outcome::Remove
    );
  }

  #[test]
  fn exclusive_exclusive_removed_when_strictly_interior() {
    // Replacement inserts text, but the span was strictly inside the region.
    let region = EditRegion::new(1, 6, 3);
    assert_eq!(
      reposition_span(2, 4, SpanFlags::EXCLUSIVE_EXCLUSIVE, region),
      Outcome::Remove
    );
  }

  #[test]
  fn exclusive_exclusive_survives_exact_replacement() {
    // Span covers the region exactly and text was replaced: both anchors are
    // pinned and the span stretches over the new text.
    let region = EditRegion::new(2, 4, 5);
    assert_eq!(
      reposition_span(2, 4, SpanFlags::EXCLUSIVE_EXCLUSIVE, region),
      keep(2, 7)
    );
  }

  #[test]
  fn straddling_spans_are_kept() {
    // Start before, end inside.
    let region = EditRegion::new(3, 6, 0);
    assert_eq!(
      reposition_span(1, 4, SpanFlags::EXCLUSIVE_EXCLUSIVE, region),
      keep(1, 3)
    );

    // Start inside, end after.
    assert_eq!(
      reposition_span(4, 8, SpanFlags::EXCLUSIVE_EXCLUSIVE, region),
      keep(3, 5)
    );
  }

  quickcheck::quickcheck! {
    // Spans entirely before the edit never move; spans entirely after shift
    // by exactly the net delta.
    fn prop_outside_spans_shift(start: usize, len: usize, removed: usize, inserted: usize, bits: u32) -> bool {
      let start = start % 50;
      let removed = removed % 20;
      let inserted = inserted % 20;
      // Non-empty so the span stays a valid state for every flag combination.
      let len = len % 20 + 1;
      let region = EditRegion::new(start, start + removed, inserted);
      let flags = SpanFlags::from_bits_truncate(bits);

      let before_ok = if start >= 2 {
        let (s, e) = (start - 2, start - 1);
        reposition_span(s, e, flags, region) == keep(s, e)
      } else {
        true
      };

      // `s > region.end >= removed`, so the subtraction cannot underflow.
      let (s, e) = (region.end + 1, region.end + 1 + len);
      let after_ok =
        reposition_span(s, e, flags, region) == keep(s - removed + inserted, e - removed + inserted);

      before_ok && after_ok
    }

    // Exclusive-exclusive spans never come out zero-length, whatever their
    // relation to the edit.
    fn prop_exclusive_exclusive_never_empty(span: (usize, usize), edit: (usize, usize), inserted: usize) -> bool {
      let (s, e) = (span.0 % 40, span.1 % 40);
      let (s, e) = (s.min(e), s.max(e));
      let e = if s == e { e + 1 } else { e };
      let (rs, re) = (edit.0 % 40, edit.1 % 40);
      let region = EditRegion::new(rs.min(re), rs.max(re), inserted % 20);

      match reposition_span(s, e, SpanFlags::EXCLUSIVE_EXCLUSIVE, region) {
        Outcome::Keep { start, end } => start < end,
        Outcome::Remove => true,
      }
    }
  }
}
