//! A mutable text buffer that keeps attached spans anchored across edits.
//!
//! [`SpanBuffer`] stores a char-indexed text (a [`ropey::Rope`]) plus a table
//! of spans: `(tag, start, end, flags)` records whose bounds are
//! automatically repositioned by every edit according to their per-boundary
//! anchor flags (see [`crate::reposition`]).
//!
//! # Basic Usage
//!
//! ```ignore
//! use std::rc::Rc;
//! use spanbuf::{
//!   buffer::SpanBuffer,
//!   span::{SpanFlags, SpanTag},
//! };
//!
//! let mut buf = SpanBuffer::from("hello, world");
//! let bold: Rc<dyn SpanTag> = Rc::new(Bold);
//!
//! buf.set_span(bold.clone(), 0, 5, SpanFlags::INCLUSIVE_INCLUSIVE)?;
//! buf.replace(0, 5, "goodbye")?;
//!
//! assert_eq!(buf.span_range(&bold), Some((0, 7)));
//! ```
//!
//! # Mutation Model
//!
//! `replace(from, to, text)` is the single mutation entry point; `insert` and
//! `delete` are conveniences over it. One call runs, in order:
//!
//! 1. input filters, which may rewrite or veto the inserted text;
//! 2. the text edit itself;
//! 3. repositioning of every span in the table;
//! 4. span migration, when the replacement text came from another
//!    span-carrying buffer (`replace_from`);
//! 5. synchronous change notification to watcher spans.
//!
//! Everything is single-threaded and runs on the caller's stack; when the
//! call returns, the buffer and all observers are consistent. A failed call
//! leaves the buffer untouched.
//!
//! # Queries
//!
//! `spans(start, end, kind)` returns the tags of spans overlapping the query
//! region (inclusive-touch, so zero-length spans on a boundary count),
//! ordered by increasing start with ties broken by insertion order.
//! `next_span_transition` scans for the nearest span boundary after a
//! position. Per-tag accessors (`span_range`, `span_flags`, …) return `None`
//! for tags with no current span.
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, SpanBufferError>`]:
//!
//! - **InvalidRange** - a range argument with start > end
//! - **RangeOutOfBounds** - a range argument extending past the buffer end
//! - **CharOutOfBounds** - a char index at or past the buffer end
//! - **ZeroLengthExclusive** - creating a zero-length exclusive-exclusive
//!   span, which is never a valid state

use std::{
  any::TypeId,
  fmt,
  rc::Rc,
};

use ropey::{
  Rope,
  RopeSlice,
};
use smallvec::SmallVec;
use thiserror::Error;

use crate::{
  Tendril,
  filter::InputFilter,
  reposition::{
    EditRegion,
    Outcome,
    reposition_span,
  },
  span::{
    SpanFlags,
    SpanTable,
    SpanTag,
    overlaps,
  },
  watch::{
    self,
    SpanEvent,
  },
};

pub type Result<T> = std::result::Result<T, SpanBufferError>;

type EventBuf = SmallVec<[SpanEvent; 4]>;

#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum SpanBufferError {
  #[error("range {from}..{to} is out of bounds for buffer length {len}")]
  RangeOutOfBounds {
    from: usize,
    to:   usize,
    len:  usize,
  },
  #[error("invalid range: start {from} is after end {to}")]
  InvalidRange { from: usize, to: usize },
  #[error("char index {index} is out of bounds for buffer length {len}")]
  CharOutOfBounds { index: usize, len: usize },
  #[error("a zero-length exclusive-exclusive span at {at} is never a valid state")]
  ZeroLengthExclusive { at: usize },
}

/// Text plus anchored spans plus input filters. See the module docs.
#[derive(Default)]
pub struct SpanBuffer {
  text:    Rope,
  spans:   SpanTable,
  filters: Vec<Rc<dyn InputFilter>>,
}

impl SpanBuffer {
  pub fn new() -> Self {
    Self::default()
  }

  // Text reads.
  //

  /// Length in chars.
  pub fn len_chars(&self) -> usize {
    self.text.len_chars()
  }

  pub fn is_empty(&self) -> bool {
    self.text.len_chars() == 0
  }

  pub fn char_at(&self, index: usize) -> Result<char> {
    let len = self.text.len_chars();
    if index >= len {
      return Err(SpanBufferError::CharOutOfBounds { index, len });
    }
    Ok(self.text.char(index))
  }

  /// Read-only window over `[from, to)`.
  pub fn slice(&self, from: usize, to: usize) -> Result<RopeSlice<'_>> {
    self.check_range(from, to)?;
    Ok(self.text.slice(from..to))
  }

  /// Append the chars of `[from, to)` to `dest`.
  pub fn copy_chars(&self, from: usize, to: usize, dest: &mut String) -> Result<()> {
    self.check_range(from, to)?;
    for chunk in self.text.slice(from..to).chunks() {
      dest.push_str(chunk);
    }
    Ok(())
  }

  pub fn text(&self) -> &Rope {
    &self.text
  }

  // Input filters.
  //

  /// Replace the installed filter chain. Filters run in order on every
  /// subsequent mutation.
  pub fn set_filters(&mut self, filters: Vec<Rc<dyn InputFilter>>) {
    self.filters = filters;
  }

  pub fn filters(&self) -> &[Rc<dyn InputFilter>] {
    &self.filters
  }

  // Mutation.
  //

  /// `replace(at, at, text)`.
  pub fn insert(&mut self, at: usize, text: &str) -> Result<&mut Self> {
    self.replace(at, at, text)
  }

  /// `replace(from, to, "")`.
  pub fn delete(&mut self, from: usize, to: usize) -> Result<&mut Self> {
    self.replace(from, to, "")
  }

  /// Replace `[from, to)` with `text`. The single mutation entry point:
  /// drives filtering, repositioning, and notification.
  pub fn replace(&mut self, from: usize, to: usize, text: &str) -> Result<&mut Self> {
    self.replace_impl(from, to, Tendril::from(text), None)?;
    Ok(self)
  }

  /// Replace `[from, to)` with `source[src_start..src_end)`, migrating the
  /// source's intersecting spans into this buffer. The source is never
  /// mutated; migrated spans are reported as added here.
  pub fn replace_from(
    &mut self,
    from: usize,
    to: usize,
    source: &SpanBuffer,
    src_start: usize,
    src_end: usize,
  ) -> Result<&mut Self> {
    source.check_range(src_start, src_end)?;

    let mut text = Tendril::new();
    for chunk in source.text.slice(src_start..src_end).chunks() {
      text.push_str(chunk);
    }

    self.replace_impl(from, to, text, Some((source, src_start, src_end)))?;
    Ok(self)
  }

  fn replace_impl(
    &mut self,
    from: usize,
    to: usize,
    mut text: Tendril,
    source: Option<(&SpanBuffer, usize, usize)>,
  ) -> Result<()> {
    self.check_range(from, to)?;

    let mut filtered = false;
    if !self.filters.is_empty() {
      let filters = self.filters.clone();
      for filter in &filters {
        if let Some(replacement) = filter.filter(&text, self, from, to) {
          text = replacement;
          filtered = true;
        }
      }
    }

    let removed = to - from;
    let inserted = text.chars().count();
    let region = EditRegion::new(from, to, inserted);

    tracing::trace!(from, to, removed, inserted, "replace");

    if removed > 0 {
      self.text.remove(from..to);
    }
    if inserted > 0 {
      self.text.insert(from, &text);
    }

    let mut events = EventBuf::new();
    self.reposition_spans(region, &mut events);

    if !filtered {
      if let Some((source, src_start, src_end)) = source {
        self.migrate_spans(source, src_start, src_end, from, &mut events);
      }
    }

    watch::dispatch(&self.spans, &events);
    Ok(())
  }

  /// Walk the table, updating or dropping every span per the edit region.
  /// Removed events carry the pre-edit bounds.
  fn reposition_spans(&mut self, region: EditRegion, events: &mut EventBuf) {
    let mut index = 0;
    while index < self.spans.len() {
      let record = self.spans.get(index);

      match reposition_span(record.start, record.end, record.flags, region) {
        Outcome::Remove => {
          let record = self.spans.remove(index);
          events.push(SpanEvent::Removed {
            tag:   record.tag,
            start: record.start,
            end:   record.end,
          });
        },
        Outcome::Keep { start, end } => {
          if (start, end) != (record.start, record.end) {
            events.push(SpanEvent::Changed {
              tag:       record.tag.clone(),
              old_start: record.start,
              old_end:   record.end,
              new_start: start,
              new_end:   end,
            });
            let record = self.spans.get_mut(index);
            record.start = start;
            record.end = end;
          }
          index += 1;
        },
      }
    }
  }

  /// Copy the source spans intersecting `[src_start, src_end)` into this
  /// (already edited) buffer, rebased onto `dest_start`. Copies that would
  /// be invalid states are dropped, not installed.
  fn migrate_spans(
    &mut self,
    source: &SpanBuffer,
    src_start: usize,
    src_end: usize,
    dest_start: usize,
    events: &mut EventBuf,
  ) {
    for record in source.spans.iter() {
      if !overlaps(record.start, record.end, src_start, src_end) {
        continue;
      }

      let new_start = record.start.saturating_sub(src_start) + dest_start;
      let new_end = record.end.min(src_end) - src_start + dest_start;

      if record.flags.forbids_zero_length() && new_start == new_end {
        continue;
      }

      match self.spans.index_of(&record.tag) {
        // The tag already carries a span here; one record per identity.
        Some(index) => {
          let existing = self.spans.get_mut(index);
          if (existing.start, existing.end, existing.flags) == (new_start, new_end, record.flags) {
            continue;
          }
          let (old_start, old_end) = (existing.start, existing.end);
          existing.start = new_start;
          existing.end = new_end;
          existing.flags = record.flags;
          events.push(SpanEvent::Changed {
            tag: record.tag.clone(),
            old_start,
            old_end,
            new_start,
            new_end,
          });
        },
        None => {
          self.spans.push(record.tag.clone(), new_start, new_end, record.flags);
          events.push(SpanEvent::Added {
            tag:   record.tag.clone(),
            start: new_start,
            end:   new_end,
          });
        },
      }
    }
  }

  // Span lifecycle.
  //

  /// Attach `tag` over `[start, end)`, or re-anchor it if it already carries
  /// a span (identity match, one record per tag).
  pub fn set_span(
    &mut self,
    tag: Rc<dyn SpanTag>,
    start: usize,
    end: usize,
    flags: SpanFlags,
  ) -> Result<()> {
    self.check_range(start, end)?;
    if flags.forbids_zero_length() && start == end {
      return Err(SpanBufferError::ZeroLengthExclusive { at: start });
    }

    let event = match self.spans.index_of(&tag) {
      Some(index) => {
        let record = self.spans.get_mut(index);
        if (record.start, record.end, record.flags) == (start, end, flags) {
          return Ok(());
        }
        let (old_start, old_end) = (record.start, record.end);
        record.start = start;
        record.end = end;
        record.flags = flags;
        SpanEvent::Changed {
          tag,
          old_start,
          old_end,
          new_start: start,
          new_end: end,
        }
      },
      None => {
        self.spans.push(tag.clone(), start, end, flags);
        SpanEvent::Added { tag, start, end }
      },
    };

    watch::dispatch(&self.spans, &[event]);
    Ok(())
  }

  /// Detach `tag`. Returns whether it carried a span.
  pub fn remove_span(&mut self, tag: &Rc<dyn SpanTag>) -> bool {
    let Some(index) = self.spans.index_of(tag) else {
      return false;
    };

    let record = self.spans.remove(index);
    watch::dispatch(&self.spans, &[SpanEvent::Removed {
      tag:   record.tag,
      start: record.start,
      end:   record.end,
    }]);
    true
  }

  /// Detach every span, in insertion order. Watchers still attached hear
  /// each removal that precedes their own.
  pub fn clear_spans(&mut self) {
    while !self.spans.is_empty() {
      let record = self.spans.remove(0);
      watch::dispatch(&self.spans, &[SpanEvent::Removed {
        tag:   record.tag,
        start: record.start,
        end:   record.end,
      }]);
    }
  }

  // Span queries.
  //

  /// Tags of all spans overlapping `[start, end]` (inclusive-touch), with
  /// `kind` filtering by the tag's concrete type. Ordered by increasing
  /// start, ties by insertion order.
  pub fn spans(&self, start: usize, end: usize, kind: Option<TypeId>) -> Result<Vec<Rc<dyn SpanTag>>> {
    self.check_range(start, end)?;

    let mut hits: Vec<(usize, Rc<dyn SpanTag>)> = self
      .spans
      .iter()
      .filter(|record| record.matches_kind(kind) && overlaps(record.start, record.end, start, end))
      .map(|record| (record.start, record.tag.clone()))
      .collect();

    hits.sort_by_key(|(start, _)| *start);
    Ok(hits.into_iter().map(|(_, tag)| tag).collect())
  }

  /// Smallest boundary of a `kind`-matching span strictly greater than
  /// `start` and smaller than `limit`; `limit` if none exists.
  pub fn next_span_transition(&self, start: usize, limit: usize, kind: Option<TypeId>) -> usize {
    let mut limit = limit;

    for record in self.spans.iter() {
      if !record.matches_kind(kind) {
        continue;
      }
      if record.start > start && record.start < limit {
        limit = record.start;
      }
      if record.end > start && record.end < limit {
        limit = record.end;
      }
    }

    limit
  }

  pub fn span_range(&self, tag: &Rc<dyn SpanTag>) -> Option<(usize, usize)> {
    let index = self.spans.index_of(tag)?;
    let record = self.spans.get(index);
    Some((record.start, record.end))
  }

  pub fn span_start(&self, tag: &Rc<dyn SpanTag>) -> Option<usize> {
    self.span_range(tag).map(|(start, _)| start)
  }

  pub fn span_end(&self, tag: &Rc<dyn SpanTag>) -> Option<usize> {
    self.span_range(tag).map(|(_, end)| end)
  }

  pub fn span_flags(&self, tag: &Rc<dyn SpanTag>) -> Option<SpanFlags> {
    let index = self.spans.index_of(tag)?;
    Some(self.spans.get(index).flags)
  }

  pub fn span_count(&self) -> usize {
    self.spans.len()
  }

  /// Snapshot of every span as `(tag, start, end, flags)`, in insertion
  /// order.
  pub fn span_entries(&self) -> Vec<(Rc<dyn SpanTag>, usize, usize, SpanFlags)> {
    self
      .spans
      .iter()
      .map(|record| (record.tag.clone(), record.start, record.end, record.flags))
      .collect()
  }

  fn check_range(&self, from: usize, to: usize) -> Result<()> {
    if from > to {
      return Err(SpanBufferError::InvalidRange { from, to });
    }
    let len = self.text.len_chars();
    if to > len {
      return Err(SpanBufferError::RangeOutOfBounds { from, to, len });
    }
    Ok(())
  }
}

impl From<&str> for SpanBuffer {
  fn from(text: &str) -> Self {
    Self {
      text:    Rope::from_str(text),
      spans:   SpanTable::default(),
      filters: Vec::new(),
    }
  }
}

impl From<String> for SpanBuffer {
  fn from(text: String) -> Self {
    Self::from(text.as_str())
  }
}

impl fmt::Display for SpanBuffer {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.text)
  }
}

impl fmt::Debug for SpanBuffer {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("SpanBuffer")
      .field("text", &self.text)
      .field("spans", &self.spans.len())
      .field("filters", &self.filters.len())
      .finish()
  }
}
