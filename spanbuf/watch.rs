//! Change notification for span observers.
//!
//! A tag that also implements [`SpanWatcher`] is stored as an ordinary span
//! (its own bounds define the region it watches) and additionally receives a
//! callback for every span that is added, removed, or moved inside that
//! region. Attach a watcher over `[0, len]` with an inclusive end anchor to
//! observe the whole buffer as it grows.
//!
//! Dispatch is synchronous: callbacks run before the mutating call returns.
//! Exactly one event fires per affected span per mutating call, and none for
//! a span whose post-edit state equals its pre-edit state. Callbacks receive
//! tags and bounds only, never the buffer itself, so re-entrant mutation from
//! inside a callback is rejected by the borrow checker rather than left
//! undefined.

use std::rc::Rc;

use crate::span::{
  SpanTable,
  SpanTag,
  overlaps,
};

/// Observer capability for a span tag.
///
/// `old_*` bounds are the accurate pre-edit bounds, snapshotted before the
/// edit touched the table.
pub trait SpanWatcher {
  fn on_span_added(&self, tag: &Rc<dyn SpanTag>, start: usize, end: usize);
  fn on_span_removed(&self, tag: &Rc<dyn SpanTag>, start: usize, end: usize);
  fn on_span_changed(
    &self,
    tag: &Rc<dyn SpanTag>,
    old_start: usize,
    old_end: usize,
    new_start: usize,
    new_end: usize,
  );
}

/// One span's transition through a single mutating call.
#[derive(Clone)]
pub(crate) enum SpanEvent {
  Added {
    tag:   Rc<dyn SpanTag>,
    start: usize,
    end:   usize,
  },
  Removed {
    tag:   Rc<dyn SpanTag>,
    start: usize,
    end:   usize,
  },
  Changed {
    tag:       Rc<dyn SpanTag>,
    old_start: usize,
    old_end:   usize,
    new_start: usize,
    new_end:   usize,
  },
}

impl SpanEvent {
  /// Region a watcher must overlap to hear this event: new bounds for
  /// additions, old bounds for removals, the old/new extent for moves.
  fn extent(&self) -> (usize, usize) {
    match *self {
      SpanEvent::Added { start, end, .. } | SpanEvent::Removed { start, end, .. } => (start, end),
      SpanEvent::Changed {
        old_start,
        old_end,
        new_start,
        new_end,
        ..
      } => (old_start.min(new_start), old_end.max(new_end)),
    }
  }
}

/// Deliver events to every watcher span whose region overlaps them. The
/// table must already be in its post-edit state.
pub(crate) fn dispatch(table: &SpanTable, events: &[SpanEvent]) {
  if events.is_empty() {
    return;
  }

  for event in events {
    let (from, to) = event.extent();

    for record in table.iter() {
      if !record.watcher || !overlaps(record.start, record.end, from, to) {
        continue;
      }
      let Some(watcher) = record.tag.as_watcher() else {
        continue;
      };

      match event {
        SpanEvent::Added { tag, start, end } => watcher.on_span_added(tag, *start, *end),
        SpanEvent::Removed { tag, start, end } => watcher.on_span_removed(tag, *start, *end),
        SpanEvent::Changed {
          tag,
          old_start,
          old_end,
          new_start,
          new_end,
        } => watcher.on_span_changed(tag, *old_start, *old_end, *new_start, *new_end),
      }
    }
  }
}
