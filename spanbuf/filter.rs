//! Input filters: pre-mutation hooks that may veto or rewrite inserted text.
//!
//! Filters run inside [`SpanBuffer::replace`](crate::buffer::SpanBuffer)
//! before the edit is applied, in installation order, each seeing the output
//! of the previous one. Returning `None` accepts the text unmodified;
//! returning `Some` substitutes the replacement (possibly empty, which vetoes
//! the insertion entirely).

use crate::{
  Tendril,
  buffer::SpanBuffer,
};

pub trait InputFilter {
  /// `source` is the candidate replacement text for `dest[dest_start..dest_end)`.
  fn filter(
    &self,
    source: &str,
    dest: &SpanBuffer,
    dest_start: usize,
    dest_end: usize,
  ) -> Option<Tendril>;
}

/// Uppercases everything typed into the buffer.
pub struct AllCaps;

impl InputFilter for AllCaps {
  fn filter(
    &self,
    source: &str,
    _dest: &SpanBuffer,
    _dest_start: usize,
    _dest_end: usize,
  ) -> Option<Tendril> {
    if source.chars().any(char::is_lowercase) {
      Some(Tendril::from(source.to_uppercase()))
    } else {
      None
    }
  }
}

/// Caps the buffer at `max` characters by truncating incoming text.
pub struct LengthFilter {
  max: usize,
}

impl LengthFilter {
  pub fn new(max: usize) -> Self {
    Self { max }
  }
}

impl InputFilter for LengthFilter {
  fn filter(
    &self,
    source: &str,
    dest: &SpanBuffer,
    dest_start: usize,
    dest_end: usize,
  ) -> Option<Tendril> {
    // Characters the destination keeps outside the replaced region.
    let kept = dest.len_chars() - (dest_end - dest_start);
    let room = self.max.saturating_sub(kept);

    if source.chars().count() <= room {
      return None;
    }

    Some(Tendril::from(
      source.chars().take(room).collect::<String>(),
    ))
  }
}
