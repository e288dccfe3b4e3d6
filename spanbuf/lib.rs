use smartstring::{LazyCompact, SmartString};

pub mod buffer;
pub mod filter;
pub mod reposition;
pub mod span;
pub mod watch;

pub type Tendril = SmartString<LazyCompact>;
