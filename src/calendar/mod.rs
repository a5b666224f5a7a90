//! Infinite calendar: a lazily extended run of days, the entries filed under
//! each of them, and the scroll bookkeeping that keeps the view steady while
//! days are spliced in at either end.
//!
//! Nothing here reads the clock or touches a terminal. "Today" is passed in
//! and the scroll surface is reached through [`Viewport`].

pub mod anchor;
pub mod day_cell;
pub mod index;
pub mod scroll;
pub mod weeks;
pub mod window;

pub use anchor::InitialAnchorScroller;
pub use day_cell::{category_for, tokenize, DayCell, DayIntent, TextToken};
pub use index::EntryIndex;
pub use scroll::{ScrollCoordinator, ScrollMetrics, Viewport};
pub use weeks::{group_weeks, week_label, DAYS_PER_WEEK};
pub use window::{week_start, DayWindow, Direction, Extension, ExtensionState};
