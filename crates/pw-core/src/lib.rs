//! Pane word completion core.
//!
//! Holds the completion domain model, the pure text functions bound into the
//! word store's SQL engine, the pane-text tokenizer, settings, and the
//! rank → dedup → present transform that turns candidates into menu records.
//!
//! Zero I/O: the store and the host live in other crates.

pub mod completion;
pub mod settings;
pub mod text;
pub mod tokenizer;
pub mod transform;

pub use completion::{Completion, Context, DisplayRecord, Doc, Edit, Position, TextRange, UserData};
pub use settings::{MatchOptions, Settings, SettingsError, StoreSettings, Weights};
pub use text::{ESCAPE_CHAR, collate, like_escape, lower, normalize};
pub use tokenizer::{DEFAULT_UNIFYING_CHARS, coalesce};
pub use transform::{InputOrder, Present, RankError, Ranked, Ranker, Stack, present};
