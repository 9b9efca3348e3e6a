//! Rank → dedup → present.
//!
//! Candidates from every source go through the ranker, whose order is
//! authoritative. The first candidate for each replacement text survives;
//! later ones are dropped. Records are produced one at a time as the ranker
//! yields, so the full ranked list is never materialized here.

use std::collections::HashSet;
use std::error::Error;
use std::fmt;

use uuid::Uuid;

use crate::completion::{Completion, Context, DisplayRecord};
use crate::settings::{MatchOptions, Settings, Weights};

/// Failure reported by a ranker. Passed through `present` untouched.
#[derive(Debug)]
pub struct RankError(Box<dyn Error + Send + Sync>);

impl RankError {
    pub fn new(source: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        Self(source.into())
    }

    pub fn into_inner(self) -> Box<dyn Error + Send + Sync> {
        self.0
    }
}

impl fmt::Display for RankError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ranking failed: {}", self.0)
    }
}

impl Error for RankError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&*self.0)
    }
}

/// Ranked candidates, pulled lazily.
pub type Ranked<'a> = Box<dyn Iterator<Item = Result<Completion, RankError>> + 'a>;

/// The ranking collaborator. `D` is the read-only store handle it may
/// consult.
pub trait Ranker<D: ?Sized> {
    fn rank<'a>(
        &'a self,
        options: &'a MatchOptions,
        weights: &'a Weights,
        db: &'a D,
        context: &'a Context,
        completions: Vec<Completion>,
    ) -> Ranked<'a>;
}

/// Identity ranker: keeps the order candidates arrived in.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputOrder;

impl<D: ?Sized> Ranker<D> for InputOrder {
    fn rank<'a>(
        &'a self,
        _options: &'a MatchOptions,
        _weights: &'a Weights,
        _db: &'a D,
        _context: &'a Context,
        completions: Vec<Completion>,
    ) -> Ranked<'a> {
        Box::new(completions.into_iter().map(Ok::<_, RankError>))
    }
}

/// Settings plus the store handle the ranker reads from.
pub struct Stack<'a, D: ?Sized> {
    pub settings: &'a Settings,
    pub db: &'a D,
}

/// Shape `completions` into menu records for the request in `context`.
pub fn present<'a, D, R>(
    stack: &Stack<'a, D>,
    ranker: &'a R,
    context: &'a Context,
    completions: Vec<Completion>,
) -> Present<'a>
where
    D: ?Sized,
    R: Ranker<D> + ?Sized,
{
    let ranked = ranker.rank(
        &stack.settings.match_options,
        &stack.settings.weights,
        stack.db,
        context,
        completions,
    );
    Present {
        ranked,
        seen: HashSet::new(),
        ctx_uid: context.uid,
    }
}

/// Iterator returned by [`present`].
pub struct Present<'a> {
    ranked: Ranked<'a>,
    seen: HashSet<String>,
    ctx_uid: Uuid,
}

impl Iterator for Present<'_> {
    type Item = Result<DisplayRecord, RankError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let cmp = match self.ranked.next()? {
                Ok(cmp) => cmp,
                Err(e) => return Some(Err(e)),
            };
            if !self.seen.contains(&cmp.primary_edit.new_text) {
                self.seen.insert(cmp.primary_edit.new_text.clone());
                return Some(Ok(DisplayRecord::for_request(self.ctx_uid, cmp)));
            }
        }
    }
}
