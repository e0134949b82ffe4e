//! N-ary filter combinators.

use serde::{Deserialize, Serialize};

use super::Filter;
use crate::context::DispatchContext;
use crate::keyword::Keyword;

/// How the members of a [`FilterGroup`] combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MultiMatchType {
    /// Every filter passes.
    #[default]
    All,
    /// At least one filter passes.
    Any,
    /// At least one filter fails.
    AnyNo,
    /// Every filter fails.
    None,
}

/// A list of filters combined by a [`MultiMatchType`].
///
/// Members are evaluated in ascending [`Filter::priority`] order (ties keep
/// declaration order) and evaluation stops as soon as the outcome is known.
/// The priority only affects short-circuiting, never which listener the
/// group belongs to. Keywords are still collected in declaration order.
#[derive(Debug, Clone, Default)]
pub struct FilterGroup {
    match_type: MultiMatchType,
    filters: Vec<Filter>,
    /// Indices into `filters`, sorted by priority.
    order: Vec<usize>,
}

impl FilterGroup {
    pub fn new(match_type: MultiMatchType) -> Self {
        Self {
            match_type,
            filters: Vec::new(),
            order: Vec::new(),
        }
    }

    /// Adds a member filter.
    pub fn with(mut self, filter: Filter) -> Self {
        self.push(filter);
        self
    }

    pub fn push(&mut self, filter: Filter) {
        let priority = filter.priority();
        let index = self.filters.len();
        self.filters.push(filter);
        let pos = self
            .order
            .partition_point(|&i| self.filters[i].priority() <= priority);
        self.order.insert(pos, index);
    }

    pub fn match_type(&self) -> MultiMatchType {
        self.match_type
    }

    /// Returns the members in declaration order.
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Evaluates the group against the event.
    ///
    /// An empty group is vacuous: `All` and `None` pass, `Any` and `AnyNo`
    /// fail.
    pub async fn evaluate(&self, ctx: &DispatchContext) -> bool {
        // (value that decides the outcome, outcome when it is seen)
        let (decisive, outcome) = match self.match_type {
            MultiMatchType::All => (false, false),
            MultiMatchType::Any => (true, true),
            MultiMatchType::AnyNo => (false, true),
            MultiMatchType::None => (true, false),
        };

        for &index in &self.order {
            if self.filters[index].evaluate(ctx).await == decisive {
                return outcome;
            }
        }
        !outcome
    }

    /// Appends the keywords of every member in declaration order.
    pub fn collect_keywords(&self, out: &mut Vec<Keyword>) {
        for filter in &self.filters {
            filter.collect_keywords(out);
        }
    }
}
