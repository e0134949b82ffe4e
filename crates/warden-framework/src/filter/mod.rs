//! Event filters.
//!
//! A listener runs only when its filter passes. Filters come in three
//! layers:
//!
//! - [`TargetFilter`]: a structural pre-filter over identity fields
//!   (component, bot, author, group, channel, guild, mention).
//! - [`Filter`]: a target filter, an optional [`Keyword`] compared against
//!   the event text by a [`MatchType`], an optional custom [`EventFilter`]
//!   predicate, and at most one AND-sibling and one OR-sibling.
//! - [`FilterGroup`]: a list of filters combined by a [`MultiMatchType`].
//!
//! A filter whose own test fails with an error or panics counts as `false`
//! for that filter only; the failure is logged and evaluation of sibling
//! filters and other listeners continues.
//!
//! # Example
//!
//! ```rust,ignore
//! let filter = Filter::builder()
//!     .target(TargetFilter::new().group("g1"))
//!     .value("ban {{target}}")
//!     .match_type(MatchType::RegexFind)
//!     .or(Filter::builder().value("kick {{target}}").build()?)
//!     .build()?;
//! ```

mod group;
mod spec;
mod target;

pub use group::{FilterGroup, MultiMatchType};
pub use spec::{FilterGroupSpec, FilterSpec};
pub use target::TargetFilter;

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::warn;
use warden_core::Event;

use crate::context::DispatchContext;
use crate::error::{BoxError, FilterError, KeywordResult, panic_message};
use crate::keyword::Keyword;
use crate::matcher::MatchType;
use crate::priority::Priority;

// =============================================================================
// EventFilter: custom predicates
// =============================================================================

/// A custom predicate over one event.
///
/// Implement this for filters that need more than target and keyword
/// matching, such as permission lookups. Returning `Err` counts as `false`.
#[async_trait]
pub trait EventFilter: Send + Sync {
    async fn test(&self, ctx: &DispatchContext) -> Result<bool, BoxError>;
}

/// An [`EventFilter`] backed by a synchronous closure.
pub struct FilterFn<F>(F);

/// Wraps a closure as an [`EventFilter`].
///
/// ```rust,ignore
/// let admins_only = filter_fn(|ctx| Ok(ctx.event().author_id() == Some("admin")));
/// ```
pub fn filter_fn<F>(f: F) -> FilterFn<F>
where
    F: Fn(&DispatchContext) -> Result<bool, BoxError> + Send + Sync + 'static,
{
    FilterFn(f)
}

#[async_trait]
impl<F> EventFilter for FilterFn<F>
where
    F: Fn(&DispatchContext) -> Result<bool, BoxError> + Send + Sync + 'static,
{
    async fn test(&self, ctx: &DispatchContext) -> Result<bool, BoxError> {
        (self.0)(ctx)
    }
}

/// Extracts the text a keyword is matched against.
pub type ContentSelector = Arc<dyn Fn(&dyn Event) -> Option<String> + Send + Sync>;

fn default_selector() -> ContentSelector {
    Arc::new(|event: &dyn Event| event.plain_text())
}

// =============================================================================
// Filter
// =============================================================================

/// A single filter node with optional AND/OR siblings.
///
/// Evaluation order of the node's own test is fixed: target, keyword,
/// custom predicate. The result then combines with the siblings as
/// `(self && and) || or`, with AND binding tighter than OR.
#[derive(Clone)]
pub struct Filter {
    target: TargetFilter,
    keyword: Option<Keyword>,
    match_type: MatchType,
    if_null_pass: bool,
    selector: ContentSelector,
    predicate: Option<Arc<dyn EventFilter>>,
    and: Option<Box<Filter>>,
    or: Option<Box<Filter>>,
    priority: i32,
}

impl Filter {
    /// Starts building a filter.
    pub fn builder() -> FilterBuilder {
        FilterBuilder::default()
    }

    /// Returns a filter that passes every event.
    pub fn always() -> Self {
        FilterBuilder::default().into_filter(None)
    }

    /// Returns a filter that delegates entirely to `predicate`.
    pub fn predicate(predicate: impl EventFilter + 'static) -> Self {
        let mut filter = Self::always();
        filter.predicate = Some(Arc::new(predicate));
        filter
    }

    pub fn target(&self) -> &TargetFilter {
        &self.target
    }

    pub fn keyword(&self) -> Option<&Keyword> {
        self.keyword.as_ref()
    }

    pub fn match_type(&self) -> MatchType {
        self.match_type
    }

    pub fn if_null_pass(&self) -> bool {
        self.if_null_pass
    }

    /// Returns the priority used when this filter is a member of a group.
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Returns `true` if this node constrains nothing and has no siblings.
    pub fn is_trivial(&self) -> bool {
        self.target.is_unconstrained()
            && self.keyword.is_none()
            && self.predicate.is_none()
            && self.and.is_none()
            && self.or.is_none()
    }

    /// Evaluates this filter tree against the event.
    pub fn evaluate<'a>(&'a self, ctx: &'a DispatchContext) -> BoxFuture<'a, bool> {
        async move {
            let own = self.test_guarded(ctx).await;
            let with_and = match &self.and {
                Some(and) if own => and.evaluate(ctx).await,
                Some(_) => false,
                None => own,
            };
            match &self.or {
                Some(or) if !with_and => or.evaluate(ctx).await,
                _ => with_and,
            }
        }
        .boxed()
    }

    /// Appends the keywords of this tree in declaration order: this node,
    /// then the AND subtree, then the OR subtree.
    pub fn collect_keywords(&self, out: &mut Vec<Keyword>) {
        if let Some(keyword) = &self.keyword {
            out.push(keyword.clone());
        }
        if let Some(and) = &self.and {
            and.collect_keywords(out);
        }
        if let Some(or) = &self.or {
            or.collect_keywords(out);
        }
    }

    async fn test_guarded(&self, ctx: &DispatchContext) -> bool {
        let failure = match AssertUnwindSafe(self.test_own(ctx)).catch_unwind().await {
            Ok(Ok(passed)) => return passed,
            Ok(Err(err)) => FilterError::Failed(err),
            Err(payload) => FilterError::Panicked(panic_message(&*payload)),
        };
        warn!(error = %failure, "Filter evaluation failed, treating as false");
        false
    }

    async fn test_own(&self, ctx: &DispatchContext) -> Result<bool, BoxError> {
        let event: &dyn Event = &**ctx.event();

        if !self.target.test(event) {
            return Ok(false);
        }

        if let Some(keyword) = &self.keyword {
            let passed = match (self.selector)(event) {
                Some(text) if !text.trim().is_empty() => self.match_type.matches(&text, keyword),
                _ => self.if_null_pass,
            };
            if !passed {
                return Ok(false);
            }
        }

        match &self.predicate {
            Some(predicate) => predicate.test(ctx).await,
            None => Ok(true),
        }
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter")
            .field("target", &self.target)
            .field("keyword", &self.keyword)
            .field("match_type", &self.match_type)
            .field("if_null_pass", &self.if_null_pass)
            .field("has_predicate", &self.predicate.is_some())
            .field("and", &self.and)
            .field("or", &self.or)
            .field("priority", &self.priority)
            .finish()
    }
}

impl Default for Filter {
    fn default() -> Self {
        Self::always()
    }
}

// =============================================================================
// FilterBuilder
// =============================================================================

/// Builder for [`Filter`].
#[derive(Clone)]
pub struct FilterBuilder {
    target: TargetFilter,
    value: String,
    literal: bool,
    case_sensitive: bool,
    match_type: MatchType,
    if_null_pass: bool,
    selector: Option<ContentSelector>,
    predicate: Option<Arc<dyn EventFilter>>,
    and: Option<Filter>,
    or: Option<Filter>,
    priority: i32,
}

impl Default for FilterBuilder {
    fn default() -> Self {
        Self {
            target: TargetFilter::default(),
            value: String::new(),
            literal: false,
            case_sensitive: true,
            match_type: MatchType::default(),
            if_null_pass: false,
            selector: None,
            predicate: None,
            and: None,
            or: None,
            priority: Priority::LOWEST,
        }
    }
}

impl FilterBuilder {
    pub fn target(mut self, target: TargetFilter) -> Self {
        self.target = target;
        self
    }

    /// Sets the keyword text. An empty value means no keyword constraint.
    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    /// Treats the value's non-placeholder text literally.
    pub fn literal(mut self, literal: bool) -> Self {
        self.literal = literal;
        self
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn match_type(mut self, match_type: MatchType) -> Self {
        self.match_type = match_type;
        self
    }

    /// Sets the outcome of the keyword test when the event has no text.
    pub fn if_null_pass(mut self, if_null_pass: bool) -> Self {
        self.if_null_pass = if_null_pass;
        self
    }

    /// Replaces the default `plain_text` content selector.
    pub fn selector<F>(mut self, selector: F) -> Self
    where
        F: Fn(&dyn Event) -> Option<String> + Send + Sync + 'static,
    {
        self.selector = Some(Arc::new(selector));
        self
    }

    pub fn predicate(mut self, predicate: impl EventFilter + 'static) -> Self {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    pub fn and(mut self, filter: Filter) -> Self {
        self.and = Some(filter);
        self
    }

    pub fn or(mut self, filter: Filter) -> Self {
        self.or = Some(filter);
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Compiles the keyword, if any, and builds the filter.
    pub fn build(self) -> KeywordResult<Filter> {
        let keyword = if self.value.is_empty() {
            None
        } else {
            Some(
                Keyword::builder(self.value.clone())
                    .case_sensitive(self.case_sensitive)
                    .literal(self.literal)
                    .build()?,
            )
        };
        Ok(self.into_filter(keyword))
    }

    fn into_filter(self, keyword: Option<Keyword>) -> Filter {
        Filter {
            target: self.target,
            keyword,
            match_type: self.match_type,
            if_null_pass: self.if_null_pass,
            selector: self.selector.unwrap_or_else(default_selector),
            predicate: self.predicate,
            and: self.and.map(Box::new),
            or: self.or.map(Box::new),
            priority: self.priority,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::any::Any;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use warden_core::{BoxedEvent, RichTextSegment};

    use super::*;

    #[derive(Default)]
    pub(crate) struct TextEvent {
        pub text: Option<String>,
        pub group: Option<String>,
    }

    impl TextEvent {
        pub(crate) fn text(text: &str) -> Self {
            Self {
                text: Some(text.to_string()),
                group: None,
            }
        }
    }

    impl Event for TextEvent {
        fn event_name(&self) -> &'static str {
            "text"
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn group_id(&self) -> Option<&str> {
            self.group.as_deref()
        }

        fn segments(&self) -> Vec<RichTextSegment> {
            self.text.iter().map(RichTextSegment::text).collect()
        }
    }

    pub(crate) fn ctx(event: TextEvent) -> DispatchContext {
        DispatchContext::new(BoxedEvent::new(event))
    }

    pub(crate) fn constant(value: bool) -> Filter {
        Filter::predicate(filter_fn(move |_| Ok(value)))
    }

    fn counting(value: bool, counter: Arc<AtomicUsize>) -> Filter {
        Filter::predicate(filter_fn(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(value)
        }))
    }

    #[tokio::test]
    async fn test_trivial_filter_passes() {
        let filter = Filter::always();
        assert!(filter.is_trivial());
        assert!(filter.evaluate(&ctx(TextEvent::default())).await);
    }

    #[tokio::test]
    async fn test_keyword_match() {
        let filter = Filter::builder()
            .value("hello")
            .match_type(MatchType::Contains)
            .build()
            .unwrap();
        assert!(filter.evaluate(&ctx(TextEvent::text("hello world"))).await);
        assert!(!filter.evaluate(&ctx(TextEvent::text("goodbye"))).await);
    }

    #[tokio::test]
    async fn test_if_null_pass() {
        let passing = Filter::builder()
            .value("hello")
            .if_null_pass(true)
            .build()
            .unwrap();
        let failing = Filter::builder().value("hello").build().unwrap();

        for event in [TextEvent::default(), TextEvent::text("   ")] {
            let ctx = ctx(event);
            assert!(passing.evaluate(&ctx).await);
            assert!(!failing.evaluate(&ctx).await);
        }
    }

    #[tokio::test]
    async fn test_target_checked_before_keyword() {
        let filter = Filter::builder()
            .target(TargetFilter::new().group("g1"))
            .value("hi")
            .build()
            .unwrap();
        let wrong_group = TextEvent {
            text: Some("hi".into()),
            group: Some("g2".into()),
        };
        let right_group = TextEvent {
            text: Some("hi".into()),
            group: Some("g1".into()),
        };
        assert!(!filter.evaluate(&ctx(wrong_group)).await);
        assert!(filter.evaluate(&ctx(right_group)).await);
    }

    #[tokio::test]
    async fn test_and_or_formula() {
        for own in [false, true] {
            for and in [false, true] {
                for or in [false, true] {
                    let filter = Filter::builder()
                        .predicate(filter_fn(move |_| Ok(own)))
                        .and(constant(and))
                        .or(constant(or))
                        .build()
                        .unwrap();
                    let got = filter.evaluate(&ctx(TextEvent::default())).await;
                    assert_eq!(got, (own && and) || or, "own={own} and={and} or={or}");
                }
            }
        }
    }

    #[tokio::test]
    async fn test_and_short_circuits() {
        let counter = Arc::new(AtomicUsize::new(0));
        let filter = Filter::builder()
            .predicate(filter_fn(|_| Ok(false)))
            .and(counting(true, counter.clone()))
            .build()
            .unwrap();
        assert!(!filter.evaluate(&ctx(TextEvent::default())).await);
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failing_filter_is_false() {
        let erroring = Filter::predicate(filter_fn(|_| Err("boom".into())));
        let panicking = Filter::predicate(filter_fn(|_| panic!("filter bug")));
        let ctx = ctx(TextEvent::default());
        assert!(!erroring.evaluate(&ctx).await);
        assert!(!panicking.evaluate(&ctx).await);

        let recovered = Filter::builder()
            .predicate(filter_fn(|_| Err("boom".into())))
            .or(constant(true))
            .build()
            .unwrap();
        assert!(recovered.evaluate(&ctx).await);
    }

    #[tokio::test]
    async fn test_custom_selector() {
        let filter = Filter::builder()
            .value("g1")
            .match_type(MatchType::Equals)
            .selector(|event| event.group_id().map(str::to_string))
            .build()
            .unwrap();
        let event = TextEvent {
            text: None,
            group: Some("g1".into()),
        };
        assert!(filter.evaluate(&ctx(event)).await);
    }

    #[test]
    fn test_collect_keywords_order() {
        let filter = Filter::builder()
            .value("a")
            .and(
                Filter::builder()
                    .value("b")
                    .or(Filter::builder().value("c").build().unwrap())
                    .build()
                    .unwrap(),
            )
            .or(Filter::builder().value("d").build().unwrap())
            .build()
            .unwrap();
        let mut keywords = Vec::new();
        filter.collect_keywords(&mut keywords);
        let texts: Vec<_> = keywords.iter().map(Keyword::text).collect();
        assert_eq!(texts, ["a", "b", "c", "d"]);
    }
}
