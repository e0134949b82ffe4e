//! Declarative filter descriptions.
//!
//! [`FilterSpec`] and [`FilterGroupSpec`] mirror [`Filter`] and
//! [`FilterGroup`] as plain serde data, so filters can be declared in
//! configuration files:
//!
//! ```toml
//! [[filters]]
//! value = "ban {{target}}"
//! match_type = "regex_find"
//! target = { groups = ["g1"] }
//!
//! [filters.or]
//! value = "kick {{target}}"
//! match_type = "regex_find"
//! ```

use serde::{Deserialize, Serialize};

use super::{Filter, FilterGroup, MultiMatchType, TargetFilter};
use crate::error::KeywordResult;
use crate::matcher::MatchType;
use crate::priority::Priority;

/// Serializable description of a [`Filter`] tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSpec {
    pub target: TargetFilter,
    /// Keyword text; empty means no keyword constraint.
    pub value: String,
    pub match_type: MatchType,
    pub if_null_pass: bool,
    pub case_sensitive: bool,
    pub literal: bool,
    pub priority: i32,
    pub and: Option<Box<FilterSpec>>,
    pub or: Option<Box<FilterSpec>>,
}

impl Default for FilterSpec {
    fn default() -> Self {
        Self {
            target: TargetFilter::default(),
            value: String::new(),
            match_type: MatchType::default(),
            if_null_pass: false,
            case_sensitive: true,
            literal: false,
            priority: Priority::LOWEST,
            and: None,
            or: None,
        }
    }
}

impl FilterSpec {
    /// Compiles this description into a [`Filter`].
    pub fn build(&self) -> KeywordResult<Filter> {
        let mut builder = Filter::builder()
            .target(self.target.clone())
            .value(self.value.clone())
            .match_type(self.match_type)
            .if_null_pass(self.if_null_pass)
            .case_sensitive(self.case_sensitive)
            .literal(self.literal)
            .priority(self.priority);
        if let Some(and) = &self.and {
            builder = builder.and(and.build()?);
        }
        if let Some(or) = &self.or {
            builder = builder.or(or.build()?);
        }
        builder.build()
    }
}

/// Serializable description of a [`FilterGroup`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterGroupSpec {
    pub match_type: MultiMatchType,
    pub filters: Vec<FilterSpec>,
}

impl FilterGroupSpec {
    pub fn build(&self) -> KeywordResult<FilterGroup> {
        self.filters
            .iter()
            .try_fold(FilterGroup::new(self.match_type), |group, spec| {
                Ok(group.with(spec.build()?))
            })
    }
}
