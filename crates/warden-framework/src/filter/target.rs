//! Structural pre-filter over event identity fields.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use warden_core::Event;

/// Restricts a filter to events from particular sources.
///
/// Each dimension is a set of accepted ids. An empty set means the dimension
/// is unconstrained. Dimensions are checked in a fixed order (component, bot,
/// author, group, channel, guild, then the mention flag) and the first
/// failing dimension short-circuits the whole check.
///
/// An event that does not carry a constrained field (for example, a private
/// message checked against `groups`) fails that dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetFilter {
    pub components: HashSet<String>,
    pub bots: HashSet<String>,
    pub authors: HashSet<String>,
    pub groups: HashSet<String>,
    pub channels: HashSet<String>,
    pub guilds: HashSet<String>,
    /// Requires the event to mention the receiving bot.
    pub at_bot: bool,
}

fn dimension_passes(accepted: &HashSet<String>, value: Option<&str>) -> bool {
    accepted.is_empty() || value.is_some_and(|v| accepted.contains(v))
}

impl TargetFilter {
    /// Creates an unconstrained target filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if no dimension is constrained.
    pub fn is_unconstrained(&self) -> bool {
        self.components.is_empty()
            && self.bots.is_empty()
            && self.authors.is_empty()
            && self.groups.is_empty()
            && self.channels.is_empty()
            && self.guilds.is_empty()
            && !self.at_bot
    }

    /// Checks `event` against every configured dimension.
    pub fn test(&self, event: &dyn Event) -> bool {
        dimension_passes(&self.components, event.component())
            && dimension_passes(&self.bots, event.bot_id())
            && dimension_passes(&self.authors, event.author_id())
            && dimension_passes(&self.groups, event.group_id())
            && dimension_passes(&self.channels, event.channel_id())
            && dimension_passes(&self.guilds, event.guild_id())
            && (!self.at_bot || event.mentions_bot())
    }

    pub fn component(mut self, id: impl Into<String>) -> Self {
        self.components.insert(id.into());
        self
    }

    pub fn bot(mut self, id: impl Into<String>) -> Self {
        self.bots.insert(id.into());
        self
    }

    pub fn author(mut self, id: impl Into<String>) -> Self {
        self.authors.insert(id.into());
        self
    }

    pub fn group(mut self, id: impl Into<String>) -> Self {
        self.groups.insert(id.into());
        self
    }

    pub fn channel(mut self, id: impl Into<String>) -> Self {
        self.channels.insert(id.into());
        self
    }

    pub fn guild(mut self, id: impl Into<String>) -> Self {
        self.guilds.insert(id.into());
        self
    }

    /// Requires (or stops requiring) a mention of the receiving bot.
    pub fn at_bot(mut self, at_bot: bool) -> Self {
        self.at_bot = at_bot;
        self
    }
}
