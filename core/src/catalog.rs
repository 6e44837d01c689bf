//! Ticket catalog filter pipeline.
//!
//! `search → date bucket → competition → price range → availability → sort`
//!
//! The pipeline is a pure function of the ticket list, the filter, and the
//! current time. It is re-run on every input change; list sizes are small
//! enough that nothing is memoized.

use crate::types::{Money, Ticket};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which fixtures to show relative to "now"
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DateBucket {
    /// Every fixture
    #[default]
    All,
    /// Kick-off at or after now
    Upcoming,
    /// Kick-off before now
    Past,
}

/// Stock filter
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Availability {
    /// Every listing
    #[default]
    All,
    /// At least one ticket left
    Available,
    /// No tickets left
    SoldOut,
}

/// Result ordering
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    /// Earliest kick-off first
    #[default]
    DateAsc,
    /// Latest kick-off first
    DateDesc,
    /// Cheapest first
    PriceLowToHigh,
    /// Most expensive first
    PriceHighToLow,
}

/// Inclusive price bounds; either side may be open.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRange {
    /// Lower bound (inclusive)
    pub min: Option<Money>,
    /// Upper bound (inclusive)
    pub max: Option<Money>,
}

impl PriceRange {
    /// Both bounds set
    #[must_use]
    pub const fn between(min: Money, max: Money) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    /// True if `price` lies within the bounds
    #[must_use]
    pub fn contains(&self, price: Money) -> bool {
        self.min.is_none_or(|min| price >= min) && self.max.is_none_or(|max| price <= max)
    }
}

/// Every input of the catalog view besides the ticket list.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogFilter {
    /// Free-text search
    pub search: String,
    /// Fixture date bucket
    pub date_bucket: DateBucket,
    /// Competition name; `None` for all competitions
    pub competition: Option<String>,
    /// Price bounds
    pub price: PriceRange,
    /// Stock filter
    pub availability: Availability,
    /// Ordering
    pub sort: SortKey,
}

impl CatalogFilter {
    /// Case-insensitive match against teams (joined by a space), location and competition
    #[must_use]
    pub fn matches_search(&self, ticket: &Ticket) -> bool {
        let needle = self.search.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        let fixture = &ticket.fixture;
        [
            fixture.teams_label(),
            fixture.location.clone(),
            fixture.competition.clone(),
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
    }

    /// Date bucket check against `now`
    #[must_use]
    pub fn matches_date(&self, ticket: &Ticket, now: DateTime<Utc>) -> bool {
        match self.date_bucket {
            DateBucket::All => true,
            DateBucket::Upcoming => ticket.fixture.event_date >= now,
            DateBucket::Past => ticket.fixture.event_date < now,
        }
    }

    /// Exact competition name check
    #[must_use]
    pub fn matches_competition(&self, ticket: &Ticket) -> bool {
        self.competition
            .as_deref()
            .is_none_or(|competition| ticket.fixture.competition == competition)
    }

    /// Stock check
    #[must_use]
    pub const fn matches_availability(&self, ticket: &Ticket) -> bool {
        match self.availability {
            Availability::All => true,
            Availability::Available => ticket.available_tickets > 0,
            Availability::SoldOut => ticket.available_tickets == 0,
        }
    }

    /// All predicates combined
    #[must_use]
    pub fn matches(&self, ticket: &Ticket, now: DateTime<Utc>) -> bool {
        self.matches_search(ticket)
            && self.matches_date(ticket, now)
            && self.matches_competition(ticket)
            && self.price.contains(ticket.price)
            && self.matches_availability(ticket)
    }
}

/// Run the pipeline: filter, then stable-sort.
///
/// Every element of the result is a reference into `tickets`; ties keep
/// their input order.
#[must_use]
pub fn apply<'a>(tickets: &'a [Ticket], filter: &CatalogFilter, now: DateTime<Utc>) -> Vec<&'a Ticket> {
    let mut result: Vec<&Ticket> = tickets.iter().filter(|t| filter.matches(t, now)).collect();
    sort(&mut result, filter.sort);
    result
}

/// Stable sort by the given key
pub fn sort(tickets: &mut [&Ticket], key: SortKey) {
    match key {
        SortKey::DateAsc => tickets.sort_by_key(|t| t.fixture.event_date),
        SortKey::DateDesc => tickets.sort_by(|a, b| b.fixture.event_date.cmp(&a.fixture.event_date)),
        SortKey::PriceLowToHigh => tickets.sort_by_key(|t| t.price),
        SortKey::PriceHighToLow => tickets.sort_by(|a, b| b.price.cmp(&a.price)),
    }
}

/// Distinct competition names in the list, sorted, for the competition dropdown
#[must_use]
pub fn competitions(tickets: &[Ticket]) -> Vec<String> {
    let mut names: Vec<String> = tickets.iter().map(|t| t.fixture.competition.clone()).collect();
    names.sort();
    names.dedup();
    names
}
