//! Ordered field resolution.
//!
//! Each result field that can come from more than one place is resolved by
//! a priority list of `(origin, candidate)` pairs. The first present
//! candidate wins and its origin is kept for the trace.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FieldOrigin {
    Record,
    Inheritance,
    Heuristic,
    PolicyDefault,
    Derived,
}

impl FieldOrigin {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Record => "record",
            Self::Inheritance => "inheritance",
            Self::Heuristic => "heuristic",
            Self::PolicyDefault => "policy_default",
            Self::Derived => "derived",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct ResolvedField<T> {
    pub value: T,
    pub origin: FieldOrigin,
}

/// First present candidate in priority order, or `None` when every source is empty.
#[must_use]
pub fn resolve_field<T, I>(candidates: I) -> Option<ResolvedField<T>>
where
    I: IntoIterator<Item = (FieldOrigin, Option<T>)>,
{
    candidates
        .into_iter()
        .find_map(|(origin, value)| value.map(|value| ResolvedField { value, origin }))
}

/// Like [`resolve_field`], treating empty collections as absent.
pub(crate) fn resolve_non_empty<T, I>(candidates: I) -> Option<ResolvedField<Vec<T>>>
where
    I: IntoIterator<Item = (FieldOrigin, Option<Vec<T>>)>,
{
    resolve_field(
        candidates
            .into_iter()
            .map(|(origin, value)| (origin, value.filter(|items| !items.is_empty()))),
    )
}
