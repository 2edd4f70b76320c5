//! Visible-list filter: free-text search plus department and status scopes.
//!
//! Pure and stable: the output keeps the input order and the input is never
//! touched, so applying the same filter to its own output is a no-op.

use serde::{Deserialize, Serialize};

use super::model::{Correspondence, Department, Status};

/// Either the `all` wildcard or a single value that must match exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope<T> {
    All,
    Only(T),
}

impl<T> Default for Scope<T> {
    fn default() -> Self {
        Self::All
    }
}

impl<T: PartialEq> Scope<T> {
    /// Does `value` fall inside this scope?
    pub fn admits(&self, value: &T) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => wanted == value,
        }
    }
}

impl<T: std::fmt::Display> std::fmt::Display for Scope<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Only(value) => write!(f, "{}", value),
        }
    }
}

impl<T: std::str::FromStr<Err = String>> std::str::FromStr for Scope<T> {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "all" {
            Ok(Self::All)
        } else {
            s.parse().map(Self::Only)
        }
    }
}

impl<T: std::fmt::Display> Serialize for Scope<T> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de, T: std::str::FromStr<Err = String>> Deserialize<'de> for Scope<T> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// The three list controls, ANDed together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboxFilter {
    /// Case-insensitive substring matched against subject, sender and body.
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub department: Scope<Department>,
    #[serde(default)]
    pub status: Scope<Status>,
}

impl InboxFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    pub fn with_department(mut self, department: Department) -> Self {
        self.department = Scope::Only(department);
        self
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = Scope::Only(status);
        self
    }

    /// Does a single item pass all three predicates?
    pub fn matches(&self, item: &Correspondence) -> bool {
        self.passes(&self.query.to_lowercase(), item)
    }

    /// `needle` is the already lower-cased query.
    fn passes(&self, needle: &str, item: &Correspondence) -> bool {
        let query_hit = needle.is_empty()
            || item.subject.to_lowercase().contains(needle)
            || item.sender.to_lowercase().contains(needle)
            || item.body.to_lowercase().contains(needle);

        query_hit && self.department.admits(&item.department) && self.status.admits(&item.status)
    }

    /// Borrowing variant of [`visible`].
    pub fn apply<'a>(&self, items: &'a [Correspondence]) -> Vec<&'a Correspondence> {
        let needle = self.query.to_lowercase();
        items
            .iter()
            .filter(|item| self.passes(&needle, item))
            .collect()
    }
}

/// Derive the visible list: items passing `filter`, in their original order.
pub fn visible(items: &[Correspondence], filter: &InboxFilter) -> Vec<Correspondence> {
    filter.apply(items).into_iter().cloned().collect()
}
