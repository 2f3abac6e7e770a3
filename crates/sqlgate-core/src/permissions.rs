//! Permission categories and grants.
//!
//! A [`Grant`] is the ordered set of SQL operation categories a session is
//! allowed to execute. Grants are never empty; a session that does not ask
//! for anything gets `{read}`.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Coarse SQL operation category, derived lexically from statement text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Read,
    Ddl,
    Dml,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Read => "read",
            Category::Ddl => "ddl",
            Category::Dml => "dml",
        }
    }

    /// Parse a single grant token, case-insensitively.
    pub fn parse_token(token: &str) -> Result<Self, CoreError> {
        match token.trim().to_ascii_lowercase().as_str() {
            "read" => Ok(Category::Read),
            "ddl" => Ok(Category::Ddl),
            "dml" => Ok(Category::Dml),
            other => Err(CoreError::InvalidPermission(other.to_string())),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An ordered set of granted categories. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant(BTreeSet<Category>);

impl Default for Grant {
    fn default() -> Self {
        Self::read_only()
    }
}

impl Grant {
    /// The `{read}` grant used when no permissions are requested.
    pub fn read_only() -> Self {
        let mut set = BTreeSet::new();
        set.insert(Category::Read);
        Self(set)
    }

    /// Build a grant from explicit categories. Fails on an empty set.
    pub fn new(categories: impl IntoIterator<Item = Category>) -> Result<Self, CoreError> {
        let set: BTreeSet<Category> = categories.into_iter().collect();
        if set.is_empty() {
            return Err(CoreError::EmptyGrant);
        }
        Ok(Self(set))
    }

    /// Parse a comma-separated grant list such as `"Read, DML"`.
    ///
    /// Tokens are case-insensitive and duplicates collapse. An unknown token
    /// fails the whole grant; there are no partial grants. A list with no
    /// valid tokens at all is also an error (grants are never empty).
    pub fn parse(input: &str) -> Result<Self, CoreError> {
        let mut set = BTreeSet::new();
        for token in input.split(',') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            set.insert(Category::parse_token(token)?);
        }
        if set.is_empty() {
            return Err(CoreError::EmptyGrant);
        }
        Ok(Self(set))
    }

    pub fn contains(&self, category: Category) -> bool {
        self.0.contains(&category)
    }

    /// True when the grant is exactly `{read}`. Selects the read-only
    /// transaction shape.
    pub fn is_read_only(&self) -> bool {
        self.0.len() == 1 && self.0.contains(&Category::Read)
    }

    pub fn categories(&self) -> impl Iterator<Item = Category> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Grant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<&str> = self.0.iter().map(|c| c.as_str()).collect();
        f.write_str(&rendered.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_dedupes_case_insensitively() {
        let grant = Grant::parse("Read, DML, read").unwrap();
        assert_eq!(grant.to_string(), "read,dml");
        assert!(grant.contains(Category::Read));
        assert!(grant.contains(Category::Dml));
        assert!(!grant.contains(Category::Ddl));
    }

    #[test]
    fn unknown_token_fails_whole_grant() {
        let err = Grant::parse("read,bogus").unwrap_err();
        assert_eq!(err, CoreError::InvalidPermission("bogus".to_string()));
    }

    #[test]
    fn empty_list_is_rejected() {
        assert_eq!(Grant::parse("").unwrap_err(), CoreError::EmptyGrant);
        assert_eq!(Grant::parse(" , ,").unwrap_err(), CoreError::EmptyGrant);
    }

    #[test]
    fn default_is_read_only() {
        let grant = Grant::default();
        assert!(grant.is_read_only());
        assert_eq!(grant.to_string(), "read");
    }

    #[test]
    fn read_plus_dml_is_not_read_only() {
        let grant = Grant::parse("read,dml").unwrap();
        assert!(!grant.is_read_only());
    }

    #[test]
    fn display_order_is_stable() {
        let grant = Grant::parse("dml,ddl,read").unwrap();
        assert_eq!(grant.to_string(), "read,ddl,dml");
    }
}
