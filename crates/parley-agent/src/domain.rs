//! Negotiation domain: issues, admissible values, and bids.
//!
//! A [`Domain`] is an ordered list of [`Issue`]s. Declaration order matters:
//! it is the iteration order everywhere in the crate and the tie-break order
//! used by the opponent model's predictions.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single admissible value of an issue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Value(String);

impl Value {
    /// Creates a value from its label.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    /// Returns the value label.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Value {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

/// A negotiable attribute with a finite set of admissible values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Issue name, unique within a domain.
    pub name: String,
    /// Admissible values in declaration order.
    pub values: Vec<Value>,
}

impl Issue {
    /// Creates an issue from a name and its values.
    #[must_use]
    pub fn new<V: Into<Value>>(name: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns true if `value` is admissible for this issue.
    #[must_use]
    pub fn admits(&self, value: &Value) -> bool {
        self.values.contains(value)
    }
}

/// The set of issues being negotiated over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    /// Domain name.
    pub name: String,
    /// Issues in declaration order.
    pub issues: Vec<Issue>,
}

impl Domain {
    /// Creates a domain, checking that it is well formed.
    ///
    /// # Errors
    ///
    /// Returns an error if the domain has no issues, an issue has no values,
    /// or a name/value is duplicated.
    pub fn new(name: impl Into<String>, issues: Vec<Issue>) -> Result<Self, DomainError> {
        let domain = Self {
            name: name.into(),
            issues,
        };
        domain.validate()?;
        Ok(domain)
    }

    /// Checks that the domain is well formed.
    ///
    /// # Errors
    ///
    /// See [`Domain::new`].
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.issues.is_empty() {
            return Err(DomainError::NoIssues);
        }
        for (i, issue) in self.issues.iter().enumerate() {
            if self.issues[..i].iter().any(|other| other.name == issue.name) {
                return Err(DomainError::DuplicateIssue(issue.name.clone()));
            }
            if issue.values.is_empty() {
                return Err(DomainError::EmptyIssue(issue.name.clone()));
            }
            for (j, value) in issue.values.iter().enumerate() {
                if issue.values[..j].contains(value) {
                    return Err(DomainError::DuplicateValue {
                        issue: issue.name.clone(),
                        value: value.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Looks up an issue by name.
    #[must_use]
    pub fn issue(&self, name: &str) -> Option<&Issue> {
        self.issues.iter().find(|issue| issue.name == name)
    }

    /// Returns the admissible values of an issue.
    #[must_use]
    pub fn values(&self, issue: &str) -> Option<&[Value]> {
        self.issue(issue).map(|issue| issue.values.as_slice())
    }

    /// Returns the number of issues.
    #[must_use]
    pub fn issue_count(&self) -> usize {
        self.issues.len()
    }

    /// Returns the issue names in declaration order.
    pub fn issue_names(&self) -> impl Iterator<Item = &str> {
        self.issues.iter().map(|issue| issue.name.as_str())
    }

    /// Returns the number of distinct complete bids, saturating at `u128::MAX`.
    #[must_use]
    pub fn size(&self) -> u128 {
        self.issues
            .iter()
            .fold(1u128, |acc, issue| acc.saturating_mul(issue.values.len() as u128))
    }

    /// Returns true if `bid` assigns an admissible value to every issue and
    /// mentions no foreign issue.
    #[must_use]
    pub fn is_complete(&self, bid: &Bid) -> bool {
        bid.len() == self.issues.len()
            && self
                .issues
                .iter()
                .all(|issue| bid.value(&issue.name).is_some_and(|v| issue.admits(v)))
    }
}

/// A proposal: one value per issue.
///
/// Bids are immutable once built and compare structurally.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bid {
    values: BTreeMap<String, Value>,
}

impl Bid {
    /// Creates a bid from issue/value pairs.
    pub fn new<K, V>(values: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Self {
            values: values
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Returns the value chosen for an issue, if any.
    #[must_use]
    pub fn value(&self, issue: &str) -> Option<&Value> {
        self.values.get(issue)
    }

    /// Returns the issues this bid assigns a value to.
    pub fn issues(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Iterates over issue/value pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of issues covered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the bid covers no issue.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Display for Bid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (issue, value)) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{issue}: {value}")?;
        }
        f.write_str("}")
    }
}

/// Errors in a domain description.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// The domain declares no issues.
    #[error("domain has no issues")]
    NoIssues,
    /// An issue has no admissible values.
    #[error("issue '{0}' has no values")]
    EmptyIssue(String),
    /// Two issues share a name.
    #[error("issue '{0}' is declared twice")]
    DuplicateIssue(String),
    /// An issue lists the same value twice.
    #[error("issue '{issue}' lists value '{value}' twice")]
    DuplicateValue {
        /// Offending issue.
        issue: String,
        /// Repeated value.
        value: Value,
    },
}
