//! Cluster topology snapshot types.
//!
//! Everything here is rebuilt from scratch on every poll. Nothing carries
//! identity across polls.

use std::fmt;

use indexmap::IndexMap;

/// URI scheme prefixed to every cluster name.
pub const FABRIC_SCHEME: &str = "fabric:/";

/// Opaque cursor returned by a paginated query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContinuationToken(pub String);

impl ContinuationToken {
    /// Wrap a raw token, treating empty strings as "no more data".
    pub fn from_raw(raw: Option<String>) -> Option<Self> {
        raw.filter(|t| !t.is_empty()).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One page of a paginated query.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub continuation: Option<ContinuationToken>,
    /// Whether the upstream advertised more data after this page.
    pub has_more: bool,
}

impl<T> Page<T> {
    /// A page whose "more data" flag is implied by the continuation token.
    pub fn new(items: Vec<T>, continuation: Option<ContinuationToken>) -> Self {
        let has_more = continuation.is_some();
        Self {
            items,
            continuation,
            has_more,
        }
    }

    /// The final page of a sequence.
    pub fn last(items: Vec<T>) -> Self {
        Self::new(items, None)
    }

    /// The token to resume with, if the sequence continues past this page.
    pub fn next_token(&self) -> Option<&ContinuationToken> {
        if self.has_more && !self.items.is_empty() {
            self.continuation.as_ref()
        } else {
            None
        }
    }
}

/// Structured cluster name (`fabric:/App/Svc`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceName {
    segments: Vec<String>,
}

impl ServiceName {
    /// Parse a name with or without the `fabric:/` scheme.
    pub fn parse(raw: &str) -> Self {
        let path = raw.strip_prefix(FABRIC_SCHEME).unwrap_or(raw);
        let segments = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        Self { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Full name including the scheme.
    pub fn uri(&self) -> String {
        format!("{}{}", FABRIC_SCHEME, self.segments.join("/"))
    }

    /// Identifier used in gateway URLs (`App~Svc`).
    pub fn id(&self) -> String {
        self.segments.join("~")
    }

    /// Proxy-safe object name prefix.
    ///
    /// Segments are joined with `-` and anything outside `[A-Za-z0-9.-]`
    /// becomes `-`, so the `_` separator and the `@` provider suffix never
    /// appear inside the prefix.
    pub fn normalized(&self) -> String {
        self.segments
            .join("-")
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '.' {
                    c
                } else {
                    '-'
                }
            })
            .collect()
    }

    /// `<normalized>_<suffix>` object name.
    pub fn object_name(&self, suffix: &str) -> String {
        format!("{}_{}", self.normalized(), suffix)
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Application {
    pub name: ServiceName,
    pub type_name: String,
    pub type_version: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
    Stateless,
    Stateful,
    Unknown,
}

impl ServiceKind {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "Stateless" => ServiceKind::Stateless,
            "Stateful" => ServiceKind::Stateful,
            _ => ServiceKind::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    pub name: ServiceName,
    pub type_name: String,
    pub kind: ServiceKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionKind {
    Singleton,
    Int64Range,
    Named,
    Unknown,
}

impl PartitionKind {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "Singleton" => PartitionKind::Singleton,
            "Int64Range" => PartitionKind::Int64Range,
            "Named" => PartitionKind::Named,
            _ => PartitionKind::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PartitionId(pub String);

impl fmt::Display for PartitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub id: PartitionId,
    pub kind: PartitionKind,
}

/// A replica or stateless instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replica {
    /// Serialized address payload (`{"Endpoints":{"name":"url"}}`).
    pub address: String,
}

/// Description of a service type, reduced to its manifest extensions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceTypeDescription {
    pub extensions: IndexMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    String(String),
    Other,
}

/// A named property from the cluster property store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub name: String,
    pub value: PropertyValue,
}

impl Property {
    pub fn string(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: PropertyValue::String(value.into()),
        }
    }
}
