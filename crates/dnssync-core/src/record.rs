//! DNS record vocabulary shared by the store, adapter and provider layers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// DNS resource record type
///
/// Types the adapter has special handling for get their own variant; any
/// other type is carried verbatim and passed through to the provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RecordType {
    /// IPv4 address
    A,
    /// IPv6 address
    Aaaa,
    /// Canonical name
    Cname,
    /// Mail exchanger (`"<priority> <target>"` content)
    Mx,
    /// Free text
    Txt,
    /// Name server
    Ns,
    /// Anything else (SRV, CAA, ...), uppercased
    Other(String),
}

impl RecordType {
    /// The wire name of this type (e.g. "AAAA")
    pub fn as_str(&self) -> &str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Cname => "CNAME",
            RecordType::Mx => "MX",
            RecordType::Txt => "TXT",
            RecordType::Ns => "NS",
            RecordType::Other(s) => s,
        }
    }

    /// Whether the provider refuses to proxy records of this type
    pub fn forbids_proxy(&self) -> bool {
        matches!(self, RecordType::Mx | RecordType::Txt | RecordType::Ns)
    }
}

impl From<String> for RecordType {
    fn from(s: String) -> Self {
        let upper = s.trim().to_ascii_uppercase();
        match upper.as_str() {
            "A" => RecordType::A,
            "AAAA" => RecordType::Aaaa,
            "CNAME" => RecordType::Cname,
            "MX" => RecordType::Mx,
            "TXT" => RecordType::Txt,
            "NS" => RecordType::Ns,
            _ => RecordType::Other(upper),
        }
    }
}

impl From<&str> for RecordType {
    fn from(s: &str) -> Self {
        RecordType::from(s.to_string())
    }
}

impl From<RecordType> for String {
    fn from(t: RecordType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operation requested by a change request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Create a new provider record
    Create,
    /// Replace the single provider record with the same name
    Update,
    /// Delete the single provider record with the same name
    Delete,
}

impl Operation {
    /// Lowercase name, as stored in the table
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

impl FromStr for Operation {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "create" => Ok(Operation::Create),
            "update" => Ok(Operation::Update),
            "delete" => Ok(Operation::Delete),
            other => Err(crate::Error::validation(format!(
                "Unknown operation '{}' (expected create, update or delete)",
                other
            ))),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque identifier of a change request row
///
/// Tables key rows either by integer or by text (uuid); both are kept in
/// their JSON shape so they round-trip through the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Integer primary key
    Int(i64),
    /// Text primary key
    Text(String),
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::Int(n) => write!(f, "{}", n),
            RequestId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        RequestId::Int(n)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        RequestId::Text(s.to_string())
    }
}
