//! Directory-service access.
//!
//! The extractor only needs three things from a directory: authenticate,
//! run one subtree search and hand back the values of a single attribute
//! per entry. [`DirectoryClient`] captures exactly that; [`LdapSession`]
//! implements it on top of `ldap3`.

pub mod ldap;

pub use ldap::LdapSession;

use crate::error::Result;
use std::fmt;

/// Authentication mode, chosen once before the session binds.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    Anonymous,
    Bound { dn: String, password: String },
}

impl Credentials {
    /// Identity used in messages; never includes the password.
    pub fn identity(&self) -> &str {
        match self {
            Credentials::Anonymous => "anonymous",
            Credentials::Bound { dn, .. } => dn,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Credentials::Anonymous)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Anonymous => write!(f, "Anonymous"),
            Credentials::Bound { dn, .. } => f
                .debug_struct("Bound")
                .field("dn", dn)
                .field("password", &"<redacted>")
                .finish(),
        }
    }
}

/// A single subtree search for one attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    base_dn: String,
    filter: String,
    attributes: Vec<String>,
    size_limit: u32,
    time_limit: u32,
}

impl SearchRequest {
    pub fn new(
        base_dn: impl Into<String>,
        filter: impl Into<String>,
        attribute: impl Into<String>,
    ) -> Self {
        Self {
            base_dn: base_dn.into(),
            filter: filter.into(),
            attributes: vec![attribute.into()],
            size_limit: 0,
            time_limit: 0,
        }
    }

    pub fn with_size_limit(mut self, limit: u32) -> Self {
        self.size_limit = limit;
        self
    }

    pub fn with_time_limit(mut self, seconds: u32) -> Self {
        self.time_limit = seconds;
        self
    }

    pub fn base_dn(&self) -> &str {
        &self.base_dn
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    /// The attribute whose values are extracted.
    pub fn target_attribute(&self) -> &str {
        &self.attributes[0]
    }

    pub fn size_limit(&self) -> u32 {
        self.size_limit
    }

    pub fn time_limit(&self) -> u32 {
        self.time_limit
    }
}

/// One raw value of the requested attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    /// Transport-encoded text, expected to be base64.
    Text(String),
    /// Bytes the client library already decoded.
    Binary(Vec<u8>),
}

/// A directory record returned by the search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub dn: String,
    /// Values of the target attribute in the order the server sent them.
    pub values: Vec<AttributeValue>,
}

impl Entry {
    pub fn new(dn: impl Into<String>, values: Vec<AttributeValue>) -> Self {
        Self {
            dn: dn.into(),
            values,
        }
    }
}

/// Minimal session contract used by the extractor.
#[allow(async_fn_in_trait)]
pub trait DirectoryClient {
    async fn bind(&mut self, credentials: &Credentials) -> Result<()>;

    async fn search(&mut self, request: &SearchRequest) -> Result<Vec<Entry>>;

    async fn unbind(&mut self) -> Result<()>;
}
