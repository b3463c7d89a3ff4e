//! `ldap3`-backed directory session.

use std::collections::HashMap;
use std::time::Duration;

use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, Scope, SearchEntry, SearchOptions};

use super::{AttributeValue, Credentials, DirectoryClient, Entry, SearchRequest};
use crate::error::{CertExtractError, Result};

/// A single connection to an LDAP server.
///
/// The connection driver runs as one background task on the current
/// runtime and ends when the session is unbound or dropped.
pub struct LdapSession {
    url: String,
    ldap: Ldap,
    bound: bool,
}

impl LdapSession {
    /// Opens a connection to `url` without authenticating.
    pub async fn connect(url: &str, timeout: Duration, starttls: bool) -> Result<Self> {
        let settings = LdapConnSettings::new()
            .set_conn_timeout(timeout)
            .set_starttls(starttls);

        tracing::debug!(url, ?timeout, starttls, "connecting to directory");

        let (conn, ldap) = LdapConnAsync::with_settings(settings, url)
            .await
            .map_err(|e| CertExtractError::Connection {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                tracing::warn!("LDAP connection driver error: {}", e);
            }
        });

        Ok(Self {
            url: url.to_string(),
            ldap,
            bound: false,
        })
    }
}

impl DirectoryClient for LdapSession {
    async fn bind(&mut self, credentials: &Credentials) -> Result<()> {
        // An anonymous bind is a simple bind with empty name and password.
        let (dn, password) = match credentials {
            Credentials::Anonymous => ("", ""),
            Credentials::Bound { dn, password } => (dn.as_str(), password.as_str()),
        };

        let result = self
            .ldap
            .simple_bind(dn, password)
            .await
            .map_err(|e| CertExtractError::Connection {
                url: self.url.clone(),
                message: e.to_string(),
            })?;

        result
            .success()
            .map_err(|e| CertExtractError::Authentication {
                identity: credentials.identity().to_string(),
                message: e.to_string(),
            })?;

        self.bound = true;
        tracing::info!(identity = credentials.identity(), "bound to directory");
        Ok(())
    }

    async fn search(&mut self, request: &SearchRequest) -> Result<Vec<Entry>> {
        let search_error = |message: String| CertExtractError::Search {
            base_dn: request.base_dn().to_string(),
            filter: request.filter().to_string(),
            message,
        };

        // Limits were range-checked against i32::MAX when the config was validated.
        let options = SearchOptions::new()
            .sizelimit(request.size_limit() as i32)
            .timelimit(request.time_limit() as i32);

        let (result_entries, _result) = self
            .ldap
            .with_search_options(options)
            .search(
                request.base_dn(),
                Scope::Subtree,
                request.filter(),
                request.attributes().to_vec(),
            )
            .await
            .map_err(|e| search_error(e.to_string()))?
            .success()
            .map_err(|e| search_error(e.to_string()))?;

        tracing::debug!(count = result_entries.len(), "search returned entries");

        let attribute = request.target_attribute();
        let entries = result_entries
            .into_iter()
            .map(|result_entry| entry_from_search(SearchEntry::construct(result_entry), attribute))
            .collect();

        Ok(entries)
    }

    async fn unbind(&mut self) -> Result<()> {
        if !self.bound {
            return Ok(());
        }

        self.ldap
            .unbind()
            .await
            .map_err(|e| CertExtractError::Connection {
                url: self.url.clone(),
                message: e.to_string(),
            })?;

        self.bound = false;
        Ok(())
    }
}

/// Collects the values of `attribute` from a search entry.
///
/// `ldap3` puts an attribute in `attrs` when every value is valid UTF-8 and
/// in `bin_attrs` otherwise. Servers may echo the attribute name in a
/// different case, so the lookup ignores case.
fn entry_from_search(entry: SearchEntry, attribute: &str) -> Entry {
    let mut values: Vec<AttributeValue> = take_attribute(entry.attrs, attribute)
        .into_iter()
        .map(AttributeValue::Text)
        .collect();

    values.extend(
        take_attribute(entry.bin_attrs, attribute)
            .into_iter()
            .map(AttributeValue::Binary),
    );

    Entry::new(entry.dn, values)
}

fn take_attribute<V>(attrs: HashMap<String, Vec<V>>, attribute: &str) -> Vec<V> {
    attrs
        .into_iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(attribute))
        .map(|(_, values)| values)
        .unwrap_or_default()
}
