//! Per-record contact enrichment.
//!
//! A lookup failure never fails a page: the record is kept with no contact.

use async_trait::async_trait;
use url::Url;

use crate::record::RawRecord;
use crate::Result;

#[async_trait]
pub trait ContactLookup: Send + Sync {
    /// Finds a contact address for `record`, if there is one.
    async fn lookup(&self, record: &RawRecord) -> Result<Option<String>>;
}

/// Never finds a contact.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoContact;

#[async_trait]
impl ContactLookup for NoContact {
    async fn lookup(&self, _record: &RawRecord) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Derives `<mailbox>@<domain>` from the record's website.
#[derive(Debug, Clone)]
pub struct DomainContact {
    mailbox: String,
}

impl DomainContact {
    pub fn new(mailbox: impl Into<String>) -> Self {
        Self {
            mailbox: mailbox.into(),
        }
    }
}

impl Default for DomainContact {
    fn default() -> Self {
        Self::new("info")
    }
}

#[async_trait]
impl ContactLookup for DomainContact {
    async fn lookup(&self, record: &RawRecord) -> Result<Option<String>> {
        let website = record.website.trim();
        if website.is_empty() {
            return Ok(None);
        }
        let url = if website.contains("://") {
            Url::parse(website)?
        } else {
            Url::parse(&format!("https://{website}"))?
        };
        let domain = url
            .host_str()
            .map(|host| host.trim_start_matches("www.").to_lowercase())
            .filter(|host| host.contains('.'));
        Ok(domain.map(|domain| format!("{}@{domain}", self.mailbox)))
    }
}

/// Runs `lookup` and folds any failure into "no contact".
pub(crate) async fn contact_or_absent(
    lookup: &dyn ContactLookup,
    record: &RawRecord,
) -> Option<String> {
    match lookup.lookup(record).await {
        Ok(contact) => contact,
        Err(e) => {
            tracing::warn!(
                name = %record.name,
                website = %record.website,
                error = %e,
                "contact lookup failed"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(website: &str) -> RawRecord {
        RawRecord::new("Org", "", website)
    }

    #[tokio::test]
    async fn domain_contact_from_website() {
        let lookup = DomainContact::default();
        let contact = lookup.lookup(&raw("https://www.Acme-Relief.org/about")).await.unwrap();
        assert_eq!(contact.as_deref(), Some("info@acme-relief.org"));

        let contact = lookup.lookup(&raw("helpers.example.net")).await.unwrap();
        assert_eq!(contact.as_deref(), Some("info@helpers.example.net"));
    }

    #[tokio::test]
    async fn no_website_no_contact() {
        let lookup = DomainContact::new("contact");
        assert_eq!(lookup.lookup(&raw("  ")).await.unwrap(), None);
        assert_eq!(lookup.lookup(&raw("http://localhost:3000")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn failures_become_absent() {
        let lookup = DomainContact::default();
        assert!(lookup.lookup(&raw("http://")).await.is_err());
        assert_eq!(contact_or_absent(&lookup, &raw("http://")).await, None);
    }
}
