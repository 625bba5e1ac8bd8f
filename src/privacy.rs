//! Identifier hashing so that logs and dashboards never carry raw sources.

use sha2::{Digest, Sha256};

use crate::settings::PrivacyConfig;

/// Length of the hashed form used for identifiers and domains.
pub const HASH_LEN: usize = 12;

/// Length of the short form used when identifier hashing is disabled.
pub const SHORT_ID_LEN: usize = 8;

fn hex_digest(data: &str) -> String {
    hex::encode(Sha256::digest(data.as_bytes()))
}

/// Hash arbitrary data to a 12 character hex token.
pub fn hash_data(data: &str) -> String {
    let mut digest = hex_digest(data);
    digest.truncate(HASH_LEN);
    digest
}

/// Short 8 character token of the same digest.
pub fn short_id(data: &str) -> String {
    let mut digest = hex_digest(data);
    digest.truncate(SHORT_ID_LEN);
    digest
}

/// Extract the host part of a URL: everything after the last `//` up to the
/// next `/`.
pub fn domain_of(url: &str) -> &str {
    let rest = url.rsplit("//").next().unwrap_or(url);
    rest.split('/').next().unwrap_or(rest)
}

/// Replace a URL with a stable pseudonymous one derived from its domain.
///
/// Feeds on the same host map to the same pseudonym, so the dashboard can
/// still group by source.
pub fn hash_url(url: &str) -> String {
    format!("https://{}.edu", hash_data(domain_of(url)))
}

/// URL form suitable for logs under the given privacy settings.
pub fn display_url(url: &str, privacy: &PrivacyConfig) -> String {
    if privacy.log_sensitive_data {
        url.to_string()
    } else {
        hash_url(url)
    }
}
