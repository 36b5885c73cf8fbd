use sha2::{Digest, Sha256};

/// One-way deduplication key derived from client address and user-agent.
///
/// Missing parts are replaced with `unknown`, so two anonymous clients share a
/// key. The value is only a same-day dedup key, never a user identifier.
#[must_use]
pub fn identity_hash(client_ip: Option<&str>, user_agent: Option<&str>) -> String {
    let identifier = format!(
        "{}-{}",
        client_ip.unwrap_or("unknown"),
        user_agent.unwrap_or("unknown")
    );
    format!("{:x}", Sha256::digest(identifier.as_bytes()))
}
