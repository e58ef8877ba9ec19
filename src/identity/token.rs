//! Instance id generation and opaque token issuance/validation.
//!
//! Grounded on this codebase's token-issuance style (`auth::token`), with
//! the JWT signing/parsing stripped out entirely: instance tokens carry no
//! structure for the registry to inspect, only equality.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;

/// An opaque bearer credential bound to exactly one instance id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Token {
    fn from(value: String) -> Self {
        Token(value)
    }
}

/// `generateInstanceId(serviceName, ip, port)`: a stable-looking identifier
/// derived from the network coordinates plus fresh entropy, so two
/// instances sharing an address still get distinct ids across restarts.
pub fn generate_instance_id(service_name: &str, ip: &str, port: u16) -> String {
    let mut entropy = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut entropy);
    format!("{service_name}-{ip}-{port}-{}", URL_SAFE_NO_PAD.encode(entropy))
}

/// `issueToken(instanceId)`: a fresh opaque string carrying >= 128 bits of
/// entropy. `instanceId` does not influence the output; it only documents
/// which instance the caller is issuing for.
pub fn issue_token(_instance_id: &str) -> Token {
    let mut entropy = [0u8; 24]; // 192 bits, comfortably above the 128-bit floor
    rand::thread_rng().fill_bytes(&mut entropy);
    Token(URL_SAFE_NO_PAD.encode(entropy))
}

/// `validate(token, instanceId)`: constant-time comparison against the
/// caller-supplied current value. Equal-length short-circuiting on string
/// equality would leak timing information proportional to the matching
/// prefix length, so comparison always walks the full byte length.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    let mut diff: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
