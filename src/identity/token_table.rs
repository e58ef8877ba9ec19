//! The `instanceId -> token` side table (§3, §4.B).
//!
//! At most one token is valid per instance at any moment; issuance or
//! rotation atomically invalidates the previous value. Guarded by a single
//! `RwLock` so rotation and validation are each a single critical section,
//! matching the "atomic transition from any observer's perspective"
//! requirement in §5.

use std::collections::HashMap;
use tokio::sync::RwLock;

use super::token::{constant_time_eq, issue_token, Token};

#[derive(Debug, Default)]
pub struct TokenTable {
    tokens: RwLock<HashMap<String, Token>>,
}

impl TokenTable {
    pub fn new() -> Self {
        Self { tokens: RwLock::new(HashMap::new()) }
    }

    /// Issues a fresh token for `instance_id`, overwriting whatever was
    /// there before. Used both by first registration and re-registration.
    pub async fn issue(&self, instance_id: &str) -> Token {
        let token = issue_token(instance_id);
        self.tokens.write().await.insert(instance_id.to_string(), token.clone());
        token
    }

    /// `rotateToken(instanceId)`: same atomic replace as `issue`, exposed
    /// under the name the contract uses.
    pub async fn rotate(&self, instance_id: &str) -> Token {
        self.issue(instance_id).await
    }

    /// `validate(token, instanceId)`.
    pub async fn validate(&self, instance_id: &str, candidate: &str) -> bool {
        match self.tokens.read().await.get(instance_id) {
            Some(stored) => constant_time_eq(stored.as_str(), candidate),
            None => false,
        }
    }

    pub async fn remove(&self, instance_id: &str) {
        self.tokens.write().await.remove(instance_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rotation_invalidates_previous_token() {
        let table = TokenTable::new();
        let t1 = table.issue("i1").await;
        assert!(table.validate("i1", t1.as_str()).await);

        let t2 = table.rotate("i1").await;
        assert_ne!(t1, t2);
        assert!(!table.validate("i1", t1.as_str()).await);
        assert!(table.validate("i1", t2.as_str()).await);
    }

    #[tokio::test]
    async fn unknown_instance_never_validates() {
        let table = TokenTable::new();
        assert!(!table.validate("ghost", "anything").await);
    }
}
