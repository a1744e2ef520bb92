//! Token table resolver configured at startup.
//!
//! Each entry has the form `TOKEN=USER_ID:ROLE`, e.g. `s3cret=driver-7:STAFF`.

use std::collections::HashMap;

use async_trait::async_trait;
use convoy_shared::Role;
use thiserror::Error;

use crate::domain::{Identity, IdentityResolver, UserId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenSpecError {
    #[error("token spec '{0}' must look like TOKEN=USER_ID:ROLE")]
    Malformed(String),

    #[error("token spec '{spec}' has an invalid user id: {reason}")]
    InvalidUserId { spec: String, reason: String },

    #[error("token spec '{spec}' has an unknown role: {role}")]
    UnknownRole { spec: String, role: String },
}

/// Resolves tokens from a fixed in-memory table.
#[derive(Debug, Default, Clone)]
pub struct StaticTokenResolver {
    tokens: HashMap<String, Identity>,
}

impl StaticTokenResolver {
    pub fn new(tokens: HashMap<String, Identity>) -> Self {
        Self { tokens }
    }

    /// Build a resolver from `TOKEN=USER_ID:ROLE` specs.
    pub fn from_specs<S: AsRef<str>>(specs: &[S]) -> Result<Self, TokenSpecError> {
        let mut tokens = HashMap::with_capacity(specs.len());
        for spec in specs {
            let (token, identity) = parse_spec(spec.as_ref().trim())?;
            tokens.insert(token, identity);
        }
        Ok(Self { tokens })
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

fn parse_spec(spec: &str) -> Result<(String, Identity), TokenSpecError> {
    let malformed = || TokenSpecError::Malformed(spec.to_string());

    let (token, rest) = spec.split_once('=').ok_or_else(malformed)?;
    let (user_id, role) = rest.rsplit_once(':').ok_or_else(malformed)?;
    if token.is_empty() {
        return Err(malformed());
    }

    let user_id = UserId::new(user_id.to_string()).map_err(|e| TokenSpecError::InvalidUserId {
        spec: spec.to_string(),
        reason: e.to_string(),
    })?;
    let role = role
        .parse::<Role>()
        .map_err(|_| TokenSpecError::UnknownRole {
            spec: spec.to_string(),
            role: role.to_string(),
        })?;

    Ok((token.to_string(), Identity::new(user_id, role)))
}

#[async_trait]
impl IdentityResolver for StaticTokenResolver {
    async fn resolve(&self, token: &str) -> Option<Identity> {
        self.tokens.get(token).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_from_specs_resolves_tokens() {
        // テスト項目: TOKEN=USER_ID:ROLE 形式の設定からトークンを解決できる
        // given (前提条件):
        let resolver =
            StaticTokenResolver::from_specs(&["tok-op=op-1:OPERATOR", "tok-s=driver-7:staff"])
                .unwrap();

        // when (操作):
        let operator = resolver.resolve("tok-op").await;
        let staff = resolver.resolve("tok-s").await;
        let unknown = resolver.resolve("nope").await;

        // then (期待する結果):
        assert_eq!(operator.map(|i| i.role), Some(Role::Operator));
        let staff = staff.unwrap();
        assert_eq!(staff.user_id.as_str(), "driver-7");
        assert_eq!(staff.role, Role::Staff);
        assert!(unknown.is_none());
    }

    #[test]
    fn test_from_specs_rejects_malformed_entries() {
        // テスト項目: 不正な形式の設定はエラーになる
        assert_eq!(
            StaticTokenResolver::from_specs(&["no-separator"]).unwrap_err(),
            TokenSpecError::Malformed("no-separator".to_string())
        );
        assert!(matches!(
            StaticTokenResolver::from_specs(&["t=u1:PILOT"]),
            Err(TokenSpecError::UnknownRole { .. })
        ));
        assert!(matches!(
            StaticTokenResolver::from_specs(&["t=:STAFF"]),
            Err(TokenSpecError::InvalidUserId { .. })
        ));
    }
}
