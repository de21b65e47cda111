use futures::future::BoxFuture;
use uuid::Uuid;

/// Resolves a caller's identity from an optional bearer credential.
///
/// Absence is tolerated: anonymous participants join by nickname only, and
/// only organizer-gated actions care about the resolved id.
pub trait AuthResolver: Send + Sync {
    /// Resolve a token to a user id, `None` for anonymous or invalid tokens.
    fn resolve(&self, token: Option<&str>) -> BoxFuture<'static, Option<Uuid>>;
}

/// Stand-in resolver that accepts the user id itself as the token.
///
/// The production deployment substitutes the real authentication
/// collaborator behind the same trait.
#[derive(Default)]
pub struct TokenIsUserId;

impl AuthResolver for TokenIsUserId {
    fn resolve(&self, token: Option<&str>) -> BoxFuture<'static, Option<Uuid>> {
        let parsed = token.and_then(|raw| Uuid::parse_str(raw.trim()).ok());
        Box::pin(async move { parsed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn absent_token_resolves_to_anonymous() {
        assert_eq!(TokenIsUserId.resolve(None).await, None);
    }

    #[tokio::test]
    async fn valid_uuid_token_resolves() {
        let id = Uuid::new_v4();
        let resolved = TokenIsUserId.resolve(Some(&id.to_string())).await;
        assert_eq!(resolved, Some(id));
    }

    #[tokio::test]
    async fn garbage_token_resolves_to_anonymous() {
        assert_eq!(TokenIsUserId.resolve(Some("not-a-uuid")).await, None);
    }
}
