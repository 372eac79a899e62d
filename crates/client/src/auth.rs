// crates/client/src/auth.rs
//! Credential access for outgoing requests.
//!
//! Tokens are read through [`TokenSource`] on every request, never cached at
//! client construction, so a rotated credential takes effect on the next
//! request without rebuilding any component.

/// Supplies the optional bearer credential and the optional admin token.
///
/// The two kinds are distinct: bearer authenticates ordinary user requests,
/// the admin token authenticates administrative catalog operations. They are
/// never merged into one header.
pub trait TokenSource: Send + Sync {
    /// Bearer credential for `Authorization: Bearer <token>`.
    fn bearer(&self) -> Option<String>;

    /// Admin credential for `X-Admin-Token`.
    fn admin_token(&self) -> Option<String> {
        None
    }
}

/// Env var carrying the bearer token.
pub const TOKEN_ENV: &str = "AILAB_TOKEN";
/// Env var carrying the admin token.
pub const ADMIN_TOKEN_ENV: &str = "AILAB_ADMIN_TOKEN";

/// Reads `AILAB_TOKEN` / `AILAB_ADMIN_TOKEN` freshly on every call.
#[derive(Debug, Clone, Default)]
pub struct EnvTokens;

impl TokenSource for EnvTokens {
    fn bearer(&self) -> Option<String> {
        std::env::var(TOKEN_ENV).ok().filter(|t| !t.is_empty())
    }

    fn admin_token(&self) -> Option<String> {
        std::env::var(ADMIN_TOKEN_ENV).ok().filter(|t| !t.is_empty())
    }
}

/// Fixed tokens, for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticTokens {
    pub bearer: Option<String>,
    pub admin: Option<String>,
}

impl StaticTokens {
    pub fn bearer(token: impl Into<String>) -> Self {
        Self { bearer: Some(token.into()), admin: None }
    }

    pub fn admin(token: impl Into<String>) -> Self {
        Self { bearer: None, admin: Some(token.into()) }
    }
}

impl TokenSource for StaticTokens {
    fn bearer(&self) -> Option<String> {
        self.bearer.clone()
    }

    fn admin_token(&self) -> Option<String> {
        self.admin.clone()
    }
}
