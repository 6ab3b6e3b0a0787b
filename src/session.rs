use async_trait::async_trait;
use axum::http::{HeaderMap, header};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use thiserror::Error;
use uuid::Uuid;

pub const ACCESS_TOKEN_COOKIE: &str = "sb-access-token";
pub const REFRESH_TOKEN_COOKIE: &str = "sb-refresh-token";
pub const CODE_VERIFIER_COOKIE: &str = "sb-code-verifier";

const REFRESH_TOKEN_MAX_AGE: i64 = 60 * 60 * 24 * 30;
const CODE_VERIFIER_MAX_AGE: i64 = 60 * 60;
const TOKEN_AUDIENCE: &str = "authenticated";

/// AuthError
///
/// Failures of the hosted auth service. A `Rejected` error carries the message the
/// service returned so handlers can turn it into user-facing text.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("auth service unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{message}")]
    Rejected { status: u16, message: String },
    #[error("invalid access token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
    #[error("no code verifier was stored for this browser")]
    MissingVerifier,
}

/// Claims
///
/// Payload of a Supabase access token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// The user's id in `auth.users`; every data store row is owned by it.
    pub sub: Uuid,
    pub exp: usize,
    pub iat: usize,
    pub aud: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Session
///
/// A verified proof of identity resolved from the request credentials.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub user_id: Uuid,
    pub email: Option<String>,
    /// Unix timestamp (seconds) after which the access token is rejected.
    pub expires_at: i64,
    pub access_token: String,
}

/// SessionTokens
///
/// Token pair issued by the auth service after a password sign-in or a code exchange.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
    /// Lifetime of the access token in seconds.
    pub expires_in: i64,
    pub user: AuthIdentity,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthIdentity {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

/// Credentials
///
/// What a request carries to prove a session: the token cookies set by this app, or an
/// `Authorization: Bearer` header for API clients. The code verifier is only present
/// between a reset request and its callback.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Credentials {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub code_verifier: Option<String>,
}

impl Credentials {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut credentials = Self::default();

        for (name, value) in cookie_pairs(headers) {
            let slot = match name {
                ACCESS_TOKEN_COOKIE => &mut credentials.access_token,
                REFRESH_TOKEN_COOKIE => &mut credentials.refresh_token,
                CODE_VERIFIER_COOKIE => &mut credentials.code_verifier,
                _ => continue,
            };
            *slot = Some(value.to_string());
        }

        if credentials.access_token.is_none() {
            credentials.access_token = headers
                .get(header::AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.strip_prefix("Bearer "))
                .filter(|token| !token.is_empty())
                .map(str::to_string);
        }

        credentials
    }
}

fn cookie_pairs(headers: &HeaderMap) -> impl Iterator<Item = (&str, &str)> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|line| line.split(';'))
        .filter_map(|pair| pair.split_once('='))
        .map(|(name, value)| (name.trim(), unquote(value.trim())))
        // Cleared cookies arrive as `name=` until the browser drops them.
        .filter(|(_, value)| !value.is_empty())
}

/// A cookie value may be wrapped in one pair of double quotes (RFC 6265 §4.1.1).
fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(value)
}

/// SessionStore
///
/// The hosted session capability. The access gate only ever calls `get_session`;
/// the page handlers drive sign-in, the reset flow and sign-out through the rest.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Resolves the credentials to a session. `Ok(None)` means the request carries none.
    async fn get_session(&self, credentials: &Credentials) -> Result<Option<Session>, AuthError>;

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<SessionTokens, AuthError>;

    /// Registers an account. The service mails a confirmation link; no session is issued.
    async fn sign_up(&self, email: &str, password: &str, redirect_to: &str) -> Result<(), AuthError>;

    /// Mails a one-time reset link bound to `code_challenge` that lands on `redirect_to`.
    async fn reset_password_for_email(
        &self,
        email: &str,
        code_challenge: &str,
        redirect_to: &str,
    ) -> Result<(), AuthError>;

    async fn exchange_code_for_session(&self, code: &str, code_verifier: &str) -> Result<SessionTokens, AuthError>;

    async fn update_password(&self, access_token: &str, password: &str) -> Result<(), AuthError>;

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError>;
}

pub type SessionState = Arc<dyn SessionStore>;

/// SupabaseAuthClient
///
/// Talks to the GoTrue REST API of a Supabase project. Access tokens are verified
/// locally against the project's JWT secret, so resolving a session costs no round-trip.
#[derive(Clone)]
pub struct SupabaseAuthClient {
    http: reqwest::Client,
    auth_url: String,
    anon_key: String,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl SupabaseAuthClient {
    pub fn new(supabase_url: &str, anon_key: &str, jwt_secret: &str) -> Self {
        let mut validation = Validation::default();
        validation.validate_exp = true;
        validation.set_audience(&[TOKEN_AUDIENCE]);

        Self {
            http: reqwest::Client::new(),
            auth_url: format!("{}/auth/v1", supabase_url.trim_end_matches('/')),
            anon_key: anon_key.to_string(),
            decoding_key: DecodingKey::from_secret(jwt_secret.as_bytes()),
            validation,
        }
    }

    pub fn verify_access_token(&self, token: &str) -> Result<Session, AuthError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(Session {
            user_id: data.claims.sub,
            email: data.claims.email,
            expires_at: data.claims.exp as i64,
            access_token: token.to_string(),
        })
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.http
            .post(format!("{}{}", self.auth_url, path))
            .header("apikey", &self.anon_key)
    }
}

/// Passes successful responses through and turns anything else into `AuthError::Rejected`
/// carrying the service's own message.
async fn expect_success(response: reqwest::Response) -> Result<reqwest::Response, AuthError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body: serde_json::Value = response.json().await.unwrap_or_default();
    let message = ["msg", "error_description", "message", "error"]
        .iter()
        .find_map(|key| body.get(*key).and_then(|value| value.as_str()))
        .unwrap_or("auth request rejected")
        .to_string();

    Err(AuthError::Rejected {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl SessionStore for SupabaseAuthClient {
    async fn get_session(&self, credentials: &Credentials) -> Result<Option<Session>, AuthError> {
        match &credentials.access_token {
            Some(token) => self.verify_access_token(token).map(Some),
            None => Ok(None),
        }
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<SessionTokens, AuthError> {
        let response = self
            .post("/token?grant_type=password")
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        Ok(expect_success(response).await?.json::<SessionTokens>().await?)
    }

    async fn sign_up(&self, email: &str, password: &str, redirect_to: &str) -> Result<(), AuthError> {
        let path = format!("/signup?redirect_to={}", urlencoding::encode(redirect_to));
        let response = self
            .post(&path)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        expect_success(response).await?;
        Ok(())
    }

    async fn reset_password_for_email(
        &self,
        email: &str,
        code_challenge: &str,
        redirect_to: &str,
    ) -> Result<(), AuthError> {
        let path = format!("/recover?redirect_to={}", urlencoding::encode(redirect_to));
        let response = self
            .post(&path)
            .json(&json!({
                "email": email,
                "code_challenge": code_challenge,
                "code_challenge_method": "s256",
            }))
            .send()
            .await?;
        expect_success(response).await?;
        Ok(())
    }

    async fn exchange_code_for_session(&self, code: &str, code_verifier: &str) -> Result<SessionTokens, AuthError> {
        let response = self
            .post("/token?grant_type=pkce")
            .json(&json!({ "auth_code": code, "code_verifier": code_verifier }))
            .send()
            .await?;
        Ok(expect_success(response).await?.json::<SessionTokens>().await?)
    }

    async fn update_password(&self, access_token: &str, password: &str) -> Result<(), AuthError> {
        let response = self
            .http
            .put(format!("{}/user", self.auth_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .json(&json!({ "password": password }))
            .send()
            .await?;
        expect_success(response).await?;
        Ok(())
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let response = self.post("/logout").bearer_auth(access_token).send().await?;
        expect_success(response).await?;
        Ok(())
    }
}

// --- Cookies ---

fn cookie(name: &str, value: &str, max_age: i64, secure: bool) -> String {
    let secure = if secure { "; Secure" } else { "" };
    format!("{name}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}{secure}")
}

/// `Set-Cookie` values that store a freshly issued session in the browser.
pub fn session_cookies(tokens: &SessionTokens, secure: bool) -> [String; 2] {
    [
        cookie(ACCESS_TOKEN_COOKIE, &tokens.access_token, tokens.expires_in, secure),
        cookie(REFRESH_TOKEN_COOKIE, &tokens.refresh_token, REFRESH_TOKEN_MAX_AGE, secure),
    ]
}

pub fn clear_session_cookies() -> [String; 2] {
    [
        cookie(ACCESS_TOKEN_COOKIE, "", 0, false),
        cookie(REFRESH_TOKEN_COOKIE, "", 0, false),
    ]
}

pub fn code_verifier_cookie(verifier: &str, secure: bool) -> String {
    cookie(CODE_VERIFIER_COOKIE, verifier, CODE_VERIFIER_MAX_AGE, secure)
}

pub fn clear_code_verifier_cookie() -> String {
    cookie(CODE_VERIFIER_COOKIE, "", 0, false)
}

// --- Mock Implementation (For Tests) ---

/// MockSessionStore
///
/// In-memory stand-in for the hosted auth service. Sessions are keyed by opaque
/// tokens; accounts and one-time codes are seeded through the builder methods.
#[derive(Default)]
pub struct MockSessionStore {
    sessions: Mutex<HashMap<String, Session>>,
    accounts: HashMap<String, (String, Uuid)>,
    codes: HashMap<String, Uuid>,
    reset_requests: Mutex<Vec<(String, String)>>,
    fail_lookups: bool,
    fail_sign_out: bool,
}

const MIN_PASSWORD_LEN: usize = 6;

impl MockSessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(mut self, token: &str, user_id: Uuid) -> Self {
        let session = Session {
            user_id,
            email: None,
            expires_at: chrono::Utc::now().timestamp() + 3600,
            access_token: token.to_string(),
        };
        self.sessions
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(token.to_string(), session);
        self
    }

    pub fn with_account(mut self, email: &str, password: &str, user_id: Uuid) -> Self {
        self.accounts
            .insert(email.to_string(), (password.to_string(), user_id));
        self
    }

    pub fn with_code(mut self, code: &str, user_id: Uuid) -> Self {
        self.codes.insert(code.to_string(), user_id);
        self
    }

    /// Every `get_session` call fails, as if the auth backend were unreachable.
    pub fn failing_lookups(mut self) -> Self {
        self.fail_lookups = true;
        self
    }

    pub fn failing_sign_out(mut self) -> Self {
        self.fail_sign_out = true;
        self
    }

    pub fn is_active(&self, token: &str) -> bool {
        self.sessions().contains_key(token)
    }

    /// `(email, code_challenge)` pairs of every reset link requested so far.
    pub fn reset_requests(&self) -> Vec<(String, String)> {
        self.reset_requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<String, Session>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn issue(&self, user_id: Uuid, email: Option<String>) -> SessionTokens {
        let access_token = format!("mock-access-{}", Uuid::new_v4().simple());
        let session = Session {
            user_id,
            email: email.clone(),
            expires_at: chrono::Utc::now().timestamp() + 3600,
            access_token: access_token.clone(),
        };
        self.sessions().insert(access_token.clone(), session);

        SessionTokens {
            access_token,
            refresh_token: format!("mock-refresh-{}", Uuid::new_v4().simple()),
            expires_in: 3600,
            user: AuthIdentity { id: user_id, email },
        }
    }
}

fn rejected(status: u16, message: &str) -> AuthError {
    AuthError::Rejected {
        status,
        message: message.to_string(),
    }
}

#[async_trait]
impl SessionStore for MockSessionStore {
    async fn get_session(&self, credentials: &Credentials) -> Result<Option<Session>, AuthError> {
        if self.fail_lookups {
            return Err(rejected(503, "session backend unavailable"));
        }
        Ok(credentials
            .access_token
            .as_ref()
            .and_then(|token| self.sessions().get(token).cloned()))
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<SessionTokens, AuthError> {
        match self.accounts.get(email) {
            Some((expected, user_id)) if expected == password => {
                Ok(self.issue(*user_id, Some(email.to_string())))
            }
            _ => Err(rejected(400, "Invalid login credentials")),
        }
    }

    async fn sign_up(&self, email: &str, password: &str, _redirect_to: &str) -> Result<(), AuthError> {
        if self.accounts.contains_key(email) {
            return Err(rejected(422, "User already registered"));
        }
        if password.len() < MIN_PASSWORD_LEN {
            return Err(rejected(422, "Password should be at least 6 characters."));
        }
        Ok(())
    }

    async fn reset_password_for_email(
        &self,
        email: &str,
        code_challenge: &str,
        _redirect_to: &str,
    ) -> Result<(), AuthError> {
        self.reset_requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((email.to_string(), code_challenge.to_string()));
        Ok(())
    }

    async fn exchange_code_for_session(&self, code: &str, code_verifier: &str) -> Result<SessionTokens, AuthError> {
        if code_verifier.is_empty() {
            return Err(AuthError::MissingVerifier);
        }
        match self.codes.get(code) {
            Some(user_id) => Ok(self.issue(*user_id, None)),
            None => Err(rejected(403, "Email link is invalid or has expired")),
        }
    }

    async fn update_password(&self, access_token: &str, password: &str) -> Result<(), AuthError> {
        if !self.is_active(access_token) {
            return Err(rejected(404, "User not found"));
        }
        if password.len() < MIN_PASSWORD_LEN {
            return Err(rejected(422, "Password should be at least 6 characters."));
        }
        Ok(())
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        if self.fail_sign_out {
            return Err(rejected(503, "sign out failed"));
        }
        self.sessions().remove(access_token);
        Ok(())
    }
}
