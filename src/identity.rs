use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::AuthError;

const MIN_PASSWORD_LEN: usize = 6;
const ANONYMOUS: &str = "Anonymous";

/// A signed-in user as seen by the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub uid: String,
    pub email: Option<String>,
}

impl User {
    /// Local accounts key their id off the normalised email so results
    /// survive restarts.
    pub fn from_email(email: &str) -> Self {
        let email = email.trim().to_lowercase();
        Self {
            uid: format!("local:{email}"),
            email: Some(email),
        }
    }

    /// Like `from_email`, rejecting addresses that cannot be real
    pub fn try_from_email(email: &str) -> Result<Self, AuthError> {
        validate_email(email).map(|email| Self::from_email(&email))
    }

    /// Name shown on the leaderboard when the store has none on file
    pub fn default_display_name(&self) -> String {
        self.email
            .as_deref()
            .and_then(|e| e.split('@').next())
            .filter(|name| !name.is_empty())
            .map_or_else(|| ANONYMOUS.to_string(), str::to_string)
    }
}

/// Identity collaborator
pub trait IdentityProvider: Send + Sync {
    fn sign_in(&self, email: &str, password: &str) -> Result<User, AuthError>;
    fn sign_up(&self, email: &str, password: &str) -> Result<User, AuthError>;
    fn sign_out(&self);
    fn current_user(&self) -> Option<User>;
}

#[derive(Debug, Default)]
struct Accounts {
    passwords: HashMap<String, String>,
    current: Option<User>,
}

/// In-process identity provider
///
/// The binary signs a user in up front with `signed_in` (from `--email`);
/// there is no password prompt in the terminal. `sign_in` and `sign_up`
/// serve hosts that drive the engine as a library and share the provider
/// with it, so a later sign-in or sign-out changes who the next result is
/// recorded for.
#[derive(Debug, Default)]
pub struct LocalIdentity {
    inner: Mutex<Accounts>,
}

impl LocalIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider with a user already signed in, as when the host passes
    /// `--email` on the command line.
    pub fn signed_in(user: User) -> Self {
        Self {
            inner: Mutex::new(Accounts {
                passwords: HashMap::new(),
                current: Some(user),
            }),
        }
    }
}

fn validate_email(email: &str) -> Result<String, AuthError> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(AuthError::InvalidEmail(email)),
    }
}

impl IdentityProvider for LocalIdentity {
    fn sign_in(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = validate_email(email)?;
        let mut accounts = self.inner.lock().map_err(|_| AuthError::Poisoned)?;
        match accounts.passwords.get(&email) {
            Some(stored) if stored == password => {
                let user = User::from_email(&email);
                accounts.current = Some(user.clone());
                tracing::debug!(uid = %user.uid, "signed in");
                Ok(user)
            }
            _ => Err(AuthError::InvalidCredentials),
        }
    }

    fn sign_up(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = validate_email(email)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword {
                min: MIN_PASSWORD_LEN,
            });
        }
        let mut accounts = self.inner.lock().map_err(|_| AuthError::Poisoned)?;
        if accounts.passwords.contains_key(&email) {
            return Err(AuthError::EmailInUse(email));
        }
        accounts.passwords.insert(email.clone(), password.to_string());
        let user = User::from_email(&email);
        accounts.current = Some(user.clone());
        tracing::debug!(uid = %user.uid, "signed up");
        Ok(user)
    }

    fn sign_out(&self) {
        if let Ok(mut accounts) = self.inner.lock() {
            accounts.current = None;
        }
    }

    fn current_user(&self) -> Option<User> {
        self.inner.lock().ok().and_then(|a| a.current.clone())
    }
}
