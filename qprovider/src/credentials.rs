//! Secure in-memory credential management keyed by vendor identity.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::{ProviderError, ProviderId};

#[derive(PartialEq, Eq)]
pub struct SecretString {
    value: String,
}

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    pub fn expose(&self) -> &str {
        self.value.as_str()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl Drop for SecretString {
    fn drop(&mut self) {
        unsafe {
            self.value.as_mut_vec().fill(0);
        }
    }
}

/// Explicit registry of vendor API keys, passed through the call context so
/// tests can substitute their own instance.
#[derive(Default)]
pub struct CredentialManager {
    credentials: Mutex<HashMap<ProviderId, SecretString>>,
}

impl CredentialManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every configured vendor key from the process environment.
    /// Vendors without a key are simply absent; resolution fails lazily with
    /// the matching "Missing ..." message when such a vendor is requested.
    pub fn from_env() -> Self {
        let manager = Self::new();
        for provider in [
            ProviderId::OpenAi,
            ProviderId::OpenRouter,
            ProviderId::Groq,
            ProviderId::Nebius,
            ProviderId::Anthropic,
            ProviderId::Gemini,
        ] {
            for variable in env_variables(provider) {
                if let Ok(value) = std::env::var(variable)
                    && !value.trim().is_empty()
                {
                    let _ = manager.set_api_key(provider, value);
                    break;
                }
            }
        }

        manager
    }

    pub fn set_api_key(
        &self,
        provider: ProviderId,
        api_key: impl Into<String>,
    ) -> Result<(), ProviderError> {
        let api_key = SecretString::new(api_key);
        if api_key.is_empty() {
            return Err(ProviderError::authentication("api key must not be empty"));
        }

        self.credentials_mut()?.insert(provider, api_key);
        Ok(())
    }

    pub fn has_credentials(&self, provider: ProviderId) -> Result<bool, ProviderError> {
        Ok(self.credentials_ref()?.contains_key(&provider))
    }

    pub fn with_api_key<R>(
        &self,
        provider: ProviderId,
        f: impl FnOnce(&str) -> R,
    ) -> Result<Option<R>, ProviderError> {
        let credentials = self.credentials_ref()?;
        Ok(credentials.get(&provider).map(|secret| f(secret.expose())))
    }

    /// Resolves the key for a vendor or fails with the vendor's
    /// "Missing ..." authentication error.
    pub fn require_api_key(&self, provider: ProviderId) -> Result<String, ProviderError> {
        self.with_api_key(provider, |value| value.to_string())?
            .ok_or_else(|| ProviderError::authentication(missing_credential_message(provider)))
    }

    pub fn clear(&self, provider: ProviderId) -> Result<bool, ProviderError> {
        Ok(self.credentials_mut()?.remove(&provider).is_some())
    }

    fn credentials_ref(
        &self,
    ) -> Result<MutexGuard<'_, HashMap<ProviderId, SecretString>>, ProviderError> {
        self.credentials
            .lock()
            .map_err(|_| ProviderError::other("credential manager lock poisoned"))
    }

    fn credentials_mut(
        &self,
    ) -> Result<MutexGuard<'_, HashMap<ProviderId, SecretString>>, ProviderError> {
        self.credentials
            .lock()
            .map_err(|_| ProviderError::other("credential manager lock poisoned"))
    }
}

fn env_variables(provider: ProviderId) -> &'static [&'static str] {
    match provider {
        ProviderId::OpenAi => &["OPENAI_API_KEY"],
        ProviderId::OpenRouter => &["OPENROUTER_API_KEY"],
        ProviderId::Groq => &["GROQ_API_KEY"],
        ProviderId::Nebius => &["NEBIUS_API_KEY"],
        ProviderId::Anthropic => &["ANTHROPIC_API_KEY"],
        ProviderId::Gemini => &["GEMINI_API_KEY", "GOOGLE_API_KEY"],
    }
}

fn missing_credential_message(provider: ProviderId) -> String {
    match provider {
        ProviderId::Gemini => "Missing GEMINI_API_KEY (or GOOGLE_API_KEY)".to_string(),
        _ => format!("Missing {}", env_variables(provider)[0]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProviderErrorKind;

    #[test]
    fn set_and_resolve_api_key() {
        let manager = CredentialManager::new();
        manager
            .set_api_key(ProviderId::OpenAi, "sk-live-123")
            .expect("key should set");

        assert!(manager.has_credentials(ProviderId::OpenAi).expect("check"));
        assert_eq!(
            manager
                .require_api_key(ProviderId::OpenAi)
                .expect("key should resolve"),
            "sk-live-123"
        );
    }

    #[test]
    fn missing_credentials_produce_vendor_specific_messages() {
        let manager = CredentialManager::new();

        let err = manager
            .require_api_key(ProviderId::Groq)
            .expect_err("missing key must fail");
        assert_eq!(err.kind, ProviderErrorKind::Authentication);
        assert_eq!(err.message, "Missing GROQ_API_KEY");

        let err = manager
            .require_api_key(ProviderId::Gemini)
            .expect_err("missing key must fail");
        assert!(err.message.contains("GEMINI_API_KEY"));
        assert!(err.message.contains("GOOGLE_API_KEY"));
    }

    #[test]
    fn empty_api_key_is_rejected() {
        let manager = CredentialManager::new();
        let err = manager
            .set_api_key(ProviderId::OpenAi, "")
            .expect_err("empty key must fail");
        assert_eq!(err.kind, ProviderErrorKind::Authentication);
    }

    #[test]
    fn secrets_never_leak_through_debug() {
        let secret = SecretString::new("sk-super-secret");
        assert_eq!(format!("{secret:?}"), "[REDACTED]");
    }

    #[test]
    fn clear_removes_stored_credential() {
        let manager = CredentialManager::new();
        manager
            .set_api_key(ProviderId::Anthropic, "sk-ant-123")
            .expect("key should set");
        assert!(manager.clear(ProviderId::Anthropic).expect("clear"));
        assert!(!manager.clear(ProviderId::Anthropic).expect("clear again"));
    }
}
