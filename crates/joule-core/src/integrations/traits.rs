use crate::error::ApiError;
use crate::integrations::keyring_store;

/// Every external data source implements this trait.
/// Credentials come from the OS keyring, looked up by `credential_key()`.
pub trait ApiService {
    /// Unique identifier (e.g. "openei", "eia").
    fn name(&self) -> &str;

    /// Human-readable display name.
    fn display_name(&self) -> &str;

    /// Keyring entry holding the API key, `None` for keyless services.
    fn credential_key(&self) -> Option<&str> {
        None
    }

    /// Whether a key is stored (always true for keyless services).
    fn is_authenticated(&self) -> bool {
        match self.credential_key() {
            Some(key) => matches!(keyring_store::get(key), Ok(Some(k)) if !k.is_empty()),
            None => true,
        }
    }

    /// Store an API key and use it for subsequent requests. Keyless
    /// services return an error instead of dropping the key.
    fn set_credentials(&mut self, api_key: &str) -> Result<(), ApiError>;

    /// Remove stored credentials.
    fn disconnect(&mut self) -> Result<(), ApiError> {
        match self.credential_key() {
            Some(key) => keyring_store::delete(key),
            None => Ok(()),
        }
    }
}
