use super::credentials::{CredentialStore, StorageError, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};

/// In-memory copy of the current token pair.
///
/// Only the session manager holds one; every change is mirrored to the
/// credential store it was loaded from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl Session {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: Some(access_token.into()),
            refresh_token: Some(refresh_token.into()),
        }
    }

    /// Load whatever tokens the store holds. Missing keys leave fields empty.
    pub fn load(store: &dyn CredentialStore) -> Result<Self, StorageError> {
        Ok(Self {
            access_token: store.get(ACCESS_TOKEN_KEY)?,
            refresh_token: store.get(REFRESH_TOKEN_KEY)?,
        })
    }

    /// Write both tokens, removing keys whose field is empty.
    pub fn save(&self, store: &dyn CredentialStore) -> Result<(), StorageError> {
        match self.access_token {
            Some(ref token) => store.set(ACCESS_TOKEN_KEY, token)?,
            None => store.remove(ACCESS_TOKEN_KEY)?,
        }
        match self.refresh_token {
            Some(ref token) => store.set(REFRESH_TOKEN_KEY, token)?,
            None => store.remove(REFRESH_TOKEN_KEY)?,
        }
        Ok(())
    }

    /// Drop both tokens from memory and from the store.
    ///
    /// Memory is cleared even if the store fails, so the process never keeps
    /// using credentials the user asked to forget.
    pub fn clear(&mut self, store: &dyn CredentialStore) -> Result<(), StorageError> {
        self.access_token = None;
        self.refresh_token = None;
        store.remove_all(&[ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY])
    }

    pub fn token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemoryStore;

    #[test]
    fn test_load_empty_store() {
        let store = MemoryStore::new();
        let session = Session::load(&store).unwrap();
        assert!(session.is_empty());
        assert_eq!(session.token(), None);
    }

    #[test]
    fn test_save_then_load() {
        let store = MemoryStore::new();
        Session::new("a", "r").save(&store).unwrap();
        assert_eq!(Session::load(&store).unwrap(), Session::new("a", "r"));
    }

    #[test]
    fn test_save_removes_missing_fields() {
        let store = MemoryStore::new();
        Session::new("a", "r").save(&store).unwrap();
        let partial = Session {
            access_token: Some("b".into()),
            refresh_token: None,
        };
        partial.save(&store).unwrap();
        assert_eq!(store.get(REFRESH_TOKEN_KEY).unwrap(), None);
        assert_eq!(store.get(ACCESS_TOKEN_KEY).unwrap().as_deref(), Some("b"));
    }

    #[test]
    fn test_clear() {
        let store = MemoryStore::new();
        let mut session = Session::new("a", "r");
        session.save(&store).unwrap();
        session.clear(&store).unwrap();
        assert!(session.is_empty());
        assert!(Session::load(&store).unwrap().is_empty());
    }
}
