//! Static credential table

use std::collections::HashMap;

/// Identity -> shared secret, immutable once the relay is running
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    secrets: HashMap<String, String>,
}

impl CredentialStore {
    pub fn new(secrets: HashMap<String, String>) -> Self {
        Self { secrets }
    }

    /// Exact-match check of `password` against the stored secret
    pub fn check(&self, identity: &str, password: &str) -> bool {
        self.secrets
            .get(identity)
            .is_some_and(|secret| secret == password)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> CredentialStore {
        CredentialStore::new(HashMap::from([
            ("drone1".to_string(), "333".to_string()),
            ("user1".to_string(), "111".to_string()),
        ]))
    }

    #[test]
    fn test_exact_match() {
        let store = store();
        assert!(store.check("drone1", "333"));
        assert!(!store.check("drone1", "333 "));
        assert!(!store.check("drone1", "111"));
        assert!(!store.check("drone9", "333"));
        assert!(!store.check("", ""));
    }
}
