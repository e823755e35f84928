/// Credentials and search metadata for one warehouse store.
///
/// A store with a missing key or secret stays configured but is skipped at
/// call time; that is never an error. The prefix character feeds the
/// planner's search-order heuristic (order ids conventionally start with
/// the store initial).
#[derive(Debug, Clone)]
pub struct StoreAccount {
    pub name: String,
    pub prefix: char,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
}

impl StoreAccount {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let prefix = name
            .chars()
            .next()
            .map(|c| c.to_ascii_uppercase())
            .unwrap_or('?');
        Self {
            name,
            prefix,
            api_key: None,
            api_secret: None,
        }
    }

    pub fn with_credentials(
        mut self,
        key: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        self.api_key = Some(key.into());
        self.api_secret = Some(secret.into());
        self
    }

    pub fn has_credentials(&self) -> bool {
        matches!((&self.api_key, &self.api_secret), (Some(_), Some(_)))
    }
}

/// The full federation a process talks to: one API base plus the ordered
/// store list. Threaded explicitly into the client and planner at
/// construction, never read from ambient global state.
#[derive(Debug, Clone)]
pub struct FederationConfig {
    pub api_base: String,
    pub stores: Vec<StoreAccount>,
}

impl FederationConfig {
    pub fn new(api_base: impl Into<String>, stores: Vec<StoreAccount>) -> Self {
        Self {
            api_base: api_base.into(),
            stores,
        }
    }

    pub fn store(&self, name: &str) -> Option<&StoreAccount> {
        self.stores
            .iter()
            .find(|store| store.name.eq_ignore_ascii_case(name))
    }
}
