use anyhow::{Context, Result};
use keyring::Entry;

use super::Role;

const SERVICE_NAME: &str = "errandline";

/// Saved login passwords in the OS keychain, one entry per role and login
/// identifier (a vendor username and a dispatcher email never collide).
pub struct CredentialStore;

impl CredentialStore {
    fn entry(role: Role, login: &str) -> Result<Entry> {
        Entry::new(SERVICE_NAME, &Self::account(role, login)).context("Failed to create keyring entry")
    }

    fn account(role: Role, login: &str) -> String {
        format!("{}:{}", role.as_str(), login)
    }

    /// Store a password in the OS keychain
    pub fn store(role: Role, login: &str, password: &str) -> Result<()> {
        Self::entry(role, login)?
            .set_password(password)
            .context("Failed to store password in keychain")?;
        Ok(())
    }

    pub fn get_password(role: Role, login: &str) -> Result<String> {
        Self::entry(role, login)?
            .get_password()
            .context("Failed to retrieve password from keychain")
    }

    pub fn delete(role: Role, login: &str) -> Result<()> {
        Self::entry(role, login)?
            .delete_credential()
            .context("Failed to delete credential from keychain")?;
        Ok(())
    }

    pub fn has_credentials(role: Role, login: &str) -> bool {
        Self::entry(role, login)
            .map(|entry| entry.get_password().is_ok())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_is_role_scoped() {
        assert_eq!(CredentialStore::account(Role::Vendor, "mama_put"), "vendor:mama_put");
        assert_eq!(
            CredentialStore::account(Role::Dispatcher, "rider@example.com"),
            "dispatcher:rider@example.com"
        );
    }
}
