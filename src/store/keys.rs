/// Key layout shared by every key-value backed store.
pub struct StoreKeys;

impl StoreKeys {
    /// Set of ACL rule strings for a principal: {prefix}acl:{principal}
    pub fn acl(prefix: &str, principal: &str) -> String {
        format!("{}acl:{}", prefix, principal)
    }

    /// Stored password hash for a principal: {prefix}user:{principal}
    pub fn user(prefix: &str, principal: &str) -> String {
        format!("{}user:{}", prefix, principal)
    }
}
