use serde::{Deserialize, Serialize};

/// A user as returned by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityUser {
    pub id: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// A caller whose bearer credential has been validated and who can be emailed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: String,
    pub email: String,
    pub phone: Option<String>,
}

impl AuthenticatedUser {
    /// Returns `None` when the user has no usable contact email.
    pub fn from_identity(user: IdentityUser) -> Option<Self> {
        let email = user
            .email
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty())?;
        Some(Self {
            id: user.id,
            email,
            phone: user.phone.filter(|p| !p.trim().is_empty()),
        })
    }
}
