//! Caller identity.
//!
//! Authentication is delegated to an external session provider; by the time a
//! request reaches the core, the provider has resolved an account identifier.
//! Every core operation takes a [`Caller`], so none of them can reach the store
//! without one.

use crate::errors::{Error, Result};

/// The resolved account on whose behalf an operation runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    user_id: String,
}

impl Caller {
    /// Builds a caller from a session-provided identifier.
    ///
    /// # Errors
    /// Returns [`Error::Unauthorized`] when the identifier is absent or blank.
    pub fn from_session(user_id: Option<&str>) -> Result<Self> {
        match user_id.map(str::trim) {
            Some(id) if !id.is_empty() => Ok(Self {
                user_id: id.to_string(),
            }),
            _ => Err(Error::Unauthorized),
        }
    }

    /// The account identifier used to scope every query.
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_from_session_trims_identifier() {
        let caller = Caller::from_session(Some("  alice ")).unwrap();
        assert_eq!(caller.user_id(), "alice");
    }

    #[test]
    fn test_from_session_rejects_missing_or_blank() {
        assert!(matches!(Caller::from_session(None), Err(Error::Unauthorized)));
        assert!(matches!(
            Caller::from_session(Some("   ")),
            Err(Error::Unauthorized)
        ));
    }
}
