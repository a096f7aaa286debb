//! Registration and login

use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::IncidentService;
use crate::auth::{
    hash_password, verify_password, Caller, Operation, Session, Table, MIN_PASSWORD_LEN,
};
use crate::models::{validate_email, Credential, Profile, RegistrationMetadata, Role};
use crate::types::{Result, WatchpostError};

/// A principal that has proven its credentials
#[derive(Debug, Clone, Serialize)]
pub struct Authenticated {
    pub session: Session,
    /// Version to embed in issued tokens
    pub token_version: u32,
}

fn invalid_credentials() -> WatchpostError {
    WatchpostError::Unauthorized("Invalid credentials".into())
}

impl IncidentService {
    /// Create a credential and its derived profile (role `user`)
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        metadata: RegistrationMetadata,
    ) -> Result<(Authenticated, Profile)> {
        validate_email(email)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(WatchpostError::validation(
                "password",
                format!("must be at least {MIN_PASSWORD_LEN} characters"),
            ));
        }

        let credential = Credential::new(email, hash_password(password)?);
        let principal_id = credential.principal_id;
        let token_version = credential.token_version;
        let email = credential.email.clone();

        // Profile creation rides on registration and is owned by the new principal
        let owner = Caller::new(principal_id, Role::User);
        self.ensure(Table::Profiles, Operation::Insert, &owner, principal_id)?;

        self.backend.insert_credential(credential).await?;
        let profile = match self
            .backend
            .insert_profile(Profile::from_registration(principal_id, &email, metadata))
            .await
        {
            Ok(profile) => profile,
            Err(e) => {
                // A credential without a profile could log in but never act
                warn!(principal = %principal_id, error = %e, "Profile insert failed, removing credential");
                if let Err(cleanup) = self.backend.delete_credential(&email).await {
                    error!(principal = %principal_id, error = %cleanup, "Failed to remove orphaned credential");
                }
                return Err(e);
            }
        };
        self.hub.publish_insert(Table::Profiles, &profile);

        info!(principal = %principal_id, "Registered principal");
        Ok((
            Authenticated {
                session: Session::new(principal_id, email),
                token_version,
            },
            profile,
        ))
    }

    /// Check an email/password pair. Every mismatch reads the same.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Authenticated> {
        let Some(credential) = self.backend.find_credential(email).await? else {
            debug!("Login for unknown email");
            return Err(invalid_credentials());
        };

        if !verify_password(password, &credential.password_hash)? {
            debug!(principal = %credential.principal_id, "Login with wrong password");
            return Err(invalid_credentials());
        }

        info!(principal = %credential.principal_id, "Principal logged in");
        Ok(Authenticated {
            session: Session::new(credential.principal_id, credential.email),
            token_version: credential.token_version,
        })
    }

    /// The session's own profile
    pub async fn me(&self, session: &Session) -> Result<Profile> {
        self.backend
            .get_profile(session.principal_id)
            .await?
            .ok_or_else(|| WatchpostError::Unauthorized("No profile for this principal".into()))
    }
}
