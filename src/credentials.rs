use async_trait::async_trait;
use std::collections::HashMap;
use std::env;

use crate::error::CredentialError;

/// Access material for the object store holding raw files.
#[derive(Debug, Clone)]
pub struct AwsCredentials {
    pub access_key: String,
    pub secret_key: String,
}

/// Source of object-store credentials, owned by the caller.
///
/// Staging tasks look credentials up by id at execution time, so rotated
/// secrets are picked up without rebuilding the pipeline.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn get_credentials(&self, credential_id: &str) -> Result<AwsCredentials, CredentialError>;
}

/// Reads `<ID>_ACCESS_KEY_ID` and `<ID>_SECRET_ACCESS_KEY` from the
/// environment, with the credential id uppercased.
#[derive(Debug, Clone, Default)]
pub struct EnvCredentialProvider;

impl EnvCredentialProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CredentialProvider for EnvCredentialProvider {
    async fn get_credentials(&self, credential_id: &str) -> Result<AwsCredentials, CredentialError> {
        let prefix = credential_id.to_uppercase();
        let access_var = format!("{}_ACCESS_KEY_ID", prefix);
        let secret_var = format!("{}_SECRET_ACCESS_KEY", prefix);

        let access_key = env::var(&access_var).map_err(|_| CredentialError::MissingVar(access_var))?;
        let secret_key = env::var(&secret_var).map_err(|_| CredentialError::MissingVar(secret_var))?;

        Ok(AwsCredentials {
            access_key,
            secret_key,
        })
    }
}

/// Fixed credential map for tests and embedded use.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentialProvider {
    entries: HashMap<String, AwsCredentials>,
}

impl StaticCredentialProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credentials(
        mut self,
        credential_id: impl Into<String>,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        self.entries.insert(
            credential_id.into(),
            AwsCredentials {
                access_key: access_key.into(),
                secret_key: secret_key.into(),
            },
        );
        self
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentialProvider {
    async fn get_credentials(&self, credential_id: &str) -> Result<AwsCredentials, CredentialError> {
        self.entries
            .get(credential_id)
            .cloned()
            .ok_or_else(|| CredentialError::Unknown(credential_id.to_string()))
    }
}
