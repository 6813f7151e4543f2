// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Bearer tokens for the Azure Resource Manager API.
//!
//! Acquiring tokens is the job of the environment (workload identity sidecars,
//! `az account get-access-token`, a secret mounted by an external refresher).
//! The controller only reads them.

use crate::dns_errors::ZoneError;
use std::path::PathBuf;

/// Source of bearer tokens for zone provider requests.
#[async_trait::async_trait]
pub trait TokenSource: Send + Sync {
    /// Return the token to send with the next request.
    ///
    /// # Errors
    ///
    /// Returns [`ZoneError::Credentials`] if no usable token is available.
    async fn bearer_token(&self) -> Result<String, ZoneError>;
}

/// A fixed token supplied at startup.
pub struct StaticToken(String);

impl StaticToken {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait::async_trait]
impl TokenSource for StaticToken {
    async fn bearer_token(&self) -> Result<String, ZoneError> {
        if self.0.trim().is_empty() {
            return Err(ZoneError::Credentials {
                reason: "static access token is empty".to_string(),
            });
        }
        Ok(self.0.trim().to_string())
    }
}

/// A token file re-read on every request, so it can be rotated underneath us.
pub struct TokenFile {
    path: PathBuf,
}

impl TokenFile {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl TokenSource for TokenFile {
    async fn bearer_token(&self) -> Result<String, ZoneError> {
        let contents =
            tokio::fs::read_to_string(&self.path)
                .await
                .map_err(|e| ZoneError::Credentials {
                    reason: format!("failed to read token file {}: {e}", self.path.display()),
                })?;

        let token = contents.trim();
        if token.is_empty() {
            return Err(ZoneError::Credentials {
                reason: format!("token file {} is empty", self.path.display()),
            });
        }
        Ok(token.to_string())
    }
}
