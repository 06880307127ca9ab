// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};

use crate::{Image, Role};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialsInput {
    pub name: String,
    pub password: String,
}

impl CredentialsInput {
    pub fn new(name: &str, password: &str) -> Self {
        Self {
            name: name.to_owned(),
            password: password.to_owned(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("user name is required -- enter a name and retry");
        }
        if self.password.is_empty() {
            bail!("password is required -- enter a password and retry");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUserInput {
    pub role: Role,
    pub credentials: CredentialsInput,
}

impl NewUserInput {
    pub fn validate(&self) -> Result<()> {
        self.credentials.validate()
    }
}

impl Image {
    pub fn validate(&self) -> Result<()> {
        if self.digest.trim().is_empty() {
            bail!("image digest is required -- every uploaded image needs a digest");
        }
        if self.patient_id.trim().is_empty() {
            bail!(
                "image {} has no patient id -- choose a patient and retry",
                self.digest
            );
        }
        Ok(())
    }
}
