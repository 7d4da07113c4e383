//! AWS IAM client wrapper

use aws_config::SdkConfig;
use aws_sdk_iam::error::SdkError;
use aws_sdk_iam::types::{AccessKey, Policy, User};
use aws_sdk_iam::Client;

use crate::aws::types::{AccessKeyInfo, PolicyDocument, PolicySummary, UserSummary};
use crate::error::IdentityServiceError;

/// Default cap on the number of users a listing returns.
pub const DEFAULT_LIST_LIMIT: i32 = 15;

/// IAM client wrapper with user, access key and policy administration.
pub struct IamClient {
    client: Client,
}

impl IamClient {
    /// Create a new IAM client from the shared SDK configuration.
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }

    /// Create a user with the given name.
    pub async fn create_user(&self, name: &str) -> Result<UserSummary, IdentityServiceError> {
        let response = self
            .client
            .create_user()
            .user_name(name)
            .send()
            .await
            .map_err(|e| IdentityServiceError::CreateUser {
                name: name.to_string(),
                source: e.into(),
            })?;

        let user = response.user().ok_or(IdentityServiceError::MissingField { field: "user" })?;
        Ok(summarize_user(user))
    }

    /// Look up a user by name.
    pub async fn get_user(&self, name: &str) -> Result<UserSummary, IdentityServiceError> {
        let response = match self.client.get_user().user_name(name).send().await {
            Ok(response) => response,
            Err(SdkError::ServiceError(err)) if err.err().is_no_such_entity_exception() => {
                return Err(IdentityServiceError::NoSuchUser {
                    name: name.to_string(),
                });
            }
            Err(e) => {
                return Err(IdentityServiceError::GetUser {
                    name: name.to_string(),
                    source: e.into(),
                });
            }
        };

        let user = response.user().ok_or(IdentityServiceError::MissingField { field: "user" })?;
        Ok(summarize_user(user))
    }

    /// Delete a user by name. Deleting a user that does not exist is
    /// reported as [`IdentityServiceError::NoSuchUser`], not as a generic
    /// failure.
    pub async fn delete_user(&self, name: &str) -> Result<(), IdentityServiceError> {
        match self.client.delete_user().user_name(name).send().await {
            Ok(_) => Ok(()),
            Err(SdkError::ServiceError(err)) if err.err().is_no_such_entity_exception() => {
                Err(IdentityServiceError::NoSuchUser {
                    name: name.to_string(),
                })
            }
            Err(e) => Err(IdentityServiceError::DeleteUser {
                name: name.to_string(),
                source: e.into(),
            }),
        }
    }

    /// List up to `max_items` users.
    pub async fn list_users(&self, max_items: i32) -> Result<Vec<UserSummary>, IdentityServiceError> {
        let response = self
            .client
            .list_users()
            .max_items(max_items)
            .send()
            .await
            .map_err(|e| IdentityServiceError::ListUsers { source: e.into() })?;

        Ok(response.users().iter().map(summarize_user).collect())
    }

    /// Create an access key pair for a user.
    pub async fn create_access_key(&self, user: &str) -> Result<AccessKeyInfo, IdentityServiceError> {
        let response = self
            .client
            .create_access_key()
            .user_name(user)
            .send()
            .await
            .map_err(|e| IdentityServiceError::CreateAccessKey {
                name: user.to_string(),
                source: e.into(),
            })?;

        let key = response
            .access_key()
            .ok_or(IdentityServiceError::MissingField { field: "access key" })?;

        Ok(summarize_access_key(key))
    }

    /// Create a managed policy from a policy document.
    pub async fn create_policy(
        &self,
        name: &str,
        document: &PolicyDocument,
    ) -> Result<PolicySummary, IdentityServiceError> {
        let body = serde_json::to_string(document)
            .map_err(|e| IdentityServiceError::EncodePolicy { source: e })?;

        let response = self
            .client
            .create_policy()
            .policy_name(name)
            .policy_document(body)
            .send()
            .await
            .map_err(|e| IdentityServiceError::CreatePolicy {
                name: name.to_string(),
                source: e.into(),
            })?;

        let policy = response
            .policy()
            .ok_or(IdentityServiceError::MissingField { field: "policy" })?;

        Ok(summarize_policy(policy))
    }

    /// Look up a managed policy by ARN.
    pub async fn get_policy(&self, arn: &str) -> Result<PolicySummary, IdentityServiceError> {
        let response = match self.client.get_policy().policy_arn(arn).send().await {
            Ok(response) => response,
            Err(SdkError::ServiceError(err)) if err.err().is_no_such_entity_exception() => {
                return Err(IdentityServiceError::NoSuchPolicy {
                    arn: arn.to_string(),
                });
            }
            Err(e) => {
                return Err(IdentityServiceError::GetPolicy {
                    arn: arn.to_string(),
                    source: e.into(),
                });
            }
        };

        let policy = response
            .policy()
            .ok_or(IdentityServiceError::MissingField { field: "policy" })?;

        Ok(summarize_policy(policy))
    }

    /// Delete a managed policy by ARN.
    pub async fn delete_policy(&self, arn: &str) -> Result<(), IdentityServiceError> {
        match self.client.delete_policy().policy_arn(arn).send().await {
            Ok(_) => Ok(()),
            Err(SdkError::ServiceError(err)) if err.err().is_no_such_entity_exception() => {
                Err(IdentityServiceError::NoSuchPolicy {
                    arn: arn.to_string(),
                })
            }
            Err(e) => Err(IdentityServiceError::DeletePolicy {
                arn: arn.to_string(),
                source: e.into(),
            }),
        }
    }
}

fn summarize_user(user: &User) -> UserSummary {
    UserSummary {
        name: user.user_name().to_string(),
        user_id: user.user_id().to_string(),
        arn: user.arn().to_string(),
        created: chrono::DateTime::from_timestamp(
            user.create_date().secs(),
            user.create_date().subsec_nanos(),
        ),
    }
}

fn summarize_access_key(key: &AccessKey) -> AccessKeyInfo {
    AccessKeyInfo {
        user_name: key.user_name().to_string(),
        access_key_id: key.access_key_id().to_string(),
        secret_access_key: key.secret_access_key().to_string(),
        status: key.status().as_str().to_string(),
    }
}

fn summarize_policy(policy: &Policy) -> PolicySummary {
    PolicySummary {
        name: policy.policy_name().map(|s| s.to_string()),
        arn: policy.arn().map(|s| s.to_string()),
        created: policy.create_date().map(|d| {
            chrono::DateTime::from_timestamp(d.secs(), d.subsec_nanos()).unwrap_or_default()
        }),
    }
}
