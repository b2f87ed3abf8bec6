use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Repository visible to an installation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Repository {
    pub id: i64,
    pub name: String,
    pub full_name: String,
    pub private: bool,
    #[serde(default)]
    pub default_branch: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Branch {
    pub name: String,
    #[serde(default)]
    pub protected: bool,
}

/// Account the App is installed on, as seen by the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct InstallationAccount {
    pub installation_id: i64,
    pub account_id: i64,
    pub login: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RepositoryPage {
    pub repositories: Vec<Repository>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct InstallationPage {
    pub installations: Vec<RawInstallation>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawInstallation {
    pub id: i64,
    pub account: RawAccount,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawAccount {
    pub id: i64,
    pub login: String,
}

impl From<RawInstallation> for InstallationAccount {
    fn from(raw: RawInstallation) -> Self {
        Self {
            installation_id: raw.id,
            account_id: raw.account.id,
            login: raw.account.login,
        }
    }
}
