//! Deterministic credential-selection policy: managed identity when the
//! environment indicates a managed host, CLI credentials for local
//! development, a composite credential as the final fallback.

use crate::error::{EngineError, ErrorCode, Result};

/// Indicator variables present only when running on a managed-identity
/// capable host.
const MANAGED_HOST_INDICATORS: &[&str] = &[
    "WEBSITE_SITE_NAME",
    "AZURE_CLIENT_ID",
    "MSI_ENDPOINT",
    "IDENTITY_ENDPOINT",
    "KUBERNETES_SERVICE_HOST",
    "CONTAINER_REGISTRY_LOGIN",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    ManagedIdentity { client_id: Option<String> },
    AzureCliDeveloper,
    AzureCliInteractive,
    Composite,
}

fn running_on_managed_host() -> bool {
    MANAGED_HOST_INDICATORS.iter().any(|var| std::env::var(var).is_ok())
}

/// Select which credential kind to construct, without constructing the
/// actual SDK credential object (an external collaborator concern).
pub fn select_credential() -> Result<Credential> {
    if running_on_managed_host() {
        return Ok(Credential::ManagedIdentity {
            client_id: std::env::var("AZURE_CLIENT_ID").ok(),
        });
    }
    if std::env::var("AZURE_CLI_DEVELOPER_AUTH").is_ok() {
        return Ok(Credential::AzureCliDeveloper);
    }
    if std::env::var("AZURE_CLI_INTERACTIVE_AUTH").is_ok() {
        return Ok(Credential::AzureCliInteractive);
    }
    Ok(Credential::Composite)
}

/// Confirm a previously selected credential still looks viable; used by
/// the `validate-config` CLI command.
pub fn validate_credential(credential: &Credential) -> Result<()> {
    match credential {
        Credential::ManagedIdentity { .. } if !running_on_managed_host() => Err(EngineError::config_with_code(
            ErrorCode::CONFIG_CREDENTIAL_UNAVAILABLE,
            "managed identity selected but no managed-host indicator is present",
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_composite_without_any_indicator() {
        for var in MANAGED_HOST_INDICATORS {
            std::env::remove_var(var);
        }
        std::env::remove_var("AZURE_CLI_DEVELOPER_AUTH");
        std::env::remove_var("AZURE_CLI_INTERACTIVE_AUTH");
        assert_eq!(select_credential().unwrap(), Credential::Composite);
    }
}
