use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub(crate) const SERVICE_NAME: &str = "strive-store";

/// Credentials for the hosted record store. Never written to the config
/// file; the system keyring is the only place they live at rest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreCredentials {
    pub api_key: String,
    pub access_token: String,
}

/// Store record-store credentials in the system keyring via Secret Service.
pub async fn store_credentials(store_url: &str, creds: &StoreCredentials) -> Result<(), String> {
    let keyring = oo7::Keyring::new()
        .await
        .map_err(|e| format!("Failed to connect to keyring: {}", e))?;

    let mut attrs = HashMap::new();
    attrs.insert("service", SERVICE_NAME);
    attrs.insert("store_url", store_url);

    let secret = serde_json::to_string(creds)
        .map_err(|e| format!("Failed to encode credentials: {}", e))?;

    keyring
        .create_item(
            &format!("Strive record store ({})", store_url),
            &attrs,
            secret.as_bytes(),
            true, // replace existing
        )
        .await
        .map_err(|e| format!("Failed to store credentials: {}", e))?;

    Ok(())
}

/// Load record-store credentials from the system keyring, if present.
pub async fn load_credentials(store_url: &str) -> Result<Option<StoreCredentials>, String> {
    let keyring = oo7::Keyring::new()
        .await
        .map_err(|e| format!("Failed to connect to keyring: {}", e))?;

    let mut attrs = HashMap::new();
    attrs.insert("service", SERVICE_NAME);
    attrs.insert("store_url", store_url);

    let items = keyring
        .search_items(&attrs)
        .await
        .map_err(|e| format!("Failed to search keyring: {}", e))?;

    let Some(item) = items.first() else {
        return Ok(None);
    };
    let secret_bytes = item
        .secret()
        .await
        .map_err(|e| format!("Failed to read secret: {}", e))?;
    let creds = serde_json::from_slice(&secret_bytes)
        .map_err(|e| format!("Invalid credential secret: {}", e))?;
    Ok(Some(creds))
}

/// Delete record-store credentials from the system keyring.
pub async fn delete_credentials(store_url: &str) -> Result<(), String> {
    let keyring = oo7::Keyring::new()
        .await
        .map_err(|e| format!("Failed to connect to keyring: {}", e))?;

    let mut attrs = HashMap::new();
    attrs.insert("service", SERVICE_NAME);
    attrs.insert("store_url", store_url);

    let items = keyring
        .search_items(&attrs)
        .await
        .map_err(|e| format!("Failed to search keyring: {}", e))?;

    for item in items {
        item.delete()
            .await
            .map_err(|e| format!("Failed to delete credential: {}", e))?;
    }

    Ok(())
}
