// Connectivity checks against the target server
use anyhow::{Context, Result, anyhow};
use sqlx::{Connection, MySqlConnection};
use tracing::info;
use url::Url;

use crate::config::Credentials;

/// Classic-protocol connection URL for the target server, with the secret percent-encoded.
pub fn target_server_url(credentials: &Credentials) -> Result<Url> {
    let mut url = Url::parse(&format!("mysql://{}:{}", credentials.host, credentials.port))
        .with_context(|| {
            format!(
                "Invalid server address {}:{}",
                credentials.host, credentials.port
            )
        })?;
    url.set_username(&credentials.user)
        .map_err(|()| anyhow!("Cannot use {} as a database user", credentials.user))?;
    if !credentials.secret().is_empty() {
        url.set_password(Some(credentials.secret()))
            .map_err(|()| anyhow!("Cannot set a password on the target server URL"))?;
    }
    Ok(url)
}

/// Opens and closes one connection to make sure the target server is reachable.
pub async fn check_db_connection(credentials: &Credentials) -> Result<()> {
    let url = target_server_url(credentials)?;
    let connection = MySqlConnection::connect(url.as_str())
        .await
        .with_context(|| {
            format!(
                "Failed to connect to {}:{} as {}",
                credentials.host, credentials.port, credentials.user
            )
        })?;
    connection
        .close()
        .await
        .context("Failed to close the preflight connection")?;

    info!(
        "Successfully connected to {}:{}",
        credentials.host, credentials.port
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_server_url_encodes_secret() -> Result<()> {
        let credentials = Credentials::new("10.0.0.5", 3306, "restore", "p@ss:w/rd");
        let url = target_server_url(&credentials)?;

        assert_eq!(url.scheme(), "mysql");
        assert_eq!(url.host_str(), Some("10.0.0.5"));
        assert_eq!(url.port(), Some(3306));
        assert_eq!(url.username(), "restore");
        assert!(url.password().is_some());
        assert!(!url.as_str().contains("p@ss:w/rd"));
        Ok(())
    }

    #[test]
    fn test_target_server_url_without_secret() -> Result<()> {
        let credentials = Credentials::new("db.internal", 3307, "admin", "");
        let url = target_server_url(&credentials)?;

        assert_eq!(url.password(), None);
        assert_eq!(url.as_str(), "mysql://admin@db.internal:3307");
        Ok(())
    }
}
