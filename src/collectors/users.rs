use super::CollectError;
use crate::client::GatewayConnection;
use tracing::debug;

/// Retrieves the full set of known users through one connection.
///
/// A failure here fails the whole pass. TODO: a gateway with zero users is a
/// valid state; decide whether an enumeration failure should instead degrade
/// to an empty user set.
pub async fn enumerate(connection: &dyn GatewayConnection) -> Result<Vec<String>, CollectError> {
    let users = connection
        .list_users()
        .await
        .map_err(CollectError::UserEnumeration)?;
    debug!(count = users.len(), "user enumeration complete");
    Ok(users)
}
