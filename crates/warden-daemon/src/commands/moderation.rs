//! Ban list command handlers.

use std::net::IpAddr;
use std::sync::Arc;

use tracing::info;
use warden_db::queries::bans;

use super::Output;
use crate::DaemonState;

/// Ban an address. Re-banning is a no-op.
pub async fn ban(state: &Arc<DaemonState>, address: IpAddr) -> Output {
    let db = state.db.lock().await;
    bans::ban(&db, address, warden_types::now())?;
    info!(%address, "Address banned");
    Ok(vec![format!("banned {address}")])
}

/// Lift a ban. Unbanning an unknown address is a no-op.
pub async fn unban(state: &Arc<DaemonState>, address: IpAddr) -> Output {
    let db = state.db.lock().await;
    let line = if bans::unban(&db, address)? {
        info!(%address, "Address unbanned");
        format!("unbanned {address}")
    } else {
        format!("{address} was not banned")
    };
    Ok(vec![line])
}

/// List banned addresses.
pub async fn bans(state: &Arc<DaemonState>) -> Output {
    let db = state.db.lock().await;
    Ok(bans::list_bans(&db)?)
}
