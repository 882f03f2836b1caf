//! # warden-reconcile
//!
//! One reconciliation pass: refresh the member snapshot from the remote API,
//! diff it against the ban list, and tag offenders as blocked.
//!
//! ## Pass
//!
//! 1. Fetch the network (tag schema). Abort if unavailable.
//! 2. Fetch all members. Abort if unavailable.
//! 3. Save each member; stale observations are skipped individually.
//! 4. Collect members whose address is banned and who are not yet blocked.
//! 5. For each candidate, re-fetch it and set its status tag to blocked.
//!    Candidates are handled concurrently; one failure never stops the rest.
//!
//! A pass has no timing logic. Repetition belongs to the caller, and
//! enforcement is eventually consistent across passes.

use std::net::IpAddr;
use std::sync::Arc;

use rusqlite::Connection;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use warden_db::queries::{bans, members};
use warden_db::DbError;
use warden_types::network::{Member, Network};
use warden_types::{Timestamp, BLOCKED_STATUS, STATUS_TAG};
use warden_ztapi::ZtApiClient;

/// Upper bound on in-flight enforcement requests within one pass.
pub const MAX_CONCURRENT_ENFORCEMENTS: usize = 8;

/// Reconciliation errors. Only local store failures surface here.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("store error: {0}")]
    Db(#[from] DbError),
}

pub type Result<T> = std::result::Result<T, ReconcileError>;

/// Why a pass stopped before enforcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    NetworkUnavailable,
    MembersUnavailable,
}

/// How a pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PassOutcome {
    #[default]
    Completed,
    Aborted(AbortReason),
}

/// Counters for one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    pub outcome: PassOutcome,
    /// Members returned by the API.
    pub fetched: usize,
    /// Members written to the store.
    pub saved: usize,
    /// Members skipped as stale.
    pub stale: usize,
    /// Banned members not yet blocked.
    pub candidates: usize,
    /// Candidates whose block tag was accepted.
    pub tagged: usize,
    /// Candidates that vanished remotely before tagging.
    pub missing: usize,
    /// Candidates whose tag update failed.
    pub failed: usize,
}

/// A member as it will be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberObservation {
    pub member_id: String,
    pub address: Option<IpAddr>,
    pub last_seen: Timestamp,
    pub status: String,
}

impl MemberObservation {
    /// Derive the stored form of a remote member under the network's schema.
    pub fn from_remote(network: &Network, member: &Member) -> Self {
        Self {
            member_id: member.id().to_string(),
            address: member.address(),
            last_seen: member.last_seen_secs(),
            status: network.tag_value_name(member, STATUS_TAG),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Enforcement {
    Tagged,
    Missing,
    Failed,
}

/// Run one reconciliation pass at time `now`.
///
/// Remote failures end the pass early or are counted; only store errors
/// are returned. The store lock is never held across a remote call.
pub async fn run_pass(
    db: &Mutex<Connection>,
    client: &ZtApiClient,
    network_id: &str,
    now: Timestamp,
) -> Result<PassReport> {
    let mut report = PassReport::default();

    let Some(network) = client.get_network(network_id).await else {
        warn!(network_id, "Network unavailable, skipping pass");
        report.outcome = PassOutcome::Aborted(AbortReason::NetworkUnavailable);
        return Ok(report);
    };

    let Some(remote_members) = client.get_members(network_id).await else {
        warn!(network_id, "Member list unavailable, skipping pass");
        report.outcome = PassOutcome::Aborted(AbortReason::MembersUnavailable);
        return Ok(report);
    };
    report.fetched = remote_members.len();

    let candidates = {
        let conn = db.lock().await;
        for member in &remote_members {
            if member.id().is_empty() {
                warn!(network_id, "Ignoring member without id");
                continue;
            }
            let obs = MemberObservation::from_remote(&network, member);
            match members::save_member(
                &conn,
                &obs.member_id,
                obs.address,
                obs.last_seen,
                &obs.status,
                now,
            )? {
                members::SaveOutcome::Saved => report.saved += 1,
                members::SaveOutcome::Stale => report.stale += 1,
            }
        }
        bans::find_members_to_block(&conn)?
    };
    report.candidates = candidates.len();

    if !candidates.is_empty() {
        info!(network_id, count = candidates.len(), "Blocking banned members");
    }

    let network = Arc::new(network);
    let permits = Arc::new(Semaphore::new(MAX_CONCURRENT_ENFORCEMENTS));
    let mut tasks = JoinSet::new();
    for member_id in candidates {
        let client = client.clone();
        let network = Arc::clone(&network);
        let permits = Arc::clone(&permits);
        tasks.spawn(async move {
            let _permit = permits.acquire_owned().await.ok();
            enforce(&client, &network, &member_id).await
        });
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Enforcement::Tagged) => report.tagged += 1,
            Ok(Enforcement::Missing) => report.missing += 1,
            Ok(Enforcement::Failed) => report.failed += 1,
            Err(e) => {
                warn!(network_id, "Enforcement task failed: {e}");
                report.failed += 1;
            }
        }
    }

    info!(
        network_id,
        fetched = report.fetched,
        saved = report.saved,
        stale = report.stale,
        candidates = report.candidates,
        tagged = report.tagged,
        missing = report.missing,
        failed = report.failed,
        "Reconciliation pass complete"
    );
    Ok(report)
}

/// Re-fetch a candidate and tag it blocked.
async fn enforce(client: &ZtApiClient, network: &Network, member_id: &str) -> Enforcement {
    let Some(member) = client.get_member(&network.id, member_id).await else {
        debug!(member_id, "Candidate not available remotely");
        return Enforcement::Missing;
    };

    if client
        .tag_member(network, &member, STATUS_TAG, BLOCKED_STATUS)
        .await
    {
        Enforcement::Tagged
    } else {
        warn!(member_id, "Failed to block member, will retry next pass");
        Enforcement::Failed
    }
}
