//! Maintenance scheduler.
//!
//! One task runs every periodic job in turn, so scan, cleanup and
//! reconciliation never overlap:
//! 1. Game-list scan (`scan_interval_secs`)
//! 2. Sighting cleanup (`cleanup_interval_secs`)
//! 3. Reconciliation pass (`reconcile_interval_secs`)
//!
//! An interval of 0 disables the job. Store errors stop the scheduler;
//! remote and game-list failures are logged and retried on the next tick.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep_until, Instant};
use tracing::{info, warn};
use warden_db::queries::sightings::{self, CleanupStats};
use warden_reconcile::{PassOutcome, PassReport};
use warden_ztapi::{ZtApiClient, ZtApiError};

use crate::config::ApiConfig;
use crate::names::NamePolicy;
use crate::scan::{self, ScanError};
use crate::DaemonState;

/// Longest reconcile delay, as a multiple of the configured interval.
const MAX_BACKOFF_FACTOR: u32 = 4;

/// Delay before the next reconciliation pass.
///
/// Doubles with each consecutive aborted pass, up to
/// [`MAX_BACKOFF_FACTOR`] times the interval.
pub fn next_reconcile_delay(interval: Duration, consecutive_aborts: u32) -> Duration {
    let factor = 1u32
        .checked_shl(consecutive_aborts)
        .unwrap_or(MAX_BACKOFF_FACTOR)
        .min(MAX_BACKOFF_FACTOR);
    interval.saturating_mul(factor)
}

/// Build an API client, or `None` when no credential or network is set.
pub fn api_client(config: &ApiConfig) -> Result<Option<ZtApiClient>, ZtApiError> {
    if !config.is_configured() {
        return Ok(None);
    }
    ZtApiClient::new(&config.token, config.base_url.as_str(), config.timeout()).map(Some)
}

/// Run one reconciliation pass against the configured network.
pub async fn reconcile_once(
    state: &DaemonState,
    client: &ZtApiClient,
) -> warden_reconcile::Result<PassReport> {
    warden_reconcile::run_pass(
        &state.db,
        client,
        &state.config.api.network_id,
        warden_types::now(),
    )
    .await
}

/// Purge sightings older than the configured retention.
pub async fn cleanup_once(state: &DaemonState) -> warden_db::Result<CleanupStats> {
    let conn = state.db.lock().await;
    let stats = sightings::clean_up(
        &conn,
        warden_types::now(),
        state.config.maintenance.retention_secs(),
    )?;
    if stats.total() > 0 {
        info!(
            member_sightings = stats.member_sightings,
            player_sightings = stats.player_sightings,
            "Expired sightings removed"
        );
    }
    Ok(stats)
}

fn every(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

fn is_due(slot: Option<Instant>, now: Instant) -> bool {
    slot.is_some_and(|at| at <= now)
}

/// Run the scheduler until a store error occurs.
pub async fn run(state: Arc<DaemonState>) -> anyhow::Result<()> {
    let schedule = &state.config.maintenance;
    let client = api_client(&state.config.api)?;
    let policy = NamePolicy::from_config(&state.config.moderation)?;

    let scan_every = every(schedule.scan_interval_secs);
    let cleanup_every = every(schedule.cleanup_interval_secs);
    let reconcile_every = if client.is_some() {
        every(schedule.reconcile_interval_secs)
    } else {
        warn!("API token or network id not configured, reconciliation disabled");
        None
    };

    info!(
        scan = ?scan_every,
        cleanup = ?cleanup_every,
        reconcile = ?reconcile_every,
        banned_words = policy.word_count(),
        "Maintenance scheduler started"
    );

    let start = Instant::now();
    let mut next_scan = scan_every.map(|_| start);
    let mut next_cleanup = cleanup_every.map(|_| start);
    let mut next_reconcile = reconcile_every.map(|_| start);
    let mut consecutive_aborts = 0u32;

    loop {
        let Some(due) = [next_scan, next_cleanup, next_reconcile]
            .into_iter()
            .flatten()
            .min()
        else {
            warn!("No maintenance jobs enabled, scheduler exiting");
            return Ok(());
        };
        sleep_until(due).await;
        let tick = Instant::now();

        if let Some(interval) = scan_every.filter(|_| is_due(next_scan, tick)) {
            match scan::scan(&state.db, &state.config.gamelist, &policy, warden_types::now()).await
            {
                Ok(report) => {
                    if !report.hidden.is_empty() {
                        info!(games = ?report.hidden, "Games hidden by name policy");
                    }
                }
                Err(ScanError::GameList(e)) => warn!("Game-list scan failed: {e}"),
                Err(ScanError::Db(e)) => return Err(e.into()),
            }
            next_scan = Some(Instant::now() + interval);
        }

        if let Some(interval) = cleanup_every.filter(|_| is_due(next_cleanup, tick)) {
            cleanup_once(&state).await?;
            next_cleanup = Some(Instant::now() + interval);
        }

        if let (Some(interval), Some(client)) = (reconcile_every, client.as_ref()) {
            if is_due(next_reconcile, tick) {
                let report = reconcile_once(&state, client).await?;
                consecutive_aborts = match report.outcome {
                    PassOutcome::Completed => 0,
                    PassOutcome::Aborted(_) => consecutive_aborts.saturating_add(1),
                };
                let delay = next_reconcile_delay(interval, consecutive_aborts);
                if consecutive_aborts > 0 {
                    warn!(
                        consecutive_aborts,
                        delay_secs = delay.as_secs(),
                        "Reconciliation aborted, backing off"
                    );
                }
                next_reconcile = Some(Instant::now() + delay);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DaemonConfig;

    #[test]
    fn test_backoff_doubles_then_caps() {
        let interval = Duration::from_secs(300);
        assert_eq!(next_reconcile_delay(interval, 0), interval);
        assert_eq!(next_reconcile_delay(interval, 1), Duration::from_secs(600));
        assert_eq!(next_reconcile_delay(interval, 2), Duration::from_secs(1200));
        assert_eq!(next_reconcile_delay(interval, 3), Duration::from_secs(1200));
        assert_eq!(next_reconcile_delay(interval, u32::MAX), Duration::from_secs(1200));
    }

    #[test]
    fn test_zero_interval_disables_job() {
        assert_eq!(every(0), None);
        assert_eq!(every(60), Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_unconfigured_api_has_no_client() {
        let client = api_client(&ApiConfig::default()).expect("build");
        assert!(client.is_none());
    }

    #[test]
    fn test_configured_api_builds_client() {
        let config = ApiConfig {
            token: "secret".into(),
            network_id: "abc123".into(),
            ..ApiConfig::default()
        };
        let client = api_client(&config).expect("build").expect("configured");
        assert_eq!(client.base_url(), warden_ztapi::DEFAULT_BASE_URL);
    }

    #[tokio::test]
    async fn test_cleanup_once_uses_retention() {
        let state = DaemonState::new(warden_db::open_memory().expect("db"), DaemonConfig::default());
        let now = warden_types::now();
        {
            let conn = state.db.lock().await;
            let old = now - 15 * warden_types::SECS_PER_DAY;
            sightings::record_player_game_sighting(&conn, "Old", "Game", old).expect("old");
            sightings::record_player_game_sighting(&conn, "New", "Game", now).expect("new");
        }

        let stats = cleanup_once(&state).await.expect("cleanup");
        assert_eq!(stats.player_sightings, 1);
        assert_eq!(stats.member_sightings, 0);
    }

    #[tokio::test]
    async fn test_run_exits_when_nothing_enabled() {
        let mut config = DaemonConfig::default();
        config.maintenance.scan_interval_secs = 0;
        config.maintenance.cleanup_interval_secs = 0;
        let state = Arc::new(DaemonState::new(warden_db::open_memory().expect("db"), config));

        run(state).await.expect("run");
    }
}
