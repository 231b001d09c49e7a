//! The two periodic loops: deadline notifications and deadline-driven
//! auto-posting. Both poll once a minute; a tick that fails is logged and
//! the loop keeps going. Nothing inside a tick may kill the loop.

pub mod commitment;
pub mod deadline_watch;

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::state::AppState;

/// Scan cadence for both loops.
const TICK_PERIOD: Duration = Duration::from_secs(60);

pub fn spawn(state: AppState) -> Vec<JoinHandle<()>> {
    vec![
        tokio::spawn(run_deadline_watch(state.clone())),
        tokio::spawn(run_commitment_engine(state)),
    ]
}

async fn run_deadline_watch(state: AppState) {
    info!("deadline watch started, scanning every minute");
    let mut ticker = tokio::time::interval(TICK_PERIOD);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        if let Err(e) = deadline_watch::tick(&state).await {
            error!(error = %e, "deadline watch tick failed");
        }
    }
}

async fn run_commitment_engine(state: AppState) {
    info!("commitment engine started, scanning every minute");
    let mut ticker = tokio::time::interval(TICK_PERIOD);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        if let Err(e) = commitment::tick(&state).await {
            error!(error = %e, "commitment engine tick failed");
        }
    }
}
