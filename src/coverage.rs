//! On-demand coverage score.
//!
//! The score is the population the spotbeam covers over one orbit, computed
//! by the backend. Only one computation runs at a time; the result lands on
//! the status line.

use bevy::prelude::*;
use bevy::tasks::{IoTaskPool, Task, block_on, futures_lite::future};

use crate::backend::{Backend, FetchError};
use crate::control::{ControlCommand, ControlSet, StatusLine};
use crate::picker::group_thousands;

/// Coverage score request state.
#[derive(Resource, Default)]
pub struct CoverageScore {
    task: Option<Task<Result<i64, FetchError>>>,
    /// Last successful score
    pub last: Option<i64>,
}

impl CoverageScore {
    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }
}

pub fn coverage_message(score: i64) -> String {
    format!("Coverage score: {} people", group_thousands(score))
}

pub struct CoveragePlugin;

impl Plugin for CoveragePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CoverageScore>()
            .add_systems(Update, request_coverage_score.in_set(ControlSet))
            .add_systems(Update, collect_coverage_score.after(ControlSet));
    }
}

fn request_coverage_score(
    mut commands: MessageReader<ControlCommand>,
    mut coverage: ResMut<CoverageScore>,
    mut status: ResMut<StatusLine>,
    backend: Res<Backend>,
) {
    let requested = commands
        .read()
        .any(|c| matches!(c, ControlCommand::RequestCoverageScore));
    if !requested {
        return;
    }
    if coverage.is_running() {
        debug!("Coverage score already being computed");
        return;
    }

    info!("Requesting coverage score");
    status.info("Computing coverage score…");
    let source = backend.source();
    coverage.task = Some(IoTaskPool::get().spawn(async move { source.coverage_score() }));
}

fn collect_coverage_score(mut coverage: ResMut<CoverageScore>, mut status: ResMut<StatusLine>) {
    let Some(task) = coverage.task.as_mut() else {
        return;
    };
    let Some(result) = block_on(future::poll_once(task)) else {
        return;
    };
    coverage.task = None;

    match result {
        Ok(score) => {
            info!("Coverage score: {score}");
            coverage.last = Some(score);
            status.info(coverage_message(score));
        }
        Err(err) => {
            warn!("Coverage score failed: {err}");
            status.error(format!("Coverage score failed: {err}"));
        }
    }
}
