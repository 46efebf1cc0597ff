// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Connection validity probing
//!
//! A positive timeout races the engine probe against a deadline on a shared
//! tokio runtime. The probe runs on the blocking pool and keeps running after
//! the deadline passes; only its answer is dropped. Callers that are
//! themselves inside a runtime have the race driven from a scoped thread.

use crate::backend::GraphEngine;
use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::{Builder, Runtime};

static PROBE_RUNTIME: Lazy<Option<Runtime>> = Lazy::new(|| {
    Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("graphlite-dbc-probe")
        .enable_time()
        .build()
        .map_err(|e| log::warn!("could not start the probe runtime: {}", e))
        .ok()
});

/// Answer whether the engine is usable within `timeout_secs`
///
/// `0` waits for the probe without a deadline. A closed connection is never
/// valid and is not probed.
pub(crate) fn is_valid<E: GraphEngine>(
    engine: &Arc<E>,
    closed: bool,
    timeout_secs: i64,
) -> Result<bool> {
    if timeout_secs < 0 {
        return Err(Error::IllegalState(
            "Timeout can't be less than zero".to_string(),
        ));
    }
    if closed {
        return Ok(false);
    }

    if timeout_secs == 0 {
        return Ok(report(engine.probe()));
    }

    let Some(runtime) = PROBE_RUNTIME.as_ref() else {
        return Ok(report(engine.probe()));
    };
    let engine = Arc::clone(engine);
    let deadline = Duration::from_secs(timeout_secs as u64);
    let race = move || {
        runtime.block_on(async move {
            tokio::time::timeout(deadline, tokio::task::spawn_blocking(move || engine.probe()))
                .await
        })
    };
    // block_on panics on a thread that already drives a runtime
    let answer = if tokio::runtime::Handle::try_current().is_ok() {
        match std::thread::scope(|scope| scope.spawn(race).join()) {
            Ok(answer) => answer,
            Err(_) => {
                log::warn!("probe thread panicked");
                return Ok(false);
            }
        }
    } else {
        race()
    };

    Ok(match answer {
        Ok(Ok(outcome)) => report(outcome),
        Ok(Err(join_error)) => {
            log::warn!("probe task failed: {}", join_error);
            false
        }
        Err(_) => {
            log::debug!("probe did not answer within {}s", timeout_secs);
            false
        }
    })
}

fn report(outcome: Result<()>) -> bool {
    match outcome {
        Ok(()) => true,
        Err(e) => {
            log::debug!("probe failed: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{EngineTransaction, QueryOutput};

    struct FixedEngine {
        healthy: bool,
    }

    struct NoTransaction;

    impl EngineTransaction for NoTransaction {
        fn run(&mut self, _query: &str) -> Result<QueryOutput> {
            Err(Error::EngineExecution("unused".to_string()))
        }
        fn success(&mut self) {}
        fn failure(&mut self) {}
        fn finalize(self) -> Result<()> {
            Ok(())
        }
    }

    impl GraphEngine for FixedEngine {
        type Transaction = NoTransaction;

        fn begin(&self) -> Result<NoTransaction> {
            Ok(NoTransaction)
        }

        fn probe(&self) -> Result<()> {
            if self.healthy {
                Ok(())
            } else {
                Err(Error::EngineExecution("database unavailable".to_string()))
            }
        }
    }

    #[test]
    fn test_negative_timeout_is_rejected() {
        let engine = Arc::new(FixedEngine { healthy: true });
        assert!(matches!(
            is_valid(&engine, false, -1),
            Err(Error::IllegalState(_))
        ));
    }

    #[test]
    fn test_probe_outcomes() {
        let healthy = Arc::new(FixedEngine { healthy: true });
        let broken = Arc::new(FixedEngine { healthy: false });
        assert!(is_valid(&healthy, false, 0).unwrap());
        assert!(is_valid(&healthy, false, 1).unwrap());
        assert!(!is_valid(&broken, false, 0).unwrap());
        assert!(!is_valid(&broken, false, 1).unwrap());
        assert!(!is_valid(&healthy, true, 0).unwrap());
    }

    #[tokio::test]
    async fn test_timed_probe_inside_current_thread_runtime() {
        let healthy = Arc::new(FixedEngine { healthy: true });
        let broken = Arc::new(FixedEngine { healthy: false });
        assert!(is_valid(&healthy, false, 1).unwrap());
        assert!(!is_valid(&broken, false, 1).unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_timed_probe_inside_multi_thread_runtime() {
        let healthy = Arc::new(FixedEngine { healthy: true });
        assert!(is_valid(&healthy, false, 5).unwrap());
        assert!(is_valid(&healthy, false, 0).unwrap());
    }
}
