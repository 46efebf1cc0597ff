//! Scriptable engine for probe and binder tests

#![allow(dead_code)]

use graphlite_dbc::{EngineTransaction, Error, GraphEngine, QueryOutput, Result, UpdateStatistics};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub enum ProbeBehavior {
    Healthy,
    Failing,
    Sleeping(Duration),
}

#[derive(Debug, Default)]
pub struct Counters {
    pub begun: AtomicUsize,
    pub committed: AtomicUsize,
    pub rolled_back: AtomicUsize,
    pub probes: AtomicUsize,
    pub released: AtomicUsize,
}

pub struct FakeEngine {
    probe: ProbeBehavior,
    pub counters: Arc<Counters>,
}

impl FakeEngine {
    pub fn new(probe: ProbeBehavior) -> Self {
        Self {
            probe,
            counters: Arc::new(Counters::default()),
        }
    }
}

impl GraphEngine for FakeEngine {
    type Transaction = FakeTransaction;

    fn begin(&self) -> Result<FakeTransaction> {
        self.counters.begun.fetch_add(1, Ordering::SeqCst);
        Ok(FakeTransaction {
            counters: Arc::clone(&self.counters),
            success: false,
            failure: false,
        })
    }

    fn probe(&self) -> Result<()> {
        self.counters.probes.fetch_add(1, Ordering::SeqCst);
        match self.probe {
            ProbeBehavior::Healthy => Ok(()),
            ProbeBehavior::Failing => Err(Error::EngineExecution("engine unavailable".to_string())),
            ProbeBehavior::Sleeping(duration) => {
                std::thread::sleep(duration);
                Ok(())
            }
        }
    }

    fn release(&self) {
        self.counters.released.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct FakeTransaction {
    counters: Arc<Counters>,
    success: bool,
    failure: bool,
}

impl EngineTransaction for FakeTransaction {
    /// `fail` errors; anything starting with `CREATE` reports one created node
    fn run(&mut self, query: &str) -> Result<QueryOutput> {
        if query == "fail" {
            return Err(Error::EngineExecution("Invalid input 'fail'".to_string()));
        }
        let nodes_created = usize::from(query.starts_with("CREATE"));
        Ok(QueryOutput::empty(UpdateStatistics {
            nodes_created,
            ..Default::default()
        }))
    }

    fn success(&mut self) {
        self.success = true;
    }

    fn failure(&mut self) {
        self.failure = true;
    }

    fn finalize(self) -> Result<()> {
        if self.success && !self.failure {
            self.counters.committed.fetch_add(1, Ordering::SeqCst);
        } else {
            self.counters.rolled_back.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}
