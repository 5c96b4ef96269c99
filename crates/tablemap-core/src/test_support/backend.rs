use crate::{
    backend::{Backend, Connection, Dialect},
    error::BackendExecutionError,
    statement::DboCommand,
    value::{RowDictionary, Value},
};
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, PoisonError},
};

///
/// MockLog
///
/// What the scripted backend observed.
///

#[derive(Clone, Debug, Default)]
pub(crate) struct MockLog {
    pub opened: usize,
    pub closed: usize,
    pub statements: Vec<String>,
    pub commands: Vec<DboCommand>,
}

#[derive(Debug, Default)]
struct MockState {
    log: MockLog,
    affected: VecDeque<Result<i64, BackendExecutionError>>,
    scalars: VecDeque<Result<Value, BackendExecutionError>>,
    readers: VecDeque<Result<Vec<RowDictionary>, BackendExecutionError>>,
}

///
/// MockBackend
///
/// Scripted backend: each call pops the next queued result of its kind,
/// falling back to one affected row, a null scalar, or an empty reader.
///

#[derive(Clone, Debug, Default)]
pub(crate) struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    fn with_state<R>(&self, f: impl FnOnce(&mut MockState) -> R) -> R {
        f(&mut self.state.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub(crate) fn log(&self) -> MockLog {
        self.with_state(|s| s.log.clone())
    }

    pub(crate) fn push_affected(&self, rows: i64) {
        self.with_state(|s| s.affected.push_back(Ok(rows)));
    }

    pub(crate) fn push_scalar(&self, value: Value) {
        self.with_state(|s| s.scalars.push_back(Ok(value)));
    }

    pub(crate) fn push_rows(&self, rows: Vec<RowDictionary>) {
        self.with_state(|s| s.readers.push_back(Ok(rows)));
    }

    pub(crate) fn fail_execute(&self, message: &str) {
        self.with_state(|s| {
            s.affected
                .push_back(Err(BackendExecutionError::new("mock", message)));
        });
    }

    pub(crate) fn fail_scalar(&self, message: &str) {
        self.with_state(|s| {
            s.scalars
                .push_back(Err(BackendExecutionError::new("mock", message)));
        });
    }

    pub(crate) fn fail_reader(&self, message: &str) {
        self.with_state(|s| {
            s.readers
                .push_back(Err(BackendExecutionError::new("mock", message)));
        });
    }
}

impl Backend for MockBackend {
    fn dialect(&self) -> Dialect {
        Dialect::SQLITE
    }

    fn connect(&self) -> Result<Box<dyn Connection>, BackendExecutionError> {
        Ok(Box::new(MockConnection {
            backend: self.clone(),
        }))
    }
}

struct MockConnection {
    backend: MockBackend,
}

impl MockConnection {
    fn record(&self, command: &DboCommand) {
        self.backend.with_state(|s| {
            s.log.statements.push(command.text().to_string());
            s.log.commands.push(command.clone());
        });
    }
}

impl Connection for MockConnection {
    fn open(&mut self) -> Result<(), BackendExecutionError> {
        self.backend.with_state(|s| s.log.opened += 1);
        Ok(())
    }

    fn close(&mut self) -> Result<(), BackendExecutionError> {
        self.backend.with_state(|s| s.log.closed += 1);
        Ok(())
    }

    fn execute(&mut self, command: &DboCommand) -> Result<i64, BackendExecutionError> {
        self.record(command);
        self.backend
            .with_state(|s| s.affected.pop_front().unwrap_or(Ok(1)))
    }

    fn execute_scalar(&mut self, command: &DboCommand) -> Result<Value, BackendExecutionError> {
        self.record(command);
        self.backend
            .with_state(|s| s.scalars.pop_front().unwrap_or(Ok(Value::Null)))
    }

    fn execute_reader(
        &mut self,
        command: &DboCommand,
    ) -> Result<Vec<RowDictionary>, BackendExecutionError> {
        self.record(command);
        self.backend
            .with_state(|s| s.readers.pop_front().unwrap_or_else(|| Ok(Vec::new())))
    }
}
