//! Compile-state registry (spec.md §4.1, component C1): a process-wide
//! `table_name -> (ddl, owner, state)` map, visible to all concurrent
//! callers for diagnostic inspection.
//!
//! A flat `DashMap` is the right generalization of the teacher's own
//! `schema::schema::Metadata` (a `RwLock<HashMap<_>>>` nesting
//! catalog/schema/table levels): our registry has one level, keyed
//! directly by table name, so a single concurrent map is enough and avoids
//! hand-rolled lock scopes for something this shallow.

use dashmap::DashMap;
use qmodel::TableDdlRef;
use tracing::instrument;

/// Lifecycle state of a table's compiled DDL module (spec.md §3, Compile state).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CompileState {
    Compiling,
    Compiled,
    Failed,
}

#[derive(Clone, Debug)]
struct Row {
    table: String,
    ddl: TableDdlRef,
    owner: String,
    state: CompileState,
}

/// `get_state` also needs to say "never inserted", which isn't itself a
/// `CompileState` (spec.md §4.1).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LookupResult {
    Compiling,
    Compiled,
    Failed,
    NotFound,
}

#[derive(Debug, Default)]
pub struct CompileRegistry {
    rows: DashMap<String, Row>,
}

impl CompileRegistry {
    pub fn create() -> Self {
        CompileRegistry { rows: DashMap::new() }
    }

    /// Unconditional upsert; always succeeds.
    #[instrument(skip(self, ddl))]
    pub fn insert(&self, table: impl Into<String>, ddl: TableDdlRef, owner: impl Into<String>, state: CompileState) {
        let table = table.into();
        self.rows.insert(table.clone(), Row { table, ddl, owner: owner.into(), state });
    }

    /// `true` only when the current state is `compiling`; carries the owner.
    pub fn is_compiling(&self, table: &str) -> Option<String> {
        self.rows.get(table).and_then(|row| (row.state == CompileState::Compiling).then(|| row.owner.clone()))
    }

    pub fn get_state(&self, table: &str) -> LookupResult {
        match self.rows.get(table).map(|row| row.state) {
            Some(CompileState::Compiling) => LookupResult::Compiling,
            Some(CompileState::Compiled) => LookupResult::Compiled,
            Some(CompileState::Failed) => LookupResult::Failed,
            None => LookupResult::NotFound,
        }
    }

    pub fn get_ddl(&self, table: &str) -> Option<TableDdlRef> {
        self.rows.get(table).map(|row| row.ddl.clone())
    }

    /// Locates the (unique) row whose owner matches, preserving its
    /// `table`/`ddl` bindings, and flips its state. `not_found` if no row
    /// has that owner (spec.md §4.1).
    #[instrument(skip(self))]
    pub fn update_state(&self, owner: &str, new_state: CompileState) -> Result<(), RegistryError> {
        let table = self
            .rows
            .iter()
            .find(|entry| entry.value().owner == owner)
            .map(|entry| entry.key().clone())
            .ok_or(RegistryError::NotFound)?;
        if let Some(mut row) = self.rows.get_mut(&table) {
            row.state = new_state;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, thiserror::Error)]
pub enum RegistryError {
    #[error("no compile-state row owned by the given owner")]
    NotFound,
}
