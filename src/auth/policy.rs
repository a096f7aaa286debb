//! Row-level authorization policy
//!
//! Every read and write against the three stores is admitted or denied by
//! [`is_allowed`], evaluated against the caller's id and a role looked up
//! fresh from the profile store. Reads the caller may not see are filtered
//! out rather than failed.

use serde::Serialize;
use std::fmt;
use uuid::Uuid;

use crate::models::Role;

/// Store a predicate applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Profiles,
    IncidentReports,
    DistressNotifications,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Profiles => "profiles",
            Table::IncidentReports => "incident_reports",
            Table::DistressNotifications => "distress_notifications",
        }
    }

    /// Column holding the owning principal for this table
    pub fn owner_column(&self) -> &'static str {
        match self {
            Table::Profiles => "id",
            Table::IncidentReports => "reporter_id",
            Table::DistressNotifications => "user_id",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operation being attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Read,
    Insert,
    Update,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Read => write!(f, "read"),
            Operation::Insert => write!(f, "insert"),
            Operation::Update => write!(f, "update"),
        }
    }
}

/// Caller identity with its freshly resolved role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub id: Uuid,
    pub role: Role,
}

impl Caller {
    pub fn new(id: Uuid, role: Role) -> Self {
        Self { id, role }
    }

    pub fn is_officer(&self) -> bool {
        self.role == Role::Officer
    }

    fn owns(&self, owner: Uuid) -> bool {
        self.id == owner
    }
}

/// Decide whether `caller` may perform `op` on a row of `table` owned by `owner`.
///
/// `owner` is the value of [`Table::owner_column`] on the row (or on the row
/// being inserted).
pub fn is_allowed(table: Table, op: Operation, caller: &Caller, owner: Uuid) -> bool {
    match (table, op) {
        // Reads: own rows, or any row for officers
        (_, Operation::Read) => caller.owns(owner) || caller.is_officer(),

        (Table::Profiles, Operation::Insert) => caller.owns(owner),
        (Table::Profiles, Operation::Update) => caller.owns(owner),

        (Table::IncidentReports, Operation::Insert) => caller.owns(owner),
        (Table::IncidentReports, Operation::Update) => caller.is_officer(),

        (Table::DistressNotifications, Operation::Insert) => caller.is_officer(),
        (Table::DistressNotifications, Operation::Update) => caller.owns(owner),
    }
}

/// Which rows a list query should fetch for a caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadScope {
    /// Every row in the table
    All,
    /// Only rows whose owner column equals this principal
    Owned(Uuid),
}

/// Push the read predicate down into a list query
pub fn read_scope(_table: Table, caller: &Caller) -> ReadScope {
    if caller.is_officer() {
        ReadScope::All
    } else {
        ReadScope::Owned(caller.id)
    }
}

/// Keep only rows the caller may read
pub fn filter_readable<T>(
    table: Table,
    caller: &Caller,
    rows: Vec<T>,
    owner_of: impl Fn(&T) -> Uuid,
) -> Vec<T> {
    rows.into_iter()
        .filter(|row| is_allowed(table, Operation::Read, caller, owner_of(row)))
        .collect()
}

/// Human-readable description of a check for logging
pub fn describe(table: Table, op: Operation) -> &'static str {
    match (table, op) {
        (Table::Profiles, Operation::Read) => "Read profile",
        (Table::Profiles, Operation::Insert) => "Create profile",
        (Table::Profiles, Operation::Update) => "Update profile",
        (Table::IncidentReports, Operation::Read) => "Read incident report",
        (Table::IncidentReports, Operation::Insert) => "Submit incident report",
        (Table::IncidentReports, Operation::Update) => "Update incident report",
        (Table::DistressNotifications, Operation::Read) => "Read distress notification",
        (Table::DistressNotifications, Operation::Insert) => "Send distress notification",
        (Table::DistressNotifications, Operation::Update) => "Acknowledge distress notification",
    }
}
