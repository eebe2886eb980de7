//! Transaction enlistment contracts.
//!
//! The session cache itself never touches a database; the transactional
//! session manager couples cache scopes with transactions through these
//! seams. A [`Transaction`] commits by value - dropping one without
//! committing rolls it back.

use std::time::Duration;

/// Represents a transaction. To roll back a transaction, drop it without
/// calling [`Transaction::commit`].
pub trait Transaction {
    /// Commits the transaction.
    fn commit(self: Box<Self>);
}

/// Indicates how transaction enlistment should occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnlistmentOption {
    /// Use an ambient transaction, if present; otherwise, enlist in a new
    /// transaction.
    #[default]
    AmbientOrNew,
    /// Always enlist in a new transaction.
    AlwaysNew,
}

/// Indicates the transaction isolation level to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolationLevel {
    ReadCommitted,
    ReadUncommitted,
    RepeatableRead,
    Serializable,
    Snapshot,
}

/// Options controlling transaction enlistment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EnlistmentOptions {
    /// How to enlist relative to an ambient transaction.
    pub option: EnlistmentOption,
    /// Isolation level, when the underlying manager supports one.
    pub isolation_level: Option<IsolationLevel>,
    /// Transaction timeout, when the underlying manager supports one.
    pub timeout: Option<Duration>,
}

impl EnlistmentOptions {
    /// Options with all defaults (ambient-or-new, manager-default isolation
    /// and timeout).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the enlistment option.
    pub fn with_option(mut self, option: EnlistmentOption) -> Self {
        self.option = option;
        self
    }

    /// Set the isolation level.
    pub fn with_isolation_level(mut self, isolation_level: IsolationLevel) -> Self {
        self.isolation_level = Some(isolation_level);
        self
    }

    /// Set the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Represents a way to enlist in a transaction.
pub trait TransactionManager {
    /// Enlists in a transaction.
    fn enlist(&self, options: EnlistmentOptions) -> Box<dyn Transaction>;
}

/// A transaction that takes no action whether it's committed or rolled back.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTransaction;

impl Transaction for NullTransaction {
    fn commit(self: Box<Self>) {}
}

/// A transaction manager that enlists in transactions that take no action
/// whether they are committed or rolled back. [`NullTransaction`] is the
/// type of enlisted transaction.
#[derive(Debug, Clone, Copy, Default)]
pub struct NonTransactionalTransactionManager;

impl TransactionManager for NonTransactionalTransactionManager {
    fn enlist(&self, _options: EnlistmentOptions) -> Box<dyn Transaction> {
        Box::new(NullTransaction)
    }
}
