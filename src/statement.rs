//! Statement execution engine.
//!
//! A `Statement` drives one prepared statement handle through
//! `Prepared -> Binding -> Executing -> {Succeeded, Cancelled, Failed}`.
//!
//! `SQLExecute` blocks inside the driver, so it runs on tokio's blocking pool
//! while the calling task races it against a `CancellationToken` and the
//! configured query timeout. If the race is lost the engine issues
//! `SQLCancel` on the same handle and returns `Error::Cancelled` right away.
//! The background call still returns later; its task, which also owns the
//! bound parameter buffers, is parked on the statement and awaited by the
//! next operation before the handle is touched again.
//!
//! The task is parked before the race starts, so dropping the `execute`
//! future leaves the same state as a cancel: `SQLCancel` is issued from the
//! drop and the next operation waits for the driver to return.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::cli::handle::{CliStatement, CliStatementExt, FreeStmt, SqlReturn};
use crate::cli::out::write_outputs;
use crate::cli::param::{Arg, BoundParam, PreparedArg};
use crate::cursor::Rows;
use crate::error::{CancelReason, Error, Result};
use crate::options::StatementOptions;

/// Interval between polls while the driver reports `SQL_STILL_EXECUTING`.
const STILL_EXECUTING_POLL: Duration = Duration::from_millis(10);

/// Result of the background execute: return code and the parameter buffers
/// it kept alive.
type Completion<H> = (SqlReturn, ParamLease<H>);

/// Parameter buffers lent to a background execute.
///
/// If the statement never takes them back (it was dropped while the execute
/// ran), the driver is told to forget them before they are freed.
struct ParamLease<H: CliStatement> {
    handle: Arc<H>,
    params: Vec<BoundParam>,
}

impl<H: CliStatement> ParamLease<H> {
    fn into_params(mut self) -> Vec<BoundParam> {
        std::mem::take(&mut self.params)
    }
}

impl<H: CliStatement> Drop for ParamLease<H> {
    fn drop(&mut self) {
        if self.params.is_empty() {
            return;
        }
        debug!(params = self.params.len(), "releasing parameters of abandoned execute");
        let ret = self.handle.free_stmt(FreeStmt::ResetParams);
        if !ret.is_success() {
            warn!(ret = ret.0, "SQL_RESET_PARAMS failed");
        }
    }
}

/// Issues `SQLCancel` if the `execute` future is dropped mid-race.
struct CancelOnDrop<H: CliStatement> {
    handle: Option<Arc<H>>,
}

impl<H: CliStatement> CancelOnDrop<H> {
    fn disarm(&mut self) {
        self.handle = None;
    }
}

impl<H: CliStatement> Drop for CancelOnDrop<H> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            debug!("execute future dropped, cancelling");
            let ret = handle.cancel();
            if !ret.is_success() {
                warn!(ret = ret.0, "SQLCancel failed");
            }
        }
    }
}

/// Lifecycle of a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementState {
    /// Prepared, nothing bound.
    Prepared,
    /// Arguments are being encoded and registered.
    Binding,
    /// Arguments registered, ready to execute.
    Bound,
    /// Execute is running.
    Executing,
    /// Last execute completed.
    Succeeded,
    /// Last execute was abandoned by cancellation or timeout.
    Cancelled,
    /// Last bind or execute failed.
    Failed,
}

/// A prepared statement.
///
/// The handle is supplied by the connection layer and stays valid for the
/// lifetime of the `Statement`.
pub struct Statement<H: CliStatement> {
    pub(crate) handle: Arc<H>,
    pub(crate) options: StatementOptions,
    pub(crate) params: Vec<BoundParam>,
    pending: Option<JoinHandle<Completion<H>>>,
    state: StatementState,
}

impl<H: CliStatement> Statement<H> {
    /// Wrap a prepared statement handle with default options.
    pub fn new(handle: H) -> Self {
        Self::with_options(handle, StatementOptions::default())
    }

    pub fn with_options(handle: H, options: StatementOptions) -> Self {
        Self {
            handle: Arc::new(handle),
            options,
            params: Vec::new(),
            pending: None,
            state: StatementState::Prepared,
        }
    }

    /// The underlying statement handle.
    pub fn handle(&self) -> &H {
        &self.handle
    }

    pub fn options(&self) -> &StatementOptions {
        &self.options
    }

    pub fn state(&self) -> StatementState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: StatementState) {
        self.state = state;
    }

    /// Whether a cancelled or abandoned execute has not been awaited yet.
    pub fn has_pending_execute(&self) -> bool {
        self.pending.is_some()
    }

    /// Wait for a cancelled execute to return and discard its outcome.
    ///
    /// Every other operation calls this first, so the handle is never used
    /// while the driver is still inside `SQLExecute`.
    pub async fn settle(&mut self) {
        let task = match self.pending.as_mut() {
            Some(task) => task,
            None => return,
        };
        let joined = task.await;
        self.pending = None;
        if self.state == StatementState::Executing {
            // the execute future was dropped before it saw the outcome
            self.state = StatementState::Cancelled;
        }
        match joined {
            Ok((ret, lease)) => {
                debug!(ret = ret.0, "discarding result of cancelled execute");
                if ret.is_success() {
                    let close = self.handle.free_stmt(FreeStmt::Close);
                    if !close.is_success() {
                        warn!(ret = close.0, "failed to close cursor of cancelled execute");
                    }
                }
                self.params = lease.into_params();
            }
            Err(err) => warn!(error = %err, "cancelled execute did not finish"),
        }
    }

    /// Number of parameter markers in the statement.
    pub async fn num_params(&mut self) -> Result<usize> {
        self.settle().await;
        let (ret, count) = self.handle.num_params();
        self.handle.check(ret)?;
        Ok(count.max(0) as usize)
    }

    /// Encode and register `args` in position order.
    ///
    /// Every argument is validated before the first native call; the first
    /// failure aborts the bind and releases what was already registered.
    pub async fn bind(&mut self, args: Vec<Arg>) -> Result<()> {
        self.settle().await;
        self.release_params();
        self.state = StatementState::Binding;

        let prepared = args
            .into_iter()
            .enumerate()
            .map(|(i, arg)| PreparedArg::prepare(i + 1, arg))
            .collect::<Result<Vec<_>>>();
        let prepared = match prepared {
            Ok(prepared) => prepared,
            Err(err) => {
                self.state = StatementState::Failed;
                return Err(err);
            }
        };

        let mut bound = Vec::with_capacity(prepared.len());
        for (i, arg) in prepared.into_iter().enumerate() {
            match arg.bind(self.handle.as_ref(), i + 1, &self.options) {
                Ok(param) => bound.push(param),
                Err(err) => {
                    debug!(position = i + 1, error = %err, "bind failed");
                    self.params = bound;
                    self.release_params();
                    self.state = StatementState::Failed;
                    return Err(err);
                }
            }
        }
        debug!(params = bound.len(), "arguments bound");
        self.params = bound;
        self.state = StatementState::Bound;
        Ok(())
    }

    /// Execute with the bound arguments.
    ///
    /// Output parameters are written to their slots on success. If any of
    /// them fails to decode, `Error::OutParameters` is returned but the
    /// statement still counts as executed and the other slots are written.
    pub async fn execute(&mut self, cancel: &CancellationToken) -> Result<()> {
        self.settle().await;
        if cancel.is_cancelled() {
            return Err(Error::Cancelled {
                reason: CancelReason::Signal,
            });
        }

        let lease = ParamLease {
            handle: Arc::clone(&self.handle),
            params: std::mem::take(&mut self.params),
        };
        let handle = Arc::clone(&self.handle);
        self.state = StatementState::Executing;
        debug!(params = lease.params.len(), "executing statement");

        let task = self.pending.insert(tokio::task::spawn_blocking(move || {
            let ret = execute_to_completion(handle.as_ref());
            (ret, lease)
        }));
        let mut guard = CancelOnDrop {
            handle: Some(Arc::clone(&self.handle)),
        };

        let timeout = self.options.query_timeout;
        let outcome = tokio::select! {
            biased;
            joined = task => Ok(joined),
            _ = cancel.cancelled() => Err(CancelReason::Signal),
            elapsed = deadline(timeout) => Err(CancelReason::Deadline(elapsed)),
        };
        guard.disarm();

        let reason = match outcome {
            Ok(joined) => {
                self.pending = None;
                return self.complete(joined);
            }
            Err(reason) => reason,
        };
        debug!(%reason, "cancelling execute");
        let ret = self.handle.cancel();
        if !ret.is_success() {
            warn!(ret = ret.0, "SQLCancel failed");
        }
        self.state = StatementState::Cancelled;
        Err(Error::Cancelled { reason })
    }

    fn complete(&mut self, joined: std::result::Result<Completion<H>, JoinError>) -> Result<()> {
        match joined {
            Ok((ret, lease)) => {
                self.params = lease.into_params();
                if ret.is_success() || ret.is_no_data() {
                    self.state = StatementState::Succeeded;
                    write_outputs(&self.params, &self.options.time_zone)
                } else {
                    self.state = StatementState::Failed;
                    Err(Error::from_diagnostics(&self.handle.diagnostics()))
                }
            }
            Err(err) => {
                // the lease was dropped with the task and reset the driver's bindings
                self.state = StatementState::Failed;
                Err(Error::Background {
                    message: err.to_string(),
                })
            }
        }
    }

    /// Rows affected by the last execute; `-1` when the driver cannot tell.
    ///
    /// A failure here does not undo the execute.
    pub async fn rows_affected(&mut self) -> Result<i64> {
        self.settle().await;
        let (ret, count) = self.handle.row_count();
        self.handle.check(ret)?;
        Ok(count as i64)
    }

    /// Open the result set produced by the last execute.
    pub async fn result_set(&mut self) -> Result<Rows<'_, H>> {
        self.settle().await;
        Rows::open(self)
    }

    /// Bind, execute and report the affected row count.
    pub async fn exec(&mut self, args: Vec<Arg>, cancel: &CancellationToken) -> Result<i64> {
        self.bind(args).await?;
        self.execute(cancel).await?;
        self.rows_affected().await
    }

    /// Bind, execute and open the result set.
    pub async fn query(
        &mut self,
        args: Vec<Arg>,
        cancel: &CancellationToken,
    ) -> Result<Rows<'_, H>> {
        self.bind(args).await?;
        self.execute(cancel).await?;
        self.result_set().await
    }

    /// Tell the driver to forget parameter buffers, then drop them.
    pub(crate) fn release_params(&mut self) {
        if self.params.is_empty() {
            return;
        }
        let ret = self.handle.free_stmt(FreeStmt::ResetParams);
        if !ret.is_success() {
            warn!(ret = ret.0, "SQL_RESET_PARAMS failed");
        }
        self.params.clear();
    }
}

impl<H: CliStatement> Drop for Statement<H> {
    fn drop(&mut self) {
        // A parked execute owns its buffers through its lease, which resets
        // them once the driver returns.
        self.release_params();
    }
}

/// Run `SQLExecute`, polling while the driver reports it is still running.
fn execute_to_completion<H: CliStatement + ?Sized>(handle: &H) -> SqlReturn {
    loop {
        let ret = handle.execute();
        if ret != SqlReturn::STILL_EXECUTING {
            return ret;
        }
        std::thread::sleep(STILL_EXECUTING_POLL);
    }
}

/// Resolve after `timeout`, or never.
async fn deadline(timeout: Option<Duration>) -> Duration {
    match timeout {
        Some(timeout) => {
            tokio::time::sleep(timeout).await;
            timeout
        }
        None => std::future::pending().await,
    }
}
