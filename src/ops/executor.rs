//! Statement execution seam
//!
//! Actual database connectivity lives outside this crate; operations talk to
//! a [`StatementExecutor`] which a driver adapter implements. The crate ships
//! a recording executor for tests and a script renderer for offline use.

use std::collections::VecDeque;
use std::io::Write;

use crate::error::Result;
use crate::ops::sql::SqlStatement;

/// Executes parameterized SQL statements against some backing store,
/// returning the number of affected rows
pub trait StatementExecutor {
    fn execute(&mut self, statement: &SqlStatement) -> Result<usize>;
}

/// Test executor that records every statement.
///
/// Each execution reports one affected row unless queued responses say
/// otherwise; queue zeros to exercise the refresh update-then-insert path.
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    executed: Vec<SqlStatement>,
    responses: VecDeque<usize>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue affected-row counts for upcoming executions
    pub fn with_responses(responses: impl IntoIterator<Item = usize>) -> Self {
        Self {
            executed: Vec::new(),
            responses: responses.into_iter().collect(),
        }
    }

    pub fn executed(&self) -> &[SqlStatement] {
        &self.executed
    }

    pub fn sql(&self) -> Vec<&str> {
        self.executed.iter().map(|s| s.sql.as_str()).collect()
    }
}

impl StatementExecutor for RecordingExecutor {
    fn execute(&mut self, statement: &SqlStatement) -> Result<usize> {
        self.executed.push(statement.clone());
        Ok(self.responses.pop_front().unwrap_or(1))
    }
}

/// Executor that renders each statement as a literal SQL script line
pub struct ScriptExecutor<W: Write> {
    out: W,
}

impl<W: Write> ScriptExecutor<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> StatementExecutor for ScriptExecutor<W> {
    fn execute(&mut self, statement: &SqlStatement) -> Result<usize> {
        writeln!(self.out, "{};", statement.render_literals())?;
        Ok(1)
    }
}
