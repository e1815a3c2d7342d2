//! Renders validation events into BIRD control-socket commands.
//!
//! Every command has the shape
//! `<add|delete> roa <address>/<min> max <max> as <asn>[ table <name>]\n`.
//! The formatter computes the worst-case rendered length once, allocates a
//! single buffer of that size and refuses any event whose rendering would
//! exceed it. Nothing is ever truncated: an oversized event produces
//! [`FormatError::TooLong`] and leaves the buffer empty.

use std::fmt::{self, Write};

use roa_bridge_config::TableName;
use thiserror::Error;

use crate::event::{Action, ValidationEvent};

const ROA_KEYWORD: &str = " roa ";
const MAX_KEYWORD: &str = " max ";
const AS_KEYWORD: &str = " as ";
const TABLE_KEYWORD: &str = " table ";
const MAX_ADDRESS_WIDTH: usize = 39;
const MAX_LENGTH_WIDTH: usize = 3;
const MAX_ASN_WIDTH: usize = 10;

/// Errors raised while rendering a command.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum FormatError {
    /// The rendered command would not fit in the command budget.
    #[error("command of {length} bytes exceeds the {limit} byte budget")]
    TooLong {
        /// Bytes the full command would need.
        length: usize,
        /// Budget in force.
        limit: usize,
    },
}

/// Bounded formatter for `add roa` / `delete roa` commands.
#[derive(Debug)]
pub struct CommandFormatter {
    table_clause: String,
    operator_limit: Option<usize>,
    capacity: usize,
    buffer: String,
}

impl CommandFormatter {
    /// Builds a formatter for the optional table and operator length cap.
    ///
    /// The cap can only lower the computed worst case, never raise it.
    #[must_use]
    pub fn new(table: Option<&TableName>, operator_limit: Option<usize>) -> Self {
        let table_clause = table_clause(table);
        let capacity = budget(&table_clause, operator_limit);
        Self {
            table_clause,
            operator_limit,
            capacity,
            buffer: String::with_capacity(capacity),
        }
    }

    /// Maximum rendered length, terminator included.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Replaces the table clause and recomputes the budget.
    pub fn set_table(&mut self, table: Option<&TableName>) {
        self.table_clause = table_clause(table);
        self.capacity = budget(&self.table_clause, self.operator_limit);
        self.buffer = String::with_capacity(self.capacity);
    }

    /// Renders `event`, returning the newline-terminated command.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::TooLong`] when the command would exceed
    /// [`capacity`](Self::capacity).
    pub fn format(&mut self, event: &ValidationEvent) -> Result<&str, FormatError> {
        self.buffer.clear();
        let mut writer = BoundedWriter {
            buffer: &mut self.buffer,
            limit: self.capacity,
            required: 0,
        };
        render(&mut writer, event, &self.table_clause);
        let required = writer.required;
        if required > self.capacity {
            self.buffer.clear();
            return Err(FormatError::TooLong {
                length: required,
                limit: self.capacity,
            });
        }
        Ok(&self.buffer)
    }
}

fn table_clause(table: Option<&TableName>) -> String {
    table.map_or_else(String::new, |name| format!("{TABLE_KEYWORD}{name}"))
}

fn budget(table_clause: &str, operator_limit: Option<usize>) -> usize {
    let longest_verb = Action::Announce.verb().len().max(Action::Withdraw.verb().len());
    let worst_case = longest_verb
        + ROA_KEYWORD.len()
        + MAX_ADDRESS_WIDTH
        + 1
        + MAX_LENGTH_WIDTH
        + MAX_KEYWORD.len()
        + MAX_LENGTH_WIDTH
        + AS_KEYWORD.len()
        + MAX_ASN_WIDTH
        + table_clause.len()
        + 1;
    operator_limit.map_or(worst_case, |limit| limit.min(worst_case))
}

fn render(writer: &mut BoundedWriter<'_>, event: &ValidationEvent, table_clause: &str) {
    let origin = &event.origin;
    // The bounded writer never fails; it only records the overflow.
    let _ = writeln!(
        writer,
        "{verb}{ROA_KEYWORD}{address}/{min}{MAX_KEYWORD}{max}{AS_KEYWORD}{asn}{table_clause}",
        verb = event.action.verb(),
        address = origin.address,
        min = origin.min_length,
        max = origin.max_length,
        asn = origin.origin_asn,
    );
}

/// Appends while the total stays within `limit` and counts every byte asked for.
struct BoundedWriter<'a> {
    buffer: &'a mut String,
    limit: usize,
    required: usize,
}

impl Write for BoundedWriter<'_> {
    fn write_str(&mut self, chunk: &str) -> fmt::Result {
        self.required += chunk.len();
        if self.required <= self.limit {
            self.buffer.push_str(chunk);
        }
        Ok(())
    }
}
