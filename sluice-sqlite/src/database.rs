use crate::{
    CBox,
    extract::{extract_name, extract_value},
};
use libsqlite3_sys::{
    SQLITE_DONE, SQLITE_OK, SQLITE_ROW, sqlite3, sqlite3_busy_timeout, sqlite3_changes64,
    sqlite3_close, sqlite3_column_count, sqlite3_errmsg, sqlite3_finalize,
    sqlite3_get_autocommit, sqlite3_last_insert_rowid, sqlite3_open_v2, sqlite3_prepare_v2,
    sqlite3_sql, sqlite3_step, sqlite3_stmt, sqlite3_total_changes64,
};
use sluice_core::{Context, Error, RawResultSet, RawUpdateResult, Result, Value, truncate_long};
use std::{
    ffi::{CStr, CString, c_char, c_int},
    ptr,
};

pub(crate) fn error_message_from_ptr(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return "Unknown error (could not extract the error message)".into();
    }
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .unwrap_or("Unknown error (the error message was not a valid C string)")
        .into()
}

/// Statement text starts with a keyword that inserts rows.
fn is_insert(statement: *mut sqlite3_stmt) -> bool {
    let text = unsafe { sqlite3_sql(statement) };
    if text.is_null() {
        return false;
    }
    let text = unsafe { CStr::from_ptr(text) }.to_string_lossy();
    let keyword = text
        .trim_start()
        .split(|c: char| !c.is_ascii_alphabetic())
        .next()
        .unwrap_or_default();
    keyword.eq_ignore_ascii_case("INSERT") || keyword.eq_ignore_ascii_case("REPLACE")
}

/// Columns, rows and directly changed rows of one statement.
struct Produced {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    changes: u64,
}

/// An open SQLite database, confined to the connection worker thread.
pub(crate) struct Database {
    connection: CBox<*mut sqlite3>,
}

impl Database {
    pub(crate) fn open(target: &CStr, flags: c_int, busy_timeout: c_int) -> Result<Self> {
        let mut connection = CBox::new(ptr::null_mut(), |p| unsafe {
            sqlite3_close(p);
        });
        let rc = unsafe { sqlite3_open_v2(target.as_ptr(), &mut *connection, flags, ptr::null()) };
        if rc != SQLITE_OK {
            // The handle is allocated even on failure, it carries the message and is closed on drop
            let error = Error::msg(error_message_from_ptr(unsafe { sqlite3_errmsg(*connection) }))
                .context(format!("While opening `{}`", target.to_string_lossy()));
            log::error!("{:#}", error);
            return Err(error);
        }
        unsafe {
            sqlite3_busy_timeout(*connection, busy_timeout);
        }
        Ok(Self { connection })
    }

    fn error(&self) -> Error {
        Error::msg(error_message_from_ptr(unsafe {
            sqlite3_errmsg(*self.connection)
        }))
    }

    /// Prepare and run every statement of `sql` in order.
    fn run(&self, sql: &str, mut visit: impl FnMut(*mut sqlite3_stmt, Produced)) -> Result<()> {
        let context = || format!("While running the query:\n{}", truncate_long!(sql));
        let sql = CString::new(sql)
            .context("Could not create a CString from the query String")
            .with_context(context)?;
        let mut tail: *const c_char = sql.as_ptr();
        while unsafe { *tail } != 0 {
            let mut statement = CBox::new(ptr::null_mut(), |p| unsafe {
                sqlite3_finalize(p);
            });
            let mut next = ptr::null();
            let rc = unsafe {
                sqlite3_prepare_v2(*self.connection, tail, -1, &mut *statement, &mut next)
            };
            if rc != SQLITE_OK {
                return Err(self.error());
            }
            tail = next;
            if statement.is_null() {
                // Only whitespace or comments left
                continue;
            }
            let produced = self.step(*statement)?;
            visit(*statement, produced);
        }
        Ok(())
    }

    fn step(&self, statement: *mut sqlite3_stmt) -> Result<Produced> {
        let connection = *self.connection;
        // `sqlite3_changes64` keeps the value of the last write, it is read only when this statement wrote
        let before = unsafe { sqlite3_total_changes64(connection) };
        let count = unsafe { sqlite3_column_count(statement) };
        let columns = (0..count)
            .map(|i| extract_name(statement, i))
            .collect::<Result<Vec<_>>>()?;
        let mut rows = Vec::new();
        loop {
            match unsafe { sqlite3_step(statement) } {
                SQLITE_ROW => rows.push(
                    (0..count)
                        .map(|i| extract_value(statement, i))
                        .collect::<Result<_>>()?,
                ),
                SQLITE_DONE => break,
                _ => return Err(self.error()),
            }
        }
        let changes = if unsafe { sqlite3_total_changes64(connection) } != before {
            unsafe { sqlite3_changes64(connection) }.max(0) as u64
        } else {
            0
        };
        Ok(Produced {
            columns,
            rows,
            changes,
        })
    }

    /// Result set of the last statement declaring columns.
    pub(crate) fn query(&self, sql: &str) -> Result<RawResultSet> {
        let mut result = RawResultSet::default();
        self.run(sql, |_, produced| {
            if !produced.columns.is_empty() {
                result = RawResultSet {
                    columns: produced.columns,
                    rows: produced.rows,
                };
            }
        })?;
        Ok(result)
    }

    pub(crate) fn update(&self, sql: &str) -> Result<RawUpdateResult> {
        let connection = *self.connection;
        let mut updated = 0;
        let mut keys = Vec::new();
        self.run(sql, |statement, produced| {
            updated += produced.changes;
            if !is_insert(statement) {
                return;
            }
            if !produced.columns.is_empty() {
                // RETURNING clause, its first column holds the keys
                keys.extend(
                    produced
                        .rows
                        .into_iter()
                        .filter_map(|row| row.into_iter().next()),
                );
            } else if produced.changes > 0 {
                keys.push(Value::Int64(Some(unsafe {
                    sqlite3_last_insert_rowid(connection)
                })));
            }
        })?;
        Ok(RawUpdateResult { updated, keys })
    }

    pub(crate) fn execute(&self, sql: &str) -> Result<()> {
        self.run(sql, |_, _| {})
    }

    pub(crate) fn is_autocommit(&self) -> bool {
        unsafe { sqlite3_get_autocommit(*self.connection) != 0 }
    }

    /// Close the database. On failure it stays open and usable.
    pub(crate) fn close(&mut self) -> Result<()> {
        let rc = unsafe { sqlite3_close(*self.connection) };
        if rc != SQLITE_OK {
            return Err(self.error().context("Could not close the database"));
        }
        self.connection.ptr = ptr::null_mut();
        Ok(())
    }
}
