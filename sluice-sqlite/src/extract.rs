use libsqlite3_sys::*;
use sluice_core::{Error, Result, Value};
use std::{
    ffi::{CStr, c_int},
    slice,
};

fn column_bytes<'s>(statement: *mut sqlite3_stmt, index: c_int, ptr: *const u8) -> &'s [u8] {
    let len = unsafe { sqlite3_column_bytes(statement, index) } as usize;
    if ptr.is_null() || len == 0 {
        return &[];
    }
    unsafe { slice::from_raw_parts(ptr, len) }
}

pub(crate) fn extract_value(statement: *mut sqlite3_stmt, index: c_int) -> Result<Value> {
    let column_type = unsafe { sqlite3_column_type(statement, index) };
    Ok(match column_type {
        SQLITE_NULL => Value::Null,
        SQLITE_INTEGER => Value::Int64(Some(unsafe { sqlite3_column_int64(statement, index) })),
        SQLITE_FLOAT => Value::Float64(Some(unsafe { sqlite3_column_double(statement, index) })),
        SQLITE_BLOB => {
            let ptr = unsafe { sqlite3_column_blob(statement, index) } as *const u8;
            Value::Blob(Some(column_bytes(statement, index, ptr).into()))
        }
        SQLITE_TEXT => {
            let ptr = unsafe { sqlite3_column_text(statement, index) };
            let text = String::from_utf8_lossy(column_bytes(statement, index, ptr));
            Value::Varchar(Some(text.into_owned()))
        }
        _ => {
            return Err(Error::msg(format!(
                "Unexpected column type {}",
                column_type
            )));
        }
    })
}

pub(crate) fn extract_name(statement: *mut sqlite3_stmt, index: c_int) -> Result<String> {
    let name = unsafe { sqlite3_column_name(statement, index) };
    if name.is_null() {
        return Err(Error::msg(format!("Column {index} has no name")));
    }
    Ok(unsafe { CStr::from_ptr(name) }.to_str()?.into())
}
