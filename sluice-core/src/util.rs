/// Formats a SQL text for logs and error messages, cutting it past 497 bytes.
#[macro_export]
macro_rules! truncate_long {
    ($query:expr) => {
        format_args!(
            "{}{}",
            &$query[..$crate::floor_char_boundary(&$query, 497)].trim_end(),
            if $query.len() > 497 { "..." } else { "" },
        )
    };
}

/// Resolves a pending operation and logs when nobody is waiting for it anymore.
#[macro_export]
macro_rules! send_value {
    ($tx:ident, $value:expr) => {{
        if $tx.send($value).is_err() {
            log::warn!("Discarding a late result: the pending operation was dropped by the caller");
        }
    }};
}

#[doc(hidden)]
pub fn floor_char_boundary(value: &str, index: usize) -> usize {
    if index >= value.len() {
        return value.len();
    }
    (0..=index)
        .rev()
        .find(|i| value.is_char_boundary(*i))
        .unwrap_or(0)
}
