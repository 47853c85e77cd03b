use std::{cell::RefCell, ffi::OsStr};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Env {
    /// `CIASM_BINARY=1`
    binary_default: bool,
    /// `CIASM_LIMIT=<n>`
    step_limit: Option<u64>,
}

thread_local! {
    /// Must only be mutated within `set_env`
    static ENV: RefCell<Option<Env>> = const { RefCell::new(None) };
}

pub fn init() {
    set_env(read_env());
}

/// Show registers and memory in binary unless told otherwise.
pub fn binary_default() -> bool {
    with_env(|env| env.binary_default)
}

/// Step limit to use when the command line gives none.
pub fn step_limit() -> Option<u64> {
    with_env(|env| env.step_limit)
}

fn read_env() -> Env {
    Env {
        binary_default: var_is("CIASM_BINARY", "1"),
        step_limit: parse_limit(std::env::var("CIASM_LIMIT").ok().as_deref()),
    }
}

// Unparseable or zero limits are ignored
fn parse_limit(value: Option<&str>) -> Option<u64> {
    value
        .and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|limit| *limit > 0)
}

fn set_env(value: Env) {
    ENV.with(|env| {
        let mut env = env.borrow_mut();
        assert!(
            env.is_none(),
            "tried to initialize environment state multiple times"
        );
        *env = Some(value);
    });
}

fn with_env<F, R>(callback: F) -> R
where
    F: Fn(&Env) -> R,
{
    ENV.with(|env| {
        // Library users may never call `init`
        let value = *env.borrow_mut().get_or_insert_with(read_env);
        callback(&value)
    })
}

fn var_is(name: impl AsRef<OsStr>, value: impl AsRef<str>) -> bool {
    std::env::var(name.as_ref()).is_ok_and(|v| v == value.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits() {
        assert_eq!(parse_limit(None), None);
        assert_eq!(parse_limit(Some("250")), Some(250));
        assert_eq!(parse_limit(Some(" 7 ")), Some(7));
        assert_eq!(parse_limit(Some("0")), None);
        assert_eq!(parse_limit(Some("many")), None);
        assert_eq!(parse_limit(Some("-3")), None);
    }
}
