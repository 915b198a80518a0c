pub type Result<T> = std::result::Result<T, crate::error::Error>;

/// Checks an argument precondition, returning `InvalidArgument` from the enclosing
/// function when it does not hold.
///
/// A failed check is reported through the `log` facade with the file, line and
/// the text of the failed condition.
#[macro_export]
macro_rules! verify_arg {
    ($name:expr, $expr:expr) => {{
        let result = $expr;
        $crate::result::verify_arg(
            result,
            stringify!($name),
            stringify!($expr),
            file!(),
            line!(),
        )?;
    }};
}

/// Computes a checked arithmetic expression (an `Option<usize>`), returning
/// `Overflow` from the enclosing function when it is `None`.
#[macro_export]
macro_rules! checked {
    ($expr:expr) => {
        match $expr {
            Some(value) => value,
            None => {
                return Err($crate::result::overflow(
                    stringify!($expr),
                    file!(),
                    line!(),
                ));
            }
        }
    };
}

#[inline]
pub fn verify_arg(
    predicate: bool,
    name: &str,
    condition: &str,
    file: &str,
    line: u32,
) -> Result<()> {
    if predicate {
        Ok(())
    } else {
        invalid_arg(name, condition, file, line)
    }
}

#[cold]
pub fn invalid_arg(name: &str, condition: &str, file: &str, line: u32) -> Result<()> {
    log::warn!("file '{file}', line: {line}: alert: ({condition})");
    Err(crate::error::ErrorKind::InvalidArgument {
        name: name.to_string(),
        message: condition.to_string(),
    }
    .into())
}

#[cold]
pub fn overflow(expr: &str, file: &str, line: u32) -> crate::error::Error {
    log::warn!("file '{file}', line: {line}: overflow: ({expr})");
    crate::error::Error::overflow(expr)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_index(index: usize, len: usize) -> Result<usize> {
        crate::verify_arg!(index, index < len);
        Ok(index)
    }

    fn double(n: usize) -> Result<usize> {
        Ok(crate::checked!(n.checked_mul(2)))
    }

    #[test]
    fn test_verify_arg() {
        assert_eq!(check_index(1, 2).unwrap(), 1);
        let err = check_index(2, 2).unwrap_err();
        assert!(err.is_invalid_arg());
        assert_eq!(err.to_string(), "invalid argument index: index < len");
    }

    #[test]
    fn test_checked() {
        assert_eq!(double(21).unwrap(), 42);
        assert!(double(usize::MAX).unwrap_err().is_overflow());
    }
}
