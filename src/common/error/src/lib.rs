mod error;

pub use error::{DaftError, DaftResult, GenericError};

#[macro_export]
macro_rules! ensure {
    ($condition:expr, $variant:ident: $($msg:tt)*) => {
        if !$condition {
            return Err($crate::DaftError::$variant(format!($($msg)*)));
        }
    };
    ($condition:expr, $($msg:tt)*) => {
        if !$condition {
            return Err($crate::DaftError::ValueError(format!($($msg)*)));
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checked(value: usize) -> DaftResult<usize> {
        ensure!(value > 0, "value must be positive, got {}", value);
        ensure!(value < 10, InternalError: "value {} out of range", value);
        Ok(value)
    }

    #[test]
    fn ensure_picks_variant() {
        assert!(checked(3).is_ok());
        assert!(matches!(checked(0), Err(DaftError::ValueError(_))));
        let err = checked(12).unwrap_err();
        assert!(err.is_internal());
        assert_eq!(err.to_string(), "DaftError::InternalError value 12 out of range");
    }
}
