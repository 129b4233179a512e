//! The result of a single validation.

/// Outcome of running data through an adapter or check.
///
/// Exactly one side is populated: a valid outcome carries the (possibly
/// coerced or stripped) data, an invalid outcome carries the adapter-defined
/// error value. There is no state in which both or neither are present.
///
/// # Example
///
/// ```
/// use warden_core::Outcome;
///
/// let ok: Outcome<i32, String> = Outcome::Valid(42);
/// assert!(ok.is_valid());
/// assert_eq!(ok.into_result(), Ok(42));
///
/// let bad: Outcome<i32, String> = Outcome::Invalid("not a number".to_string());
/// assert!(bad.is_invalid());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum Outcome<T, E> {
    /// Validation passed; carries the validated value.
    Valid(T),
    /// Validation failed; carries the adapter error.
    Invalid(E),
}

impl<T, E> Outcome<T, E> {
    /// Returns true if validation passed.
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    /// Returns true if validation failed.
    pub const fn is_invalid(&self) -> bool {
        matches!(self, Self::Invalid(_))
    }

    /// Returns the validated value, if any.
    pub fn valid(self) -> Option<T> {
        match self {
            Self::Valid(value) => Some(value),
            Self::Invalid(_) => None,
        }
    }

    /// Returns the validation error, if any.
    pub fn invalid(self) -> Option<E> {
        match self {
            Self::Valid(_) => None,
            Self::Invalid(error) => Some(error),
        }
    }

    /// Maps the validated value.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U, E> {
        match self {
            Self::Valid(value) => Outcome::Valid(f(value)),
            Self::Invalid(error) => Outcome::Invalid(error),
        }
    }

    /// Maps the validation error.
    pub fn map_invalid<F2, F: FnOnce(E) -> F2>(self, f: F) -> Outcome<T, F2> {
        match self {
            Self::Valid(value) => Outcome::Valid(value),
            Self::Invalid(error) => Outcome::Invalid(f(error)),
        }
    }

    /// Converts into a standard `Result`.
    pub fn into_result(self) -> Result<T, E> {
        match self {
            Self::Valid(value) => Ok(value),
            Self::Invalid(error) => Err(error),
        }
    }
}

impl<T, E> From<Result<T, E>> for Outcome<T, E> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::Valid(value),
            Err(error) => Self::Invalid(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        let ok: Outcome<u8, &str> = Outcome::Valid(1);
        assert!(ok.is_valid());
        assert!(!ok.is_invalid());
        assert_eq!(ok.clone().valid(), Some(1));
        assert_eq!(ok.invalid(), None);

        let bad: Outcome<u8, &str> = Outcome::Invalid("nope");
        assert!(bad.is_invalid());
        assert_eq!(bad.clone().valid(), None);
        assert_eq!(bad.invalid(), Some("nope"));
    }

    #[test]
    fn test_from_result() {
        let outcome: Outcome<u8, String> = Err("bad".to_string()).into();
        assert_eq!(outcome, Outcome::Invalid("bad".to_string()));

        let outcome: Outcome<u8, String> = Ok(3).into();
        assert_eq!(outcome.map(|v| v * 2), Outcome::Valid(6));
    }

    #[test]
    fn test_map_invalid() {
        let outcome: Outcome<u8, &str> = Outcome::Invalid("short");
        assert_eq!(outcome.map_invalid(str::len), Outcome::Invalid(5));
    }
}
