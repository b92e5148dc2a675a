//! Field validation
//!
//! A `Validator` collects every failing field of a single validation pass so
//! that clients can fix all of them in one round trip. Only the first message
//! recorded for a given field is kept.


use regex::Regex;

use crate::error::{Error, Result, ValidationErrors};


/// Accumulates field-level validation failures
#[derive(Debug, Default)]
pub struct Validator {
    errors: ValidationErrors,
}

impl Validator {

    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if no failures have been recorded
    pub fn valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Records a failure for `key`, unless that key has already failed
    pub fn add_error(&mut self, key: &str, message: &str) {
        self.errors.entry(key.to_owned())
            .or_insert_with(|| message.to_owned());
    }

    /// Records `message` under `key` if `ok` is false
    pub fn check(&mut self, ok: bool, key: &str, message: &str) {
        if !ok {
            self.add_error(key, message);
        }
    }

    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    /// Converts the accumulated failures into a `Validation` error, if any
    pub fn into_result(self) -> Result<()> {
        if self.valid() {
            Ok(())
        } else {
            Err(Error::Validation(self.errors))
        }
    }
}


/// Returns `true` if `value` matches `pattern`
pub fn matches(value: &str, pattern: &Regex) -> bool {
    pattern.is_match(value)
}


/// Returns `true` if `value` is one of `permitted`
pub fn permitted_value<T>(value: &T, permitted: &[T]) -> bool
where T: PartialEq
{
    permitted.iter().any(|p| p == value)
}


#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn new_validator_is_valid() {
        let v = Validator::new();
        assert!(v.valid());
        assert!(v.into_result().is_ok());
    }

    #[test]
    fn failed_check_is_recorded() {
        let mut v = Validator::new();
        v.check(true, "name", "unused");
        v.check(false, "mac_address", "must be 12 characters");

        assert!(!v.valid());
        assert_eq!(v.errors().len(), 1);
        assert_eq!(v.errors()["mac_address"], "must be 12 characters");
    }

    #[test]
    fn first_failure_per_key_wins() {
        let mut v = Validator::new();
        v.check(false, "page", "must be greater than zero");
        v.check(false, "page", "must be a maximum of 10 million");

        assert_eq!(v.errors()["page"], "must be greater than zero");
    }

    #[test]
    fn into_result_carries_every_failure() {
        let mut v = Validator::new();
        v.add_error("name", "must be provided");
        v.add_error("site_name", "invalid");

        match v.into_result() {
            Err(Error::Validation(errors)) => {
                assert_eq!(errors.len(), 2);
                assert!(errors.contains_key("name"));
                assert!(errors.contains_key("site_name"));
            },
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn matches_uses_pattern() {
        let rx = Regex::new("^[0-9A-F]+$").unwrap();
        assert!(matches("ACCC85930342", &rx));
        assert!(!matches("accc", &rx));
    }

    #[test]
    fn permitted_value_checks_membership() {
        let safelist = ["id", "name", "-id"];
        assert!(permitted_value(&"-id", &safelist));
        assert!(!permitted_value(&"unknown", &safelist));
        assert!(permitted_value(&3, &[1, 2, 3]));
    }
}
