use std::fmt;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("inspection failed: {0}")]
pub struct InspectionError(pub String);

/// Collects non-fatal failures so a run can finish before reporting them.
#[derive(Debug, Default)]
pub struct AccumulatedFailures {
    failures: Vec<String>,
}

impl AccumulatedFailures {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, failure: impl fmt::Display) {
        self.failures.push(failure.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// All failures as one message, or None if nothing failed.
    pub fn get_error(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        let lines: Vec<String> = self.failures.iter().map(|f| format!("* {}", f)).collect();
        Some(format!("The following errors were encountered:\n{}", lines.join("\n")))
    }

    pub fn raise_if_needed(&self) -> Result<(), InspectionError> {
        match self.get_error() {
            Some(msg) => Err(InspectionError(msg)),
            None      => Ok(()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_empty_does_not_raise() {
        let failures = AccumulatedFailures::new();
        assert!(failures.is_empty());
        assert!(failures.get_error().is_none());
        assert_eq!(failures.raise_if_needed(), Ok(()));
    }

    #[test]
    fn test_failures_are_listed_in_order() {
        let mut failures = AccumulatedFailures::new();
        failures.add("failed to run ipmitool: exit 1");
        failures.add(format_args!("bad body {}", 42));
        assert!(!failures.is_empty());
        assert_eq!(
            failures.raise_if_needed(),
            Err(InspectionError(
                "The following errors were encountered:\n\
                 * failed to run ipmitool: exit 1\n\
                 * bad body 42"
                    .to_string()
            ))
        );
    }
}
