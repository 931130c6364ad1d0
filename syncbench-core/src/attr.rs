//! Case Overrides
//!
//! [`CaseAttr`] is a set of optional field overrides. Applying it to a plain
//! workload yields a new [`CaseDef`]; applying it to an existing case keeps
//! that case's identity and declaration number and replaces only the fields
//! the override sets. Repeated application accumulates, the last writer of a
//! field wins.
//!
//! ```ignore
//! let case = CaseAttr::new().repetitions(5).wrap(MySuite::perf_add as CaseFn<_>)?;
//! let case = CaseAttr::new().warmup(0).apply(case)?;
//! assert_eq!((case.repetitions(), case.warmup()), (5, 0));
//! ```

use crate::case::{CaseDef, CaseFn, CaseSpec};
use crate::error::ConfigError;

/// Optional overrides for a case's run parameters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaseAttr {
    /// Measured iteration count
    pub repetitions: Option<usize>,
    /// Warmup iteration count
    pub warmup: Option<usize>,
}

impl CaseAttr {
    /// Empty override set
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the measured iteration count
    pub fn repetitions(mut self, n: usize) -> Self {
        self.repetitions = Some(n);
        self
    }

    /// Override the warmup iteration count
    pub fn warmup(mut self, n: usize) -> Self {
        self.warmup = Some(n);
        self
    }

    /// Set a field by name.
    ///
    /// Accepts `repetitions` (alias `n`) and `warmup` (alias `n_warmup`).
    pub fn set(mut self, field: &str, value: i64) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
        };
        match field {
            "repetitions" | "n" => {
                if value <= 0 {
                    return Err(ConfigError::NonPositiveRepetitions(value));
                }
                self.repetitions = Some(usize::try_from(value).map_err(|_| invalid())?);
            }
            "warmup" | "n_warmup" => {
                self.warmup = Some(usize::try_from(value).map_err(|_| invalid())?);
            }
            other => return Err(ConfigError::UnknownField(other.to_string())),
        }
        Ok(self)
    }

    /// Build an override set from `(field, value)` pairs, applied in order
    pub fn from_fields<I, K>(fields: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, i64)>,
        K: AsRef<str>,
    {
        fields
            .into_iter()
            .try_fold(Self::new(), |attr, (field, value)| {
                attr.set(field.as_ref(), value)
            })
    }

    /// Layer `later` over `self`; fields set in `later` win
    pub fn merge(self, later: CaseAttr) -> CaseAttr {
        CaseAttr {
            repetitions: later.repetitions.or(self.repetitions),
            warmup: later.warmup.or(self.warmup),
        }
    }

    /// Reject values that can never describe a runnable case
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.repetitions {
            Some(0) => Err(ConfigError::NonPositiveRepetitions(0)),
            _ => Ok(()),
        }
    }

    /// Apply to a plain workload
    pub fn wrap<S>(self, func: CaseFn<S>) -> Result<CaseDef<S>, ConfigError> {
        self.apply(CaseSpec::Raw(func))
    }

    /// Apply to a workload or an existing case
    pub fn apply<S>(self, target: impl Into<CaseSpec<S>>) -> Result<CaseDef<S>, ConfigError> {
        self.validate()?;
        Ok(target.into().resolve().with_attr(self))
    }
}
