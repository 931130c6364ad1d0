//! Case Descriptors
//!
//! A [`CaseDef`] pairs a workload with its run parameters. Every descriptor
//! takes the next value of a process-wide sequence when it is created, and
//! suites run their cases in ascending sequence order. Creating descriptors
//! in declaration order is therefore enough to run them in declaration order.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::attr::CaseAttr;

/// Default number of measured iterations
pub const DEFAULT_REPETITIONS: usize = 10_000;

/// Default number of discarded warmup iterations
pub const DEFAULT_WARMUP: usize = 10;

/// Identifier prefix that marks a suite member as a benchmark case
pub const CASE_PREFIX: &str = "perf_";

static NEXT_ORDER: AtomicU64 = AtomicU64::new(0);

fn next_order() -> u64 {
    NEXT_ORDER.fetch_add(1, Ordering::Relaxed)
}

/// Workload bound to a suite instance
pub type CaseFn<S> = fn(&mut S) -> anyhow::Result<()>;

/// Conversion of a workload's return value into a case result
///
/// Lets `#[suite]` accept methods returning `()` or any `Result<(), E>`
/// whose error converts into `anyhow::Error`.
#[doc(hidden)]
pub trait IntoCaseResult {
    /// Normalize into `anyhow::Result<()>`
    fn into_case_result(self) -> anyhow::Result<()>;
}

impl IntoCaseResult for () {
    fn into_case_result(self) -> anyhow::Result<()> {
        Ok(())
    }
}

impl<E> IntoCaseResult for Result<(), E>
where
    E: Into<anyhow::Error>,
{
    fn into_case_result(self) -> anyhow::Result<()> {
        self.map_err(Into::into)
    }
}

/// Immutable description of one benchmark case
pub struct CaseDef<S> {
    name: String,
    func: CaseFn<S>,
    attr: CaseAttr,
    order: u64,
}

impl<S> CaseDef<S> {
    /// Wrap a workload with default parameters and the next declaration number
    pub fn new(func: CaseFn<S>) -> Self {
        Self {
            name: String::new(),
            func,
            attr: CaseAttr::default(),
            order: next_order(),
        }
    }

    pub(crate) fn with_attr(mut self, attr: CaseAttr) -> Self {
        self.attr = self.attr.merge(attr);
        self
    }

    pub(crate) fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Case name (declared identifier without [`CASE_PREFIX`]); empty until discovered
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The workload
    pub fn func(&self) -> CaseFn<S> {
        self.func
    }

    /// Explicit overrides carried by this case
    pub fn attr(&self) -> CaseAttr {
        self.attr
    }

    /// Measured iterations, falling back to [`DEFAULT_REPETITIONS`]
    pub fn repetitions(&self) -> usize {
        self.attr.repetitions.unwrap_or(DEFAULT_REPETITIONS)
    }

    /// Warmup iterations, falling back to [`DEFAULT_WARMUP`]
    pub fn warmup(&self) -> usize {
        self.attr.warmup.unwrap_or(DEFAULT_WARMUP)
    }

    /// Declaration sequence number
    pub fn order(&self) -> u64 {
        self.order
    }
}

impl<S> Clone for CaseDef<S> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            func: self.func,
            attr: self.attr,
            order: self.order,
        }
    }
}

impl<S> fmt::Debug for CaseDef<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaseDef")
            .field("name", &self.name)
            .field("repetitions", &self.repetitions())
            .field("warmup", &self.warmup())
            .field("order", &self.order)
            .finish_non_exhaustive()
    }
}

/// A declared suite member before discovery: a bare workload or an
/// already-configured case
pub enum CaseSpec<S> {
    /// Plain workload, gets default parameters
    Raw(CaseFn<S>),
    /// Case with overrides applied
    Configured(CaseDef<S>),
}

impl<S> CaseSpec<S> {
    /// Resolve into the canonical descriptor
    pub fn resolve(self) -> CaseDef<S> {
        match self {
            CaseSpec::Raw(func) => CaseDef::new(func),
            CaseSpec::Configured(case) => case,
        }
    }
}

impl<S> From<CaseFn<S>> for CaseSpec<S> {
    fn from(func: CaseFn<S>) -> Self {
        CaseSpec::Raw(func)
    }
}

impl<S> From<CaseDef<S>> for CaseSpec<S> {
    fn from(case: CaseDef<S>) -> Self {
        CaseSpec::Configured(case)
    }
}
