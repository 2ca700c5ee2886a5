//! Filter stage: drops records that fail a predicate.

use feedq_core::types::Record;

use crate::predicate::Predicate;
use crate::traits::{OpError, Stage};

type PredicateFn = dyn Fn(&Record) -> bool + Send + Sync;

enum Condition {
    Func(Box<PredicateFn>),
    /// Simple predicate expression: "field op literal"
    Expr(Predicate),
}

pub struct Filter {
    condition: Condition,
}

impl Filter {
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&Record) -> bool + Send + Sync + 'static,
    {
        Self {
            condition: Condition::Func(Box::new(predicate)),
        }
    }

    pub fn from_predicate(predicate: Predicate) -> Self {
        Self {
            condition: Condition::Expr(predicate),
        }
    }

    /// Parse `expr` (see `Predicate::parse`) into a filter.
    pub fn expr(expr: &str) -> Result<Self, OpError> {
        Predicate::parse(expr).map(Self::from_predicate)
    }

    pub fn matches(&self, record: &Record) -> bool {
        match &self.condition {
            Condition::Func(f) => f(record),
            Condition::Expr(p) => p.matches(record),
        }
    }
}

impl Stage for Filter {
    fn name(&self) -> &'static str {
        "filter"
    }

    fn apply(&self, record: Record) -> Option<Record> {
        self.matches(&record).then_some(record)
    }
}
