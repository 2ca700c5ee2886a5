//! Simple predicate expressions over record fields.
//!
//! Supports expressions of the form: "field OP literal" where
//! OP ∈ {==, !=, <, <=, >, >=, ^=, *=}. `^=` is a case-insensitive prefix
//! match and `*=` a case-insensitive substring match. The literal may be
//! wrapped in single or double quotes.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use feedq_core::types::Record;

use crate::traits::OpError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    StartsWith,
    Contains,
}

impl CompareOp {
    // Two-character operators first so "<=" is not read as "<".
    const TOKENS: [(&'static str, CompareOp); 8] = [
        ("==", CompareOp::Eq),
        ("!=", CompareOp::Ne),
        ("<=", CompareOp::Le),
        (">=", CompareOp::Ge),
        ("^=", CompareOp::StartsWith),
        ("*=", CompareOp::Contains),
        ("<", CompareOp::Lt),
        (">", CompareOp::Gt),
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::StartsWith => "^=",
            CompareOp::Contains => "*=",
        }
    }

    fn holds(&self, ord: Ordering) -> bool {
        match self {
            CompareOp::Eq => ord == Ordering::Equal,
            CompareOp::Ne => ord != Ordering::Equal,
            CompareOp::Lt => ord == Ordering::Less,
            CompareOp::Le => ord != Ordering::Greater,
            CompareOp::Gt => ord == Ordering::Greater,
            CompareOp::Ge => ord != Ordering::Less,
            CompareOp::StartsWith | CompareOp::Contains => false,
        }
    }
}

/// A parsed `field OP literal` comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub field: String,
    pub op: CompareOp,
    pub literal: String,
}

impl Predicate {
    pub fn new(field: impl Into<String>, op: CompareOp, literal: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            op,
            literal: literal.into(),
        }
    }

    /// Parse a simple predicate like "position > 3" or "section == news".
    ///
    /// The operator is the leftmost token in the expression; at equal
    /// positions the longer token wins.
    pub fn parse(expr: &str) -> Result<Self, OpError> {
        let (pos, token, op) = CompareOp::TOKENS
            .iter()
            .filter_map(|(tok, op)| expr.find(tok).map(|pos| (pos, *tok, *op)))
            .min_by(|a, b| a.0.cmp(&b.0).then(b.1.len().cmp(&a.1.len())))
            .ok_or_else(|| OpError::Parse(expr.to_string()))?;

        let field = expr[..pos].trim();
        if field.is_empty() {
            return Err(OpError::Parse(format!("{expr} (missing field name)")));
        }
        let literal = unquote(expr[pos + token.len()..].trim());

        Ok(Self::new(field, op, literal))
    }

    /// Evaluate against a record. Missing or non-scalar fields never match.
    ///
    /// Ordering comparisons are numeric when both sides parse as numbers and
    /// lexicographic otherwise.
    pub fn matches(&self, record: &Record) -> bool {
        let Some(value) = record.text(&self.field) else {
            return false;
        };

        match self.op {
            CompareOp::StartsWith => value
                .to_lowercase()
                .starts_with(&self.literal.to_lowercase()),
            CompareOp::Contains => value.to_lowercase().contains(&self.literal.to_lowercase()),
            op => {
                let ord = match (value.trim().parse::<f64>(), self.literal.parse::<f64>()) {
                    (Ok(a), Ok(b)) => match a.partial_cmp(&b) {
                        Some(ord) => ord,
                        None => return false,
                    },
                    _ => value.as_str().cmp(self.literal.as_str()),
                };
                op.holds(ord)
            }
        }
    }
}

impl FromStr for Predicate {
    type Err = OpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.field, self.op.as_str(), self.literal)
    }
}

fn unquote(s: &str) -> &str {
    for q in ['"', '\''] {
        if s.len() >= 2 && s.starts_with(q) && s.ends_with(q) {
            return &s[1..s.len() - 1];
        }
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(section: &str, position: &str) -> Record {
        Record::from_pairs([("section", section), ("position", position)])
    }

    #[test]
    fn parses_operators() {
        let p = Predicate::parse("position >= 10").unwrap();
        assert_eq!(p, Predicate::new("position", CompareOp::Ge, "10"));

        let p = Predicate::parse("title == 'a <b> c'").unwrap();
        assert_eq!(p.op, CompareOp::Eq);
        assert_eq!(p.literal, "a <b> c");

        let p: Predicate = "author ^= M".parse().unwrap();
        assert_eq!(p.op, CompareOp::StartsWith);
        assert_eq!(p.to_string(), "author ^= M");
    }

    #[test]
    fn rejects_garbage() {
        assert!(Predicate::parse("section news").is_err());
        assert!(Predicate::parse("== news").is_err());
    }

    #[test]
    fn numeric_comparison_beats_lexicographic() {
        let p = Predicate::parse("position < 10").unwrap();
        assert!(p.matches(&article("news", "9")));
        assert!(!p.matches(&article("news", "10")));
    }

    #[test]
    fn string_comparison() {
        let p = Predicate::parse("section != sports").unwrap();
        assert!(p.matches(&article("news", "1")));
        assert!(!p.matches(&article("sports", "1")));
    }

    #[test]
    fn prefix_and_substring_ignore_case() {
        let rec = Record::from_pairs([("name", "Maria Lopez")]);
        assert!(Predicate::parse("name ^= m").unwrap().matches(&rec));
        assert!(Predicate::parse("name *= LOP").unwrap().matches(&rec));
        assert!(!Predicate::parse("name ^= L").unwrap().matches(&rec));
    }

    #[test]
    fn missing_field_never_matches() {
        let p = Predicate::parse("author != x").unwrap();
        assert!(!p.matches(&article("news", "1")));
    }
}
