//! Filter condition compiler

use crate::coerce::{coerce_relational, stringify};
use crate::error::CompileError;
use polars::prelude::ClosedInterval;
use dw_frame::{col, lit, DataType, Expr, Schema};
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

/// Condition operator
///
/// Unrecognised names are kept as [`FilterOperator::Other`] and compile to a
/// literal substring search.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FilterOperator {
    /// Equal (`equals` accepted)
    Eq,
    /// Not equal
    Ne,
    /// Greater than (`greater_than` accepted)
    Gt,
    /// Greater or equal
    Gte,
    /// Less than (`less_than` accepted)
    Lt,
    /// Less or equal
    Lte,
    /// Substring or regex search
    Contains,
    /// Literal prefix
    StartsWith,
    /// Literal suffix
    EndsWith,
    /// Null cell
    IsNull,
    /// Non-null cell
    IsNotNull,
    /// Inclusive range with optional bounds
    Between,
    /// Anything else
    Other(String),
}

impl FilterOperator {
    /// Canonical operator name
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::Contains => "contains",
            Self::StartsWith => "startswith",
            Self::EndsWith => "endswith",
            Self::IsNull => "is_null",
            Self::IsNotNull => "is_not_null",
            Self::Between => "between",
            Self::Other(name) => name,
        }
    }
}

impl From<String> for FilterOperator {
    fn from(name: String) -> Self {
        match name.as_str() {
            "eq" | "equals" => Self::Eq,
            "ne" => Self::Ne,
            "gt" | "greater_than" => Self::Gt,
            "gte" => Self::Gte,
            "lt" | "less_than" => Self::Lt,
            "lte" => Self::Lte,
            "contains" => Self::Contains,
            "startswith" => Self::StartsWith,
            "endswith" => Self::EndsWith,
            "is_null" => Self::IsNull,
            "is_not_null" => Self::IsNotNull,
            "between" => Self::Between,
            _ => Self::Other(name),
        }
    }
}

impl From<&str> for FilterOperator {
    fn from(name: &str) -> Self {
        Self::from(name.to_string())
    }
}

impl From<FilterOperator> for String {
    fn from(op: FilterOperator) -> Self {
        op.as_str().to_string()
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How per-condition predicates are folded together
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Combinator {
    /// Every condition must hold
    #[default]
    And,
    /// At least one condition must hold
    Or,
}

fn default_true() -> bool {
    true
}

/// One filter condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCondition {
    /// Column to test
    pub column: String,
    /// Operator
    pub operator: FilterOperator,
    /// Operand: a scalar, or `{ "start": .., "end": .. }` for `between`
    #[serde(default)]
    pub value: serde_json::Value,
    /// `contains` treats the value as a regular expression
    #[serde(default)]
    pub regex: bool,
    /// Text operators match case
    #[serde(default = "default_true")]
    pub case_sensitive: bool,
    /// Invert this condition before combining
    #[serde(default)]
    pub negate: bool,
}

impl FilterCondition {
    /// Condition with default flags
    #[must_use]
    pub fn new(
        column: impl Into<String>,
        operator: impl Into<FilterOperator>,
        value: serde_json::Value,
    ) -> Self {
        Self {
            column: column.into(),
            operator: operator.into(),
            value,
            regex: false,
            case_sensitive: true,
            negate: false,
        }
    }

    /// Set negation
    #[inline]
    #[must_use]
    pub fn with_negate(mut self, negate: bool) -> Self {
        self.negate = negate;
        self
    }

    /// Set regex interpretation for `contains`
    #[inline]
    #[must_use]
    pub fn with_regex(mut self, regex: bool) -> Self {
        self.regex = regex;
        self
    }

    /// Set case sensitivity for text operators
    #[inline]
    #[must_use]
    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }
}

/// Filter request: conditions folded with a single combinator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterRequest {
    /// Conditions in evaluation order
    pub conditions: Vec<FilterCondition>,
    /// Fold operator (`logic` accepted)
    #[serde(default, alias = "logic")]
    pub combinator: Combinator,
    /// Name of the derived node
    #[serde(default)]
    pub new_node_name: Option<String>,
}

impl FilterRequest {
    /// Request folded with `and`
    #[must_use]
    pub fn all(conditions: Vec<FilterCondition>) -> Self {
        Self {
            conditions,
            combinator: Combinator::And,
            new_node_name: None,
        }
    }

    /// Request folded with `or`
    #[must_use]
    pub fn any(conditions: Vec<FilterCondition>) -> Self {
        Self {
            combinator: Combinator::Or,
            ..Self::all(conditions)
        }
    }

    /// Set the derived node name
    #[inline]
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.new_node_name = Some(name.into());
        self
    }
}

/// Compile a filter request against a schema
///
/// # Errors
/// Fails on unknown columns, text operators over non-text columns, invalid
/// regular expressions, and empty requests.
pub fn compile_filter(request: &FilterRequest, schema: &Schema) -> Result<Expr, CompileError> {
    let mut combined: Option<Expr> = None;
    for condition in &request.conditions {
        let expr = compile_condition(condition, schema)?;
        combined = Some(match combined {
            None => expr,
            Some(acc) => match request.combinator {
                Combinator::And => acc.and(expr),
                Combinator::Or => acc.or(expr),
            },
        });
    }
    let expr = combined.ok_or(CompileError::EmptyFilter)?;
    debug!(predicate = ?expr, "compiled filter");
    Ok(expr)
}

fn compile_condition(condition: &FilterCondition, schema: &Schema) -> Result<Expr, CompileError> {
    let name = condition.column.as_str();
    let dtype = schema
        .get(name)
        .ok_or_else(|| CompileError::unknown_column(name, schema.names()))?;
    let operand = || coerce_relational(&condition.value, dtype).to_lit();

    let expr = match &condition.operator {
        FilterOperator::Eq => col(name).eq(operand()),
        FilterOperator::Ne => col(name).neq(operand()),
        FilterOperator::Gt => col(name).gt(operand()),
        FilterOperator::Gte => col(name).gt_eq(operand()),
        FilterOperator::Lt => col(name).lt(operand()),
        FilterOperator::Lte => col(name).lt_eq(operand()),
        FilterOperator::Contains => {
            require_text(condition, dtype)?;
            contains(condition)?
        }
        FilterOperator::StartsWith => {
            require_text(condition, dtype)?;
            let (column, prefix) = folded(condition);
            column.str().starts_with(lit(prefix))
        }
        FilterOperator::EndsWith => {
            require_text(condition, dtype)?;
            let (column, suffix) = folded(condition);
            column.str().ends_with(lit(suffix))
        }
        FilterOperator::IsNull => col(name).is_null(),
        FilterOperator::IsNotNull => col(name).is_not_null(),
        FilterOperator::Between => between(col(name), &condition.value, dtype),
        FilterOperator::Other(op) => {
            warn!(operator = %op, column = name, "unknown filter operator, using literal contains");
            require_text(condition, dtype)?;
            let (column, needle) = folded(condition);
            column.str().contains_literal(lit(needle))
        }
    };

    Ok(if condition.negate { expr.not() } else { expr })
}

fn require_text(condition: &FilterCondition, dtype: DataType) -> Result<(), CompileError> {
    if dtype.is_text() {
        Ok(())
    } else {
        Err(CompileError::NotText {
            operator: condition.operator.to_string(),
            column: condition.column.clone(),
            dtype,
        })
    }
}

/// Column and operand, both lowercased when matching ignores case
fn folded(condition: &FilterCondition) -> (Expr, String) {
    let text = stringify(&condition.value);
    let column = col(condition.column.as_str());
    if condition.case_sensitive {
        (column, text)
    } else {
        (column.str().to_lowercase(), text.to_lowercase())
    }
}

fn contains(condition: &FilterCondition) -> Result<Expr, CompileError> {
    if !condition.regex {
        let (column, needle) = folded(condition);
        return Ok(column.str().contains_literal(lit(needle)));
    }
    let text = stringify(&condition.value);
    RegexBuilder::new(&text)
        .case_insensitive(!condition.case_sensitive)
        .build()
        .map_err(|e| CompileError::InvalidRegex {
            column: condition.column.clone(),
            pattern: text.clone(),
            message: e.to_string(),
        })?;
    let pattern = if condition.case_sensitive {
        text
    } else {
        format!("(?i){text}")
    };
    Ok(col(condition.column.as_str()).str().contains(lit(pattern), true))
}

fn between(column: Expr, value: &serde_json::Value, dtype: DataType) -> Expr {
    let bound = |key: &str| {
        value
            .get(key)
            .filter(|v| !v.is_null())
            .map(|v| coerce_relational(v, dtype).to_lit())
    };
    match (bound("start"), bound("end")) {
        (Some(start), Some(end)) => column.is_between(start, end, ClosedInterval::Both),
        (Some(start), None) => column.gt_eq(start),
        (None, Some(end)) => column.lt_eq(end),
        (None, None) => lit(true),
    }
}
