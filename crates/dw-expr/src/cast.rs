//! Cast compiler
//!
//! A cast rewrites one column in place. Compilation resolves the source type
//! from the schema and picks the rewrite:
//!
//! | target | source | rewrite |
//! |---|---|---|
//! | datetime | text | `str().to_datetime` (`format` or inferred), UTC, strict or lenient |
//! | datetime | other | lenient cast |
//! | string | datetime | `dt().to_string` with `format` or RFC 3339 |
//! | string | other | text form |
//! | integer | text | through float, so numeric text truncates toward zero |
//! | integer | other | lenient; floats truncate toward zero |
//! | float | any | lenient |
//!
//! Every rewrite is a polars expression; lenient casts null what they cannot
//! convert.

use crate::error::CompileError;
use dw_frame::temporal::{is_valid_format, utc_datetime};
use dw_frame::{col, lit, DataFrame, DataType, Expr, FrameExt, FrameResult, LazyFrame, Schema};
use polars::prelude::{DataType as PolarsType, StrptimeOptions, TimeUnit};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported cast targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    /// Text (`utf8`, `str`, `text` accepted)
    String,
    /// 64-bit integer
    Integer,
    /// 64-bit float
    Float,
    /// UTC timestamp
    Datetime,
}

impl TargetType {
    /// Column type produced by the cast
    #[must_use]
    pub fn data_type(self) -> DataType {
        match self {
            Self::String => DataType::String,
            Self::Integer => DataType::Integer,
            Self::Float => DataType::Float,
            Self::Datetime => DataType::Datetime,
        }
    }

    /// Lowercase name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Datetime => "datetime",
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetType {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "string" | "utf8" | "str" | "text" => Ok(Self::String),
            "integer" => Ok(Self::Integer),
            "float" => Ok(Self::Float),
            "datetime" => Ok(Self::Datetime),
            _ => Err(CompileError::UnsupportedTarget(s.to_string())),
        }
    }
}

/// Cast request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastSpec {
    /// Column to rewrite
    pub column: String,
    /// Target type name
    pub target_type: String,
    /// strftime format for datetime parsing or rendering
    #[serde(default)]
    pub format: Option<String>,
    /// Abort on the first unparseable value (datetime targets only)
    #[serde(default)]
    pub strict: bool,
}

impl CastSpec {
    /// Lenient cast without a format
    #[must_use]
    pub fn new(column: impl Into<String>, target_type: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            target_type: target_type.into(),
            format: None,
            strict: false,
        }
    }

    /// Set the datetime format
    #[inline]
    #[must_use]
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Set strict parsing
    #[inline]
    #[must_use]
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

/// Summary of an applied cast
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastInfo {
    /// Column rewritten
    pub column: String,
    /// Type before the cast
    pub original_type: DataType,
    /// Type after the cast
    pub new_type: DataType,
    /// Target as requested
    pub target_type: String,
    /// Format in use, if any
    pub format_used: Option<String>,
    /// Strictness, reported for datetime targets only
    pub strict_used: Option<bool>,
}

/// A validated column rewrite
#[derive(Debug, Clone)]
pub struct CompiledCast {
    column: String,
    source_type: DataType,
    target: TargetType,
    requested: String,
    format: Option<String>,
    strict: bool,
    expr: Expr,
}

/// RFC 3339 in UTC; fractional seconds only when present
const RFC3339_UTC: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

fn rewrite(target: TargetType, source: DataType, column: &str, format: Option<&str>, strict: bool) -> Expr {
    let input = col(column);
    match (target, source) {
        (TargetType::Datetime, DataType::String) => {
            let options = StrptimeOptions {
                format: format.map(Into::into),
                strict,
                exact: true,
                cache: true,
            };
            input.str().to_datetime(
                Some(TimeUnit::Microseconds),
                Some("UTC".into()),
                options,
                lit("raise"),
            )
        }
        (TargetType::Datetime, _) => input.cast(utc_datetime()),
        (TargetType::String, DataType::Datetime) => input.dt().to_string(format.unwrap_or(RFC3339_UTC)),
        (TargetType::String, _) => input.cast(PolarsType::String),
        (TargetType::Integer, DataType::String) => input.cast(PolarsType::Float64).cast(PolarsType::Int64),
        (TargetType::Integer, _) => input.cast(PolarsType::Int64),
        (TargetType::Float, _) => input.cast(PolarsType::Float64),
    }
}

/// Compile a cast spec against a schema
///
/// # Errors
/// Fails on unknown columns, unsupported targets and invalid formats.
pub fn compile_cast(spec: &CastSpec, schema: &Schema) -> Result<CompiledCast, CompileError> {
    let source_type = schema
        .get(&spec.column)
        .ok_or_else(|| CompileError::unknown_column(&spec.column, schema.names()))?;
    let target: TargetType = spec.target_type.parse()?;
    if let Some(format) = spec.format.as_deref() {
        if !is_valid_format(format) {
            return Err(CompileError::InvalidFormat(format.to_string()));
        }
    }

    let expr = rewrite(target, source_type, &spec.column, spec.format.as_deref(), spec.strict);
    Ok(CompiledCast {
        column: spec.column.clone(),
        source_type,
        target,
        requested: spec.target_type.clone(),
        format: spec.format.clone(),
        strict: spec.strict && target == TargetType::Datetime,
        expr,
    })
}

impl CompiledCast {
    /// Column being rewritten
    #[must_use]
    pub fn column(&self) -> &str {
        &self.column
    }

    /// Resolved target
    #[must_use]
    pub fn target(&self) -> TargetType {
        self.target
    }

    /// Strict datetime parsing is in effect
    #[must_use]
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Rewrite expression
    #[must_use]
    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Evaluate the rewrite on a sample without keeping the result
    ///
    /// # Errors
    /// Returns [`CompileError::SampleValidation`] when evaluation fails.
    pub fn validate_sample(&self, sample: &DataFrame) -> Result<(), CompileError> {
        self.apply(sample)
            .map(|_| ())
            .map_err(|source| CompileError::SampleValidation {
                column: self.column.clone(),
                target: self.requested.clone(),
                source,
            })
    }

    /// Rewrite an eager table
    ///
    /// # Errors
    /// Propagates evaluation failures (strict datetime parsing).
    pub fn apply(&self, frame: &DataFrame) -> FrameResult<DataFrame> {
        frame.with_expr_column(&self.column, &self.expr)
    }

    /// Record the rewrite on a plan
    #[must_use]
    pub fn apply_lazy(&self, frame: LazyFrame) -> LazyFrame {
        frame.with_column(self.expr.clone().alias(self.column.as_str()))
    }

    /// Operation log entry
    #[must_use]
    pub fn describe(&self) -> String {
        format!("cast({}, {})", self.column, self.target)
    }

    /// Result summary
    #[must_use]
    pub fn info(&self) -> CastInfo {
        CastInfo {
            column: self.column.clone(),
            original_type: self.source_type,
            new_type: self.target.data_type(),
            target_type: self.requested.clone(),
            format_used: self.format.clone(),
            strict_used: (self.target == TargetType::Datetime).then_some(self.strict),
        }
    }

    /// Human-readable success message
    #[must_use]
    pub fn message(&self) -> String {
        let suffix = if self.target == TargetType::Datetime {
            " (UTC timezone applied)"
        } else {
            ""
        };
        format!(
            "Successfully cast column '{}' from {} to {}{suffix}",
            self.column,
            self.source_type,
            self.target.data_type()
        )
    }
}
