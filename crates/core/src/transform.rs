//! Transform requests and their arguments.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A scalar transform argument.
///
/// The built-in transforms read widths and heights, but the cache treats
/// arguments as opaque values that are stringified into the cache key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TransformArg {
    Number(i64),
    Text(String),
}

impl TransformArg {
    /// Interpret the argument as a pixel dimension.
    ///
    /// Returns `None` for zero, negative, out-of-range or non-numeric values.
    pub fn as_dimension(&self) -> Option<u32> {
        let value = match self {
            Self::Number(n) => *n,
            Self::Text(s) => s.trim().parse::<i64>().ok()?,
        };
        u32::try_from(value).ok().filter(|v| *v > 0)
    }

    /// Parse a command-line or query-string value.
    ///
    /// The caller's text is what ends up in the cache key, so a value only
    /// becomes a number when it prints back identically (`"120"`, not `"007"`
    /// or `"+5"`). Text values still work as dimensions.
    pub fn parse(raw: &str) -> Self {
        match raw.parse::<i64>() {
            Ok(n) if n.to_string() == raw => Self::Number(n),
            _ => Self::Text(raw.to_string()),
        }
    }
}

impl fmt::Display for TransformArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for TransformArg {
    fn from(n: i64) -> Self {
        Self::Number(n)
    }
}

impl From<u32> for TransformArg {
    fn from(n: u32) -> Self {
        Self::Number(i64::from(n))
    }
}

impl From<i32> for TransformArg {
    fn from(n: i32) -> Self {
        Self::Number(i64::from(n))
    }
}

impl From<&str> for TransformArg {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for TransformArg {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

/// A request to materialize one derivative of a source.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransformRequest {
    /// Registered transform name, e.g. `SetWidth`.
    pub format: String,
    pub arg1: Option<TransformArg>,
    pub arg2: Option<TransformArg>,
}

impl TransformRequest {
    /// A request without arguments.
    pub fn new(format: impl Into<String>) -> Self {
        Self {
            format: format.into(),
            arg1: None,
            arg2: None,
        }
    }

    pub fn with_arg(format: impl Into<String>, arg1: impl Into<TransformArg>) -> Self {
        Self {
            format: format.into(),
            arg1: Some(arg1.into()),
            arg2: None,
        }
    }

    pub fn with_args(
        format: impl Into<String>,
        arg1: impl Into<TransformArg>,
        arg2: impl Into<TransformArg>,
    ) -> Self {
        Self {
            format: format.into(),
            arg1: Some(arg1.into()),
            arg2: Some(arg2.into()),
        }
    }

    /// Arguments in positional order.
    pub fn args(&self) -> [Option<&TransformArg>; 2] {
        [self.arg1.as_ref(), self.arg2.as_ref()]
    }

    /// Number of leading arguments that are present.
    pub fn arg_count(&self) -> usize {
        self.args().iter().take_while(|a| a.is_some()).count()
    }
}

impl fmt::Display for TransformRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format)?;
        let args: Vec<String> = self.args().iter().flatten().map(|a| a.to_string()).collect();
        write!(f, "({})", args.join(","))
    }
}
