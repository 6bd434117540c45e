//! Filter grammar for the search endpoint.
//!
//! Numeric filters arrive as operator-prefixed strings (`>=30`, `<4.5`).
//! A string that doesn't fit the grammar is treated as if the filter had
//! been omitted, so `rating=banana` degrades to an unfiltered query.

use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use super::dto::SearchParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    pub fn sql(self) -> &'static str {
        match self {
            CmpOp::Eq => "=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        }
    }
}

/// A parsed comparison, e.g. `<=30` becomes `Cmp { op: Le, value: 30 }`.
/// Shared by the SQL pushdown and the in-process calories filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cmp<T> {
    pub op: CmpOp,
    pub value: T,
}

impl<T: FromStr> Cmp<T> {
    /// Parse `<op><number>`. Two-character operators are tried before the
    /// single-character ones, otherwise `<=` would parse as `<` with a
    /// dangling `=`. The number is the longest `digits(.digits)?` prefix;
    /// trailing junk is ignored, and a fractional literal falls back to its
    /// integer part when `T` is integral. Anything else yields `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let s = raw.trim();
        let (op, rest) = if let Some(r) = s.strip_prefix("<=") {
            (CmpOp::Le, r)
        } else if let Some(r) = s.strip_prefix(">=") {
            (CmpOp::Ge, r)
        } else if let Some(r) = s.strip_prefix('<') {
            (CmpOp::Lt, r)
        } else if let Some(r) = s.strip_prefix('>') {
            (CmpOp::Gt, r)
        } else if let Some(r) = s.strip_prefix('=') {
            (CmpOp::Eq, r)
        } else {
            return None;
        };

        let int_len = rest.bytes().take_while(u8::is_ascii_digit).count();
        if int_len == 0 {
            return None;
        }
        let mut full_len = int_len;
        if let Some(frac) = rest[int_len..].strip_prefix('.') {
            let frac_len = frac.bytes().take_while(u8::is_ascii_digit).count();
            if frac_len > 0 {
                full_len = int_len + 1 + frac_len;
            }
        }

        rest[..full_len]
            .parse::<T>()
            .ok()
            .or_else(|| rest[..int_len].parse::<T>().ok())
            .map(|value| Cmp { op, value })
    }
}

impl<T: PartialOrd + Copy> Cmp<T> {
    pub fn matches(&self, candidate: T) -> bool {
        match self.op {
            CmpOp::Eq => candidate == self.value,
            CmpOp::Lt => candidate < self.value,
            CmpOp::Le => candidate <= self.value,
            CmpOp::Gt => candidate > self.value,
            CmpOp::Ge => candidate >= self.value,
        }
    }
}

/// Filters the search endpoint understands. Text filters and the two
/// numeric columns are pushed down into SQL; calories lives inside the
/// serialized nutrients blob and is applied after the fetch.
#[derive(Debug, Default)]
pub struct SearchFilters {
    pub title: Option<String>,
    pub cuisine: Option<String>,
    pub total_time: Option<Cmp<i64>>,
    pub rating: Option<Cmp<f64>>,
    pub calories: Option<Cmp<f64>>,
}

impl SearchFilters {
    pub fn from_params(p: &SearchParams) -> Self {
        Self {
            title: non_empty(&p.title),
            cuisine: non_empty(&p.cuisine),
            total_time: p.total_time.as_deref().and_then(Cmp::parse),
            rating: p.rating.as_deref().and_then(Cmp::parse),
            calories: p.calories.as_deref().and_then(Cmp::parse),
        }
    }
}

fn non_empty(v: &Option<String>) -> Option<String> {
    v.as_deref().filter(|s| !s.is_empty()).map(str::to_string)
}

lazy_static! {
    static ref NUMBER_RE: Regex = Regex::new(r"\d+(\.\d+)?").unwrap();
}

/// Extract the calories value from a deserialized nutrients object.
/// Bare numbers are used as-is; strings like `"389 kcal"` yield their
/// first numeric substring; anything else counts as 0.
pub fn calories_of(nutrients: &Value) -> f64 {
    match nutrients.get("calories") {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => NUMBER_RE
            .find(s)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0.0),
        _ => 0.0,
    }
}
