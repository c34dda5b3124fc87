//! Named query parameters.
//!
//! Extract templates reference dates as `:target_date` / `:start_date`. TDS only
//! understands positional `@P1..@Pn` markers, so templates are rewritten before
//! execution and the bound values are returned in marker order.

use std::collections::BTreeMap;

use analytics_core::{Error, Result};
use chrono::NaiveDate;

pub const TARGET_DATE: &str = "target_date";
pub const START_DATE: &str = "start_date";

/// Date parameters bound into extract queries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    values: BTreeMap<String, NaiveDate>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: NaiveDate) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: NaiveDate) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<NaiveDate> {
        self.values.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A statement ready for positional binding.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundQuery {
    pub sql: String,
    pub values: Vec<NaiveDate>,
}

/// Rewrite `:name` markers to `@Pn` and collect their values.
///
/// Repeated names reuse the same position. Markers inside single-quoted
/// literals and `::` sequences are left alone.
pub fn bind_named(template: &str, params: &QueryParams) -> Result<BoundQuery> {
    let mut sql = String::with_capacity(template.len());
    let mut values = Vec::new();
    let mut positions: BTreeMap<String, usize> = BTreeMap::new();
    let mut in_literal = false;

    let chars: Vec<char> = template.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '\'' {
            in_literal = !in_literal;
            sql.push(c);
            i += 1;
            continue;
        }

        let starts_marker = !in_literal
            && c == ':'
            && chars.get(i + 1).is_some_and(|n| n.is_ascii_alphabetic() || *n == '_')
            && (i == 0 || chars[i - 1] != ':');

        if !starts_marker {
            sql.push(c);
            i += 1;
            continue;
        }

        let mut end = i + 1;
        while end < chars.len() && (chars[end].is_ascii_alphanumeric() || chars[end] == '_') {
            end += 1;
        }
        let name: String = chars[i + 1..end].iter().collect();

        let position = match positions.get(&name) {
            Some(position) => *position,
            None => {
                let value = params.get(&name).ok_or_else(|| {
                    Error::query(format!("query references unbound parameter :{}", name))
                })?;
                values.push(value);
                positions.insert(name, values.len());
                values.len()
            }
        };
        sql.push_str(&format!("@P{}", position));
        i = end;
    }

    Ok(BoundQuery { sql, values })
}
