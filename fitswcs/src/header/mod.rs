//! Access to WCS header keywords.
//!
//! The transformation code never touches FITS cards directly; it asks a
//! [`KeywordProvider`] for typed values. Any header store can implement the
//! trait. [`KeywordMap`] is the in-memory implementation, and [`parse_header`]
//! fills one from raw header card text.

mod card;

use std::collections::HashMap;

use crate::error::{WcsError, WcsResult};

pub use card::{parse_header, CardValue, HeaderCard, CARD_SIZE};

pub trait KeywordProvider {
    fn get_string(&self, key: &str) -> Option<String>;
    fn get_float(&self, key: &str) -> Option<f64>;
    fn get_int(&self, key: &str) -> Option<i64>;

    /// Numeric value whether the card was written as a real or an integer.
    fn get_number(&self, key: &str) -> Option<f64> {
        self.get_float(key)
            .or_else(|| self.get_int(key).map(|v| v as f64))
    }

    fn require_float(&self, key: &str) -> WcsResult<f64> {
        self.get_number(key)
            .ok_or_else(|| WcsError::missing_keyword(key))
    }

    fn require_string(&self, key: &str) -> WcsResult<String> {
        self.get_string(key)
            .ok_or_else(|| WcsError::missing_keyword(key))
    }

    fn contains(&self, key: &str) -> bool {
        self.get_string(key).is_some() || self.get_number(key).is_some()
    }
}

#[derive(Debug, Clone, Default)]
pub struct KeywordMap {
    strings: HashMap<String, String>,
    floats: HashMap<String, f64>,
    ints: HashMap<String, i64>,
}

impl KeywordMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_string(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let key = key.into();
        self.remove(&key);
        self.strings.insert(key, value.into());
        self
    }

    pub fn set_float(&mut self, key: impl Into<String>, value: f64) -> &mut Self {
        let key = key.into();
        self.remove(&key);
        self.floats.insert(key, value);
        self
    }

    pub fn set_int(&mut self, key: impl Into<String>, value: i64) -> &mut Self {
        let key = key.into();
        self.remove(&key);
        self.ints.insert(key, value);
        self
    }

    pub fn remove(&mut self, key: &str) {
        self.strings.remove(key);
        self.floats.remove(key);
        self.ints.remove(key);
    }

    pub fn set_value(&mut self, key: impl Into<String>, value: CardValue) -> &mut Self {
        let key = key.into();
        match value {
            CardValue::Logical(b) => self.set_string(key, if b { "T" } else { "F" }),
            CardValue::Integer(i) => self.set_int(key, i),
            CardValue::Real(r) => self.set_float(key, r),
            CardValue::String(s) => self.set_string(key, s),
        }
    }

    pub fn len(&self) -> usize {
        self.strings.len() + self.floats.len() + self.ints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeywordProvider for KeywordMap {
    fn get_string(&self, key: &str) -> Option<String> {
        self.strings.get(key).cloned()
    }

    fn get_float(&self, key: &str) -> Option<f64> {
        self.floats.get(key).copied()
    }

    fn get_int(&self, key: &str) -> Option<i64> {
        self.ints.get(key).copied()
    }
}

impl FromIterator<WcsKeyword> for KeywordMap {
    fn from_iter<I: IntoIterator<Item = WcsKeyword>>(iter: I) -> Self {
        let mut map = Self::new();
        for keyword in iter {
            match keyword.value {
                WcsKeywordValue::Real(v) => map.set_float(keyword.name, v),
                WcsKeywordValue::Integer(v) => map.set_int(keyword.name, v),
                WcsKeywordValue::String(v) => map.set_string(keyword.name, v),
            };
        }
        map
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WcsKeywordValue {
    Real(f64),
    Integer(i64),
    String(String),
}

/// A header keyword produced when exporting a WCS.
#[derive(Debug, Clone, PartialEq)]
pub struct WcsKeyword {
    pub name: String,
    pub value: WcsKeywordValue,
}

impl WcsKeyword {
    pub fn real(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value: WcsKeywordValue::Real(value),
        }
    }

    pub fn integer(name: impl Into<String>, value: i64) -> Self {
        Self {
            name: name.into(),
            value: WcsKeywordValue::Integer(value),
        }
    }

    pub fn string(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: WcsKeywordValue::String(value.into()),
        }
    }

    /// Formats the keyword as an 80-column header card. Numbers are right
    /// justified to column 30; reals keep full precision.
    pub fn to_card(&self) -> String {
        let value = match &self.value {
            WcsKeywordValue::Real(v) => format!("{:>20}", format_real(*v)),
            WcsKeywordValue::Integer(v) => format!("{:>20}", v),
            WcsKeywordValue::String(s) => format!("'{:<8}'", s.replace('\'', "''")),
        };
        let mut card = format!("{:<8}= {}", self.name, value);
        card.truncate(CARD_SIZE);
        format!("{:<width$}", card, width = CARD_SIZE)
    }
}

fn format_real(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{:.1}", v)
    } else {
        format!("{:E}", v)
    }
}
