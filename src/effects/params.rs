//! Two-segment parameter lists

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// A single macro parameter
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Text(String),
}

impl ParamValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Text(_) => None,
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{}", v),
            Self::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct Cursor {
    in_loop: bool,
    pos: usize,
}

/// Parameter sequence with a play-once main part and a repeating looped part
///
/// Equality and hashing only look at the contents, never at the cursor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "ParamListDef")]
pub struct ParamList {
    main: Vec<ParamValue>,
    #[serde(rename = "loop", default)]
    looped: Vec<ParamValue>,
    #[serde(skip)]
    cursor: Cursor,
}

impl ParamList {
    pub fn new(main: Vec<ParamValue>, looped: Vec<ParamValue>) -> Self {
        let mut list = Self {
            main,
            looped,
            cursor: Cursor::default(),
        };
        list.rewind();
        list
    }

    pub fn from_ints(main: &[i64], looped: &[i64]) -> Self {
        Self::new(
            main.iter().copied().map(ParamValue::Int).collect(),
            looped.iter().copied().map(ParamValue::Int).collect(),
        )
    }

    pub fn main(&self) -> &[ParamValue] {
        &self.main
    }

    pub fn looped(&self) -> &[ParamValue] {
        &self.looped
    }

    /// Index of the first looped value in the flattened list
    pub fn loop_index(&self) -> usize {
        self.main.len()
    }

    pub fn len(&self) -> usize {
        self.main.len() + self.looped.len()
    }

    pub fn is_empty(&self) -> bool {
        self.main.is_empty() && self.looped.is_empty()
    }

    /// Move the cursor back to the first value
    pub fn rewind(&mut self) {
        self.cursor = Cursor {
            in_loop: self.main.is_empty() && !self.looped.is_empty(),
            pos: 0,
        };
    }

    /// Value under the cursor
    pub fn peek(&self) -> Option<&ParamValue> {
        if self.cursor.in_loop {
            self.looped.get(self.cursor.pos)
        } else {
            self.main.get(self.cursor.pos)
        }
    }

    /// Advance the cursor by one value.
    ///
    /// Once the main part is exhausted the cursor enters the looped part and
    /// cycles there. Without a looped part it holds on the last main value.
    pub fn step(&mut self) {
        if self.cursor.in_loop {
            if !self.looped.is_empty() {
                self.cursor.pos = (self.cursor.pos + 1) % self.looped.len();
            }
        } else if self.cursor.pos + 1 < self.main.len() {
            self.cursor.pos += 1;
        } else if !self.looped.is_empty() {
            self.cursor = Cursor {
                in_loop: true,
                pos: 0,
            };
        }
    }

    /// Take the value under the cursor and advance
    pub fn next_value(&mut self) -> Option<ParamValue> {
        let value = self.peek().cloned();
        self.step();
        value
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParamValue> {
        self.main.iter().chain(self.looped.iter())
    }
}

#[derive(Deserialize)]
struct ParamListDef {
    #[serde(default)]
    main: Vec<ParamValue>,
    #[serde(rename = "loop", default)]
    looped: Vec<ParamValue>,
}

impl From<ParamListDef> for ParamList {
    fn from(def: ParamListDef) -> Self {
        Self::new(def.main, def.looped)
    }
}

impl PartialEq for ParamList {
    fn eq(&self, other: &Self) -> bool {
        self.main == other.main && self.looped == other.looped
    }
}

impl Eq for ParamList {}

impl Hash for ParamList {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.main.hash(state);
        self.looped.hash(state);
    }
}
