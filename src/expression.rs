use core::fmt;

use itertools::Itertools;
use serde::{de::{self, SeqAccess, Visitor}, ser::SerializeSeq, Deserialize, Deserializer, Serialize, Serializer};


/// Expressions are the nodes the evaluator walks. Every special form and call
/// is a [`Expression::List`]; its first element decides how it is read.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Number(f64),
    /// String literal, still wrapped in its `"` delimiters
    QuotedString(String),
    Symbol(String),
    List(Vec<Expression>),
}

impl Expression {
    pub fn symbol(name: impl Into<String>) -> Self {
        Self::Symbol(name.into())
    }

    /// Builds a string literal from unquoted text
    pub fn string(text: &str) -> Self {
        Self::QuotedString(format!("\"{}\"", text))
    }

    pub fn list(items: impl IntoIterator<Item = Expression>) -> Self {
        Self::List(items.into_iter().collect())
    }

    pub(crate) fn as_symbol(&self) -> Option<&str> {
        match self {
            Self::Symbol(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(number) => fmt::Display::fmt(number, f),
            Self::QuotedString(text) => f.write_str(text),
            Self::Symbol(name) => f.write_str(name),
            Self::List(items) => write!(f, "({})", items.iter().join(" ")),
        }
    }
}

// The JSON form mirrors the nested-array shape: numbers, strings (quoted
// strings keep their delimiters) and arrays for lists.
impl Serialize for Expression {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Number(number) => serializer.serialize_f64(*number),
            Self::QuotedString(text) | Self::Symbol(text) => serializer.serialize_str(text),
            Self::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
        }
    }
}

struct ExpressionVisitor;

impl<'de> Visitor<'de> for ExpressionVisitor {
    type Value = Expression;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "a number, a string or an array of expressions")
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<Self::Value, E> {
        Ok(Expression::Number(value))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
        Ok(Expression::Number(value as f64))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
        Ok(Expression::Number(value as f64))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
        if is_quoted_text(value) {
            Ok(Expression::QuotedString(value.to_owned()))
        } else {
            Ok(Expression::Symbol(value.to_owned()))
        }
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Expression::List(items))
    }
}

impl<'de> Deserialize<'de> for Expression {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ExpressionVisitor)
    }
}

/// Keywords that introduce a special form when they head a list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialForm {
    Begin,
    Var,
    Set,
    If,
    While,
    Def,
    Lambda,
}

impl SpecialForm {
    pub fn from_symbol(name: &str) -> Option<Self> {
        Some(match name {
            "begin" => Self::Begin,
            "var" => Self::Var,
            "set" => Self::Set,
            "if" => Self::If,
            "while" => Self::While,
            "def" => Self::Def,
            "lambda" => Self::Lambda,
            _ => return None,
        })
    }
}

fn is_quoted_text(text: &str) -> bool {
    text.len() >= 2 && text.starts_with('"') && text.ends_with('"')
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "_+-*/<>=%".contains(c)
}

pub fn is_number(expression: &Expression) -> bool {
    matches!(expression, Expression::Number(_))
}

/// A string literal whose text still carries both `"` delimiters
pub fn is_quoted_string(expression: &Expression) -> bool {
    matches!(expression, Expression::QuotedString(text) if is_quoted_text(text))
}

/// A symbol that can be looked up: made of identifier/operator characters
/// and not one of the special-form keywords.
pub fn is_variable_name(expression: &Expression) -> bool {
    matches!(
        expression,
        Expression::Symbol(name) if !name.is_empty() && name.chars().all(is_name_char) && SpecialForm::from_symbol(name).is_none()
    )
}

/// Text of a string literal without its delimiters. Callers check
/// [`is_quoted_string`] first.
pub(crate) fn strip_quotes(text: &str) -> &str {
    &text[1..text.len() - 1]
}
