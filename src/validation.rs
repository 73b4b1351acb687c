//! Field-level validation of JSON request bodies.
//!
//! Bodies are validated as a whole so that a single 422 response can name
//! every offending field. Each accessor distinguishes a key that is absent
//! from one that is explicitly `null`, which is what partial updates need.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::str::FromStr;
use uuid::Uuid;

/// Fractional digits kept for dosage amounts.
pub const DECIMAL_SCALE: u32 = 3;

/// Digits allowed before the decimal point: `NUMERIC(10, 3)` leaves seven.
pub const DECIMAL_INTEGER_DIGITS: u32 = 7;

/// Field name -> messages, in field order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn extend(&mut self, other: ValidationErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fields: Vec<&str> = self.fields().collect();
        write!(f, "invalid fields: {}", fields.join(", "))
    }
}

impl std::error::Error for ValidationErrors {}

/// What a request body says about one field.
#[derive(Debug, Clone, PartialEq)]
pub enum Change<T> {
    /// Key absent: leave the stored value alone.
    Keep,
    /// Key present with `null`.
    Clear,
    Set(T),
}

impl<T> Default for Change<T> {
    fn default() -> Self {
        Change::Keep
    }
}

/// Create bodies must supply required fields; update bodies may omit
/// anything but cannot null out required columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Create,
    Update,
}

impl<T> Change<T> {
    pub fn is_keep(&self) -> bool {
        matches!(self, Change::Keep)
    }

    /// Value for a freshly created row: absent and null both mean "no value".
    pub fn into_option(self) -> Option<T> {
        match self {
            Change::Set(v) => Some(v),
            Change::Keep | Change::Clear => None,
        }
    }

    pub fn apply_to(self, target: &mut Option<T>) {
        match self {
            Change::Keep => {}
            Change::Clear => *target = None,
            Change::Set(v) => *target = Some(v),
        }
    }

    /// For required columns `Clear` has already been rejected during validation.
    pub fn apply_required(self, target: &mut T) {
        if let Change::Set(v) = self {
            *target = v;
        }
    }
}

impl<T> Change<Vec<T>> {
    /// Lists are replaced wholesale; `null` resets to empty.
    pub fn apply_list(self, target: &mut Vec<T>) {
        match self {
            Change::Keep => {}
            Change::Clear => target.clear(),
            Change::Set(v) => *target = v,
        }
    }

    pub fn into_list(self) -> Vec<T> {
        self.into_option().unwrap_or_default()
    }
}

pub struct Validator<'a> {
    body: &'a Map<String, Value>,
    prefix: String,
    errors: ValidationErrors,
}

impl<'a> Validator<'a> {
    pub fn new(body: &'a Map<String, Value>) -> Self {
        Self {
            body,
            prefix: String::new(),
            errors: ValidationErrors::new(),
        }
    }

    /// Validator for a nested object; its error keys are prefixed with `key.`.
    pub fn nested(&self, key: &str, body: &'a Map<String, Value>) -> Validator<'a> {
        Validator {
            body,
            prefix: format!("{}{}.", self.prefix, key),
            errors: ValidationErrors::new(),
        }
    }

    pub fn absorb(&mut self, child: Validator<'_>) {
        self.errors.extend(child.errors);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_error(&self, key: &str) -> bool {
        self.errors.contains(&self.path(key))
    }

    pub fn finish(self) -> Result<(), ValidationErrors> {
        self.errors.into_result()
    }

    pub fn add_error(&mut self, key: &str, message: impl Into<String>) {
        let path = self.path(key);
        self.errors.add(path, message);
    }

    fn path(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    fn label(key: &str) -> String {
        key.replace('_', " ")
    }

    /// Shared required-field rule for both input modes.
    pub fn required<T>(&mut self, mode: InputMode, key: &str, change: Change<T>) -> Change<T> {
        match mode {
            InputMode::Create => match self.require(key, change) {
                Some(v) => Change::Set(v),
                None => Change::Keep,
            },
            InputMode::Update => self.not_null(key, change),
        }
    }

    fn fail<T>(&mut self, key: &str, message: String) -> Change<T> {
        self.add_error(key, message);
        Change::Keep
    }

    fn raw(&self, key: &str) -> Change<&'a Value> {
        match self.body.get(key) {
            None => Change::Keep,
            Some(Value::Null) => Change::Clear,
            Some(v) => Change::Set(v),
        }
    }

    /// Rejects explicit `null` on a column that cannot be cleared.
    pub fn not_null<T>(&mut self, key: &str, change: Change<T>) -> Change<T> {
        if let Change::Clear = change {
            return self.fail(key, format!("The {} field cannot be null.", Self::label(key)));
        }
        change
    }

    /// Required on create: must be present and non-null.
    pub fn require<T>(&mut self, key: &str, change: Change<T>) -> Option<T> {
        match change {
            Change::Set(v) => Some(v),
            Change::Clear | Change::Keep => {
                if !self.has_error(key) {
                    self.add_error(key, format!("The {} field is required.", Self::label(key)));
                }
                None
            }
        }
    }

    pub fn string(&mut self, key: &str, max: usize) -> Change<String> {
        match self.raw(key) {
            Change::Set(Value::String(s)) => {
                if s.chars().count() > max {
                    self.fail(
                        key,
                        format!(
                            "The {} field must not be greater than {} characters.",
                            Self::label(key),
                            max
                        ),
                    )
                } else {
                    Change::Set(s.clone())
                }
            }
            Change::Set(_) => self.fail(key, format!("The {} field must be a string.", Self::label(key))),
            Change::Clear => Change::Clear,
            Change::Keep => Change::Keep,
        }
    }

    /// Like [`string`](Self::string) but blank strings count as missing.
    pub fn required_string(&mut self, key: &str, max: usize) -> Option<String> {
        let change = match self.string(key, max) {
            Change::Set(s) if s.trim().is_empty() => Change::Keep,
            other => other,
        };
        self.require(key, change)
    }

    /// Update-side counterpart of [`required_string`](Self::required_string).
    pub fn present_string(&mut self, key: &str, max: usize) -> Change<String> {
        let change = self.string(key, max);
        if let Change::Set(s) = &change {
            if s.trim().is_empty() {
                return self.fail(key, format!("The {} field is required.", Self::label(key)));
            }
        }
        self.not_null(key, change)
    }

    pub fn string_list(&mut self, key: &str, item_max: usize) -> Change<Vec<String>> {
        let items = match self.raw(key) {
            Change::Set(Value::Array(items)) => items,
            Change::Set(_) => return self.fail(key, format!("The {} field must be an array.", Self::label(key))),
            Change::Clear => return Change::Clear,
            Change::Keep => return Change::Keep,
        };

        let mut out = Vec::with_capacity(items.len());
        let mut valid = true;
        for (i, item) in items.iter().enumerate() {
            let item_key = format!("{}.{}", key, i);
            match item {
                Value::String(s) if s.chars().count() <= item_max => out.push(s.clone()),
                Value::String(_) => {
                    valid = false;
                    self.add_error(
                        &item_key,
                        format!(
                            "The {} field must not be greater than {} characters.",
                            Self::label(&item_key),
                            item_max
                        ),
                    );
                }
                _ => {
                    valid = false;
                    self.add_error(&item_key, format!("The {} field must be a string.", Self::label(&item_key)));
                }
            }
        }
        if valid {
            Change::Set(out)
        } else {
            Change::Keep
        }
    }

    pub fn boolean(&mut self, key: &str) -> Change<bool> {
        let parsed = match self.raw(key) {
            Change::Set(Value::Bool(b)) => Some(*b),
            Change::Set(Value::Number(n)) => match n.as_i64() {
                Some(0) => Some(false),
                Some(1) => Some(true),
                _ => None,
            },
            Change::Set(Value::String(s)) => match s.as_str() {
                "0" | "false" => Some(false),
                "1" | "true" => Some(true),
                _ => None,
            },
            Change::Set(_) => None,
            Change::Clear => return Change::Clear,
            Change::Keep => return Change::Keep,
        };
        match parsed {
            Some(b) => Change::Set(b),
            None => self.fail(key, format!("The {} field must be true or false.", Self::label(key))),
        }
    }

    pub fn integer(&mut self, key: &str, min: i32, max: i32) -> Change<i32> {
        let value = match self.raw(key) {
            Change::Set(Value::Number(n)) => n.as_i64(),
            Change::Set(_) => None,
            Change::Clear => return Change::Clear,
            Change::Keep => return Change::Keep,
        };
        match value {
            Some(v) if v >= i64::from(min) && v <= i64::from(max) => Change::Set(v as i32),
            Some(_) => self.fail(
                key,
                format!("The {} field must be between {} and {}.", Self::label(key), min, max),
            ),
            None => self.fail(key, format!("The {} field must be an integer.", Self::label(key))),
        }
    }

    pub fn integer_list(&mut self, key: &str, min: i32, max: i32) -> Change<Vec<i32>> {
        let items = match self.raw(key) {
            Change::Set(Value::Array(items)) => items,
            Change::Set(_) => return self.fail(key, format!("The {} field must be an array.", Self::label(key))),
            Change::Clear => return Change::Clear,
            Change::Keep => return Change::Keep,
        };
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            match item.as_i64() {
                Some(v) if v >= i64::from(min) && v <= i64::from(max) => out.push(v as i32),
                _ => {
                    return self.fail(
                        key,
                        format!(
                            "The {} field must contain integers between {} and {}.",
                            Self::label(key),
                            min,
                            max
                        ),
                    )
                }
            }
        }
        Change::Set(out)
    }

    /// Non-negative decimal given as a JSON number or numeric string. The
    /// value is rescaled to [`DECIMAL_SCALE`] places, the precision of the
    /// `NUMERIC(10, 3)` columns, so every backend returns the same digits.
    pub fn decimal(&mut self, key: &str) -> Change<Decimal> {
        let parsed = match self.raw(key) {
            Change::Set(Value::Number(n)) => Decimal::from_str(&n.to_string()).ok(),
            Change::Set(Value::String(s)) => Decimal::from_str(s.trim()).ok(),
            Change::Set(_) => None,
            Change::Clear => return Change::Clear,
            Change::Keep => return Change::Keep,
        };
        let limit = Decimal::from(10u64.pow(DECIMAL_INTEGER_DIGITS));
        match parsed {
            Some(d) if d.is_sign_negative() && !d.is_zero() => {
                self.fail(key, format!("The {} field must be at least 0.", Self::label(key)))
            }
            Some(d) if d.normalize().scale() > DECIMAL_SCALE => self.fail(
                key,
                format!(
                    "The {} field must not have more than {} decimal places.",
                    Self::label(key),
                    DECIMAL_SCALE
                ),
            ),
            Some(d) if d >= limit => {
                self.fail(key, format!("The {} field must be less than {}.", Self::label(key), limit))
            }
            Some(d) => {
                let mut d = d.abs();
                d.rescale(DECIMAL_SCALE);
                Change::Set(d)
            }
            None => self.fail(key, format!("The {} field must be a number.", Self::label(key))),
        }
    }

    pub fn date(&mut self, key: &str) -> Change<NaiveDate> {
        match self.raw(key) {
            Change::Set(Value::String(s)) => match parse_date(s) {
                Some(d) => Change::Set(d),
                None => self.fail(key, format!("The {} field must be a valid date.", Self::label(key))),
            },
            Change::Set(_) => self.fail(key, format!("The {} field must be a valid date.", Self::label(key))),
            Change::Clear => Change::Clear,
            Change::Keep => Change::Keep,
        }
    }

    pub fn datetime(&mut self, key: &str) -> Change<DateTime<Utc>> {
        match self.raw(key) {
            Change::Set(Value::String(s)) => match parse_datetime(s) {
                Some(dt) => Change::Set(dt),
                None => self.fail(key, format!("The {} field must be a valid date.", Self::label(key))),
            },
            Change::Set(_) => self.fail(key, format!("The {} field must be a valid date.", Self::label(key))),
            Change::Clear => Change::Clear,
            Change::Keep => Change::Keep,
        }
    }

    /// List of `HH:MM` / `HH:MM:SS` clock times, kept verbatim.
    pub fn clock_times(&mut self, key: &str) -> Change<Vec<String>> {
        let change = self.string_list(key, 8);
        if let Change::Set(times) = &change {
            if let Some(bad) = times.iter().position(|t| parse_clock_time(t).is_none()) {
                let item_key = format!("{}.{}", key, bad);
                return self.fail(
                    &item_key,
                    format!("The {} field must match the format HH:MM.", Self::label(&item_key)),
                );
            }
        }
        change
    }

    pub fn one_of<T: FromStr>(&mut self, key: &str) -> Change<T> {
        match self.raw(key) {
            Change::Set(Value::String(s)) => match s.parse::<T>() {
                Ok(v) => Change::Set(v),
                Err(_) => self.fail(key, format!("The selected {} is invalid.", Self::label(key))),
            },
            Change::Set(_) => self.fail(key, format!("The selected {} is invalid.", Self::label(key))),
            Change::Clear => Change::Clear,
            Change::Keep => Change::Keep,
        }
    }

    pub fn uuid(&mut self, key: &str) -> Change<Uuid> {
        match self.raw(key) {
            Change::Set(Value::String(s)) => match Uuid::parse_str(s) {
                Ok(id) => Change::Set(id),
                Err(_) => self.fail(key, format!("The {} field must be a valid identifier.", Self::label(key))),
            },
            Change::Set(_) => self.fail(key, format!("The {} field must be a valid identifier.", Self::label(key))),
            Change::Clear => Change::Clear,
            Change::Keep => Change::Keep,
        }
    }

    pub fn email(&mut self, key: &str) -> Option<String> {
        let email = self.required_string(key, 255)?;
        let valid = match email.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
            }
            None => false,
        };
        if valid {
            Some(email)
        } else {
            self.add_error(key, format!("The {} field must be a valid email address.", Self::label(key)));
            None
        }
    }

    pub fn object(&mut self, key: &str) -> Change<&'a Map<String, Value>> {
        match self.raw(key) {
            Change::Set(Value::Object(map)) => Change::Set(map),
            Change::Set(_) => self.fail(key, format!("The {} field must be an object.", Self::label(key))),
            Change::Clear => Change::Clear,
            Change::Keep => Change::Keep,
        }
    }
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

/// RFC 3339, or a naive `YYYY-MM-DD[ T]HH:MM[:SS]` read as UTC.
pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}

pub fn parse_clock_time(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .ok()
}
