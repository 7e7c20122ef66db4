//! Attribute maps and the layered precedence stack.
//!
//! Attributes travel on every op of the wire format and on every fragment in
//! the tree. A `null` value is meaningful: inside a change it removes the key
//! from whatever it is composed onto.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Attribute keys understood by the engine
pub mod keys {
    /// Block discriminator on the last op of a block group
    pub const BLOCK: &str = "block";
    /// Fragment discriminator for non-text units
    pub const FRAG: &str = "frag";

    pub const FONT: &str = "font";
    pub const SIZE: &str = "size";
    pub const BOLD: &str = "bold";
    pub const ITALIC: &str = "italic";
    pub const UNDERLINE: &str = "underline";
    pub const STRIKE: &str = "strike";
    pub const COLOR: &str = "color";
    pub const BACKGROUND: &str = "background";

    pub const ALIGN: &str = "align";
    pub const INDENT: &str = "indent";
    pub const FIRST_LINE_INDENT: &str = "firstLineIndent";
    pub const LINE_SPACING: &str = "lineSpacing";

    pub const SRC: &str = "src";
    pub const WIDTH: &str = "width";
    pub const HEIGHT: &str = "height";
    pub const TEXT: &str = "text";

    pub const LANGUAGE: &str = "language";
    pub const COL_WIDTHS: &str = "colWidths";
    pub const COL_SPAN: &str = "colSpan";
    pub const ROW_SPAN: &str = "rowSpan";
}

static LIBRARY_DEFAULTS: LazyLock<Attributes> = LazyLock::new(|| {
    Attributes::new()
        .with(keys::FONT, "sans-serif")
        .with(keys::SIZE, 12)
        .with(keys::COLOR, "#000000")
});

/// An ordered string-keyed map of JSON values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(BTreeMap<String, Value>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Font family, size and color every fragment falls back to
    pub fn library_defaults() -> &'static Attributes {
        &LIBRARY_DEFAULTS
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn get_f32(&self, key: &str) -> Option<f32> {
        self.0.get(key).and_then(Value::as_f64).map(|n| n as f32)
    }

    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.0
            .get(key)
            .and_then(Value::as_u64)
            .and_then(|n| usize::try_from(n).ok())
    }

    /// Missing and non-boolean values read as `false`
    pub fn get_bool(&self, key: &str) -> bool {
        self.0.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// `None` for an empty map, so ops never carry `"attributes": {}`
    pub fn into_option(self) -> Option<Self> {
        if self.is_empty() { None } else { Some(self) }
    }

    /// Move the listed keys out into a new map
    pub fn split_off_keys(&mut self, keys: &[&str]) -> Attributes {
        let mut taken = Attributes::new();
        for key in keys {
            if let Some(value) = self.0.remove(*key) {
                taken.0.insert((*key).to_string(), value);
            }
        }
        taken
    }

    /// Copy without the `block`/`frag` discriminators
    pub fn without_structural(&self) -> Attributes {
        let mut copy = self.clone();
        copy.0.remove(keys::BLOCK);
        copy.0.remove(keys::FRAG);
        copy
    }

    /// `self` layered over `base`; `null` values in `self` clear the key
    pub fn merged_over(&self, base: &Attributes) -> Attributes {
        let mut merged = base.clone();
        for (key, value) in &self.0 {
            if value.is_null() {
                merged.0.remove(key);
            } else {
                merged.0.insert(key.clone(), value.clone());
            }
        }
        merged
    }

    /// Apply `b` on top of `a`. With `keep_null` the `null` markers survive
    /// (composing two changes); without it they delete keys (composing a
    /// change onto content).
    pub fn compose(
        a: Option<&Attributes>,
        b: Option<&Attributes>,
        keep_null: bool,
    ) -> Option<Attributes> {
        let mut result = b.cloned().unwrap_or_default();
        if !keep_null {
            result.0.retain(|_, value| !value.is_null());
        }
        if let Some(a) = a {
            for (key, value) in &a.0 {
                if !b.is_some_and(|b| b.contains_key(key)) {
                    result.0.insert(key.clone(), value.clone());
                }
            }
        }
        result.into_option()
    }

    /// The change that turns `a` into `b`
    pub fn diff(a: Option<&Attributes>, b: Option<&Attributes>) -> Option<Attributes> {
        let empty = Attributes::new();
        let a = a.unwrap_or(&empty);
        let b = b.unwrap_or(&empty);
        let mut result = Attributes::new();
        for key in a.0.keys().chain(b.0.keys()) {
            if a.get(key) != b.get(key) {
                let value = b.get(key).cloned().unwrap_or(Value::Null);
                result.0.insert(key.clone(), value);
            }
        }
        result.into_option()
    }

    /// The change that undoes `attr` when it was applied over `base`
    pub fn invert(attr: Option<&Attributes>, base: Option<&Attributes>) -> Option<Attributes> {
        let empty = Attributes::new();
        let attr = attr.unwrap_or(&empty);
        let base = base.unwrap_or(&empty);
        let mut result = Attributes::new();
        for (key, value) in &base.0 {
            if attr.contains_key(key) && attr.get(key) != Some(value) {
                result.0.insert(key.clone(), value.clone());
            }
        }
        for key in attr.0.keys() {
            if !base.contains_key(key) {
                result.0.insert(key.clone(), Value::Null);
            }
        }
        result.into_option()
    }
}

impl FromIterator<(String, Value)> for Attributes {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// The precedence stack a fragment compiles its effective attributes from.
///
/// Library defaults sit below everything and are passed in at compile time;
/// `override_defaults` is owned by the enclosing block kind; `explicit` is
/// what the user set and what the wire format carries; `transient` is a
/// short-lived override that never serializes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeLayers {
    pub override_defaults: Attributes,
    pub explicit: Attributes,
    pub transient: Option<Attributes>,
}

impl AttributeLayers {
    pub fn from_explicit(explicit: Attributes) -> Self {
        Self {
            explicit,
            ..Self::default()
        }
    }

    pub fn compile(&self, defaults: &Attributes) -> Attributes {
        let mut compiled = self.override_defaults.merged_over(defaults);
        compiled = self.explicit.merged_over(&compiled);
        if let Some(transient) = &self.transient {
            compiled = transient.merged_over(&compiled);
        }
        compiled
    }
}
