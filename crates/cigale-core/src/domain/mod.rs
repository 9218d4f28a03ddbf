pub mod errors;

pub use errors::{CigaleError, CigaleErrorCategory, CigaleResult};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Text(String),
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl Display for Scalar {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Bool(true) => f.write_str("True"),
            Self::Bool(false) => f.write_str("False"),
            Self::Int(value) => write!(f, "{}", value),
            Self::Float(value) => f.write_str(&render_float(*value)),
        }
    }
}

/// Renders a float the way the external program's own (Python) tooling
/// prints it: integral values keep one decimal, tiny and huge magnitudes use
/// a two-digit signed exponent.
fn render_float(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let magnitude = value.abs();
    if magnitude != 0.0 && !(1.0e-4..1.0e16).contains(&magnitude) {
        let rendered = format!("{value:e}");
        let Some((mantissa, exponent)) = rendered.split_once('e') else {
            return rendered;
        };
        let exponent: i32 = exponent.parse().unwrap_or_default();
        let sign = if exponent < 0 { '-' } else { '+' };
        return format!("{}e{}{:02}", mantissa, sign, exponent.abs());
    }

    if value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u32> for Scalar {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

/// A value written into one `key = value` line of the run configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Scalar(Scalar),
    Sequence(Vec<Scalar>),
}

impl ParamValue {
    /// Text placed after `key = `. Sequence items are joined with `", "`.
    pub fn render(&self) -> String {
        match self {
            Self::Scalar(scalar) => scalar.to_string(),
            Self::Sequence(items) => items
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    pub fn from_json(key: &str, value: &Value) -> CigaleResult<Self> {
        match value {
            Value::Array(items) => items
                .iter()
                .map(|item| scalar_from_json(key, item))
                .collect::<CigaleResult<Vec<_>>>()
                .map(Self::Sequence),
            other => scalar_from_json(key, other).map(Self::Scalar),
        }
    }
}

fn scalar_from_json(key: &str, value: &Value) -> CigaleResult<Scalar> {
    let unsupported = |found: &str| CigaleError::UnsupportedValue {
        key: key.to_string(),
        found: found.to_string(),
    };

    match value {
        Value::String(text) => Ok(Scalar::Text(text.clone())),
        Value::Bool(flag) => Ok(Scalar::Bool(*flag)),
        Value::Number(number) => {
            if let Some(integer) = number.as_i64() {
                Ok(Scalar::Int(integer))
            } else if let Some(float) = number.as_f64() {
                Ok(Scalar::Float(float))
            } else {
                Err(unsupported("number"))
            }
        }
        Value::Null => Err(unsupported("null")),
        Value::Array(_) => Err(unsupported("nested list")),
        Value::Object(_) => Err(unsupported("object")),
    }
}

impl Display for ParamValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}

impl From<Scalar> for ParamValue {
    fn from(value: Scalar) -> Self {
        Self::Scalar(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Scalar(value.into())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Scalar(value.into())
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Scalar(value.into())
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        Self::Scalar(value.into())
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Scalar(value.into())
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        Self::Scalar(value.into())
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        Self::Scalar(value.into())
    }
}

impl<T> From<Vec<T>> for ParamValue
where
    T: Into<Scalar>,
{
    fn from(values: Vec<T>) -> Self {
        Self::Sequence(values.into_iter().map(Into::into).collect())
    }
}

/// Key/value pairs in insertion order. Lookups scan linearly; parameter
/// blocks hold a handful of keys.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedMap<V> {
    entries: Vec<(String, V)>,
}

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<V> OrderedMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the value of an existing key in place, otherwise appends.
    pub fn insert(&mut self, key: impl Into<String>, value: V) -> Option<V> {
        let key = key.into();
        if let Some((_, slot)) = self.entries.iter_mut().find(|(name, _)| *name == key) {
            return Some(std::mem::replace(slot, value));
        }
        self.entries.push((key, value));
        None
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub type ParamMap = OrderedMap<ParamValue>;

impl ParamMap {
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value.into());
        self
    }

    /// `raw` keeps document order (serde_json `preserve_order`).
    pub fn from_json(raw: &Map<String, Value>) -> CigaleResult<Self> {
        let mut params = ParamMap::new();
        for (key, value) in raw.iter() {
            params.insert(key, ParamValue::from_json(key, value)?);
        }
        Ok(params)
    }
}

/// Per-module parameter blocks; key order is the `sed_modules` order.
pub type ModuleConfig = OrderedMap<ParamMap>;

impl ModuleConfig {
    pub fn with_module(mut self, module: impl Into<String>, params: ParamMap) -> Self {
        self.insert(module, params);
        self
    }

    pub fn module_names(&self) -> Vec<String> {
        self.keys().map(str::to_string).collect()
    }

    pub fn from_json_modules(raw: &Map<String, Value>) -> CigaleResult<Self> {
        let mut modules = ModuleConfig::new();
        for (module, params) in raw.iter() {
            let Value::Object(params) = params else {
                return Err(CigaleError::UnsupportedValue {
                    key: module.clone(),
                    found: "non-object module block".to_string(),
                });
            };
            modules.insert(module.as_str(), ParamMap::from_json(params)?);
        }
        Ok(modules)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HstBands {
    #[serde(default)]
    pub acs: Vec<String>,
    #[serde(default)]
    pub uvis: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JwstBands {
    #[serde(default)]
    pub nircam: Vec<String>,
    #[serde(default)]
    pub miri: Vec<String>,
}

/// Requested output bands, per observatory and instrument.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BandSelection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hst: Option<HstBands>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwst: Option<JwstBands>,
}

impl BandSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_acs<I, S>(mut self, bands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let hst = self.hst.get_or_insert_with(HstBands::default);
        hst.acs.extend(bands.into_iter().map(Into::into));
        self
    }

    pub fn with_uvis<I, S>(mut self, bands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let hst = self.hst.get_or_insert_with(HstBands::default);
        hst.uvis.extend(bands.into_iter().map(Into::into));
        self
    }

    pub fn with_nircam<I, S>(mut self, bands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let jwst = self.jwst.get_or_insert_with(JwstBands::default);
        jwst.nircam.extend(bands.into_iter().map(Into::into));
        self
    }

    pub fn with_miri<I, S>(mut self, bands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let jwst = self.jwst.get_or_insert_with(JwstBands::default);
        jwst.miri.extend(bands.into_iter().map(Into::into));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::{BandSelection, ModuleConfig, ParamMap, ParamValue, Scalar};
    use crate::domain::CigaleError;
    use serde_json::{Map, Value};

    #[test]
    fn scalars_render_like_the_external_tooling() {
        assert_eq!(Scalar::Bool(true).to_string(), "True");
        assert_eq!(Scalar::Bool(false).to_string(), "False");
        assert_eq!(Scalar::Int(-3).to_string(), "-3");
        assert_eq!(Scalar::Float(1.0).to_string(), "1.0");
        assert_eq!(Scalar::Float(0.001).to_string(), "0.001");
        assert_eq!(Scalar::Float(3.1).to_string(), "3.1");
        assert_eq!(Scalar::Float(1.0e-7).to_string(), "1e-07");
        assert_eq!(Scalar::Float(2.5e20).to_string(), "2.5e+20");
        assert_eq!(Scalar::from("B_B90 & V_B90").to_string(), "B_B90 & V_B90");
    }

    #[test]
    fn sequences_join_without_trailing_separator() {
        let value = ParamValue::from(vec![1, 2, 3]);
        assert_eq!(value.render(), "1, 2, 3");
        assert_eq!(ParamValue::from(Vec::<i64>::new()).render(), "");
    }

    #[test]
    fn ordered_map_keeps_json_document_order() {
        let raw: Map<String, Value> = serde_json::from_str(
            r#"{"sfh2exp": {"tau_main": [0.001], "age": [1]}, "bc03": {"imf": [1]}, "nebular": {}}"#,
        )
        .expect("module config should parse");
        let modules = ModuleConfig::from_json_modules(&raw).expect("values should be supported");

        assert_eq!(modules.module_names(), vec!["sfh2exp", "bc03", "nebular"]);
        let sfh = modules.get("sfh2exp").expect("sfh2exp block should exist");
        assert_eq!(sfh.keys().collect::<Vec<_>>(), vec!["tau_main", "age"]);
        assert_eq!(sfh.get("tau_main"), Some(&ParamValue::from(vec![0.001])));
    }

    #[test]
    fn module_blocks_must_be_objects() {
        let raw: Map<String, Value> =
            serde_json::from_str(r#"{"sfh2exp": [1, 2]}"#).expect("json parses");
        let error = ModuleConfig::from_json_modules(&raw).expect_err("list block should fail");
        assert!(matches!(error, CigaleError::UnsupportedValue { ref key, .. } if key == "sfh2exp"));
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut params = ParamMap::new().with("a", 1).with("b", 2);
        let previous = params.insert("a", ParamValue::from(5));

        assert_eq!(previous, Some(ParamValue::from(1)));
        assert_eq!(params.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(params.get("a"), Some(&ParamValue::from(5)));
    }

    #[test]
    fn json_objects_and_nulls_are_unsupported() {
        let raw: Map<String, Value> =
            serde_json::from_str(r#"{"ok": 1, "bad": {"nested": true}}"#).expect("json parses");
        let error = ParamMap::from_json(&raw).expect_err("object values should be rejected");
        assert!(matches!(
            error,
            CigaleError::UnsupportedValue { ref key, ref found } if key == "bad" && found == "object"
        ));

        let raw: Map<String, Value> =
            serde_json::from_str(r#"{"bad": [[1, 2]]}"#).expect("json parses");
        let error = ParamMap::from_json(&raw).expect_err("nested lists should be rejected");
        assert_eq!(error.placeholder(), "INPUT.UNSUPPORTED_VALUE");
    }

    #[test]
    fn band_selection_defaults_missing_instruments_to_empty() {
        let selection: BandSelection =
            serde_json::from_str(r#"{"hst": {"acs": ["F435W"]}}"#).expect("selection parses");
        assert_eq!(selection, BandSelection::new().with_acs(["F435W"]));
        assert!(selection.jwst.is_none());

        let unknown = serde_json::from_str::<BandSelection>(r#"{"hst": {"wfc3": ["F435W"]}}"#);
        assert!(unknown.is_err(), "unknown instrument keys should be rejected");
    }
}
