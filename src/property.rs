//! Scene property paths.
//!
//! A path such as `objects['Cube'].location[2]` names one floating point
//! field in the scene's property tree:
//!
//! ```text
//! path    := segment ('.' segment)*
//! segment := identifier ('[' (quoted_string | integer) ']')?
//! ```
//!
//! Dots inside brackets do not split segments. Resolution walks the tree
//! from the root, reading the attribute named by each segment and then
//! applying its subscript, and succeeds only on a `Value::Float` leaf.

use crate::error::ConfigurationError;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The host's property tree, as seen by the resolver.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Float(f64),
    Int(i64),
    Bool(bool),
    Str(String),
    /// Integer-indexed collection (vectors, colors, arrays).
    Sequence(Vec<Value>),
    /// String-keyed collection.
    Mapping(BTreeMap<String, Value>),
    /// Named attributes.
    Object(BTreeMap<String, Value>),
}

impl Value {
    pub fn object<K: Into<String>>(fields: impl IntoIterator<Item = (K, Value)>) -> Value {
        Value::Object(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn mapping<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Value {
        Value::Mapping(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn floats(values: impl IntoIterator<Item = f64>) -> Value {
        Value::Sequence(values.into_iter().map(Value::Float).collect())
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Read-only lookup, for hosts and UI code.
    pub fn get(&self, path: &PropertyPath) -> Option<&Value> {
        let mut current = self;
        for segment in &path.segments {
            current = match current {
                Value::Object(fields) => fields.get(&segment.name)?,
                _ => return None,
            };
            current = match (&segment.subscript, current) {
                (None, v) => v,
                (Some(Subscript::Key(key)), Value::Mapping(entries)) => entries.get(key)?,
                (Some(Subscript::Index(index)), Value::Sequence(items)) => {
                    items.get(normalize_index(*index, items.len())?)?
                }
                _ => return None,
            };
        }
        Some(current)
    }

    fn kind(&self) -> &'static str {
        match self {
            Value::Float(_) => "float",
            Value::Int(_) => "int",
            Value::Bool(_) => "bool",
            Value::Str(_) => "string",
            Value::Sequence(_) => "sequence",
            Value::Mapping(_) => "mapping",
            Value::Object(_) => "object",
        }
    }
}

/// Bracketed part of a segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subscript {
    Key(String),
    /// Negative values count from the end.
    Index(i64),
}

impl fmt::Display for Subscript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subscript::Key(key) => write!(f, "['{}']", key),
            Subscript::Index(index) => write!(f, "[{}]", index),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub name: String,
    pub subscript: Option<Subscript>,
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if let Some(subscript) = &self.subscript {
            write!(f, "{}", subscript)?;
        }
        Ok(())
    }
}

/// A parsed property path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyPath {
    segments: Vec<Segment>,
}

impl PropertyPath {
    pub fn parse(path: &str) -> Result<Self, ConfigurationError> {
        let path = path.trim();
        if path.is_empty() {
            return Err(ConfigurationError::EmptyPath);
        }
        let segments = split_segments(path)?
            .into_iter()
            .map(|raw| parse_segment(path, raw))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Keyframe address for the field this path resolves to.
    ///
    /// An indexed leaf is keyed through its compound attribute: the key for
    /// `obj.location[2]` is property `location` on owner `obj`.
    pub fn keyframe_key(&self) -> PropertyKey {
        // Parsed paths always have at least one segment.
        let (last, owner) = match self.segments.split_last() {
            Some(split) => split,
            None => return PropertyKey::default(),
        };
        PropertyKey {
            owner: owner
                .iter()
                .map(|s| s.to_string())
                .collect::<Vec<_>>()
                .join("."),
            property: last.name.clone(),
        }
    }
}

impl FromStr for PropertyPath {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PropertyPath::parse(s)
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

/// Attribute to keyframe after a property write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PropertyKey {
    /// Path of the owning object; empty for the root.
    pub owner: String,
    pub property: String,
}

/// A resolved, writable floating point field.
#[derive(Debug)]
pub struct NumericField<'a> {
    value: &'a mut f64,
}

impl NumericField<'_> {
    pub fn get(&self) -> f64 {
        *self.value
    }

    pub fn set(&mut self, value: f64) {
        *self.value = value;
    }
}

/// Resolve `path` against `root` to a writable float.
pub fn resolve<'a>(
    root: &'a mut Value,
    path: &PropertyPath,
) -> Result<NumericField<'a>, ConfigurationError> {
    let mut current = root;
    for segment in &path.segments {
        current = attribute(current, &segment.name)?;
        if let Some(subscript) = &segment.subscript {
            current = subscript_mut(current, segment, subscript)?;
        }
    }
    match current {
        Value::Float(value) => Ok(NumericField { value }),
        _ => Err(ConfigurationError::NotNumeric(path.to_string())),
    }
}

fn attribute<'a>(value: &'a mut Value, name: &str) -> Result<&'a mut Value, ConfigurationError> {
    match value {
        Value::Object(fields) => fields
            .get_mut(name)
            .ok_or_else(|| ConfigurationError::MissingAttribute(name.to_string())),
        _ => Err(ConfigurationError::NotAnObject(name.to_string())),
    }
}

fn subscript_mut<'a>(
    value: &'a mut Value,
    segment: &Segment,
    subscript: &Subscript,
) -> Result<&'a mut Value, ConfigurationError> {
    match (subscript, value) {
        (Subscript::Key(key), Value::Mapping(entries)) => entries
            .get_mut(key)
            .ok_or_else(|| ConfigurationError::MissingKey(key.clone())),
        (Subscript::Index(index), Value::Sequence(items)) => {
            let len = items.len();
            let i = normalize_index(*index, len).ok_or(ConfigurationError::IndexOutOfRange {
                index: index.unsigned_abs() as usize,
                len,
            })?;
            Ok(&mut items[i])
        }
        (subscript, other) => Err(ConfigurationError::NotSubscriptable {
            segment: segment.name.clone(),
            subscript: format!("{} (value is a {})", subscript, other.kind()),
        }),
    }
}

fn normalize_index(index: i64, len: usize) -> Option<usize> {
    let i = if index < 0 {
        (len as i64).checked_add(index)?
    } else {
        index
    };
    usize::try_from(i).ok().filter(|&i| i < len)
}

/// Split on dots that are outside brackets and quotes.
fn split_segments(path: &str) -> Result<Vec<&str>, ConfigurationError> {
    let malformed = |reason: &str| ConfigurationError::MalformedPath {
        path: path.to_string(),
        reason: reason.to_string(),
    };

    let mut parts = Vec::new();
    let mut start = 0;
    let mut in_brackets = false;
    let mut quote: Option<char> = None;

    for (i, c) in path.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') if in_brackets => quote = Some(c),
            (None, '[') if !in_brackets => in_brackets = true,
            (None, '[') => return Err(malformed("nested '['")),
            (None, ']') if in_brackets => in_brackets = false,
            (None, ']') => return Err(malformed("unmatched ']'")),
            (None, '.') if !in_brackets => {
                parts.push(&path[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if quote.is_some() {
        return Err(malformed("unterminated quote"));
    }
    if in_brackets {
        return Err(malformed("unterminated '['"));
    }
    parts.push(&path[start..]);
    Ok(parts)
}

fn parse_segment(path: &str, raw: &str) -> Result<Segment, ConfigurationError> {
    let malformed = |reason: String| ConfigurationError::MalformedPath {
        path: path.to_string(),
        reason,
    };

    let (name, subscript) = match raw.find('[') {
        Some(open) => {
            let close = closing_bracket(raw, open)
                .ok_or_else(|| malformed(format!("unterminated subscript in '{}'", raw)))?;
            if close != raw.len() - 1 {
                return Err(malformed(format!(
                    "segment '{}' must end with a single subscript",
                    raw
                )));
            }
            (&raw[..open], Some(parse_subscript(&raw[open + 1..close])?))
        }
        None => (raw, None),
    };

    if !is_identifier(name) {
        return Err(malformed(format!("'{}' is not an identifier", name)));
    }
    Ok(Segment {
        name: name.to_string(),
        subscript,
    })
}

/// Byte offset of the ']' closing the '[' at `open`, skipping quoted text.
fn closing_bracket(raw: &str, open: usize) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, c) in raw[open + 1..].char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, ']') => return Some(open + 1 + i),
            _ => {}
        }
    }
    None
}

fn quoted(body: &str) -> Option<&str> {
    let mut chars = body.chars();
    let first = chars.next()?;
    if (first == '\'' || first == '"') && body.len() >= 2 && body.ends_with(first) {
        let inner = &body[1..body.len() - 1];
        // The closing quote must be the first occurrence after the opening one.
        (!inner.contains(first)).then_some(inner)
    } else {
        None
    }
}

fn parse_subscript(body: &str) -> Result<Subscript, ConfigurationError> {
    let body = body.trim();
    if let Some(key) = quoted(body) {
        return Ok(Subscript::Key(key.to_string()));
    }
    body.parse::<i64>()
        .map(Subscript::Index)
        .map_err(|_| ConfigurationError::InvalidSubscript(body.to_string()))
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Value {
        Value::object([(
            "a",
            Value::object([
                ("b", Value::floats([1.5, 2.5])),
                ("m", Value::mapping([("x.y", Value::Float(4.0))])),
                ("n", Value::Int(3)),
            ]),
        )])
    }

    #[test]
    fn test_parse_segments() {
        let path = PropertyPath::parse("objects['Cube.001'].location[2]").unwrap();
        assert_eq!(
            path.segments(),
            &[
                Segment {
                    name: "objects".into(),
                    subscript: Some(Subscript::Key("Cube.001".into())),
                },
                Segment {
                    name: "location".into(),
                    subscript: Some(Subscript::Index(2)),
                },
            ]
        );
    }

    #[test]
    fn test_parse_double_quoted_key_with_bracket() {
        let path = PropertyPath::parse("a.m[\"k]ey\"]").unwrap();
        assert_eq!(
            path.segments()[1].subscript,
            Some(Subscript::Key("k]ey".into()))
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(PropertyPath::parse("  "), Err(ConfigurationError::EmptyPath));
        assert!(matches!(
            PropertyPath::parse("a..b"),
            Err(ConfigurationError::MalformedPath { .. })
        ));
        assert!(matches!(
            PropertyPath::parse("a[0"),
            Err(ConfigurationError::MalformedPath { .. })
        ));
        assert!(matches!(
            PropertyPath::parse("a[0][1]"),
            Err(ConfigurationError::MalformedPath { .. })
        ));
        assert!(matches!(
            PropertyPath::parse("a[x]"),
            Err(ConfigurationError::InvalidSubscript(_))
        ));
        assert!(matches!(
            PropertyPath::parse("a['x]"),
            Err(ConfigurationError::MalformedPath { .. })
        ));
    }

    #[test]
    fn test_resolve_and_write_sequence_element() {
        let mut root = sample();
        let path = PropertyPath::parse("a.b[0]").unwrap();
        let mut field = resolve(&mut root, &path).unwrap();
        assert_eq!(field.get(), 1.5);
        field.set(15.0);

        assert_eq!(root.get(&path).and_then(Value::as_f64), Some(15.0));
        let other = PropertyPath::parse("a.b[1]").unwrap();
        assert_eq!(root.get(&other).and_then(Value::as_f64), Some(2.5));
    }

    #[test]
    fn test_resolve_negative_index() {
        let mut root = sample();
        let path = PropertyPath::parse("a.b[-1]").unwrap();
        assert_eq!(resolve(&mut root, &path).unwrap().get(), 2.5);
        let path = PropertyPath::parse("a.b[-3]").unwrap();
        assert_eq!(
            resolve(&mut root, &path).unwrap_err(),
            ConfigurationError::IndexOutOfRange { index: 3, len: 2 }
        );
    }

    #[test]
    fn test_resolve_key_with_dot() {
        let mut root = sample();
        let path = PropertyPath::parse("a.m['x.y']").unwrap();
        assert_eq!(resolve(&mut root, &path).unwrap().get(), 4.0);
    }

    #[test]
    fn test_missing_attribute_leaves_tree_unchanged() {
        let mut root = sample();
        let path = PropertyPath::parse("a.c").unwrap();
        assert_eq!(
            resolve(&mut root, &path).unwrap_err(),
            ConfigurationError::MissingAttribute("c".into())
        );
        assert_eq!(root, sample());
    }

    #[test]
    fn test_key_subscript_on_sequence_is_configuration_error() {
        let mut root = sample();
        let path = PropertyPath::parse("a.b['x']").unwrap();
        assert!(matches!(
            resolve(&mut root, &path),
            Err(ConfigurationError::NotSubscriptable { .. })
        ));
    }

    #[test]
    fn test_non_float_leaf_is_rejected() {
        let mut root = sample();
        for p in ["a.n", "a.b", "a"] {
            let path = PropertyPath::parse(p).unwrap();
            assert!(matches!(
                resolve(&mut root, &path),
                Err(ConfigurationError::NotNumeric(_))
            ));
        }
    }

    #[test]
    fn test_attribute_on_scalar_is_rejected() {
        let mut root = sample();
        let path = PropertyPath::parse("a.n.x").unwrap();
        assert_eq!(
            resolve(&mut root, &path).unwrap_err(),
            ConfigurationError::NotAnObject("x".into())
        );
    }

    #[test]
    fn test_keyframe_key_uses_compound_parent() {
        let path = PropertyPath::parse("objects['Cube'].location[2]").unwrap();
        assert_eq!(
            path.keyframe_key(),
            PropertyKey {
                owner: "objects['Cube']".into(),
                property: "location".into(),
            }
        );
        let path = PropertyPath::parse("frame_rate").unwrap();
        assert_eq!(path.keyframe_key().owner, "");
    }

    #[test]
    fn test_read_only_get() {
        let root = sample();
        let path = PropertyPath::parse("a.b[1]").unwrap();
        assert_eq!(root.get(&path).and_then(Value::as_f64), Some(2.5));
        let path = PropertyPath::parse("a.m['nope']").unwrap();
        assert!(root.get(&path).is_none());
    }
}
