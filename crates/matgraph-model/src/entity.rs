//! Read-only views over entity records.
//!
//! Entity records are kept as YAML mappings (see crate docs). `EntityView`
//! gives typed access to the handful of fields the engine reasons about
//! without forcing the rest of the record through a schema.

use serde_yaml::{Mapping, Value};

pub const KEY_ID: &str = "id";
pub const KEY_NAME: &str = "name";
pub const KEY_CATEGORY: &str = "category";
pub const KEY_SUBCATEGORY: &str = "subcategory";
pub const KEY_PROPERTIES: &str = "properties";
pub const KEY_RELATIONSHIPS: &str = "relationships";

// Property sub-keys. Renaming any of these is a breaking format change.
pub const PROP_VALUE: &str = "value";
pub const PROP_UNIT: &str = "unit";
pub const PROP_MIN: &str = "min";
pub const PROP_MAX: &str = "max";
pub const PROP_CONFIDENCE: &str = "confidence";
pub const PROP_RESEARCH_BASIS: &str = "research_basis";

const RECORD_KEYS: [&str; 4] = [PROP_VALUE, PROP_UNIT, PROP_MIN, PROP_MAX];

/// String view of a mapping key (YAML allows non-string keys; we ignore those).
pub fn str_key(v: &Value) -> Option<&str> {
    v.as_str()
}

/// Look up a string-keyed field in a mapping.
pub fn field<'a>(m: &'a Mapping, key: &str) -> Option<&'a Value> {
    m.get(key)
}

/// Interpret a YAML scalar as a number. Quoted numerics (`"2.7"`) are accepted
/// because curated content frequently stores them that way.
pub fn as_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EntityView<'a> {
    key: &'a str,
    record: &'a Mapping,
}

/// A single property record found inside an entity.
#[derive(Debug, Clone, Copy)]
pub struct PropertyRecord<'a> {
    pub value: Option<&'a Value>,
    pub unit: Option<&'a str>,
    pub min: Option<&'a Value>,
    pub max: Option<&'a Value>,
}

impl<'a> PropertyRecord<'a> {
    fn from_mapping(m: &'a Mapping) -> Self {
        Self {
            value: m.get(PROP_VALUE),
            unit: m.get(PROP_UNIT).and_then(Value::as_str),
            min: m.get(PROP_MIN),
            max: m.get(PROP_MAX),
        }
    }

    fn from_scalar(v: &'a Value) -> Self {
        Self {
            value: Some(v),
            unit: None,
            min: None,
            max: None,
        }
    }

    pub fn numeric_value(&self) -> Option<f64> {
        self.value.and_then(as_number)
    }

    /// Entity-level ranges are forbidden; ranges belong to the category registry.
    pub fn has_min_max(&self) -> bool {
        self.min.is_some() || self.max.is_some()
    }
}

/// A property reference: its name, the bucket it was grouped under (if the
/// entity uses grouped properties), and the record itself.
#[derive(Debug, Clone, Copy)]
pub struct PropertyRef<'a> {
    pub name: &'a str,
    pub group: Option<&'a str>,
    pub record: PropertyRecord<'a>,
}

fn is_record_mapping(m: &Mapping) -> bool {
    RECORD_KEYS.iter().any(|k| m.contains_key(*k))
}

fn is_group_mapping(m: &Mapping) -> bool {
    !is_record_mapping(m) && m.values().any(Value::is_mapping)
}

impl<'a> EntityView<'a> {
    pub fn new(key: &'a str, record: &'a Mapping) -> Self {
        Self { key, record }
    }

    /// Build a view from a document entry. Returns `None` for non-mapping records.
    pub fn from_entry(key: &'a Value, record: &'a Value) -> Option<Self> {
        Some(Self::new(str_key(key)?, record.as_mapping()?))
    }

    pub fn key(&self) -> &'a str {
        self.key
    }

    pub fn record(&self) -> &'a Mapping {
        self.record
    }

    pub fn id(&self) -> Option<&'a str> {
        self.record.get(KEY_ID).and_then(Value::as_str)
    }

    pub fn name(&self) -> Option<&'a str> {
        self.record.get(KEY_NAME).and_then(Value::as_str)
    }

    pub fn category(&self) -> Option<&'a str> {
        self.record
            .get(KEY_CATEGORY)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn subcategory(&self) -> Option<&'a str> {
        self.record
            .get(KEY_SUBCATEGORY)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn relationships(&self) -> Option<&'a Mapping> {
        self.record.get(KEY_RELATIONSHIPS).and_then(Value::as_mapping)
    }

    /// Every property record of this entity, flattening one level of grouping.
    pub fn properties(&self) -> Vec<PropertyRef<'a>> {
        let mut out = Vec::new();
        let Some(props) = self.record.get(KEY_PROPERTIES).and_then(Value::as_mapping) else {
            return out;
        };
        for (k, v) in props {
            let Some(name) = str_key(k) else {
                continue;
            };
            match v {
                Value::Null => {}
                Value::Mapping(m) if is_group_mapping(m) => {
                    for (pk, pv) in m {
                        let Some(pname) = str_key(pk) else {
                            continue;
                        };
                        // Group-level scalars (label, description, percentage) are metadata.
                        if let Value::Mapping(pm) = pv {
                            out.push(PropertyRef {
                                name: pname,
                                group: Some(name),
                                record: PropertyRecord::from_mapping(pm),
                            });
                        }
                    }
                }
                Value::Mapping(m) => out.push(PropertyRef {
                    name,
                    group: None,
                    record: PropertyRecord::from_mapping(m),
                }),
                Value::Sequence(_) => {}
                scalar => out.push(PropertyRef {
                    name,
                    group: None,
                    record: PropertyRecord::from_scalar(scalar),
                }),
            }
        }
        out
    }

    /// Numeric value of a named property, wherever it is grouped.
    pub fn property_value(&self, property: &str) -> Option<f64> {
        self.properties()
            .into_iter()
            .find(|p| p.name == property)
            .and_then(|p| p.record.numeric_value())
    }

    /// Strings found at a dotted field path (`a.b.c`). Lists of strings and
    /// lists of `{name: ..}` mappings are flattened.
    pub fn texts_at(&self, path: &str) -> Vec<&'a str> {
        let mut cur: Option<&'a Value> = None;
        for (i, seg) in path.split('.').enumerate() {
            let next = if i == 0 {
                self.record.get(seg)
            } else {
                cur.and_then(Value::as_mapping).and_then(|m| m.get(seg))
            };
            match next {
                Some(v) => cur = Some(v),
                None => return Vec::new(),
            }
        }
        let mut out = Vec::new();
        if let Some(v) = cur {
            collect_texts(v, &mut out);
        }
        out
    }
}

fn collect_texts<'a>(v: &'a Value, out: &mut Vec<&'a str>) {
    match v {
        Value::String(s) => out.push(s.as_str()),
        Value::Sequence(items) => {
            for item in items {
                match item {
                    Value::Mapping(m) => {
                        if let Some(s) = m.get(KEY_NAME).and_then(Value::as_str) {
                            out.push(s);
                        }
                    }
                    other => collect_texts(other, out),
                }
            }
        }
        _ => {}
    }
}
