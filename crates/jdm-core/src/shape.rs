//! Structural projection of a document onto caller-declared record shapes.
//!
//! A [`ShapeRegistry`] maps shape names to ordered field lists. Projection is
//! best-effort: the document only has to share one top-level key with the
//! target shape, unknown document keys are dropped and missing fields are
//! simply absent. A field declared with a nested shape is projected
//! recursively when its value is a mapping (or, for sequence fields, for each
//! mapping element); everything else is kept as the raw value.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    #[default]
    Any,
    Scalar,
    Mapping,
    Sequence,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(default)]
    pub kind: FieldKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nested: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Shape {
    name: String,
    fields: Vec<FieldSpec>,
}

impl Shape {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(FieldSpec {
            name: name.into(),
            kind,
            nested: None,
        });
        self
    }

    /// A field whose mapping value projects into the registered shape `shape`.
    pub fn nested(mut self, name: impl Into<String>, shape: impl Into<String>) -> Self {
        self.fields.push(FieldSpec {
            name: name.into(),
            kind: FieldKind::Mapping,
            nested: Some(shape.into()),
        });
        self
    }

    /// A sequence field whose mapping elements project into `shape`.
    pub fn nested_list(mut self, name: impl Into<String>, shape: impl Into<String>) -> Self {
        self.fields.push(FieldSpec {
            name: name.into(),
            kind: FieldKind::Sequence,
            nested: Some(shape.into()),
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    fn overlaps(&self, doc: &Map<String, Value>) -> bool {
        self.fields.iter().any(|f| doc.contains_key(&f.name))
    }
}

/// Shape name → ordered fields. Deserializes from
/// `{"User": [{"name": "order", "kind": "mapping", "nested": "Order"}, ...]}`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, Vec<FieldSpec>>", into = "BTreeMap<String, Vec<FieldSpec>>")]
pub struct ShapeRegistry {
    shapes: BTreeMap<String, Shape>,
}

impl From<BTreeMap<String, Vec<FieldSpec>>> for ShapeRegistry {
    fn from(table: BTreeMap<String, Vec<FieldSpec>>) -> Self {
        let shapes = table
            .into_iter()
            .map(|(name, fields)| (name.clone(), Shape { name, fields }))
            .collect();
        Self { shapes }
    }
}

impl From<ShapeRegistry> for BTreeMap<String, Vec<FieldSpec>> {
    fn from(reg: ShapeRegistry) -> Self {
        reg.shapes.into_iter().map(|(k, s)| (k, s.fields)).collect()
    }
}

impl ShapeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, shape: Shape) -> Self {
        self.register(shape);
        self
    }

    pub fn register(&mut self, shape: Shape) {
        self.shapes.insert(shape.name.clone(), shape);
    }

    pub fn get(&self, name: &str) -> Option<&Shape> {
        self.shapes.get(name)
    }

    /// Project `doc` onto the shape registered as `shape`.
    ///
    /// Fails with `UnknownShape` if `shape` is not registered and with
    /// `ShapeMismatch` if the document is not a mapping or shares no key with
    /// the shape's fields.
    pub fn project(&self, doc: &Value, shape: &str) -> Result<Projected> {
        let target = self.get(shape).ok_or_else(|| Error::UnknownShape {
            shape: shape.to_string(),
        })?;
        match doc {
            Value::Object(map) if target.overlaps(map) => Ok(self.populate(target, map)),
            _ => Err(Error::ShapeMismatch {
                shape: shape.to_string(),
            }),
        }
    }

    fn populate(&self, shape: &Shape, doc: &Map<String, Value>) -> Projected {
        let mut fields = Vec::with_capacity(shape.fields.len());
        for spec in &shape.fields {
            let Some(value) = doc.get(&spec.name) else {
                continue;
            };
            let nested = spec.nested.as_deref().and_then(|n| self.get(n));
            fields.push((spec.name.clone(), self.field(spec.kind, nested, value)));
        }
        Projected {
            shape: shape.name.clone(),
            fields,
        }
    }

    fn field(&self, kind: FieldKind, nested: Option<&Shape>, value: &Value) -> ProjectedField {
        match (nested, kind, value) {
            (Some(shape), FieldKind::Any | FieldKind::Mapping, Value::Object(map)) => {
                ProjectedField::Record(self.populate(shape, map))
            }
            (Some(shape), FieldKind::Sequence, Value::Array(items)) => ProjectedField::Records(
                items
                    .iter()
                    .map(|item| match item {
                        Value::Object(map) => ProjectedField::Record(self.populate(shape, map)),
                        other => ProjectedField::Raw(other.clone()),
                    })
                    .collect(),
            ),
            _ => ProjectedField::Raw(value.clone()),
        }
    }
}

/// A document projected onto a shape; fields keep the shape's declaration order.
#[derive(Clone, Debug, PartialEq)]
pub struct Projected {
    shape: String,
    fields: Vec<(String, ProjectedField)>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ProjectedField {
    Raw(Value),
    Record(Projected),
    Records(Vec<ProjectedField>),
}

impl Projected {
    pub fn shape(&self) -> &str {
        &self.shape
    }

    pub fn get(&self, name: &str) -> Option<&ProjectedField> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, f)| f)
    }

    pub fn raw(&self, name: &str) -> Option<&Value> {
        match self.get(name)? {
            ProjectedField::Raw(v) => Some(v),
            _ => None,
        }
    }

    pub fn record(&self, name: &str) -> Option<&Projected> {
        match self.get(name)? {
            ProjectedField::Record(p) => Some(p),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ProjectedField)> {
        self.fields.iter().map(|(n, f)| (n.as_str(), f))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Back to plain JSON, keeping only projected fields.
    pub fn to_value(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|(n, f)| (n.clone(), f.to_value()))
                .collect(),
        )
    }
}

impl ProjectedField {
    pub fn to_value(&self) -> Value {
        match self {
            ProjectedField::Raw(v) => v.clone(),
            ProjectedField::Record(p) => p.to_value(),
            ProjectedField::Records(items) => {
                Value::Array(items.iter().map(ProjectedField::to_value).collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry() -> ShapeRegistry {
        ShapeRegistry::new()
            .with(
                Shape::new("User")
                    .field("name", FieldKind::Scalar)
                    .field("email", FieldKind::Scalar)
                    .nested("order", "Order"),
            )
            .with(
                Shape::new("Order")
                    .field("id", FieldKind::Scalar)
                    .field("amount", FieldKind::Scalar)
                    .nested_list("lines", "Line"),
            )
            .with(Shape::new("Line").field("sku", FieldKind::Scalar))
    }

    #[test]
    fn projects_nested_records_and_drops_extras() {
        let doc = json!({
            "name": "Adam",
            "password": "secret",
            "order": {"id": "i12", "amount": 200000, "lines": [{"sku": "a", "qty": 2}, 7]}
        });
        let p = registry().project(&doc, "User").unwrap();
        assert_eq!(p.shape(), "User");
        assert_eq!(p.raw("name"), Some(&json!("Adam")));
        assert!(p.get("password").is_none());
        assert!(p.get("email").is_none());
        let order = p.record("order").unwrap();
        assert_eq!(order.shape(), "Order");
        assert_eq!(
            p.to_value(),
            json!({
                "name": "Adam",
                "order": {"id": "i12", "amount": 200000, "lines": [{"sku": "a"}, 7]}
            })
        );
    }

    #[test]
    fn undeclared_nested_shape_keeps_raw_mapping() {
        let reg = ShapeRegistry::new().with(
            Shape::new("User")
                .field("name", FieldKind::Any)
                .nested("order", "Missing"),
        );
        let p = reg.project(&json!({"name": "A", "order": {"id": 1}}), "User").unwrap();
        assert_eq!(p.raw("order"), Some(&json!({"id": 1})));
    }

    #[test]
    fn no_overlap_is_a_mismatch() {
        let err = registry().project(&json!({"title": "x"}), "User").unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { shape } if shape == "User"));
        assert!(matches!(
            registry().project(&json!(["name"]), "User"),
            Err(Error::ShapeMismatch { .. })
        ));
        assert!(matches!(
            registry().project(&json!({"name": "x"}), "Nope"),
            Err(Error::UnknownShape { .. })
        ));
    }

    #[test]
    fn registry_reads_from_json_table() {
        let table = r#"{
            "User": [{"name": "name"}, {"name": "order", "kind": "mapping", "nested": "Order"}],
            "Order": [{"name": "id", "kind": "scalar"}]
        }"#;
        let reg: ShapeRegistry = serde_json::from_str(table).unwrap();
        assert_eq!(reg.get("User").unwrap().fields()[0].kind, FieldKind::Any);
        let p = reg.project(&json!({"order": {"id": 3, "x": 1}}), "User").unwrap();
        assert_eq!(p.record("order").unwrap().to_value(), json!({"id": 3}));
    }
}
