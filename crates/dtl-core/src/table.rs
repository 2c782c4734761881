//! Runtime tables: ordered named columns of equal length.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::array::Array;
use crate::dtype::DType;

/// A named, typed column slot in a schema.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub dtype: DType,
}

/// Column names and dtypes of a table, in column order.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Schema {
    pub fields: Vec<Field>,
}

impl Schema {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }
}

/// An ordered collection of equal-length named columns.
///
/// Construction asserts the table invariants (unique names, rectangular
/// shape); violating them is a bug in the caller, not an input error.
#[derive(Clone, Debug, Default)]
pub struct Table {
    columns: IndexMap<String, Arc<Array>>,
}

impl Table {
    pub fn new(columns: impl IntoIterator<Item = (String, Arc<Array>)>) -> Self {
        let mut map = IndexMap::new();
        let mut rows = None;
        for (name, array) in columns {
            let expected = *rows.get_or_insert(array.len());
            assert_eq!(
                expected,
                array.len(),
                "column {name} has {} rows, expected {expected}",
                array.len(),
            );
            let replaced = map.insert(name.clone(), array);
            assert!(replaced.is_none(), "duplicate column {name}");
        }
        Self { columns: map }
    }

    pub fn num_rows(&self) -> usize {
        self.columns
            .first()
            .map(|(_, array)| array.len())
            .unwrap_or(0)
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, name: &str) -> Option<&Arc<Array>> {
        self.columns.get(name)
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &Arc<Array>)> {
        self.columns.iter().map(|(name, array)| (name.as_str(), array))
    }

    pub fn schema(&self) -> Schema {
        Schema {
            fields: self
                .columns
                .iter()
                .map(|(name, array)| Field {
                    name: name.clone(),
                    dtype: array.dtype(),
                })
                .collect(),
        }
    }
}

impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        self.columns.len() == other.columns.len()
            && self
                .columns
                .iter()
                .zip(&other.columns)
                .all(|((an, av), (bn, bv))| an == bn && av == bv)
    }
}
