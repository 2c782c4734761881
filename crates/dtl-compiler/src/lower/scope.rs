//! Compile-time scopes.
//!
//! A scope is the set of columns a table expression makes visible, each
//! reachable under a set of namespaces: `None` for unqualified references,
//! `Some(table)` for qualified ones. Scopes exist only during lowering; the
//! IR keeps nothing but final column names.

use std::collections::BTreeSet;

use dtl_ir::ArrayId;

pub(crate) type Namespace = Option<String>;

#[derive(Clone, Debug)]
pub(crate) struct ScopeColumn {
    pub name: String,
    pub namespaces: BTreeSet<Namespace>,
    pub expression: ArrayId,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct Scope {
    pub columns: Vec<ScopeColumn>,
}

/// The namespace set of a column only reachable unqualified.
pub(crate) fn default_namespaces() -> BTreeSet<Namespace> {
    BTreeSet::from([None])
}

impl Scope {
    /// First column whose name matches and whose namespace set contains the
    /// query's namespace. Returns `None` on resolution failure; the caller
    /// owns producing the compile error.
    pub fn lookup(&self, namespace: Option<&str>, name: &str) -> Option<ArrayId> {
        self.columns
            .iter()
            .find(|column| {
                column.name == name
                    && column
                        .namespaces
                        .iter()
                        .any(|candidate| candidate.as_deref() == namespace)
            })
            .map(|column| column.expression)
    }

    /// Drop all qualified namespaces, leaving top-level names only. Every
    /// column must already be visible unqualified; lowering never strips a
    /// scope where that does not hold.
    pub fn strip_namespaces(&self) -> Scope {
        Scope {
            columns: self
                .columns
                .iter()
                .map(|column| {
                    assert!(
                        column.namespaces.contains(&None),
                        "stripping column '{}' which is not visible unqualified",
                        column.name,
                    );
                    ScopeColumn {
                        name: column.name.clone(),
                        namespaces: default_namespaces(),
                        expression: column.expression,
                    }
                })
                .collect(),
        }
    }
}
