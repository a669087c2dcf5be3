//! # Layout Resolution
//!
//! Rows reference their schema (and the schemas of nested UDT scopes) only by
//! `SchemaId`. A `LayoutResolver` turns that id back into a compiled layout.
//!
//! - `NamespaceResolver` compiles layouts from a namespace on first use and
//!   caches them behind a `parking_lot::RwLock`.
//! - `StaticResolver` serves a fixed set of pre-built layouts.
//!
//! Both are `Send + Sync` and are shared between rows as `Arc<dyn LayoutResolver>`.

use std::sync::Arc;

use eyre::{eyre, Result};
use hashbrown::HashMap;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::layouts::compiler::LayoutCompiler;
use crate::layouts::layout::Layout;
use crate::schema::{Namespace, SchemaId};

pub trait LayoutResolver: Send + Sync + std::fmt::Debug {
    fn resolve(&self, schema_id: SchemaId) -> Option<Arc<Layout>>;
}

#[derive(Debug)]
pub struct NamespaceResolver {
    namespace: Namespace,
    cache: RwLock<HashMap<SchemaId, Arc<Layout>>>,
}

impl NamespaceResolver {
    pub fn new(namespace: Namespace) -> Self {
        Self {
            namespace,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Returns the cached layout for `schema_id`, compiling it on first use.
    pub fn layout(&self, schema_id: SchemaId) -> Result<Arc<Layout>> {
        if let Some(layout) = self.cache.read().get(&schema_id) {
            return Ok(Arc::clone(layout));
        }

        let schema = self
            .namespace
            .schema_by_id(schema_id)
            .ok_or_else(|| eyre!("schema {} not found in namespace '{}'", schema_id, self.namespace.name))?;
        let compiled = Arc::new(LayoutCompiler::compile(&self.namespace, schema)?);

        let mut cache = self.cache.write();
        let layout = cache.entry(schema_id).or_insert_with(|| {
            debug!(schema_id = %schema_id, name = %schema.name, "cached compiled layout");
            compiled
        });
        Ok(Arc::clone(layout))
    }

    /// Looks a layout up by schema name. Fails if the name is ambiguous.
    pub fn layout_by_name(&self, name: &str) -> Result<Arc<Layout>> {
        let mut matches = self.namespace.schemas_named(name);
        match (matches.next(), matches.next()) {
            (Some(schema), None) => self.layout(schema.id),
            (None, _) => Err(eyre!("no schema named '{}'", name)),
            (Some(_), Some(_)) => Err(eyre!("schema name '{}' is ambiguous", name)),
        }
    }

    /// Compiles every schema of the namespace up front, surfacing the first error.
    pub fn compile_all(&self) -> Result<()> {
        for schema in &self.namespace.schemas {
            self.layout(schema.id)?;
        }
        Ok(())
    }
}

impl LayoutResolver for NamespaceResolver {
    fn resolve(&self, schema_id: SchemaId) -> Option<Arc<Layout>> {
        match self.layout(schema_id) {
            Ok(layout) => Some(layout),
            Err(err) => {
                warn!(schema_id = %schema_id, error = %err, "layout resolution failed");
                None
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct StaticResolver {
    layouts: HashMap<SchemaId, Arc<Layout>>,
}

impl StaticResolver {
    pub fn new(layouts: impl IntoIterator<Item = Layout>) -> Self {
        Self {
            layouts: layouts
                .into_iter()
                .map(|l| (l.schema_id(), Arc::new(l)))
                .collect(),
        }
    }
}

impl LayoutResolver for StaticResolver {
    fn resolve(&self, schema_id: SchemaId) -> Option<Arc<Layout>> {
        self.layouts.get(&schema_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Property, PropertyType, Schema, TypeKind};

    fn namespace() -> Namespace {
        Namespace::new("ns")
            .with_schema(
                Schema::new("A", SchemaId(1))
                    .with_property(Property::new("x", PropertyType::primitive(TypeKind::Int32).fixed())),
            )
            .with_schema(Schema::new("B", SchemaId(2)))
    }

    #[test]
    fn resolver_caches_compiled_layouts() {
        let resolver = NamespaceResolver::new(namespace());
        let first = resolver.resolve(SchemaId(1)).unwrap();
        let second = resolver.resolve(SchemaId(1)).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.name(), "A");
    }

    #[test]
    fn unknown_schema_resolves_to_none() {
        let resolver = NamespaceResolver::new(namespace());
        assert!(resolver.resolve(SchemaId(99)).is_none());
        assert!(resolver.layout(SchemaId(99)).is_err());
    }

    #[test]
    fn layouts_are_found_by_name() {
        let resolver = NamespaceResolver::new(namespace());
        resolver.compile_all().unwrap();
        assert_eq!(resolver.layout_by_name("B").unwrap().schema_id(), SchemaId(2));
        assert!(resolver.layout_by_name("C").is_err());
    }

    #[test]
    fn static_resolver_serves_prebuilt_layouts() {
        let ns = namespace();
        let layout = LayoutCompiler::compile(&ns, &ns.schemas[0]).unwrap();
        let resolver = StaticResolver::new([layout]);
        assert!(resolver.resolve(SchemaId(1)).is_some());
        assert!(resolver.resolve(SchemaId(2)).is_none());
    }
}
