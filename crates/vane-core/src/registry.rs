//! Plugin type registry.
//!
//! Plugin crates contribute factories to the [`PLUGINS`] distributed slice as
//! a link-time side effect. [`Registry::collect_all`] turns that slice into an
//! explicit value which the controller receives by reference; nothing reads
//! the slice at request time.
//!
//! ```rust,ignore
//! vane_core::register_plugin!(CPU: input "cpu" => Cpu);
//! ```

use std::collections::BTreeMap;
use std::sync::OnceLock;

use linkme::distributed_slice;
use tracing::{debug, warn};

use crate::describe::describe;
use crate::plugin::{Aggregator, Input, Output, PluginKind, Processor};
use crate::schema::TypeSchema;

// =============================================================================
// Factories
// =============================================================================

pub type InputFactory = fn() -> Box<dyn Input>;
pub type OutputFactory = fn() -> Box<dyn Output>;
pub type ProcessorFactory = fn() -> Box<dyn Processor>;
pub type AggregatorFactory = fn() -> Box<dyn Aggregator>;

/// A zero-argument constructor for one plugin type.
#[derive(Clone, Copy)]
pub enum PluginFactory {
    Input(InputFactory),
    Output(OutputFactory),
    Processor(ProcessorFactory),
    Aggregator(AggregatorFactory),
}

impl PluginFactory {
    pub fn kind(&self) -> PluginKind {
        match self {
            Self::Input(_) => PluginKind::Input,
            Self::Output(_) => PluginKind::Output,
            Self::Processor(_) => PluginKind::Processor,
            Self::Aggregator(_) => PluginKind::Aggregator,
        }
    }
}

/// One entry of the [`PLUGINS`] slice.
#[derive(Clone, Copy)]
pub struct PluginRegistration {
    /// Unqualified name, e.g. `cpu`.
    pub name: &'static str,
    pub factory: PluginFactory,
}

impl PluginRegistration {
    pub const fn input(name: &'static str, factory: InputFactory) -> Self {
        Self {
            name,
            factory: PluginFactory::Input(factory),
        }
    }

    pub const fn output(name: &'static str, factory: OutputFactory) -> Self {
        Self {
            name,
            factory: PluginFactory::Output(factory),
        }
    }

    pub const fn processor(name: &'static str, factory: ProcessorFactory) -> Self {
        Self {
            name,
            factory: PluginFactory::Processor(factory),
        }
    }

    pub const fn aggregator(name: &'static str, factory: AggregatorFactory) -> Self {
        Self {
            name,
            factory: PluginFactory::Aggregator(factory),
        }
    }

    /// Qualified name, e.g. `inputs.cpu`.
    pub fn qualified_name(&self) -> String {
        self.factory.kind().qualify(self.name)
    }
}

/// Every plugin linked into the binary.
#[distributed_slice]
pub static PLUGINS: [PluginRegistration];

/// Adds a `Default`-constructed plugin type to [`PLUGINS`].
///
/// ```rust,ignore
/// register_plugin!(CPU: input "cpu" => Cpu);
/// register_plugin!(MINMAX: aggregator "minmax" => MinMax);
/// ```
///
/// The kind is one of `input`, `output`, `processor` or `aggregator`.
#[macro_export]
macro_rules! register_plugin {
    ($static_name:ident : $kind:ident $name:literal => $ty:ty) => {
        #[$crate::__private::linkme::distributed_slice($crate::registry::PLUGINS)]
        #[linkme(crate = $crate::__private::linkme)]
        static $static_name: $crate::registry::PluginRegistration =
            $crate::registry::PluginRegistration::$kind($name, || {
                ::std::boxed::Box::new(<$ty as ::std::default::Default>::default())
            });
    };
}

// =============================================================================
// Registry
// =============================================================================

/// Read-only mapping from qualified plugin names to factories.
///
/// Built once at startup, then shared as `Arc<Registry>`. The type catalog is
/// computed on first use and memoized.
#[derive(Default)]
pub struct Registry {
    inputs: BTreeMap<&'static str, InputFactory>,
    outputs: BTreeMap<&'static str, OutputFactory>,
    processors: BTreeMap<&'static str, ProcessorFactory>,
    aggregators: BTreeMap<&'static str, AggregatorFactory>,
    catalog: OnceLock<Vec<TypeSchema>>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from every entry in [`PLUGINS`].
    ///
    /// Duplicate names are logged and the first registration wins.
    pub fn collect_all() -> Self {
        let mut registry = Self::new();
        for entry in PLUGINS {
            registry.register(*entry);
        }
        debug!(count = registry.len(), "Plugin registry collected");
        registry
    }

    /// Adds a registration. Returns `false` if the name was already taken.
    pub fn register(&mut self, entry: PluginRegistration) -> bool {
        let inserted = match entry.factory {
            PluginFactory::Input(f) => insert_first(&mut self.inputs, entry.name, f),
            PluginFactory::Output(f) => insert_first(&mut self.outputs, entry.name, f),
            PluginFactory::Processor(f) => insert_first(&mut self.processors, entry.name, f),
            PluginFactory::Aggregator(f) => insert_first(&mut self.aggregators, entry.name, f),
        };
        if inserted {
            self.catalog = OnceLock::new();
        } else {
            warn!(
                plugin = %entry.qualified_name(),
                "Duplicate plugin registration, keeping the first"
            );
        }
        inserted
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(mut self, entry: PluginRegistration) -> Self {
        self.register(entry);
        self
    }

    pub fn input(&self, name: &str) -> Option<InputFactory> {
        self.inputs.get(name).copied()
    }

    pub fn output(&self, name: &str) -> Option<OutputFactory> {
        self.outputs.get(name).copied()
    }

    pub fn processor(&self, name: &str) -> Option<ProcessorFactory> {
        self.processors.get(name).copied()
    }

    pub fn aggregator(&self, name: &str) -> Option<AggregatorFactory> {
        self.aggregators.get(name).copied()
    }

    /// Looks up a factory by kind and unqualified name.
    pub fn get(&self, kind: PluginKind, name: &str) -> Option<PluginFactory> {
        match kind {
            PluginKind::Input => self.input(name).map(PluginFactory::Input),
            PluginKind::Output => self.output(name).map(PluginFactory::Output),
            PluginKind::Processor => self.processor(name).map(PluginFactory::Processor),
            PluginKind::Aggregator => self.aggregator(name).map(PluginFactory::Aggregator),
        }
    }

    pub fn len(&self) -> usize {
        self.inputs.len() + self.outputs.len() + self.processors.len() + self.aggregators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All qualified names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .inputs
            .keys()
            .map(|n| PluginKind::Input.qualify(n))
            .chain(self.outputs.keys().map(|n| PluginKind::Output.qualify(n)))
            .chain(self.processors.keys().map(|n| PluginKind::Processor.qualify(n)))
            .chain(self.aggregators.keys().map(|n| PluginKind::Aggregator.qualify(n)))
            .collect();
        names.sort();
        names
    }

    /// Schema of every registered type, described from a fresh instance and
    /// sorted by qualified name.
    pub fn catalog(&self) -> &[TypeSchema] {
        self.catalog.get_or_init(|| {
            let mut catalog: Vec<TypeSchema> = self
                .inputs
                .iter()
                .map(|(n, f)| schema_of(PluginKind::Input, n, &f()))
                .chain(
                    self.outputs
                        .iter()
                        .map(|(n, f)| schema_of(PluginKind::Output, n, &f())),
                )
                .chain(
                    self.processors
                        .iter()
                        .map(|(n, f)| schema_of(PluginKind::Processor, n, &f())),
                )
                .chain(
                    self.aggregators
                        .iter()
                        .map(|(n, f)| schema_of(PluginKind::Aggregator, n, &f())),
                )
                .collect();
            catalog.sort_by(|a, b| a.name.cmp(&b.name));
            catalog
        })
    }
}

fn insert_first<F>(map: &mut BTreeMap<&'static str, F>, name: &'static str, factory: F) -> bool {
    if map.contains_key(name) {
        return false;
    }
    map.insert(name, factory);
    true
}

fn schema_of<T: crate::Configurable + ?Sized>(kind: PluginKind, name: &str, instance: &T) -> TypeSchema {
    TypeSchema {
        name: kind.qualify(name),
        config: describe(instance),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PluginResult;
    use crate::metric::{Accumulator, Metric};
    use crate::schema::FieldKind;
    use crate::{Configurable, Duration};

    #[derive(Default, Configurable)]
    pub struct Dummy {
        pub interval: Duration,
        pub label: String,
    }

    impl Input for Dummy {
        fn gather(&mut self, _acc: &mut Accumulator) -> PluginResult<()> {
            Ok(())
        }
    }

    #[derive(Default, Configurable)]
    pub struct Passthrough {
        pub order: i64,
    }

    impl Processor for Passthrough {
        fn apply(&mut self, metrics: Vec<Metric>) -> Vec<Metric> {
            metrics
        }
    }

    fn registry() -> Registry {
        Registry::new()
            .with(PluginRegistration::input("dummy", || Box::new(Dummy::default())))
            .with(PluginRegistration::processor("passthrough", || {
                Box::new(Passthrough::default())
            }))
    }

    #[test]
    fn test_lookup_by_kind() {
        let registry = registry();
        assert!(registry.get(PluginKind::Input, "dummy").is_some());
        assert!(registry.get(PluginKind::Output, "dummy").is_none());
        assert!(registry.get(PluginKind::Processor, "passthrough").is_some());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_duplicate_keeps_first() {
        let mut registry = registry();
        let added = registry.register(PluginRegistration::input("dummy", || {
            Box::new(Dummy {
                label: "second".into(),
                ..Default::default()
            })
        }));
        assert!(!added);

        let catalog = registry.catalog();
        let dummy = catalog.iter().find(|t| t.name == "inputs.dummy").unwrap();
        assert!(dummy.config["label"].default.is_none());
    }

    #[test]
    fn test_catalog_is_sorted_and_memoized() {
        let registry = registry();
        let names: Vec<&str> = registry.catalog().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["inputs.dummy", "processors.passthrough"]);
        assert_eq!(registry.names(), vec!["inputs.dummy", "processors.passthrough"]);

        let first = registry.catalog().as_ptr();
        assert_eq!(first, registry.catalog().as_ptr());
        assert_eq!(
            registry.catalog()[0].config["interval"].kind,
            FieldKind::Duration
        );
    }

    crate::register_plugin!(LINKED: processor "linked" => Passthrough);

    #[test]
    fn test_collect_all_sees_linked_plugins() {
        let registry = Registry::collect_all();
        assert!(registry.processor("linked").is_some());
        assert!(registry.names().contains(&"processors.linked".to_string()));
    }
}
