//! Processor registry and exact-match template dispatch.
//!
//! Processors are enumerated from a compiled descriptor table, each naming
//! the complete template-id set it understands. A node resolves to a
//! processor only when its template-id set equals a declared set exactly;
//! strict subsets and supersets never match. Unmatched nodes go to the
//! fallback processor for their [`NodeKind`].

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use cda_model::{ImportError, ImportResult, Node, NodeKind, TemplateIdSet};
use tracing::debug;

use crate::processor::Processor;
use crate::processors;

/// Startup-time registration record.
#[derive(Clone)]
pub struct ProcessorDescriptor {
    pub name: &'static str,
    pub declared: TemplateIdSet,
    pub factory: fn() -> Arc<dyn Processor>,
}

impl ProcessorDescriptor {
    pub fn new(name: &'static str, declared: &[&str], factory: fn() -> Arc<dyn Processor>) -> Self {
        Self {
            name,
            declared: declared.iter().copied().collect(),
            factory,
        }
    }
}

impl fmt::Debug for ProcessorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessorDescriptor")
            .field("name", &self.name)
            .field("declared", &self.declared)
            .finish_non_exhaustive()
    }
}

/// Result of dispatching one node.
#[derive(Clone)]
pub struct Dispatch {
    pub processor: Arc<dyn Processor>,
    /// True when no declared set matched and the kind fallback was used.
    pub fallback: bool,
}

struct Fallbacks {
    document: Arc<dyn Processor>,
    section: Arc<dyn Processor>,
    organizer: Arc<dyn Processor>,
    entry: Arc<dyn Processor>,
    encounter: Arc<dyn Processor>,
    reference: Arc<dyn Processor>,
}

pub struct ProcessorRegistry {
    descriptors: Vec<ProcessorDescriptor>,
    processors: HashMap<TemplateIdSet, (usize, Arc<dyn Processor>)>,
    fallbacks: Fallbacks,
}

impl ProcessorRegistry {
    /// An empty registry with the built-in kind fallbacks.
    pub fn new() -> Self {
        Self {
            descriptors: Vec::new(),
            processors: HashMap::new(),
            fallbacks: Fallbacks {
                document: processors::document::generic(),
                section: processors::section::generic(),
                organizer: processors::organizer::generic(),
                entry: processors::entry::generic(),
                encounter: processors::encounter::generic(),
                reference: processors::reference::generic(),
            },
        }
    }

    /// Register a descriptor. Two descriptors may not declare the same set.
    pub fn register(&mut self, descriptor: ProcessorDescriptor) -> ImportResult<()> {
        if descriptor.declared.is_empty() {
            return Err(ImportError::DispatchAmbiguous {
                templates: descriptor.declared.to_string(),
                first: descriptor.name.to_string(),
                second: "every fallback".to_string(),
            });
        }
        if let Some((index, _)) = self.processors.get(&descriptor.declared) {
            return Err(ImportError::DispatchAmbiguous {
                templates: descriptor.declared.to_string(),
                first: self.descriptors[*index].name.to_string(),
                second: descriptor.name.to_string(),
            });
        }
        let processor = (descriptor.factory)();
        debug!(
            processor = descriptor.name,
            templates = %descriptor.declared,
            "registered processor"
        );
        self.processors.insert(
            descriptor.declared.clone(),
            (self.descriptors.len(), processor),
        );
        self.descriptors.push(descriptor);
        Ok(())
    }

    /// Processor whose declared set equals `template_ids`, if any.
    pub fn resolve(&self, template_ids: &TemplateIdSet) -> Option<Arc<dyn Processor>> {
        self.processors
            .get(template_ids)
            .map(|(_, processor)| Arc::clone(processor))
    }

    pub fn fallback(&self, kind: NodeKind) -> Arc<dyn Processor> {
        let fallback = match kind {
            NodeKind::Document => &self.fallbacks.document,
            NodeKind::Section => &self.fallbacks.section,
            NodeKind::Organizer => &self.fallbacks.organizer,
            NodeKind::Act
            | NodeKind::Observation
            | NodeKind::Procedure
            | NodeKind::SubstanceAdministration => &self.fallbacks.entry,
            NodeKind::Encounter => &self.fallbacks.encounter,
            NodeKind::ExternalReference => &self.fallbacks.reference,
        };
        Arc::clone(fallback)
    }

    pub fn dispatch(&self, node: &Node) -> Dispatch {
        match self.resolve(&node.template_ids) {
            Some(processor) => Dispatch {
                processor,
                fallback: false,
            },
            None => Dispatch {
                processor: self.fallback(node.kind),
                fallback: true,
            },
        }
    }

    /// Descriptors in registration order.
    pub fn descriptors(&self) -> &[ProcessorDescriptor] {
        &self.descriptors
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

impl Default for ProcessorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

static DEFAULT_REGISTRY: OnceLock<ImportResult<Arc<ProcessorRegistry>>> = OnceLock::new();

/// Process-wide registry with every bundled processor, built on first use.
pub fn default_registry() -> ImportResult<Arc<ProcessorRegistry>> {
    DEFAULT_REGISTRY
        .get_or_init(|| build_default_registry().map(Arc::new))
        .clone()
}

pub fn build_default_registry() -> ImportResult<ProcessorRegistry> {
    let mut registry = ProcessorRegistry::new();
    for descriptor in processors::builtin_descriptors() {
        registry.register(descriptor)?;
    }
    Ok(registry)
}
