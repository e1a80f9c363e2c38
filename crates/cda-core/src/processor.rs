//! Node interpreter trait.

use cda_model::{Fragment, ImportResult, Node};
use cda_validate::RuleChain;

use crate::context::ProcessingContext;
use crate::session::ImportSession;

/// What a processor made of a node.
#[derive(Debug)]
pub enum Processed {
    /// A fragment; the walker descends into the node's children with it as
    /// their parent output.
    Fragment(Fragment),
    /// No fragment of its own; children are walked and their fragments
    /// attach to the enclosing output.
    PassThrough,
    /// Nothing is produced for the node or its children.
    Skip,
}

/// Interprets nodes that declare one template contract.
///
/// Implementors expose their validation rules separately from `process` so
/// the walker can fail fast before any side effect.
pub trait Processor: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str {
        "Node processor"
    }

    /// Rule chain run before [`Processor::process`], general layers first.
    fn rules(&self) -> &RuleChain;

    fn process(
        &self,
        node: &Node,
        context: &ProcessingContext<'_>,
        session: &mut ImportSession<'_>,
    ) -> ImportResult<Processed>;
}
