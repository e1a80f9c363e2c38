pub mod context;
pub mod importer;
pub mod processor;
mod processors;
pub mod redact;
pub mod registry;
pub mod session;
pub mod store;
pub mod versioning;
pub mod vocabulary;
pub mod walker;

pub use context::{ContextOutput, ProcessingContext};
pub use importer::{ImportStage, ImportedRecord, Importer, Subscriber, Subscription};
pub use processor::{Processed, Processor};
pub use processors::builtin_descriptors;
pub use redact::{REDACTED_VALUE, log_data_enabled, redact_value, set_log_data_enabled};
pub use registry::{
    Dispatch, ProcessorDescriptor, ProcessorRegistry, build_default_registry, default_registry,
};
pub use session::{ImportSession, SessionMark};
pub use store::{
    ConceptStore, InMemoryConceptStore, InMemoryRecordRepository, PersistBatch, PersistedRecord,
    RecordRepository, Retired, StoreError, VoidRequest,
};
pub use versioning::{REPLACED_REASON, Version, VersioningResolver};
pub use vocabulary::{MAX_CREATE_ATTEMPTS, VocabularyResolver, concept_name};
pub use walker::Walker;
