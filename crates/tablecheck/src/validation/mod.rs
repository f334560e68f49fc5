//! Rule-driven validators and the engine that runs them.

mod checksum;
mod completeness;
mod duplicates;
mod engine;
mod integrity;
mod patterns;
mod result;
mod rule;
mod skip_policy;
mod validator;

pub use checksum::{is_valid_cnpj, is_valid_cpf};
pub use completeness::{CompletenessParams, CompletenessRule, CompletenessValidator};
pub use duplicates::{DuplicateParams, DuplicateRule, DuplicatesValidator};
pub use engine::ValidationEngine;
pub use integrity::{IntegrityParams, IntegrityRule, IntegrityValidator, ReferenceSource};
pub use patterns::{PatternParams, PatternRule, PatternType, PatternsValidator};
pub use result::{Details, ValidationResult};
pub use rule::{Rule, Severity};
pub use skip_policy::{
    ColumnSkipPolicy, NamePatternPolicy, NeverSkip, DEFAULT_DUPLICATE_PATTERNS,
    DEFAULT_UNIQUE_PATTERNS,
};
pub use validator::Validator;
