//! Rules, attachments, scoped views, evaluation and reporting.

pub mod attachment;
pub mod engine;
pub mod report;
pub mod rule;
pub mod scope;

pub use attachment::{
    num_padding, AttachmentArgs, AttachmentData, AttachmentError, AttachmentFetcher,
    AttachmentLookup, AttachmentTarget, Attachments,
};
pub use engine::{evaluate, FindingKind, LintFinding, LintReport};
pub use report::{write_human, JsonReport, JsonRunError, JsonSummary, LINT_REPORT_SCHEMA_VERSION};
pub use rule::{check_fn, Check, CheckContext, CheckError, CheckOutput, FnCheck, Rule, RuleSet, Severity};
pub use scope::{MissingAttachment, ScopedNode, ScopedView};
