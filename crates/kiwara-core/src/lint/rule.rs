//! Rules: a check, its severity, its attachments and its parameters.

use super::attachment::Attachments;
use super::scope::{MissingAttachment, ScopedNode};
use crate::error::Error;
use crate::logger::Logger;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// How a rule's findings count toward the exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warn,
}

impl Severity {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "error" => Some(Self::Error),
            "warn" | "warning" => Some(Self::Warn),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A check could not produce a verdict. Recorded as an internal error.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error(transparent)]
    MissingAttachment(#[from] MissingAttachment),

    #[error("Invalid params: {0}")]
    Params(String),

    #[error("Unexpected attachment data for \"{key}\": {reason}")]
    AttachmentShape { key: String, reason: String },

    #[error("{0}")]
    Failed(String),
}

impl CheckError {
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}

/// Messages emitted by one check for one package.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckOutput(Vec<String>);

impl CheckOutput {
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn messages(&self) -> &[String] {
        &self.0
    }

    #[must_use]
    pub fn into_messages(self) -> Vec<String> {
        self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<()> for CheckOutput {
    fn from((): ()) -> Self {
        Self::none()
    }
}

impl From<String> for CheckOutput {
    fn from(message: String) -> Self {
        Self(vec![message])
    }
}

impl From<&str> for CheckOutput {
    fn from(message: &str) -> Self {
        Self(vec![message.to_string()])
    }
}

impl From<Vec<String>> for CheckOutput {
    fn from(messages: Vec<String>) -> Self {
        Self(messages)
    }
}

impl From<Vec<&str>> for CheckOutput {
    fn from(messages: Vec<&str>) -> Self {
        Self(messages.into_iter().map(str::to_string).collect())
    }
}

impl<T: Into<CheckOutput>> From<Option<T>> for CheckOutput {
    fn from(message: Option<T>) -> Self {
        message.map(Into::into).unwrap_or_default()
    }
}

/// Everything a check gets to look at.
pub struct CheckContext<'a> {
    /// The package, seen through this rule's attachment data only.
    pub pkg: ScopedNode<'a>,
    pub params: &'a Value,
    pub logger: &'a dyn Logger,
}

impl CheckContext<'_> {
    /// Deserialize the rule's parameters.
    pub fn params_as<T: DeserializeOwned>(&self) -> Result<T, CheckError> {
        serde_json::from_value(self.params.clone()).map_err(|e| CheckError::Params(e.to_string()))
    }
}

/// A diagnostic run against every package of the tree.
pub trait Check: Send + Sync {
    fn name(&self) -> &str;

    /// Fetchers whose results this check reads through
    /// [`ScopedNode::attachment`].
    fn attachments(&self) -> Attachments {
        Attachments::new()
    }

    fn check(&self, ctx: &CheckContext<'_>) -> Result<CheckOutput, CheckError>;
}

/// A check built from a closure.
pub struct FnCheck<F> {
    name: String,
    attachments: Attachments,
    f: F,
}

/// Wrap a closure as a [`Check`].
pub fn check_fn<F>(name: impl Into<String>, f: F) -> FnCheck<F>
where
    F: Fn(&CheckContext<'_>) -> Result<CheckOutput, CheckError> + Send + Sync,
{
    FnCheck {
        name: name.into(),
        attachments: Attachments::new(),
        f,
    }
}

impl<F> FnCheck<F> {
    #[must_use]
    pub fn with_attachments(mut self, attachments: Attachments) -> Self {
        self.attachments = attachments;
        self
    }
}

impl<F> Check for FnCheck<F>
where
    F: Fn(&CheckContext<'_>) -> Result<CheckOutput, CheckError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn attachments(&self) -> Attachments {
        self.attachments.clone()
    }

    fn check(&self, ctx: &CheckContext<'_>) -> Result<CheckOutput, CheckError> {
        (self.f)(ctx)
    }
}

/// An immutable `(severity, check, params)` triple.
#[derive(Clone)]
pub struct Rule {
    severity: Severity,
    check: Arc<dyn Check>,
    attachments: Attachments,
    params: Value,
}

impl Rule {
    /// Create a rule, validating the check's attachment declarations.
    ///
    /// # Errors
    /// Returns [`Error::InvalidRule`] for a blank check name or a malformed
    /// attachment map.
    pub fn new(severity: Severity, check: impl Check + 'static) -> Result<Self, Error> {
        Self::from_shared(severity, Arc::new(check))
    }

    pub fn from_shared(severity: Severity, check: Arc<dyn Check>) -> Result<Self, Error> {
        if check.name().trim().is_empty() {
            return Err(Error::invalid_rule("", "check name is empty"));
        }
        let attachments = check.attachments();
        attachments
            .validate()
            .map_err(|reason| Error::invalid_rule(check.name(), reason))?;

        Ok(Self {
            severity,
            check,
            attachments,
            params: Value::Null,
        })
    }

    /// Attach parameters. Must be a JSON object.
    pub fn with_params(mut self, params: Value) -> Result<Self, Error> {
        if !params.is_object() && !params.is_null() {
            return Err(Error::invalid_rule(
                self.name(),
                "params must be an object",
            ));
        }
        self.params = params;
        Ok(self)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.check.name()
    }

    #[must_use]
    pub fn severity(&self) -> Severity {
        self.severity
    }

    #[must_use]
    pub fn attachments(&self) -> &Attachments {
        &self.attachments
    }

    #[must_use]
    pub fn params(&self) -> &Value {
        &self.params
    }

    pub(crate) fn run(&self, ctx: &CheckContext<'_>) -> Result<CheckOutput, CheckError> {
        self.check.check(ctx)
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name())
            .field("severity", &self.severity)
            .field("attachments", &self.attachments)
            .field("params", &self.params)
            .finish()
    }
}

/// Ordered rules of one run. Declaration order is evaluation order.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn push(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.rules.iter()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Rule> {
        self.rules.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl FromIterator<Rule> for RuleSet {
    fn from_iter<I: IntoIterator<Item = Rule>>(iter: I) -> Self {
        Self {
            rules: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}
