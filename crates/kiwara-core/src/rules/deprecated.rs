use crate::lint::{Check, CheckContext, CheckError, CheckOutput};
use crate::pkg::PackageView;

/// Reports packages whose manifest carries a deprecation notice.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeprecatedCheck;

impl Check for DeprecatedCheck {
    fn name(&self) -> &str {
        super::DEPRECATED
    }

    fn check(&self, ctx: &CheckContext<'_>) -> Result<CheckOutput, CheckError> {
        let info = ctx.pkg.deprecated_info();
        if !info.deprecated {
            return Ok(CheckOutput::none());
        }
        Ok(format!("Package is deprecated: {}", info.message).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lint::{evaluate, FindingKind, Rule, RuleSet, Severity};
    use crate::testing::{empty_lookup, mock_tree};
    use crate::{CancelToken, NullLogger};
    use serde_json::json;

    #[test]
    fn test_reports_deprecated_only() {
        let tree = mock_tree(&json!({
            "name": "root",
            "version": "1.0.0",
            "dependencies": [
                { "name": "request", "version": "2.88.2", "deprecated": "request has been deprecated" },
                { "name": "undici", "version": "6.0.0" }
            ]
        }));
        let rules = RuleSet::new().with(Rule::new(Severity::Error, DeprecatedCheck).unwrap());
        let lookup = empty_lookup(&tree, &rules);

        let report = evaluate(&tree, &rules, &lookup, &NullLogger, &CancelToken::never()).unwrap();
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].kind, FindingKind::Error);
        assert_eq!(report.findings[0].package, "request@2.88.2");
        assert_eq!(
            report.findings[0].message,
            "Package is deprecated: request has been deprecated"
        );
    }
}
