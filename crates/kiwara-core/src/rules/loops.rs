use crate::lint::{Check, CheckContext, CheckError, CheckOutput};
use crate::pkg::PackageView;

/// Reports packages that depend (transitively) on themselves.
#[derive(Debug, Clone, Copy, Default)]
pub struct DependencyLoopCheck;

impl Check for DependencyLoopCheck {
    fn name(&self) -> &str {
        super::DEPENDENCY_LOOP
    }

    fn check(&self, ctx: &CheckContext<'_>) -> Result<CheckOutput, CheckError> {
        if !ctx.pkg.is_loop() {
            return Ok(CheckOutput::none());
        }
        Ok(format!("Dependency loop: {}", ctx.pkg.path_string()).into())
    }
}
