use crate::lint::{Check, CheckContext, CheckError, CheckOutput};
use crate::pkg::PackageView;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Params {
    max: usize,
}

/// Reports packages declaring more direct dependencies than `max`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaxDirectDependenciesCheck;

impl Check for MaxDirectDependenciesCheck {
    fn name(&self) -> &str {
        super::MAX_DIRECT_DEPENDENCIES
    }

    fn check(&self, ctx: &CheckContext<'_>) -> Result<CheckOutput, CheckError> {
        let Params { max } = ctx.params_as()?;
        let count = ctx.pkg.direct_dependencies().len();
        if count <= max {
            return Ok(CheckOutput::none());
        }
        Ok(format!("Has {count} direct dependencies (max {max})").into())
    }
}
