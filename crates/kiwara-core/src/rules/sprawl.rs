use crate::lint::{Check, CheckContext, CheckError, CheckOutput};
use crate::pkg::{DependencyStats, PackageView};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Params {
    max_versions: usize,
}

/// Reports, once per run on the root, every package name that resolved to
/// more than `max_versions` versions anywhere in the tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct VersionSprawlCheck;

impl Check for VersionSprawlCheck {
    fn name(&self) -> &str {
        super::VERSION_SPRAWL
    }

    fn check(&self, ctx: &CheckContext<'_>) -> Result<CheckOutput, CheckError> {
        if ctx.pkg.parent().is_some() {
            return Ok(CheckOutput::none());
        }
        let Params { max_versions } = ctx.params_as()?;

        let messages: Vec<String> = DependencyStats::new(ctx.pkg, true)
            .versions_by_name()
            .into_iter()
            .filter(|(_, versions)| versions.len() > max_versions)
            .map(|(name, versions)| {
                let list: Vec<_> = versions.into_iter().collect();
                format!(
                    "{name} is resolved in {} versions: {}",
                    list.len(),
                    list.join(", ")
                )
            })
            .collect();

        Ok(messages.into())
    }
}
