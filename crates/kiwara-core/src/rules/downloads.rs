use crate::lint::{
    AttachmentArgs, AttachmentError, AttachmentFetcher, Attachments, Check, CheckContext,
    CheckError, CheckOutput,
};
use crate::logger::Logger;
use crate::pkg::{DownloadStatistic, DownloadsClient};
use futures::future::{BoxFuture, FutureExt};
use serde::Deserialize;
use serde_json::Value;

/// Attachment key holding a [`DownloadStatistic`].
pub const DOWNLOADS_ATTACHMENT: &str = "downloads";

impl AttachmentFetcher for DownloadsClient {
    fn fetch(&self, args: AttachmentArgs) -> BoxFuture<'static, Result<Value, AttachmentError>> {
        let client = self.clone();
        async move {
            let stat = client.last_week(args.package.name()).await?;
            args.logger.info(&format!(
                "Download count for {}: {}",
                args.package.full_name(),
                stat.downloads
            ));
            Ok(serde_json::to_value(stat)?)
        }
        .boxed()
    }
}

#[derive(Debug, Deserialize)]
struct Params {
    minimum: u64,
}

/// Reports packages downloaded fewer than `minimum` times last week.
#[derive(Debug, Clone)]
pub struct DownloadCountCheck {
    client: DownloadsClient,
}

impl DownloadCountCheck {
    #[must_use]
    pub fn new(client: DownloadsClient) -> Self {
        Self { client }
    }
}

impl Check for DownloadCountCheck {
    fn name(&self) -> &str {
        super::DOWNLOAD_COUNT
    }

    fn attachments(&self) -> Attachments {
        Attachments::new().with(DOWNLOADS_ATTACHMENT, self.client.clone())
    }

    fn check(&self, ctx: &CheckContext<'_>) -> Result<CheckOutput, CheckError> {
        let Params { minimum } = ctx.params_as()?;

        // A failed lookup was already reported as a warning while resolving.
        let stat: DownloadStatistic = match ctx.pkg.attachment_as(DOWNLOADS_ATTACHMENT) {
            Ok(stat) => stat,
            Err(CheckError::MissingAttachment(_)) => return Ok(CheckOutput::none()),
            Err(e) => return Err(e),
        };

        if stat.downloads >= minimum {
            return Ok(CheckOutput::none());
        }
        Ok(format!(
            "Only {} downloads last week (minimum {minimum})",
            stat.downloads
        )
        .into())
    }
}
