use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::{Result, guarded};
use crate::extractor::PageExtractor;
use crate::types::VideoRecord;

/// Describe each reference in order, dropping the ones whose page can't be read
pub async fn enrich(
    extractor: &mut dyn PageExtractor,
    references: &[String],
    cancel: &CancellationToken,
) -> Result<Vec<VideoRecord>> {
    let mut records = Vec::with_capacity(references.len());

    for reference in references {
        match guarded(cancel, extractor.describe(reference)).await {
            Ok(metadata) => records.push(VideoRecord::from_metadata(metadata)),
            Err(super::DiscoveryError::Extractor(e)) => {
                warn!(reference = %reference, error = %e, "Skipping reference without metadata");
            }
            Err(e) => return Err(e),
        }
    }

    Ok(records)
}
