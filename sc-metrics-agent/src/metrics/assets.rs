//! Asset IP counts

use std::collections::BTreeMap;

use tracing::debug;

use super::{MetricSnapshot, ASSET_NAME_TAG, IP_COUNT, ORG_TAG};
use crate::entities::Asset;
use crate::error::MetricsError;
use crate::metrics::MetricKey;

/// Reported while an asset's IP list is being recalculated
pub const IP_COUNT_UPDATING: i64 = -1;

pub fn asset_ip_counts(assets: &[Asset]) -> Result<BTreeMap<String, i64>, MetricsError> {
    let mut counts = BTreeMap::new();

    for asset in assets {
        let ip_count = asset
            .ip_count
            .trim()
            .parse::<i64>()
            .map_err(|source| MetricsError::Parse {
                field: "ipCount",
                entity: format!("asset {}", asset.name),
                value: asset.ip_count.clone(),
                source,
            })?;

        if ip_count == IP_COUNT_UPDATING {
            debug!(asset = %asset.name, "asset mid-update, skipping ip count");
            continue;
        }
        counts.insert(asset.name.clone(), ip_count);
    }

    Ok(counts)
}

pub fn record_ip_counts(snapshot: &mut MetricSnapshot, org: &str, counts: &BTreeMap<String, i64>) {
    for (asset_name, count) in counts {
        let key = MetricKey::new(IP_COUNT)
            .tag(ORG_TAG, org)
            .tag(ASSET_NAME_TAG, asset_name);
        snapshot.insert(&key, *count);
    }
}
