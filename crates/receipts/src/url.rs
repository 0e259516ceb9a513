use crate::{ReceiptsError, Result};
use locksmith::Url;
use unlock_dash_core::models::ReceiptResponse;

/// Link to the receipts page of the app for the given receipts.
pub fn receipts_url(
    origin: &str,
    lock: &str,
    network: u64,
    receipts: &[ReceiptResponse],
) -> Result<Url> {
    let mut url = Url::parse(&format!("{}/receipts", origin.trim_end_matches('/')))
        .map_err(|e| ReceiptsError::InvalidOrigin(format!("{origin}: {e}")))?;
    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("address", lock)
            .append_pair("network", &network.to_string());
        for receipt in receipts.iter().filter_map(|r| r.receipt.as_ref()) {
            query.append_pair("hash", &receipt.id);
        }
    }
    Ok(url)
}
