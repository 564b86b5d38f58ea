use std::collections::HashMap;

/// Per-address failure totals. Keys are compared as exact strings.
pub type FailureCounts = HashMap<String, u64>;

pub fn aggregate<'a, I>(addresses: I) -> FailureCounts
where
    I: IntoIterator<Item = &'a str>,
{
    addresses
        .into_iter()
        .fold(FailureCounts::new(), |mut counts, addr| {
            *counts.entry(addr.to_string()).or_insert(0) += 1;
            counts
        })
}
