use std::{collections::BTreeMap, path::Path};

use anyhow::Context;
use serde::Deserialize;
use tracing::debug;

use crate::{
    Percent,
    portfolio::{Holding, Portfolio},
    rebalance::validate_allocations,
};

/// Target allocations as written in `target.yml`:
///
/// ```yaml
/// Positions:
///   AAPL: 22
///   GOOG: 38
/// ```
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TargetBuilder {
    #[serde(default)]
    positions: BTreeMap<String, Percent>,
}

impl TargetBuilder {
    fn build(self) -> anyhow::Result<Portfolio> {
        let requested = Portfolio::new(
            self.positions
                .into_iter()
                .map(|(symbol, percent)| Holding::with_allocation(symbol, percent)),
        )?;
        validate_allocations(&requested)?;
        Ok(requested)
    }
}

/// Loads the requested portfolio, one holding per symbol in symbol order.
pub fn load_from_file(path: impl AsRef<Path>) -> anyhow::Result<Portfolio> {
    let path = path.as_ref();
    let targets_file =
        std::fs::File::open(path).with_context(|| format!("Failed to open file {path:?}"))?;
    let builder: TargetBuilder = serde_yaml::from_reader(targets_file)
        .with_context(|| format!("Failed to parse target allocations in {path:?}"))?;
    debug!(?builder, "parsed targets");
    builder.build()
}
