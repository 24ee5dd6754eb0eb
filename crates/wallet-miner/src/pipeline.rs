//! Replay, mine and hijack in one go, driven by a [`Config`].

use crate::{
    hijack::{HijackError, HijackOutcome, Hijacker, InitPayload, InitializerLayout},
    mine::{AddressMiner, DeploymentTemplate, MinedAddress, MiningError, sequential_salts},
    probe::{ProxyLineage, lineage},
    replay::{ReplayError, ReplaySummary, Replayer},
};
use serde::Serialize;
use wallet_miner_common::{LedgerClient, LedgerError, SignedTransactionRecord};
use wallet_miner_config::{Config, MissingValue};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("replay failed: {0}")]
    Replay(#[from] ReplayError),
    #[error("mining failed: {0}")]
    Mining(#[from] MiningError),
    #[error("hijack failed: {0}")]
    Hijack(#[from] HijackError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Config(#[from] MissingValue),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PipelineReport {
    pub replay: ReplaySummary,
    pub mined: MinedAddress,
    /// Present when a proxy to hijack is configured.
    pub lineage: Option<ProxyLineage>,
    pub hijack: Option<HijackOutcome>,
}

#[derive(Debug)]
pub struct Pipeline<'a, L: ?Sized> {
    ledger: &'a L,
    config: &'a Config,
}

impl<'a, L: LedgerClient + ?Sized> Pipeline<'a, L> {
    pub fn new(ledger: &'a L, config: &'a Config) -> Self {
        Self { ledger, config }
    }

    pub async fn run(
        &self,
        records: &[SignedTransactionRecord],
    ) -> Result<PipelineReport, PipelineError> {
        let Config { replay, mining, hijack, .. } = self.config;
        let sender = self.config.sender()?;

        let replay = Replayer::new(self.ledger)
            .with_targets(replay.targets.iter().copied())
            .with_funding(replay.fund)
            .replay(records)
            .await?;

        let template = DeploymentTemplate::from_config(mining, sender);
        let mined = AddressMiner::new(self.ledger, sender)
            .with_gas_limit(mining.gas_limit)
            .mine(&template, sequential_salts(mining.salt_start), mining.target, mining.max_attempts)
            .await?;

        let (lineage, hijack) = match hijack.proxy {
            Some(proxy) => {
                let lineage = lineage(self.ledger, proxy).await?;
                let outcome = Hijacker::new(self.ledger, sender)
                    .with_layout(InitializerLayout::from_config(hijack))
                    .with_gas_limit(hijack.gas_limit.unwrap_or(mining.gas_limit))
                    .hijack(lineage.implementation, &InitPayload::from_config(hijack))
                    .await?;
                (Some(lineage), Some(outcome))
            }
            None => (None, None),
        };

        Ok(PipelineReport { replay, mined, lineage, hijack })
    }
}
