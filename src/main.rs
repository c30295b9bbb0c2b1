use std::sync::Arc;
use tracing::{error, info};
use txbatch::{
    config::Config,
    identity::derive_identities,
    ledger::EthersLedger,
    report::TracingObserver,
    retry::RetryEngine,
    signature::{create_provider, SignerRegistry},
    BatchExecutor, RevocationFlow,
};

const DEFAULT_CONFIG: &str = "config/default.toml";

/// Entry point: `txbatch [run|revoke] [config path]`
///
/// Loads the configuration, derives the identities, checks the ledger is
/// reachable and runs either the batch or the revocation flow. Progress and
/// the final summary are logged through `TracingObserver`.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(String::as_str).unwrap_or("run");
    let path = args.get(2).map(String::as_str).unwrap_or(DEFAULT_CONFIG);

    let config = Config::load(path)?;
    let identities = derive_identities(&config.identities.mnemonic, config.identities.count)?;
    info!("Derived {} identities", identities.len());

    let ledger = Arc::new(EthersLedger::connect(&config.ledger.rpc_url, config.ledger.chain_id)?);
    let observer = Arc::new(TracingObserver::default());

    match command {
        "run" => {
            let retry = RetryEngine::new(config.retry_policy(), config.failure_policy());
            let mut executor =
                BatchExecutor::new(ledger, config.executor_config()?, retry).with_observer(observer);

            if let Some(signature) = &config.signature {
                // Custom signers have to be registered here by the embedding program
                let provider = create_provider(&signature.kind, &SignerRegistry::new())?;
                executor = executor.with_signature_provider(provider);
            }

            let summary = executor.execute(&identities).await?;
            if summary.failure_count > 0 {
                error!("{} of {} identities failed", summary.failure_count, summary.results.len());
            }
        }
        "revoke" => {
            let flow = RevocationFlow::new(
                ledger,
                config.token_address()?,
                config.target_address()?,
                config.gas_config()?,
                config.batch.max_concurrency,
                config.settle_delay(),
            )
            .with_failure_policy(config.failure_policy())
            .with_attempt_timeout(config.retry_policy().attempt_timeout)
            .with_observer(observer);

            flow.run(&identities).await?;
        }
        other => anyhow::bail!("unknown command '{}', expected 'run' or 'revoke'", other),
    }

    Ok(())
}
