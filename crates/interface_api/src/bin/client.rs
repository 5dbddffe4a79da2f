//! Insurance protocol client
//!
//! # Usage
//!
//! ```bash
//! # Walk through pool setup, a purchase, a refused claim and a cancellation
//! insurance-client demo
//!
//! # Print a pool's balance, and optionally a policy's state
//! insurance-client status <pool-id> [policy-id]
//!
//! # Issue a bearer token for an identity
//! insurance-client token <identity>
//!
//! # Submit a JSON instruction request as the token's identity
//! insurance-client submit <token> '{"pool":"…","instruction":{"instruction":"cancel_policy"},"policy":"…"}'
//! ```
//!
//! Configuration is read from `INSURANCE__*` variables; a `.env` file in the
//! working directory is loaded first. `INSURANCE__AUTH__JWT_SECRET` (32+
//! characters) is always required. `status` and `submit` are only useful
//! with `INSURANCE__STORE=postgres`.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use core_kernel::{Identity, Lamports, PolicyId, PoolId};
use domain_protocol::Instruction;
use interface_api::config::ApiConfig;
use interface_api::dto::InstructionRequest;
use interface_api::telemetry::init_tracing;
use interface_api::{ApiError, ProtocolService};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = ApiConfig::from_env().context("failed to load configuration")?;
    init_tracing(&config.log).context("failed to initialise tracing")?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let service = ProtocolService::from_config(&config).await?;

    match args.first().map(String::as_str) {
        Some("demo") => demo(&service).await,
        Some("status") => {
            let pool: PoolId = args
                .get(1)
                .context("usage: insurance-client status <pool-id> [policy-id]")?
                .parse()
                .context("invalid pool id")?;
            let policy: Option<PolicyId> = args
                .get(2)
                .map(|p| p.parse())
                .transpose()
                .context("invalid policy id")?;
            status(&service, pool, policy).await
        }
        Some("token") => {
            let identity: Identity = args
                .get(1)
                .context("usage: insurance-client token <identity>")?
                .parse()
                .context("invalid identity")?;
            println!("{}", service.tokens().issue(identity)?);
            Ok(())
        }
        Some("submit") => {
            let (token, body) = match (args.get(1), args.get(2)) {
                (Some(token), Some(body)) => (token, body),
                _ => bail!("usage: insurance-client submit <token> <request-json>"),
            };
            match service.submit_json(token, body).await {
                Ok(receipt) => print_json("receipt", &receipt),
                Err(e) => {
                    print_json("error", &e.to_response())?;
                    Err(e.into())
                }
            }
        }
        _ => bail!(
            "usage: insurance-client <demo | status <pool-id> [policy-id] | token <identity> | submit <token> <request-json>>"
        ),
    }
}

async fn status(service: &ProtocolService, pool: PoolId, policy: Option<PolicyId>) -> Result<()> {
    let pool_status = service.pool_status(pool).await?;
    print_json("pool", &pool_status)?;

    if let Some(policy) = policy {
        let policy_status = service.policy_status(policy).await?;
        print_json("policy", &policy_status)?;
    }
    Ok(())
}

async fn demo(service: &ProtocolService) -> Result<()> {
    let authority = Identity::new_v7();
    let user = Identity::new_v7();
    let authority_token = service.tokens().issue(authority)?;
    let user_token = service.tokens().issue(user)?;

    let pool = PoolId::new_v7();
    let policy = PolicyId::new_v7();
    info!(%pool, %policy, %authority, %user, "Running demo");

    let receipt = service
        .submit(
            &authority_token,
            InstructionRequest::new(pool, Instruction::InitializePool { bump: 0 }),
        )
        .await?;
    print_json("initialize_pool", &receipt)?;

    let receipt = service
        .submit(
            &user_token,
            InstructionRequest::new(
                pool,
                Instruction::PurchaseInsurance {
                    deposit_amount: Lamports::new(1_000_000_000),
                    premium_amount: Lamports::new(100_000_000),
                    coverage_amount: Lamports::new(5_000_000_000),
                },
            )
            .with_policy(policy),
        )
        .await?;
    print_json("purchase_insurance", &receipt)?;

    let approval = service
        .submit(
            &authority_token,
            InstructionRequest::new(pool, Instruction::ApproveClaim).with_policy(policy),
        )
        .await;
    match approval {
        Ok(receipt) => print_json("approve_claim", &receipt)?,
        Err(e @ ApiError::Protocol(_)) => {
            warn!(error = %e, "Claim refused");
            print_json("approve_claim", &e.to_response())?;
        }
        Err(e) => return Err(e.into()),
    }

    let receipt = service
        .submit(
            &user_token,
            InstructionRequest::new(pool, Instruction::CancelPolicy).with_policy(policy),
        )
        .await?;
    print_json("cancel_policy", &receipt)?;

    status(service, pool, Some(policy)).await
}

fn print_json<T: Serialize>(label: &str, value: &T) -> Result<()> {
    println!("== {}", label);
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
