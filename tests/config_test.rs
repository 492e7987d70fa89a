mod common;

use std::path::PathBuf;

use anyhow::Result;
use common::recording_service;
use visitledger::config::Config;
use visitledger::domain::{CreditPolicy, PricingTable};

fn bundled(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("config")
        .join(name)
}

#[test]
fn test_bundled_parking_config_matches_default_tariff() -> Result<()> {
    let config = Config::from_file(&bundled("parking.toml"))?;
    assert_eq!(config.database, "parking.db");
    assert_eq!(config.pricing, PricingTable::default());
    Ok(())
}

#[test]
fn test_explicit_path_wins() -> Result<()> {
    let config = Config::load(Some(&bundled("canteen.toml")))?;
    assert_eq!(config.database, "canteen.db");
    Ok(())
}

#[tokio::test]
async fn test_canteen_config_grants_flat_welcome_credit() -> Result<()> {
    let config = Config::from_file(&bundled("canteen.toml"))?;
    assert_eq!(
        config.pricing.credit_policy,
        CreditPolicy::Flat { amount: 5000 }
    );

    let service = recording_service(config.pricing);
    let customer = service
        .register_customer("Lakshmi", "9445566778", None)
        .await?;

    // 4 dosa = 80.00
    let first = service.process_visit(customer.id, "Dosa", 4).await?;
    assert_eq!(first.fee_charged, 8000);
    assert_eq!(first.credit_earned, 5000);

    // 2 meals = 100.00 - 50.00 credit
    let second = service.process_visit(customer.id, "meals", 2).await?;
    assert_eq!(second.credit_applied, 5000);
    assert_eq!(second.fee_charged, 5000);
    Ok(())
}
