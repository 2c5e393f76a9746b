//! Demo data seeder for Dealflow development and testing.
//!
//! Opens a demo lead ledger with a couple of payment entries and a
//! document, then prints bearer tokens for a sales, a finance and an admin
//! identity so the API can be exercised by hand.
//!
//! Usage: cargo run --bin seeder

use anyhow::Context;
use rust_decimal::Decimal;
use sea_orm_migration::MigratorTrait;
use uuid::Uuid;

use dealflow_core::reconcile::{Attachment, Caller, Decision, LedgerError, Role, RoleSet};
use dealflow_db::{
    LedgerRepository, connect,
    migration::Migrator,
    repositories::{NewDocumentEntry, NewLedger, NewPaymentEntry, VerifyPayment},
};
use dealflow_shared::{AppConfig, JwtConfig, JwtService};

/// Demo lead ID (consistent across runs).
const DEMO_LEAD_ID: Uuid = Uuid::from_u128(0x0000_0000_0000_0000_0000_0000_0000_0101);
/// Demo sales identity.
const SALES_USER_ID: Uuid = Uuid::from_u128(0x0000_0000_0000_0000_0000_0000_0000_0201);
/// Demo finance identity.
const FINANCE_USER_ID: Uuid = Uuid::from_u128(0x0000_0000_0000_0000_0000_0000_0000_0202);
/// Demo admin identity.
const ADMIN_USER_ID: Uuid = Uuid::from_u128(0x0000_0000_0000_0000_0000_0000_0000_0203);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("failed to load configuration")?;

    println!("Connecting to database...");
    let db = connect(&config.database.url)
        .await
        .context("failed to connect to database")?;
    Migrator::up(&db, None).await.context("failed to migrate")?;

    let repo = LedgerRepository::new(db);
    let sales = Caller::new(SALES_USER_ID, RoleSet::new([Role::Sales]));
    let finance = Caller::new(FINANCE_USER_ID, RoleSet::new([Role::Finance]));

    println!("Seeding demo ledger...");
    seed_demo_ledger(&repo, &sales, &finance).await?;

    println!("Development tokens:");
    let jwt = JwtService::new(JwtConfig::from(&config.jwt));
    for (label, user_id, role) in [
        ("sales", SALES_USER_ID, Role::Sales),
        ("finance", FINANCE_USER_ID, Role::Finance),
        ("admin", ADMIN_USER_ID, Role::Admin),
    ] {
        let token = jwt.generate_access_token(user_id, &[role.as_str()])?;
        println!("  {label:<8} {user_id}  {token}");
    }

    println!("Seeding complete!");
    Ok(())
}

/// Opens the demo lead unless it exists, then adds entries in several
/// states.
async fn seed_demo_ledger(
    repo: &LedgerRepository,
    sales: &Caller,
    finance: &Caller,
) -> anyhow::Result<()> {
    let opened = repo
        .open_ledger(
            sales,
            NewLedger {
                lead_id: DEMO_LEAD_ID,
                title: "Riverside office fit-out".to_string(),
                customer_name: Some("Riverside Holdings".to_string()),
            },
        )
        .await;

    match opened {
        Ok(lead) => println!("  Created demo lead: {}", lead.id),
        Err(LedgerError::LedgerAlreadyOpen(_)) => {
            println!("  Demo lead already exists, skipping...");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    }

    let deposit = repo
        .submit_payment_entry(
            sales,
            DEMO_LEAD_ID,
            NewPaymentEntry {
                amount: Decimal::new(1_500_000, 2),
                note: "Deposit, wire transfer".to_string(),
                attachment: Some(Attachment {
                    url: "https://files.dealflow.local/receipts/deposit.pdf".to_string(),
                    media_type: "application/pdf".to_string(),
                }),
            },
        )
        .await?;
    repo.verify_payment_entry(
        finance,
        deposit.id,
        VerifyPayment {
            decision: Decision::Approved,
            finance_notes: Some("Matched bank statement".to_string()),
        },
    )
    .await?;

    repo.submit_payment_entry(
        sales,
        DEMO_LEAD_ID,
        NewPaymentEntry {
            amount: Decimal::new(2_250_000, 2),
            note: "Second instalment".to_string(),
            attachment: None,
        },
    )
    .await?;

    repo.submit_document_entry(
        sales,
        DEMO_LEAD_ID,
        NewDocumentEntry {
            note: "Signed contract".to_string(),
            attachment: Attachment {
                url: "https://files.dealflow.local/contracts/riverside.pdf".to_string(),
                media_type: "application/pdf".to_string(),
            },
        },
    )
    .await?;

    println!("  Added 2 payment entries and 1 document entry");
    Ok(())
}
