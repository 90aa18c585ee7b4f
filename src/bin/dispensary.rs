//! Dispensary demo
//!
//! Opens the request store described by the environment, seeds a user and a
//! couple of medicines, then walks one request through submission, approval
//! and dispensing via the JSON procedures.
//!
//! ```bash
//! MEDICINE_DB_PATH=/tmp/dispensary.db cargo run --bin dispensary
//! ```

use anyhow::Context;
use medicine_requests::api::{self, Api};
use medicine_requests::types::{Medicine, MedicineId, User, UserId, UserStatus};
use medicine_requests::{Config, RequestService, RequestStore, SledStore};
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn seed(store: &SledStore) -> anyhow::Result<(UserId, MedicineId, MedicineId)> {
    let user = UserId(store.next_id()?);
    let paracetamol = MedicineId(store.next_id()?);
    let amoxicillin = MedicineId(store.next_id()?);

    store.put_user(&User::new(user, "Maria Santos", "msantos", UserStatus::Approved))?;
    store.put_medicine(
        &Medicine::new(paracetamol, "Paracetamol 500mg", "Biogesic", 120)
            .with_category("Analgesic")
            .set_recommended(true),
    )?;
    store.put_medicine(
        &Medicine::new(amoxicillin, "Amoxicillin 250mg", "Amoxil", 3).with_category("Antibiotic"),
    )?;

    tracing::info!(%user, %paracetamol, %amoxicillin, "seeded demo catalog");
    Ok((user, paracetamol, amoxicillin))
}

fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.log_filter))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let store = SledStore::open(&config.storage).context("failed to open request store")?;
    let (user, paracetamol, amoxicillin) = seed(&store)?;
    let api = Api::new(RequestService::new(store.clone()));

    let submitted = api
        .call(
            api::SUBMIT,
            json!({
                "userId": user.0,
                "reason": "Post-extraction pain and infection",
                "medicines": [
                    { "medicineId": paracetamol.0, "quantity": 10 },
                    { "medicineId": amoxicillin.0 }
                ]
            }),
        )
        .map_err(|err| anyhow::anyhow!("submit failed ({}): {}", err.code, err.message))?;
    let request_id = submitted["id"]
        .as_u64()
        .context("submitted request has no id")?;

    // amoxicillin was submitted without a quantity; more than is in stock is refused
    let amoxicillin_key = amoxicillin.0.to_string();
    let refused = api.call(
        api::UPDATE_QUANTITIES,
        json!({ "requestId": request_id, "quantities": { amoxicillin_key.as_str(): 5 } }),
    );
    if let Err(err) = refused {
        tracing::info!(code = err.code, message = %err.message, "quantity edit refused");
    }
    api.call(
        api::UPDATE_QUANTITIES,
        json!({ "requestId": request_id, "quantities": { amoxicillin_key.as_str(): 3 } }),
    )
    .map_err(|err| anyhow::anyhow!("quantity edit failed: {}", err.message))?;

    for status in ["APPROVED", "GIVEN"] {
        api.call(api::UPDATE_STATUS, json!({ "id": request_id, "status": status }))
            .map_err(|err| anyhow::anyhow!("{status} failed: {}", err.message))?;
    }

    let limits = api
        .call(api::LIMITS, json!({ "userId": user.0 }))
        .map_err(|err| anyhow::anyhow!("limits failed: {}", err.message))?;
    let stats = api
        .call(api::STATS, json!({}))
        .map_err(|err| anyhow::anyhow!("stats failed: {}", err.message))?;

    println!("{}", serde_json::to_string_pretty(&json!({ "limits": limits, "stats": stats }))?);

    for id in [paracetamol, amoxicillin] {
        if let Some(medicine) = store.medicine(id)? {
            tracing::info!(medicine = %medicine.name, stock = medicine.stock, "stock after dispensing");
        }
    }

    store.flush()?;
    Ok(())
}
