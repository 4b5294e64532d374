//! HTTP routes for registering devices and browsing their history.

use std::collections::BTreeMap;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use crate::crypto::DisplayKey;
use crate::error::ApiError;
use crate::model::{Amendment, Block, Record};
use crate::AppState;

const STOLEN_NOTICE: &str = "Device reported stolen";

#[derive(Deserialize)]
pub struct RegisterInput {
    pub brand: String,
    pub model: String,
    pub serial_number: String,
    pub supplier: String,
}

/// Edit of the block at `index` (position within the chain).
#[derive(Deserialize)]
pub struct EditInput {
    pub index: usize,
    #[serde(flatten)]
    pub amendment: Amendment,
}

/// One device block as shown to users. The buyer id is never returned in clear.
#[derive(Debug, Serialize, Deserialize)]
pub struct BlockView {
    pub sequence_index: u64,
    pub created_at: String,
    pub previous_hash: String,
    pub hash: String,
    pub brand: String,
    pub model: String,
    pub serial_number: String,
    pub supplier: String,
    pub is_sold: bool,
    pub buyer: String,
    pub is_stolen: bool,
    /// "Sold to <buyer>" or "Not sold", plus the stolen notice if flagged.
    pub status: String,
    pub buyer_id_sealed: Option<String>,
    pub recorded_at: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenesisView {
    pub sequence_index: u64,
    pub created_at: String,
    pub previous_hash: String,
    pub hash: String,
}

fn rfc3339(at: OffsetDateTime) -> Result<String, ApiError> {
    at.format(&Rfc3339).map_err(|_| ApiError::Internal)
}

fn status_text(record: &Record) -> String {
    let sale = if record.is_sold {
        format!("Sold to {}", record.buyer)
    } else {
        "Not sold".to_string()
    };
    if record.is_stolen {
        format!("{sale}. {STOLEN_NOTICE}")
    } else {
        sale
    }
}

fn block_view(block: &Block, key: &DisplayKey) -> Result<BlockView, ApiError> {
    let record = block.record().ok_or(ApiError::Internal)?;
    let buyer_id_sealed = if record.buyer_id.is_empty() {
        None
    } else {
        Some(key.seal(&record.buyer_id)?)
    };

    Ok(BlockView {
        sequence_index: block.sequence_index,
        created_at: rfc3339(block.created_at)?,
        previous_hash: block.previous_hash.clone(),
        hash: block.hash.clone(),
        brand: record.brand.clone(),
        model: record.model.clone(),
        serial_number: record.serial_number.clone(),
        supplier: record.supplier.clone(),
        is_sold: record.is_sold,
        buyer: record.buyer.clone(),
        is_stolen: record.is_stolen,
        status: status_text(record),
        buyer_id_sealed,
        recorded_at: rfc3339(record.created_at)?,
    })
}

fn chain_view(chain: &[Block], key: &DisplayKey) -> Result<Vec<BlockView>, ApiError> {
    chain.iter().map(|b| block_view(b, key)).collect()
}

/// POST /devices
pub async fn register_device(
    State(state): State<AppState>,
    payload: Result<Json<RegisterInput>, JsonRejection>,
) -> Result<Json<BlockView>, ApiError> {
    let Json(input) = payload?;
    let record = Record::new(input.brand, input.model, input.serial_number, input.supplier);
    let block = state.ledger()?.append(record);
    tracing::info!(index = block.sequence_index, "device registered");
    Ok(Json(block_view(&block, &state.display_key)?))
}

/// POST /devices/:serial/edit
pub async fn edit_device(
    State(state): State<AppState>,
    Path(serial): Path<String>,
    payload: Result<Json<EditInput>, JsonRejection>,
) -> Result<Json<BlockView>, ApiError> {
    let Json(input) = payload?;
    let block = {
        let mut ledger = state.ledger()?;
        let Some(target) = ledger.block_at(&serial, input.index).and_then(Block::record) else {
            tracing::info!(serial = %serial, index = input.index, "edit target not found");
            return Err(ApiError::EditTargetNotFound {
                serial,
                index: input.index,
            });
        };
        let revised = target.amend(input.amendment);
        ledger.append(revised)
    };
    tracing::info!(serial = %serial, index = block.sequence_index, "device updated");
    Ok(Json(block_view(&block, &state.display_key)?))
}

/// GET /devices
pub async fn list_devices(
    State(state): State<AppState>,
) -> Result<Json<BTreeMap<String, Vec<BlockView>>>, ApiError> {
    let ledger = state.ledger()?;
    let mut out = BTreeMap::new();
    for (serial, chain) in ledger.all_chains() {
        out.insert(serial.clone(), chain_view(chain, &state.display_key)?);
    }
    Ok(Json(out))
}

/// GET /devices/:serial — empty list for unknown serials
pub async fn device_history(
    State(state): State<AppState>,
    Path(serial): Path<String>,
) -> Result<Json<Vec<BlockView>>, ApiError> {
    let ledger = state.ledger()?;
    Ok(Json(chain_view(ledger.lookup(&serial), &state.display_key)?))
}

/// GET /devices/:serial/verify — recompute hashes and linkage; returns { ok, faults[] }
#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyResp {
    pub ok: bool,
    pub faults: Vec<String>,
}
pub async fn verify_device(
    State(state): State<AppState>,
    Path(serial): Path<String>,
) -> Result<Json<VerifyResp>, ApiError> {
    let faults = state.ledger()?.chain_faults(&serial);
    Ok(Json(VerifyResp {
        ok: faults.is_empty(),
        faults: faults.iter().map(ToString::to_string).collect(),
    }))
}

/// GET /genesis
pub async fn genesis(State(state): State<AppState>) -> Result<Json<GenesisView>, ApiError> {
    let ledger = state.ledger()?;
    let g = ledger.genesis();
    Ok(Json(GenesisView {
        sequence_index: g.sequence_index,
        created_at: rfc3339(g.created_at)?,
        previous_hash: g.previous_hash.clone(),
        hash: g.hash.clone(),
    }))
}

/// GET /health
#[derive(Serialize)]
pub struct Health {
    pub status: &'static str,
}
pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

/// GET /version
#[derive(Serialize)]
pub struct Version {
    pub version: &'static str,
    pub git_sha: Option<&'static str>,
}
pub async fn version() -> Json<Version> {
    Json(Version {
        version: env!("CARGO_PKG_VERSION"),
        git_sha: option_env!("GIT_SHA"),
    })
}
