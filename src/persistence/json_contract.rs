use serde::{Deserialize, Serialize};

use crate::annotation::DrawingObject;
use crate::error::{ReplayError, ReplayResult};

pub const DRAWINGS_JSON_SCHEMA_V1: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawingsJsonContractV1 {
    pub schema_version: u32,
    pub drawings: Vec<DrawingObject>,
}

pub fn drawings_to_json_contract_v1_pretty(drawings: &[DrawingObject]) -> ReplayResult<String> {
    let payload = DrawingsJsonContractV1 {
        schema_version: DRAWINGS_JSON_SCHEMA_V1,
        drawings: drawings.to_vec(),
    };
    serde_json::to_string_pretty(&payload).map_err(|e| {
        ReplayError::InvalidData(format!("failed to serialize drawings contract v1: {e}"))
    })
}

/// Accepts either a bare drawing array or the versioned envelope.
pub fn drawings_from_json_compat_str(input: &str) -> ReplayResult<Vec<DrawingObject>> {
    if let Ok(drawings) = serde_json::from_str::<Vec<DrawingObject>>(input) {
        return Ok(drawings);
    }
    let payload: DrawingsJsonContractV1 = serde_json::from_str(input).map_err(|e| {
        ReplayError::InvalidData(format!("failed to parse drawings json payload: {e}"))
    })?;
    if payload.schema_version != DRAWINGS_JSON_SCHEMA_V1 {
        return Err(ReplayError::InvalidData(format!(
            "unsupported drawings schema version: {}",
            payload.schema_version
        )));
    }
    Ok(payload.drawings)
}
