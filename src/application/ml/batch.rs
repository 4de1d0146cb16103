//! Offline scoring of many requests against one shared backend.

use super::estimator::FloorPriceEstimator;
use crate::domain::ml::feature_record::FloorPriceRequest;
use crate::domain::ports::ScoringBackend;
use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::Serialize;
use std::io::{Read, Write};
use tracing::{info, warn};

/// A parsed input row, or why it could not be parsed.
pub type RequestRow = std::result::Result<FloorPriceRequest, String>;

/// One output row. Rows that could not be scored carry an empty estimate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchEstimate {
    pub row: usize,
    pub inventory_id: String,
    pub ex_floor_price: Option<f32>,
    pub floor_price: Option<f32>,
}

/// Reads requests from CSV with a header row named after the features.
pub fn read_requests<R: Read>(reader: R) -> Result<Vec<RequestRow>> {
    let mut rdr = csv::Reader::from_reader(reader);
    rdr.headers().context("Failed to read CSV header")?;

    Ok(rdr
        .deserialize::<FloorPriceRequest>()
        .map(|row| row.map_err(|e| e.to_string()))
        .collect())
}

/// Scores every row in parallel. Output order matches input order.
pub fn score_rows<B: ScoringBackend>(
    estimator: &FloorPriceEstimator<B>,
    rows: &[RequestRow],
) -> Vec<BatchEstimate> {
    let estimates: Vec<BatchEstimate> = rows
        .par_iter()
        .enumerate()
        .map(|(row, parsed)| match parsed {
            Ok(request) => {
                let floor_price = estimator.predict(request).unwrap_or_else(|e| {
                    warn!("Row {}: {}", row, e);
                    None
                });
                BatchEstimate {
                    row,
                    inventory_id: request.inventory_id.clone(),
                    ex_floor_price: request.ex_floor_price,
                    floor_price,
                }
            }
            Err(reason) => {
                warn!("Row {}: unreadable request: {}", row, reason);
                BatchEstimate {
                    row,
                    inventory_id: String::new(),
                    ex_floor_price: None,
                    floor_price: None,
                }
            }
        })
        .collect();

    let scored = estimates.iter().filter(|e| e.floor_price.is_some()).count();
    info!("Scored {}/{} requests", scored, estimates.len());
    estimates
}

pub fn write_estimates<W: Write>(writer: W, estimates: &[BatchEstimate]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for estimate in estimates {
        wtr.serialize(estimate)
            .context(format!("Failed to write row {}", estimate.row))?;
    }
    wtr.flush().context("Failed to flush estimates")?;
    Ok(())
}
