//! CSV product import
//!
//! Plain comma separated text with a header row. Quoted fields are not
//! supported: a comma inside a value splits it. Rows that cannot become a
//! product are left out and listed in [`ImportOutcome::skipped`].

use rust_decimal::Decimal;
use serde::Serialize;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;
use crate::domain::aggregates::MAX_UNIT_PRICE;
use crate::domain::value_objects::{Money, Sku};

const NAME_HEADERS: [&str; 2] = ["name_ar", "name"];
const SUPPLIER_HEADERS: [&str; 2] = ["supplier_id", "supplier"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImportError {
    #[error("missing required column: {0}")]
    MissingColumn(&'static str),
}

/// A product row ready to insert into `products`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ImportedProduct {
    #[serde(rename = "name_ar")]
    pub name: String,
    pub sku: Option<Sku>,
    pub price: Money,
    pub stock: i32,
    pub supplier_id: Option<Uuid>,
    pub active: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SkippedRow {
    /// One-based line number in the uploaded file (the header is line 1).
    pub line: usize,
    pub reason: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ImportOutcome {
    pub rows: Vec<ImportedProduct>,
    pub skipped: Vec<SkippedRow>,
}

struct Columns {
    name: usize,
    price: Option<usize>,
    sku: Option<usize>,
    stock: Option<usize>,
    supplier: Option<usize>,
}

impl Columns {
    fn resolve(header: &str) -> Result<Self, ImportError> {
        let names: Vec<String> = header
            .trim_start_matches('\u{feff}')
            .split(',')
            .map(|h| h.trim().to_lowercase())
            .collect();
        let find = |wanted: &[&str]| names.iter().position(|h| wanted.contains(&h.as_str()));
        Ok(Self {
            name: find(&NAME_HEADERS).ok_or(ImportError::MissingColumn("name"))?,
            price: find(&["price"]),
            sku: find(&["sku"]),
            stock: find(&["stock"]),
            supplier: find(&SUPPLIER_HEADERS),
        })
    }
}

fn cell<'a>(cells: &[&'a str], index: Option<usize>) -> Option<&'a str> {
    index.and_then(|i| cells.get(i)).map(|c| c.trim()).filter(|c| !c.is_empty())
}

/// Parses an uploaded CSV. Rows with a blank supplier cell fall back to
/// `default_supplier`.
pub fn parse_products(text: &str, default_supplier: Option<Uuid>) -> Result<ImportOutcome, ImportError> {
    let mut lines = text.lines().enumerate().filter(|(_, l)| !l.trim().is_empty());
    let (_, header) = lines.next().ok_or(ImportError::MissingColumn("name"))?;
    let cols = Columns::resolve(header)?;

    let mut outcome = ImportOutcome::default();
    for (index, line) in lines {
        let line_no = index + 1;
        let cells: Vec<&str> = line.split(',').collect();
        match parse_row(&cells, &cols, default_supplier) {
            Ok(row) => outcome.rows.push(row),
            Err(reason) => outcome.skipped.push(SkippedRow { line: line_no, reason }),
        }
    }
    Ok(outcome)
}

fn parse_row(cells: &[&str], cols: &Columns, default_supplier: Option<Uuid>) -> Result<ImportedProduct, String> {
    let name = cell(cells, Some(cols.name)).ok_or_else(|| "empty name".to_string())?;
    let sku = cell(cells, cols.sku).map(Sku::new).transpose().map_err(|e| e.to_string())?;
    let supplier_id = match cell(cells, cols.supplier) {
        Some(raw) => Some(Uuid::parse_str(raw).map_err(|_| format!("invalid supplier reference: {raw}"))?),
        None => default_supplier,
    };
    let price = cell(cells, cols.price).and_then(|p| Decimal::from_str(p).ok()).unwrap_or(Decimal::ZERO);
    if price < Decimal::ZERO || price > MAX_UNIT_PRICE {
        return Err(format!("invalid price: {price}"));
    }
    let stock = cell(cells, cols.stock).and_then(|s| s.parse::<i32>().ok()).unwrap_or(0);
    if stock < 0 {
        return Err(format!("invalid stock: {stock}"));
    }
    Ok(ImportedProduct { name: name.to_string(), sku, price: Money::new(price), stock, supplier_id, active: true })
}
