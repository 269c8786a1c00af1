//! # Catalog CSV Import
//!
//! Parses a stock-count spreadsheet and works out which products changed.
//!
//! ## Expected layout
//! ```text
//! ID,Product,Qty.,Price
//! 7d1e…,Lucky Me Pancit Canton,48,15.00
//! a90c…,Safeguard Soap,"1,200 pcs",
//! ```
//! - `ID` is required; rows with a blank id are skipped
//! - `Qty.` (or `Qty`) keeps only digits, `.` and `-`; an empty cell is 0
//! - `Price` is optional; an empty cell leaves the price alone
//! - An empty `Product` cell keeps the current name

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::Product;

/// One parsed spreadsheet row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogRow {
    pub id: String,
    pub name: String,
    pub qty: i64,
    pub price: Option<Money>,
}

/// A row that differs from the stored catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogChange {
    pub id: String,
    pub name: String,
    pub qty: i64,
    pub price: Option<Money>,
    pub is_new: bool,
}

fn keep_numeric(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect()
}

fn parse_qty(raw: &str, line: u64) -> CoreResult<i64> {
    let cleaned = keep_numeric(raw);
    if cleaned.is_empty() {
        return Ok(0);
    }
    // Whole units only; a fractional part is dropped
    let whole = cleaned.split('.').next().unwrap_or_default();
    match whole {
        "" | "-" => Ok(0),
        digits => digits.parse::<i64>().map_err(|_| {
            ValidationError::InvalidFormat {
                field: format!("Qty. (line {})", line),
                reason: format!("'{}' is not a number", raw.trim()),
            }
            .into()
        }),
    }
}

fn parse_price(raw: &str, line: u64) -> CoreResult<Option<Money>> {
    let cleaned = keep_numeric(raw);
    if cleaned.is_empty() {
        return Ok(None);
    }
    let price: Money = cleaned.parse().map_err(|_| ValidationError::InvalidFormat {
        field: format!("Price (line {})", line),
        reason: format!("'{}' is not an amount", raw.trim()),
    })?;
    if price.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: format!("Price (line {})", line),
        }
        .into());
    }
    Ok(Some(price))
}

/// Parses a catalog CSV with a header row.
pub fn parse_catalog_csv(input: &str) -> CoreResult<Vec<CatalogRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(input.as_bytes());

    let headers = reader.headers()?.clone();
    let column = |names: &[&str]| {
        headers
            .iter()
            .position(|h| names.iter().any(|n| h.eq_ignore_ascii_case(n)))
    };

    let id_col = column(&["ID"]).ok_or_else(|| ValidationError::Required {
        field: "ID column".to_string(),
    })?;
    let name_col = column(&["Product", "Name"]);
    let qty_col = column(&["Qty.", "Qty"]).ok_or_else(|| ValidationError::Required {
        field: "Qty. column".to_string(),
    })?;
    let price_col = column(&["Price"]);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();

        let id = record.get(id_col).unwrap_or_default().trim();
        if id.is_empty() {
            continue;
        }

        let name = name_col
            .and_then(|c| record.get(c))
            .unwrap_or_default()
            .trim()
            .to_string();
        let qty = parse_qty(record.get(qty_col).unwrap_or_default(), line)?;
        let price = match price_col.and_then(|c| record.get(c)) {
            Some(raw) => parse_price(raw, line)?,
            None => None,
        };

        rows.push(CatalogRow {
            id: id.to_string(),
            name,
            qty,
            price,
        });
    }

    Ok(rows)
}

/// Keeps only rows that are new or differ from the stored product.
pub fn diff_catalog(rows: Vec<CatalogRow>, current: &[Product]) -> Vec<CatalogChange> {
    rows.into_iter()
        .filter_map(|row| match current.iter().find(|p| p.id == row.id) {
            Some(existing) => {
                let name = if row.name.is_empty() {
                    existing.name.clone()
                } else {
                    row.name
                };
                let same_name = name == existing.name;
                let same_qty = row.qty == existing.qty;
                let same_price = row.price.map_or(true, |p| p == existing.price());
                if same_name && same_qty && same_price {
                    None
                } else {
                    Some(CatalogChange {
                        id: row.id,
                        name,
                        qty: row.qty,
                        price: row.price,
                        is_new: false,
                    })
                }
            }
            None => {
                let name = if row.name.is_empty() {
                    row.id.clone()
                } else {
                    row.name
                };
                Some(CatalogChange {
                    id: row.id,
                    name,
                    qty: row.qty,
                    price: row.price,
                    is_new: true,
                })
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn product(id: &str, name: &str, qty: i64, price_cents: i64) -> Product {
        Product {
            id: id.to_string(),
            sku: id.to_string(),
            name: name.to_string(),
            price_cents,
            qty,
            threshold: 0,
            deadstock: false,
            monthly_sales: BTreeMap::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_parse_sanitises_cells() {
        let input = "ID,Product,Qty.,Price\n\
                     p1, Canton ,48,15.00\n\
                     ,Orphan,3,\n\
                     p2,Soap,\"1,200 pcs\",\n\
                     p3,Rice,12.7,₱52.5\n";
        let rows = parse_catalog_csv(input).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].name, "Canton");
        assert_eq!(rows[0].price, Some(Money::from_cents(1500)));
        assert_eq!(rows[1].qty, 1200);
        assert_eq!(rows[1].price, None);
        assert_eq!(rows[2].qty, 12);
        assert_eq!(rows[2].price, Some(Money::from_cents(5250)));
    }

    #[test]
    fn test_parse_requires_id_column() {
        let err = parse_catalog_csv("Product,Qty.\nSoap,3\n").unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::Required { .. })));
    }

    #[test]
    fn test_parse_accepts_plain_qty_header() {
        let rows = parse_catalog_csv("ID,Product,Qty\np1,Soap,\n").unwrap();
        assert_eq!(rows[0].qty, 0);
    }

    #[test]
    fn test_diff_only_changed() {
        let current = vec![
            product("p1", "Canton", 48, 1500),
            product("p2", "Soap", 10, 3500),
        ];
        let rows = vec![
            CatalogRow { id: "p1".into(), name: "Canton".into(), qty: 48, price: None },
            CatalogRow { id: "p2".into(), name: String::new(), qty: 12, price: None },
            CatalogRow { id: "p3".into(), name: "Rice".into(), qty: 5, price: Some(Money::from_cents(5200)) },
        ];
        let changes = diff_catalog(rows, &current);
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].id, "p2");
        assert_eq!(changes[0].name, "Soap");
        assert!(!changes[0].is_new);
        assert!(changes[1].is_new);
    }

    #[test]
    fn test_diff_detects_price_change() {
        let current = vec![product("p1", "Canton", 48, 1500)];
        let rows = vec![CatalogRow {
            id: "p1".into(),
            name: "Canton".into(),
            qty: 48,
            price: Some(Money::from_cents(1600)),
        }];
        assert_eq!(diff_catalog(rows, &current).len(), 1);
    }
}
