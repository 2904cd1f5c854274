//! Movement history views: filters, per-type counts and CSV export.

use std::io;

use chrono::NaiveDate;
use serde::Serialize;

use stockflow_core::ProductId;
use stockflow_inventory::{MovementType, StockMovement};

/// Page size of the history table.
pub const HISTORY_PER_PAGE: usize = 15;

pub const CSV_HEADER: [&str; 9] = [
    "Date",
    "Time",
    "Product",
    "Movement Type",
    "Quantity",
    "User",
    "Reason",
    "Previous Qty",
    "New Qty",
];

/// Filters of the history screen. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MovementFilter {
    pub product: Option<ProductId>,
    pub movement_type: Option<MovementType>,
    pub user: Option<String>,
    /// First day included (UTC).
    pub from: Option<NaiveDate>,
    /// Last day included, up to its end (UTC).
    pub to: Option<NaiveDate>,
    pub search: String,
}

impl MovementFilter {
    pub fn is_empty(&self) -> bool {
        self.product.is_none()
            && self.movement_type.is_none()
            && self.user.is_none()
            && self.from.is_none()
            && self.to.is_none()
            && self.search.trim().is_empty()
    }

    /// `term` is the lowercased search text.
    pub fn matches(&self, movement: &StockMovement, term: &str) -> bool {
        let day = movement.created_at.date_naive();
        self.product.is_none_or(|id| movement.product_id == id)
            && self.movement_type.is_none_or(|t| movement.movement_type == t)
            && self.user.as_deref().is_none_or(|u| movement.created_by == u)
            && self.from.is_none_or(|from| day >= from)
            && self.to.is_none_or(|to| day <= to)
            && (term.is_empty() || matches_search(movement, term))
    }

    /// Filter `movements`, preserving order.
    pub fn apply<'a>(&self, movements: &'a [StockMovement]) -> Vec<&'a StockMovement> {
        let term = self.search.trim().to_lowercase();
        movements.iter().filter(|m| self.matches(m, &term)).collect()
    }
}

/// `term` must already be lowercase.
fn matches_search(movement: &StockMovement, term: &str) -> bool {
    movement.product_name.to_lowercase().contains(term)
        || movement.created_by.to_lowercase().contains(term)
        || movement.reason.to_lowercase().contains(term)
        || movement.movement_type.as_str().to_lowercase().contains(term)
        || movement.movement_type.label().to_lowercase().contains(term)
}

/// Distinct users in first-seen order (user filter options).
pub fn users(movements: &[StockMovement]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for m in movements {
        if !m.created_by.is_empty() && !seen.contains(&m.created_by) {
            seen.push(m.created_by.clone());
        }
    }
    seen
}

/// Counts shown in the summary cards above the history table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementStats {
    pub total: usize,
    pub stock_in: usize,
    pub stock_out: usize,
    pub adjustment: usize,
    pub returns: usize,
    pub loss: usize,
    pub initial: usize,
}

impl MovementStats {
    pub fn from_movements<'a>(movements: impl IntoIterator<Item = &'a StockMovement>) -> Self {
        let mut stats = Self::default();
        for m in movements {
            stats.total += 1;
            match m.movement_type {
                MovementType::StockIn => stats.stock_in += 1,
                MovementType::StockOut => stats.stock_out += 1,
                MovementType::Adjustment => stats.adjustment += 1,
                MovementType::Return => stats.returns += 1,
                MovementType::Loss => stats.loss += 1,
                MovementType::Initial => stats.initial += 1,
            }
        }
        stats
    }

    pub fn count(&self, movement_type: MovementType) -> usize {
        match movement_type {
            MovementType::StockIn => self.stock_in,
            MovementType::StockOut => self.stock_out,
            MovementType::Adjustment => self.adjustment,
            MovementType::Return => self.returns,
            MovementType::Loss => self.loss,
            MovementType::Initial => self.initial,
        }
    }
}

/// Write `movements` as CSV: plain header line, then one fully quoted record
/// per movement. Timestamps are rendered in UTC.
pub fn export_csv<'a, W: io::Write>(
    movements: impl IntoIterator<Item = &'a StockMovement>,
    mut writer: W,
) -> Result<(), csv::Error> {
    writer.write_all(CSV_HEADER.join(",").as_bytes())?;
    writer.write_all(b"\n")?;

    let mut csv = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);

    let mut rows = 0usize;
    for m in movements {
        let reason = m.reason.trim();
        csv.write_record([
            m.created_at.format("%Y-%m-%d").to_string(),
            m.created_at.format("%H:%M:%S").to_string(),
            m.product_name.clone(),
            m.movement_type.label().to_string(),
            m.quantity.to_string(),
            m.created_by.clone(),
            if reason.is_empty() { "N/A".to_string() } else { reason.to_string() },
            m.previous_quantity.map(|q| q.to_string()).unwrap_or_default(),
            m.new_quantity.map(|q| q.to_string()).unwrap_or_default(),
        ])?;
        rows += 1;
    }
    csv.flush()?;
    tracing::debug!(rows, "exported stock history");
    Ok(())
}

pub fn export_csv_string<'a>(
    movements: impl IntoIterator<Item = &'a StockMovement>,
) -> Result<String, csv::Error> {
    let mut buf = Vec::new();
    export_csv(movements, &mut buf)?;
    String::from_utf8(buf).map_err(|e| csv::Error::from(io::Error::new(io::ErrorKind::InvalidData, e)))
}

/// `stock-history-YYYY-MM-DD.csv`
pub fn export_filename(date: NaiveDate) -> String {
    format!("stock-history-{}.csv", date.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use stockflow_core::MovementId;

    fn movement(
        id: i64,
        product: (i64, &str),
        movement_type: MovementType,
        quantity: u64,
        user: &str,
        reason: &str,
        at: (i32, u32, u32, u32),
    ) -> StockMovement {
        StockMovement {
            id: MovementId::new(id),
            product_id: ProductId::new(product.0),
            product_name: product.1.to_string(),
            movement_type,
            quantity,
            reason: reason.to_string(),
            previous_quantity: Some(10),
            new_quantity: Some(stockflow_inventory::resulting_quantity(10, movement_type, quantity)),
            created_by: user.to_string(),
            created_at: Utc.with_ymd_and_hms(at.0, at.1, at.2, at.3, 5, 9).unwrap(),
        }
    }

    fn ledger() -> Vec<StockMovement> {
        vec![
            movement(1, (1, "Widget"), MovementType::StockIn, 5, "alice", "restock", (2024, 3, 1, 9)),
            movement(2, (2, "Gadget"), MovementType::StockOut, 3, "bob", "order #7", (2024, 3, 2, 23)),
            movement(3, (1, "Widget"), MovementType::Loss, 1, "alice", "", (2024, 3, 3, 0)),
            movement(4, (2, "Gadget"), MovementType::Adjustment, 8, "carol", "audit", (2024, 3, 4, 12)),
        ]
    }

    fn ids(found: Vec<&StockMovement>) -> Vec<i64> {
        found.iter().map(|m| m.id.get()).collect()
    }

    #[test]
    fn empty_filter_keeps_everything() {
        let filter = MovementFilter::default();
        assert!(filter.is_empty());
        assert_eq!(filter.apply(&ledger()).len(), 4);
    }

    #[test]
    fn filters_by_product_type_and_user() {
        let movements = ledger();
        let by_product = MovementFilter {
            product: Some(ProductId::new(1)),
            ..MovementFilter::default()
        };
        assert_eq!(ids(by_product.apply(&movements)), vec![1, 3]);

        let by_type_and_user = MovementFilter {
            movement_type: Some(MovementType::Loss),
            user: Some("alice".to_string()),
            ..MovementFilter::default()
        };
        assert_eq!(ids(by_type_and_user.apply(&movements)), vec![3]);
    }

    #[test]
    fn date_range_includes_whole_end_day() {
        let filter = MovementFilter {
            from: NaiveDate::from_ymd_opt(2024, 3, 2),
            to: NaiveDate::from_ymd_opt(2024, 3, 3),
            ..MovementFilter::default()
        };
        // 23:05 on the 2nd and 00:05 on the 3rd both fall inside.
        assert_eq!(ids(filter.apply(&ledger())), vec![2, 3]);
    }

    #[test]
    fn search_spans_name_user_reason_and_type() {
        let movements = ledger();
        let search = |term: &str| {
            ids(MovementFilter {
                search: term.to_string(),
                ..MovementFilter::default()
            }
            .apply(&movements))
        };
        assert_eq!(search("GADGET"), vec![2, 4]);
        assert_eq!(search("carol"), vec![4]);
        assert_eq!(search("order"), vec![2]);
        assert_eq!(search("stock_in"), vec![1]);
        assert_eq!(search("loss"), vec![3]);
        assert!(search("nothing like this").is_empty());
    }

    #[test]
    fn stats_count_per_type() {
        let movements = ledger();
        let stats = MovementStats::from_movements(&movements);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.count(MovementType::StockIn), 1);
        assert_eq!(stats.count(MovementType::Return), 0);
        assert_eq!(stats.adjustment, 1);
    }

    #[test]
    fn users_are_distinct_in_order() {
        assert_eq!(users(&ledger()), vec!["alice", "bob", "carol"]);
    }

    #[test]
    fn csv_export_quotes_every_field() {
        let movements = ledger();
        let csv = export_csv_string(&movements[..3]).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(
            lines[0],
            "Date,Time,Product,Movement Type,Quantity,User,Reason,Previous Qty,New Qty"
        );
        assert_eq!(
            lines[1],
            r#""2024-03-01","09:05:09","Widget","Stock In","5","alice","restock","10","15""#
        );
        assert_eq!(
            lines[3],
            r#""2024-03-03","00:05:09","Widget","Loss","1","alice","N/A","10","9""#
        );
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn csv_movement_type_column_uses_labels() {
        let movements = ledger();
        let csv = export_csv_string(&movements).unwrap();
        for label in ["\"Stock In\"", "\"Stock Out\"", "\"Loss\"", "\"Adjustment\""] {
            assert!(csv.contains(label), "missing {label} in {csv}");
        }
        assert!(!csv.contains("STOCK_IN"));
    }

    #[test]
    fn csv_export_escapes_embedded_quotes() {
        let mut m = ledger().remove(0);
        m.reason = "said \"urgent\", then left".to_string();
        let csv = export_csv_string([&m]).unwrap();
        assert!(csv.contains(r#""said ""urgent"", then left""#));
    }

    #[test]
    fn filename_uses_iso_date() {
        let date = NaiveDate::from_ymd_opt(2024, 7, 9).unwrap();
        assert_eq!(export_filename(date), "stock-history-2024-07-09.csv");
    }
}
