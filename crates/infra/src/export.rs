//! Delimited export of inventory lines.

use std::io::{self, Write};

use rust_decimal::Decimal;

use stockrec_inventory::InventoryLine;

/// Column order of the export.
pub const EXPORT_COLUMNS: [&str; 15] = [
    "product_id",
    "name",
    "sku",
    "unit",
    "stock_initial",
    "entries",
    "exits",
    "sdu_theoretical",
    "physical_count",
    "variance",
    "cmm",
    "cmp",
    "min_stock",
    "max_stock",
    "status",
];

/// Write a header row and one row per line into `sink`, returning the sink.
pub fn write_inventory<W: Write>(sink: W, lines: &[InventoryLine], delimiter: u8) -> io::Result<W> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(sink);

    writer.write_record(EXPORT_COLUMNS)?;
    for line in lines {
        writer.write_record(row(line))?;
    }

    writer.into_inner().map_err(|e| e.into_error())
}

/// Render lines into an in-memory buffer.
pub fn export_inventory(lines: &[InventoryLine], delimiter: u8) -> io::Result<Vec<u8>> {
    write_inventory(Vec::new(), lines, delimiter)
}

fn row(line: &InventoryLine) -> [String; 15] {
    [
        line.product_id.to_string(),
        line.name.clone(),
        line.sku.clone(),
        line.unit.clone(),
        line.stock_initial.to_string(),
        line.entries.to_string(),
        line.exits.to_string(),
        line.sdu_theoretical().to_string(),
        optional(line.physical_count),
        optional(line.variance()),
        money(line.cmm),
        money(line.cmp),
        line.min_stock.to_string(),
        line.max_stock.to_string(),
        line.status().as_str().to_string(),
    ]
}

fn optional(value: Option<i64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn money(value: Decimal) -> String {
    format!("{:.2}", value.round_dp(2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockrec_core::{ProductId, WarehouseId};
    use stockrec_inventory::{PeriodCounters, StockedProduct};

    fn line(name: &str, count: Option<i64>) -> InventoryLine {
        let product =
            StockedProduct::new(ProductId::new(), name, "SKU-1", "kg", 30, 80).unwrap();
        InventoryLine::new(
            WarehouseId::new(),
            &product,
            PeriodCounters::new(50, 20, 30),
            Decimal::new(45, 0),
            Decimal::new(110, 0),
        )
        .with_physical_count(count)
    }

    #[derive(Debug)]
    struct BrokenSink;

    impl Write for BrokenSink {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink closed"))
        }
    }

    #[test]
    fn header_lists_the_columns_in_order() {
        let bytes = export_inventory(&[], b',').unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(
            text.trim_end(),
            "product_id,name,sku,unit,stock_initial,entries,exits,sdu_theoretical,physical_count,variance,cmm,cmp,min_stock,max_stock,status"
        );
    }

    #[test]
    fn counted_and_uncounted_rows() {
        let counted = line("Rice", Some(35));
        let uncounted = line("Beans, dried", None);
        let bytes = export_inventory(&[counted.clone(), uncounted.clone()], b',').unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let rows: Vec<&str> = text.lines().collect();

        assert_eq!(rows.len(), 3);
        assert_eq!(
            rows[1],
            format!("{},Rice,SKU-1,kg,50,20,30,40,35,-5,45.00,110.00,30,80,normal", counted.product_id)
        );
        assert_eq!(
            rows[2],
            format!(
                "{},\"Beans, dried\",SKU-1,kg,50,20,30,40,,,45.00,110.00,30,80,normal",
                uncounted.product_id
            )
        );
    }

    #[test]
    fn delimiter_is_configurable() {
        let bytes = export_inventory(&[line("Rice", None)], b';').unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("product_id;name;sku;"));
    }

    #[test]
    fn sink_failures_surface_as_io_errors() {
        let err = write_inventory(BrokenSink, &[line("Rice", None)], b',').unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
