use chrono::NaiveDate;
use flexcsv::{CsvBuilder, CsvValue, WriteOptions};
use rust_decimal::Decimal;

fn main() {
    println!("=== Writing CSV ===\n");

    let mut builder = CsvBuilder::new();
    builder.with_headers(["Id", "Cost", "Created", "Name"]);
    builder.add_row([
        CsvValue::Int(512),
        Decimal::new(670, 2).into(),
        NaiveDate::from_ymd_opt(2021, 5, 16)
            .unwrap()
            .and_hms_opt(13, 42, 16)
            .unwrap()
            .into(),
        "Algonquin".into(),
    ]);
    builder.add_row([
        CsvValue::Int(164323),
        CsvValue::Float(12221.23),
        CsvValue::Null,
        "Richard".into(),
    ]);

    // Example 1: default options (everything quoted, CRLF, trailing newline)
    println!("1. Default options:");
    println!("{}", builder.render(&WriteOptions::default()));

    // Example 2: minimal quoting, Unix newlines
    println!("2. Minimal quoting:");
    let minimal = WriteOptions {
        quote_all_fields: false,
        newline: "\n".to_string(),
        end_with_newline: false,
        ..WriteOptions::default()
    };
    println!("{}\n", builder.render(&minimal));

    // Example 3: tab separated with single quotes and doubled-quote escapes
    println!("3. Tab separated, single quotes:");
    let tabs = WriteOptions {
        separator: '\t',
        quote_char: '\'',
        use_backslash_escape: false,
        newline: "\n".to_string(),
        ..WriteOptions::default()
    };
    println!("{}", builder.render(&tabs));
}
