use std::io::Write;

use flexcsv::{Csv, CsvOptions, RowBinding};
use tempfile::NamedTempFile;

fn write_temp(bytes: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(bytes).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn open_reads_a_plain_file() {
    let file = write_temp(b"10/02/2020,A573,Beverage,Yes,1\n11/02/2020,A584,\"Beverage, other\",Yes,1");

    let csv = Csv::open(file.path()).unwrap();
    let rows = csv.all_rows().unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0], vec!["10/02/2020", "A573", "Beverage", "Yes", "1"]);
    assert_eq!(
        rows[1],
        vec!["11/02/2020", "A584", "Beverage, other", "Yes", "1"]
    );
}

#[test]
fn open_skips_a_utf8_bom() {
    let mut bytes = vec![0xEF, 0xBB, 0xBF];
    bytes.extend_from_slice(b"name,count\nonion,3");
    let file = write_temp(&bytes);

    let options = CsvOptions {
        has_header_row: true,
        ..CsvOptions::default()
    };
    let csv = Csv::open_with(file.path(), options).unwrap();

    assert_eq!(csv.header_row().unwrap(), ["name", "count"]);
    assert_eq!(csv.all_rows().unwrap(), vec![vec!["onion", "3"]]);
}

#[test]
fn open_detects_a_utf16_bom() {
    let mut bytes = vec![0xFF, 0xFE];
    bytes.extend("id,città\n7,Roma".encode_utf16().flat_map(u16::to_le_bytes));
    let file = write_temp(&bytes);

    let options = CsvOptions {
        has_header_row: true,
        ..CsvOptions::default()
    };
    let csv = Csv::open_with(file.path(), options).unwrap();

    assert_eq!(csv.header_row().unwrap(), ["id", "città"]);
    assert_eq!(csv.all_rows().unwrap(), vec![vec!["7", "Roma"]]);
}

#[test]
fn pipe_separated_file_with_quotes_maps_to_structs() {
    let file = write_temp(
        b"id|adjustment|type\n1|-5.67|NQS\n2|3.257|\"EDG \"\"Any\"\"\"\n3|1.5|plain",
    );

    #[derive(Debug, Default)]
    struct Adjustment {
        id: i32,
        adjustment: rust_decimal::Decimal,
        kind: String,
    }

    let options = CsvOptions {
        separator: '|',
        has_header_row: true,
        ..CsvOptions::default()
    };
    let csv = Csv::open_with(file.path(), options).unwrap();

    let binding = RowBinding::new()
        .bind_named("id", |a: &mut Adjustment, v: i32| a.id = v)
        .bind_named("adjustment", |a: &mut Adjustment, v: rust_decimal::Decimal| {
            a.adjustment = v
        })
        .bind_named("type", |a: &mut Adjustment, v: String| a.kind = v);

    let values: Vec<Adjustment> = csv
        .map_rows(&binding)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(values.len(), 3);
    assert_eq!(values[0].id, 1);
    assert_eq!(values[0].adjustment, rust_decimal::Decimal::new(-567, 2));
    assert_eq!(values[0].kind, "NQS");
    assert_eq!(values[1].kind, "EDG \"Any\"");
}

#[test]
fn file_sessions_support_repeated_passes() {
    let file = write_temp(b"1,2\n3,4");
    let csv = Csv::open(file.path()).unwrap();

    let first = csv.all_rows().unwrap();
    let second = csv.all_rows().unwrap();
    assert_eq!(first, second);
    assert_eq!(first, vec![vec!["1", "2"], vec!["3", "4"]]);
}
