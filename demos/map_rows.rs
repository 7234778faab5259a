use flexcsv::{Csv, CsvOptions, RowBinding};

#[derive(Debug, Default)]
struct Person {
    first_name: String,
    surname: String,
    age: Option<i32>,
}

fn main() -> flexcsv::Result<()> {
    println!("=== Mapping rows to structs ===\n");

    // Example 1: positional binding, no header row
    println!("1. Positional:");
    let binding = RowBinding::new()
        .bind(|p: &mut Person, v: String| p.first_name = v)
        .bind(|p: &mut Person, v: String| p.surname = v)
        .bind(|p: &mut Person, v: Option<i32>| p.age = v);

    let csv = Csv::from_string("fred,smith,41\nemily,sutland,", CsvOptions::default())?;
    for person in csv.map_rows(&binding)? {
        println!("  {:?}", person?);
    }

    // Example 2: header-name binding, case-insensitive
    println!("\n2. By header name:");
    let binding = RowBinding::new()
        .bind_named("FIRSTNAME", |p: &mut Person, v: String| p.first_name = v)
        .bind_named("surname", |p: &mut Person, v: String| p.surname = v)
        .bind_named("age", |p: &mut Person, v: Option<i32>| p.age = v);

    let options = CsvOptions {
        has_header_row: true,
        ..CsvOptions::default()
    };
    let csv = Csv::from_string("surname,firstName,age\nbloggs,joe,30\nshaw,susan,25", options)?;
    for person in csv.map_rows(&binding)? {
        println!("  {:?}", person?);
    }

    // Example 3: explicit column indices override everything else
    println!("\n3. Explicit columns:");
    let binding = RowBinding::new()
        .bind_column(2, |p: &mut Person, v: String| p.surname = v)
        .bind_column(0, |p: &mut Person, v: String| p.first_name = v);

    let csv = Csv::from_string("ada,unused,lovelace", CsvOptions::default())?;
    for person in csv.map_rows(&binding)? {
        println!("  {:?}", person?);
    }

    Ok(())
}
