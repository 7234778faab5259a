use flexcsv::{Csv, CsvOptions};

fn main() -> flexcsv::Result<()> {
    println!("=== Reading CSV dialects ===\n");

    // Example 1: plain comma-separated data
    println!("1. Comma separated:");
    let csv = Csv::from_string("a string, another one,1.433,simple\nsecond,row,42.5,done", CsvOptions::default())?;
    for row in csv.rows() {
        println!("  {:?}", row?.values());
    }

    // Example 2: header row with typed access
    println!("\n2. Header row and typed getters:");
    let options = CsvOptions {
        has_header_row: true,
        ..CsvOptions::default()
    };
    let csv = Csv::from_string("name,time\nsue,16\nbob,17", options)?;
    println!("  header: {:?}", csv.header_row()?);
    for row in csv.rows() {
        let row = row?;
        println!("  {} -> {}", row.get_string(0)?, row.get_i32(1)?);
    }

    // Example 3: pipe separated with single-quote quoting
    println!("\n3. Custom dialect (pipe separator, single quotes):");
    let options = CsvOptions {
        separator: '|',
        quote_char: '\'',
        ..CsvOptions::default()
    };
    let csv = Csv::from_string("1|'EDG ''Any'''|-5.67\n2|plain|3.257", options)?;
    for row in csv.rows() {
        println!("  {:?}", row?.values());
    }

    // Example 4: backslash-escaped quotes
    println!("\n4. Backslash escapes:");
    let options = CsvOptions {
        backslash_escapes_quotes: true,
        ..CsvOptions::default()
    };
    let csv = Csv::from_string("\"quote \\\"and\\\" more\",second", options)?;
    for row in csv.rows() {
        println!("  {:?}", row?.values());
    }

    Ok(())
}
