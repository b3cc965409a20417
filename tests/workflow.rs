//! End-to-end tests for the conversion pipeline, driven through the public API.

use rust_xlsxwriter::Workbook;
use sheetconv::cleaning::{fill_missing_with_mean, remove_duplicates, select_columns};
use sheetconv::downloader::{to_csv, to_xlsx};
use sheetconv::loader::{from_csv, from_xlsx};
use sheetconv::{
    ConvertError, FileFormat, ProcessOptions, Stage, UploadedFile, Value, Visualization,
    process_batch, process_file,
};

const ORDERS: &str = "\
order,customer,amount,paid
1,acme,10.5,True
2,globex,,False
1,acme,10.5,True
3,,3.0,True
";

fn build_inventory_xlsx() -> Vec<u8> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.write_string(0, 0, "item").unwrap();
    sheet.write_string(0, 1, "qty").unwrap();
    sheet.write_string(0, 2, "price").unwrap();
    sheet.write_string(1, 0, "bolt").unwrap();
    sheet.write_number(1, 1, 100.0).unwrap();
    sheet.write_number(1, 2, 0.25).unwrap();
    sheet.write_string(2, 0, "nut").unwrap();
    sheet.write_number(2, 2, 0.1).unwrap();
    sheet.write_string(3, 0, "washer").unwrap();
    sheet.write_number(3, 1, 300.0).unwrap();
    sheet.write_number(3, 2, 0.05).unwrap();
    workbook.save_to_buffer().unwrap()
}

#[test]
fn xlsx_upload_converts_to_csv() {
    let upload = UploadedFile::new("inventory.xlsx", build_inventory_xlsx());
    let options = ProcessOptions {
        convert_to: Some(FileFormat::Csv),
        ..ProcessOptions::default()
    };
    let report = process_file(&upload, &options).unwrap();

    assert_eq!(report.format, FileFormat::Workbook);
    let artifact = report.artifact.unwrap();
    assert_eq!(artifact.file_name, "inventory.csv");
    assert_eq!(artifact.mime_type, "text/csv");
    assert_eq!(
        String::from_utf8(artifact.bytes).unwrap(),
        "item,qty,price\nbolt,100,0.25\nnut,,0.1\nwasher,300,0.05\n"
    );
}

#[test]
fn xlsx_fill_missing_uses_mean() {
    let upload = UploadedFile::new("inventory.xlsx", build_inventory_xlsx());
    let options = ProcessOptions {
        clean_data: true,
        fill_missing: true,
        ..ProcessOptions::default()
    };
    let report = process_file(&upload, &options).unwrap();
    assert_eq!(report.table.column("qty").unwrap().values[1], Value::Int(200));
}

#[test]
fn csv_round_trips_through_workbook() {
    let table = from_csv("orders.csv", ORDERS.as_bytes()).unwrap();
    let back = from_xlsx("orders.xlsx", &to_xlsx(&table).unwrap()).unwrap();
    assert_eq!(back.column_names(), table.column_names());
    assert_eq!(back, table);
    assert_eq!(to_csv(&back).unwrap(), ORDERS);
}

#[test]
fn whole_floats_stay_floats_through_workbook() {
    let csv = "price\n2.5\n3.0\n";
    let table = from_csv("prices.csv", csv.as_bytes()).unwrap();
    let back = from_xlsx("prices.xlsx", &to_xlsx(&table).unwrap()).unwrap();
    assert_eq!(
        back.column("price").unwrap().values,
        vec![Value::Float(2.5), Value::Float(3.0)]
    );
    assert_eq!(to_csv(&back).unwrap(), csv);
}

#[test]
fn csv_round_trips_byte_for_byte() {
    let table = from_csv("orders.csv", ORDERS.as_bytes()).unwrap();
    assert_eq!(to_csv(&table).unwrap(), ORDERS);
}

#[test]
fn deduplicate_twice_equals_once() {
    let table = from_csv("orders.csv", ORDERS.as_bytes()).unwrap();
    let once = remove_duplicates(&table);
    assert_eq!(once.height(), 3);
    assert_eq!(remove_duplicates(&once), once);
}

#[test]
fn fill_missing_one_null_three() {
    let table = from_csv("n.csv", b"n,label\n1,a\n,\n3,c\n").unwrap();
    let filled = fill_missing_with_mean(&table);
    assert_eq!(
        filled.column("n").unwrap().values,
        vec![Value::Int(1), Value::Int(2), Value::Int(3)]
    );
    assert_eq!(filled.column("label"), table.column("label"));
}

#[test]
fn selecting_every_column_is_identity() {
    let table = from_csv("orders.csv", ORDERS.as_bytes()).unwrap();
    let all: Vec<String> = table.column_names().iter().map(|s| s.to_string()).collect();
    assert_eq!(select_columns(&table, &all), table);
}

#[test]
fn unsupported_upload_is_skipped_without_affecting_others() {
    let uploads = vec![
        UploadedFile::new("report.txt", b"hello".to_vec()),
        UploadedFile::new("orders.csv", ORDERS.as_bytes()),
    ];
    let outcomes = process_batch(&uploads, |_| ProcessOptions {
        convert_to: Some(FileFormat::Workbook),
        ..ProcessOptions::default()
    });

    match &outcomes[0].result {
        Err(ConvertError::UnsupportedFormat { name }) => assert_eq!(name, "report.txt"),
        other => panic!("expected UnsupportedFormat, got {other:?}"),
    }
    let good = outcomes[1].result.as_ref().unwrap();
    assert_eq!(good.stages.last(), Some(&Stage::Offered));
    assert_eq!(good.artifact.as_ref().unwrap().file_name, "orders.xlsx");
}

#[test]
fn malformed_workbook_fails_only_that_file() {
    let mut truncated = build_inventory_xlsx();
    truncated.truncate(truncated.len() / 2);

    let uploads = vec![
        UploadedFile::new("broken.xlsx", truncated),
        UploadedFile::new("inventory.xlsx", build_inventory_xlsx()),
    ];
    let outcomes = process_batch(&uploads, |_| ProcessOptions::default());

    assert!(matches!(
        outcomes[0].result,
        Err(ConvertError::Parse { .. })
    ));
    assert_eq!(outcomes[1].result.as_ref().unwrap().table.height(), 3);
}

#[test]
fn chart_on_text_only_table_is_a_notice() {
    let upload = UploadedFile::new("names.csv", b"first,last\nada,lovelace\n".to_vec());
    let options = ProcessOptions {
        visualize: true,
        ..ProcessOptions::default()
    };
    let report = process_file(&upload, &options).unwrap();
    assert_eq!(
        report.visualization,
        Some(Visualization::Empty {
            message: "No numerical data available".to_string()
        })
    );
    assert!(report.stages.contains(&Stage::Visualized));
}
