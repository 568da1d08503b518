//! `.xlsx` round trips built in memory.
//!
//! Run with: `cargo test --test workbook_tests`

#![cfg(feature = "workbook")]

use fattura::core::*;
use fattura::workbook::*;
use pretty_assertions::assert_eq;
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};

const LEGEND: [&str; 11] = [
    "1 <FatturaElettronicaHeader>",
    "1.1 <DatiTrasmissione>",
    "1.1.2 <ProgressivoInvio>",
    "2 <FatturaElettronicaBody>",
    "2.1 <DatiGenerali>",
    "2.1.1 <DatiGeneraliDocumento>",
    "2.1.1.3 <Data>",
    "2.1.1.4 <Numero>",
    "2.2 <DatiBeniServizi>",
    "2.2.1 <DettaglioLinee>",
    "2.2.1.4 <Descrizione>",
];

const HEADERS: [&str; 4] = [
    "1.1.2 <ProgressivoInvio>",
    "2.1.1.3 <Data>",
    "2.1.1.4 <Numero>",
    "2.2.1.4 <Descrizione>",
];

fn legend_sheet() -> Sheet {
    let mut sheet = Sheet::new("Legenda");
    sheet.push_row(["ID e Nome", "Descrizione"]);
    for entry in LEGEND {
        sheet.push_row([entry, ""]);
    }
    sheet
}

fn data_sheet(name: &str) -> Sheet {
    let mut sheet = Sheet::new(name);
    sheet.push_row(HEADERS);
    sheet.push_row(["00001", "2024-06-15", "1", r#"["Pane","Latte"]"#]);
    sheet.push_row(["00002", "2024-06-16", "2", "Burro"]);
    sheet
}

fn single_workbook() -> Vec<u8> {
    write_sheets(&[data_sheet("Fatture"), legend_sheet()]).unwrap()
}

fn options() -> CodecOptions {
    CodecOptionsBuilder::new().representation_sheet("Legenda").build()
}

fn rows_of(bytes: &[u8], sheet: Option<&str>) -> Vec<Vec<String>> {
    let sheet = read_sheet(bytes, sheet).unwrap();
    (1..=sheet.height())
        .map(|r| {
            (1..=sheet.width())
                .map(|c| sheet.text(r, c).unwrap_or_default())
                .collect()
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

#[test]
fn sheets_are_listed_in_order() {
    assert_eq!(sheet_names(&single_workbook()).unwrap(), vec!["Fatture", "Legenda"]);
}

#[test]
fn native_cells_are_decoded() {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.write_string(0, 0, "testo").unwrap();
    worksheet.write_number(0, 1, 42.0).unwrap();
    worksheet.write_number(0, 2, 12.5).unwrap();
    worksheet.write_boolean(0, 3, true).unwrap();
    let date = ExcelDateTime::from_ymd(2024, 6, 15).unwrap();
    let format = Format::new().set_num_format("yyyy-mm-dd");
    worksheet.write_datetime_with_format(0, 4, &date, &format).unwrap();
    let bytes = workbook.save_to_buffer().unwrap();

    let sheet = read_sheet(&bytes, None).unwrap();
    assert_eq!(sheet.name(), "Sheet1");
    let texts: Vec<Option<String>> = (1..=5).map(|c| sheet.text(1, c)).collect();
    assert_eq!(
        texts,
        vec![
            Some("testo".to_string()),
            Some("42".to_string()),
            Some("12.5".to_string()),
            Some("true".to_string()),
            Some("2024-06-15".to_string()),
        ]
    );
}

#[test]
fn missing_sheet_is_a_workbook_error() {
    let err = read_sheet(&single_workbook(), Some("Nope")).unwrap_err();
    assert!(matches!(err, CodecError::Workbook(ref m) if m.contains("Nope")));

    let options = CodecOptionsBuilder::new().mapping_sheet("Nope").build();
    let err = rows_to_documents(&single_workbook(), &options).unwrap_err();
    assert!(matches!(err, CodecError::Workbook(_)));
}

// ---------------------------------------------------------------------------
// Rows to documents
// ---------------------------------------------------------------------------

#[test]
fn single_workbook_conversion() {
    let report = rows_to_documents(&single_workbook(), &options()).unwrap();
    assert!(report.rejected.is_empty());
    assert_eq!(report.documents.len(), 2);
    let first = &report.documents[0];
    assert_eq!(first.filename, "invoice_1.xml");
    assert_eq!(first.xml.matches("<DettaglioLinee>").count(), 2);
    assert!(first.xml.contains("<ProgressivoInvio>00001</ProgressivoInvio>"));
    assert!(report.documents[1].xml.contains("<Descrizione>Burro</Descrizione>"));
}

#[test]
fn three_workbook_conversion() {
    let data = write_sheets(&[data_sheet("Dati")]).unwrap();
    let mapping = write_sheets(&[data_sheet("Mappa")]).unwrap();
    let representation = write_sheets(&[legend_sheet()]).unwrap();

    let report =
        rows_to_documents_from(&data, &mapping, &representation, &CodecOptions::default()).unwrap();
    assert_eq!(report.data_rows(), 2);
    assert!(report.documents[1].xml.contains("<Numero>2</Numero>"));
}

// ---------------------------------------------------------------------------
// Documents to rows
// ---------------------------------------------------------------------------

#[test]
fn documents_flatten_into_a_new_workbook() {
    let report = rows_to_documents(&single_workbook(), &options()).unwrap();
    let docs: Vec<&str> = report.documents.iter().map(|d| d.xml.as_str()).collect();

    let output = documents_to_rows(&docs, &single_workbook(), None, &options()).unwrap();
    assert_eq!(output.sheet_name, DEFAULT_OUTPUT_SHEET);
    assert_eq!(output.appended, 2);
    assert_eq!(output.first_row, 1);
    assert!(output.failures.is_empty());
    assert_eq!(
        rows_of(&output.bytes, None),
        vec![
            vec!["00001", "2024-06-15", "1", r#"["Pane","Latte"]"#],
            vec!["00002", "2024-06-16", "2", "Burro"],
        ]
    );
}

#[test]
fn rows_are_appended_to_an_existing_workbook() {
    let mut summary = Sheet::new("Riepilogo");
    summary.push_row(["Progressivo", "Data", "Numero", "Descrizione"]);
    let other = Sheet::from_rows("Note", vec![vec!["keep me"]]);
    let existing = write_sheets(&[summary, other]).unwrap();

    let report = rows_to_documents(&single_workbook(), &options()).unwrap();
    let docs: Vec<String> = report.documents.into_iter().map(|d| d.xml).collect();
    let broken = "<FatturaElettronica>".to_string();
    let inputs = vec![docs[0].clone(), broken, docs[1].clone()];

    let output = documents_to_rows(&inputs, &single_workbook(), Some(&existing), &options()).unwrap();
    assert_eq!(output.sheet_name, "Riepilogo");
    assert_eq!(output.first_row, 2);
    assert_eq!(output.appended, 3);
    assert_eq!(output.failures.len(), 1);
    assert_eq!(output.failures[0].index, 1);

    assert_eq!(sheet_names(&output.bytes).unwrap(), vec!["Riepilogo", "Note"]);
    let rows = rows_of(&output.bytes, Some("Riepilogo"));
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[1][3], r#"["Pane","Latte"]"#);
    assert!(rows[2][0].starts_with("ERROR: "));
    assert!(rows[2][1..].iter().all(String::is_empty));
    assert_eq!(rows[3][3], "Burro");
    assert_eq!(rows_of(&output.bytes, Some("Note")), vec![vec!["keep me"]]);
}

#[test]
fn id_header_row_labels_a_new_sheet() {
    let report = rows_to_documents(&single_workbook(), &options()).unwrap();
    let docs: Vec<&str> = report.documents.iter().map(|d| d.xml.as_str()).collect();

    let labeled = CodecOptionsBuilder::new()
        .representation_sheet("Legenda")
        .id_header_row(true)
        .build();
    let output = documents_to_rows(&docs, &single_workbook(), None, &labeled).unwrap();
    assert_eq!(output.first_row, 2);
    assert_eq!(output.appended, 2);
    let rows = rows_of(&output.bytes, None);
    assert_eq!(rows[0], vec!["ID: 1.1.2", "ID: 2.1.1.3", "ID: 2.1.1.4", "ID: 2.2.1.4"]);
    assert_eq!(rows[2][3], "Burro");

    // A sheet that already has rows keeps them and gets no label row.
    let again = documents_to_rows(&docs, &single_workbook(), Some(&output.bytes), &labeled).unwrap();
    assert_eq!(again.first_row, 4);
    assert_eq!(rows_of(&again.bytes, None).len(), 5);
}

#[test]
fn named_output_sheet() {
    let report = rows_to_documents(&single_workbook(), &options()).unwrap();
    let docs: Vec<&str> = report.documents.iter().map(|d| d.xml.as_str()).collect();

    let named = CodecOptionsBuilder::new()
        .representation_sheet("Legenda")
        .output_sheet("Esportate")
        .build();
    let output = documents_to_rows(&docs, &single_workbook(), None, &named).unwrap();
    assert_eq!(output.sheet_name, "Esportate");

    let existing = write_sheets(&[Sheet::new("Altro")]).unwrap();
    let err = documents_to_rows(&docs, &single_workbook(), Some(&existing), &named).unwrap_err();
    assert!(matches!(err, CodecError::Workbook(_)));
}

#[test]
fn separate_legend_workbook_for_flattening() {
    let mapping = write_sheets(&[data_sheet("Mappa")]).unwrap();
    let representation = write_sheets(&[legend_sheet()]).unwrap();
    let report =
        rows_to_documents_from(&mapping, &mapping, &representation, &CodecOptions::default()).unwrap();
    let docs: Vec<&str> = report.documents.iter().map(|d| d.xml.as_str()).collect();

    let output =
        documents_to_rows_from(&docs, &mapping, &representation, None, &CodecOptions::default())
            .unwrap();
    assert_eq!(rows_of(&output.bytes, None)[1], vec!["00002", "2024-06-16", "2", "Burro"]);
}
