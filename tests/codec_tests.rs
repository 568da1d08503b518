use fattura::core::*;
use pretty_assertions::assert_eq;

fn id(s: &str) -> SchemaId {
    s.parse().unwrap()
}

fn legend() -> Sheet {
    let entries = [
        "1 <FatturaElettronicaHeader>",
        "1.1 <DatiTrasmissione>",
        "1.1.1 <IdTrasmittente>",
        "1.1.1.1 <IdPaese>",
        "1.1.1.2 <IdCodice>",
        "1.1.2 <ProgressivoInvio>",
        "1.1.3 <FormatoTrasmissione>",
        "1.1.4 <CodiceDestinatario>",
        "2 <FatturaElettronicaBody>",
        "2.1 <DatiGenerali>",
        "2.1.1 <DatiGeneraliDocumento>",
        "2.1.1.1 <TipoDocumento>",
        "2.1.1.2 <Divisa>",
        "2.1.1.3 <Data>",
        "2.1.1.4 <Numero>",
        "2.1.2 <DatiOrdineAcquisto>",
        "2.1.2.1 <RiferimentoNumeroLinea>",
        "2.1.2.2 <IdDocumento>",
        "2.1.2.3 <Data>",
        "2.2 <DatiBeniServizi>",
        "2.2.1 <DettaglioLinee>",
        "2.2.1.4 <Descrizione>",
        "2.2.1.9 <PrezzoTotale>",
        "2.2.2 <DatiRiepilogo>",
        "2.2.2.1 <AliquotaIVA>",
        "2.2.2.5 <ImponibileImporto>",
    ];
    let mut sheet = Sheet::new("Rappresentazione");
    sheet.push_row(["Rappresentazione tabellare del tracciato"]);
    sheet.push_row(["ID e Nome", "Descrizione funzionale"]);
    for entry in entries {
        sheet.push_row([entry, "..."]);
    }
    sheet
}

const HEADERS: [&str; 11] = [
    "1.1.1.1 <IdPaese>",
    "1.1.1.2 <IdCodice>",
    "1.1.2 <ProgressivoInvio>",
    "2.1.1.1 <TipoDocumento>",
    "2.1.1.2 <Divisa>",
    "2.1.1.3 <Data>",
    "2.1.1.4 <Numero>",
    "2.1.2.1 <RiferimentoNumeroLinea>",
    "2.1.2.2 <IdDocumento>",
    "2.2.1.4 <Descrizione>",
    "2.2.1.9 <PrezzoTotale>",
];

fn full_row() -> [&'static str; 11] {
    [
        "IT",
        "01234567890",
        "00001",
        "TD01",
        "EUR",
        "2024-03-15",
        "42",
        r#"["1","2","3"]"#,
        r#"["PO-1","PO-2"]"#,
        r#"["Pane","Latte"]"#,
        r#"["2.50","1.20"]"#,
    ]
}

fn mapping(rows: &[[&str; 11]]) -> Sheet {
    let mut sheet = Sheet::new("Fatture");
    sheet.push_row(HEADERS);
    for row in rows {
        sheet.push_row(*row);
    }
    sheet
}

fn codec_with(options: CodecOptions) -> Codec {
    let tables = SchemaTables::from_sheets(&legend(), &mapping(&[]), &options).unwrap();
    Codec::new(tables, options).unwrap()
}

fn codec() -> Codec {
    codec_with(CodecOptions::default())
}

fn cells(row: &[&str]) -> Vec<CellValue> {
    row.iter().map(|s| CellValue::from(*s)).collect()
}

fn texts(tree: &Tree, path: &[&str]) -> Vec<String> {
    tree.select(path)
        .into_iter()
        .filter_map(|n| tree.node(n).text.clone())
        .collect()
}

// ---------------------------------------------------------------------------
// Schema tables
// ---------------------------------------------------------------------------

#[test]
fn legend_paths_follow_annotated_prefixes() {
    let codec = codec();
    let tables = codec.tables();
    assert_eq!(tables.tags.len(), 26);
    assert_eq!(
        tables.paths.path(&id("2.1.2.3")).unwrap(),
        ["FatturaElettronicaBody", "DatiGenerali", "DatiOrdineAcquisto", "Data"]
    );
    assert_eq!(tables.paths.leaf_tag(&id("1.1.1.2")), Some("IdCodice"));
}

#[test]
fn every_mapping_column_is_located() {
    let codec = codec();
    let columns = &codec.tables().columns;
    assert_eq!(columns.width(), 11);
    assert_eq!(columns.len(), 11);
    assert_eq!(columns.get(8), Some(&id("2.1.2.1")));
    assert_eq!(columns.get(11), Some(&id("2.2.1.9")));
    assert_eq!(columns.get(12), None);
}

#[test]
fn discovery_is_deterministic() {
    let a = discover(&legend()).unwrap();
    let b = discover(&legend()).unwrap();
    assert_eq!(a, b);
    assert_eq!(resolve(&a), resolve(&b));
}

#[test]
fn missing_legend_is_schema_not_found() {
    let empty = Sheet::from_rows("Vuoto", vec![vec!["nothing", "here"]]);
    let err = SchemaTables::from_sheets(&empty, &mapping(&[]), &CodecOptions::default()).unwrap_err();
    assert!(matches!(err, CodecError::SchemaNotFound(_)));
}

// ---------------------------------------------------------------------------
// Row collection
// ---------------------------------------------------------------------------

#[test]
fn broken_json_is_one_literal_value() {
    let codec = codec();
    let mut row = full_row();
    row[9] = "not-json-[broken";
    let (values, diagnostics) = collect(&cells(&row), &codec.tables().columns);
    assert_eq!(values.get(&id("2.2.1.4")).unwrap(), ["not-json-[broken"]);
    assert!(diagnostics.is_empty());
}

#[test]
fn unmapped_cells_are_reported() {
    let codec = codec();
    let mut row = cells(&full_row());
    row.push("stray".into());
    let (_, diagnostics) = codec.row_to_tree(&row);
    assert_eq!(diagnostics, vec![Diagnostic::UnmappableColumn { column: 12 }]);
}

// ---------------------------------------------------------------------------
// Materialization
// ---------------------------------------------------------------------------

#[test]
fn sibling_ids_fan_out_into_line_items() {
    let mut sheet = Sheet::new("Legenda");
    for entry in [
        "ID e Nome",
        "2 <FatturaElettronicaBody>",
        "2.2 <DatiBeniServizi>",
        "2.2.2.1 <Descrizione>",
        "2.2.2.3 <PrezzoTotale>",
    ] {
        sheet.push_row([entry]);
    }
    let tags = discover(&sheet).unwrap();
    let paths = resolve(&tags);
    let values: ValueList = [
        (id("2.2.2.1"), vec!["Widget A", "Widget B"]),
        (id("2.2.2.3"), vec!["10.00", "20.00"]),
    ]
    .into_iter()
    .collect();
    let profile = SchemaProfile::fattura();
    let (tree, diagnostics) = materialize(&values, &paths, &MaterializePolicy::new(&profile));

    assert!(diagnostics.is_empty());
    let lines = tree.select(&["FatturaElettronicaBody", "DatiBeniServizi", "DettaglioLinee"]);
    assert_eq!(lines.len(), 2);
    let line_texts = |line: NodeId| -> Vec<String> {
        tree.children(line)
            .iter()
            .filter_map(|&c| tree.node(c).text.clone())
            .collect()
    };
    assert_eq!(line_texts(lines[0]), vec!["Widget A", "10.00"]);
    assert_eq!(line_texts(lines[1]), vec!["Widget B", "20.00"]);
}

#[test]
fn references_are_zipped_against_documents() {
    let codec = codec();
    let mut row = full_row();
    row[7] = r#"["A","B","C"]"#;
    row[8] = r#"["X","Y"]"#;
    let (tree, _) = codec.row_to_tree(&cells(&row));

    let groups = tree.select(&["FatturaElettronicaBody", "DatiGenerali", "DatiOrdineAcquisto"]);
    assert_eq!(groups.len(), 2);
    let group = |i: usize, tag: &str| -> Vec<String> {
        tree.children(groups[i])
            .iter()
            .map(|&c| tree.node(c))
            .filter(|n| n.local_name() == tag)
            .filter_map(|n| n.text.clone())
            .collect()
    };
    assert_eq!(group(0, "IdDocumento"), vec!["X"]);
    assert_eq!(group(0, "RiferimentoNumeroLinea"), vec!["A"]);
    assert_eq!(group(1, "IdDocumento"), vec!["Y"]);
    assert_eq!(group(1, "RiferimentoNumeroLinea"), vec!["B", "C"]);
}

#[test]
fn blank_document_entry_does_not_shift_references() {
    let codec = codec();
    let mut row = full_row();
    row[7] = r#"["1","2","3"]"#;
    row[8] = r#"["X","","Z"]"#;
    let (tree, _) = codec.row_to_tree(&cells(&row));

    let groups = tree.select(&["FatturaElettronicaBody", "DatiGenerali", "DatiOrdineAcquisto"]);
    assert_eq!(groups.len(), 2);
    let leaves = |i: usize| -> Vec<(String, String)> {
        tree.children(groups[i])
            .iter()
            .map(|&c| tree.node(c))
            .map(|n| (n.local_name().to_string(), n.text.clone().unwrap_or_default()))
            .collect()
    };
    let pair = |tag: &str, text: &str| (tag.to_string(), text.to_string());
    assert_eq!(leaves(0), vec![pair("RiferimentoNumeroLinea", "1"), pair("IdDocumento", "X")]);
    assert_eq!(leaves(1), vec![pair("RiferimentoNumeroLinea", "3"), pair("IdDocumento", "Z")]);
}

#[test]
fn document_header_comes_first_in_general_data() {
    let (tree, _) = codec().row_to_tree(&cells(&full_row()));
    let general = tree.select(&["FatturaElettronicaBody", "DatiGenerali"])[0];
    let names: Vec<&str> = tree
        .children(general)
        .iter()
        .map(|&c| tree.node(c).local_name())
        .collect();
    assert_eq!(
        names,
        vec!["DatiGeneraliDocumento", "DatiOrdineAcquisto", "DatiOrdineAcquisto"]
    );
    let root: Vec<&str> = tree
        .children(tree.root())
        .iter()
        .map(|&c| tree.node(c).local_name())
        .collect();
    assert_eq!(root, vec!["FatturaElettronicaHeader", "FatturaElettronicaBody"]);
}

#[test]
fn mandatory_defaults_are_inserted_on_request() {
    let options = CodecOptionsBuilder::new().enforce_mandatory_fields(true).build();
    let mut row = full_row();
    row[0] = "";
    let (tree, diagnostics) = codec_with(options).row_to_tree(&cells(&row));
    assert_eq!(
        texts(&tree, &["FatturaElettronicaHeader", "DatiTrasmissione", "FormatoTrasmissione"]),
        vec!["FPR12"]
    );
    assert_eq!(
        texts(&tree, &["FatturaElettronicaHeader", "DatiTrasmissione", "CodiceDestinatario"]),
        vec!["0000000"]
    );
    assert_eq!(diagnostics.len(), 2);
    assert!(diagnostics.iter().all(|d| !d.is_lossy()));
}

// ---------------------------------------------------------------------------
// Serialization
// ---------------------------------------------------------------------------

#[test]
fn full_document_snapshot() {
    let (xml, diagnostics) = codec().convert_row(&cells(&full_row())).unwrap();
    assert!(diagnostics.is_empty());
    insta::assert_snapshot!(xml, @r#"
    <?xml version="1.0" encoding="UTF-8"?>
    <FatturaElettronica xmlns="http://ivaservizi.agenziaentrate.gov.it/docs/xsd/fatture/v1.2" versione="FPR12">
      <FatturaElettronicaHeader>
        <DatiTrasmissione>
          <IdTrasmittente>
            <IdPaese>IT</IdPaese>
            <IdCodice>01234567890</IdCodice>
          </IdTrasmittente>
          <ProgressivoInvio>00001</ProgressivoInvio>
        </DatiTrasmissione>
      </FatturaElettronicaHeader>
      <FatturaElettronicaBody>
        <DatiGenerali>
          <DatiGeneraliDocumento>
            <TipoDocumento>TD01</TipoDocumento>
            <Divisa>EUR</Divisa>
            <Data>2024-03-15</Data>
            <Numero>42</Numero>
          </DatiGeneraliDocumento>
          <DatiOrdineAcquisto>
            <RiferimentoNumeroLinea>1</RiferimentoNumeroLinea>
            <IdDocumento>PO-1</IdDocumento>
          </DatiOrdineAcquisto>
          <DatiOrdineAcquisto>
            <RiferimentoNumeroLinea>2</RiferimentoNumeroLinea>
            <RiferimentoNumeroLinea>3</RiferimentoNumeroLinea>
            <IdDocumento>PO-2</IdDocumento>
          </DatiOrdineAcquisto>
        </DatiGenerali>
        <DatiBeniServizi>
          <DettaglioLinee>
            <Descrizione>Pane</Descrizione>
            <PrezzoTotale>2.50</PrezzoTotale>
          </DettaglioLinee>
          <DettaglioLinee>
            <Descrizione>Latte</Descrizione>
            <PrezzoTotale>1.20</PrezzoTotale>
          </DettaglioLinee>
        </DatiBeniServizi>
      </FatturaElettronicaBody>
    </FatturaElettronica>
    "#);
}

#[test]
fn reset_sections_mode_without_declaration() {
    let options = CodecOptionsBuilder::new()
        .namespace_mode(NamespaceMode::ResetSections)
        .include_xml_declaration(false)
        .build();
    let (xml, _) = codec_with(options).convert_row(&cells(&full_row())).unwrap();
    assert!(xml.starts_with("<FatturaElettronica "));
    assert!(xml.contains("<FatturaElettronicaHeader xmlns=\"\">"));
    assert!(xml.contains("<FatturaElettronicaBody xmlns=\"\">"));
    assert!(!xml.contains("<DatiGenerali xmlns"));
}

#[test]
fn special_characters_survive_serialization() {
    let mut row = full_row();
    row[9] = r#"["Vino \"rosso\" & bianco","<Latte>"]"#;
    let codec = codec();
    let (xml, _) = codec.convert_row(&cells(&row)).unwrap();
    assert!(xml.contains("&amp;"));
    let back = codec.document_to_row(&xml).unwrap();
    assert_eq!(back[9], r#"["Vino \"rosso\" & bianco","<Latte>"]"#);
}

// ---------------------------------------------------------------------------
// Batch conversion and flattening
// ---------------------------------------------------------------------------

#[test]
fn batch_names_documents_by_data_row() {
    let mut second = full_row();
    second[6] = "43";
    let sheet = mapping(&[full_row(), [""; 11], second]);
    let options = CodecOptionsBuilder::new().filename_prefix("fattura_").build();
    let report = codec_with(options).rows_to_documents(&sheet);

    assert!(report.rejected.is_empty());
    let names: Vec<(usize, &str)> = report
        .documents
        .iter()
        .map(|d| (d.row, d.filename.as_str()))
        .collect();
    assert_eq!(names, vec![(2, "fattura_1.xml"), (4, "fattura_2.xml")]);
    assert!(report.documents[1].xml.contains("<Numero>43</Numero>"));
}

#[test]
fn flattening_restores_the_row() {
    let codec = codec();
    let (xml, _) = codec.convert_row(&cells(&full_row())).unwrap();
    let row = codec.document_to_row(&xml).unwrap();
    assert_eq!(row, full_row().to_vec());
}

#[test]
fn flattening_a_foreign_document_fills_known_columns() {
    let xml = r#"<p:FatturaElettronica xmlns:p="urn:x">
        <FatturaElettronicaBody>
          <DatiGenerali>
            <DatiGeneraliDocumento><Numero> 7 </Numero><Causale>ignored</Causale></DatiGeneraliDocumento>
          </DatiGenerali>
        </FatturaElettronicaBody>
      </p:FatturaElettronica>"#;
    let row = codec().document_to_row(xml).unwrap();
    let mut expected = vec![String::new(); 11];
    expected[6] = "7".into();
    assert_eq!(row, expected);
}

#[test]
fn concurrent_rows_match_sequential_output() {
    let codec = codec();
    let rows: Vec<Vec<CellValue>> = (1..=8)
        .map(|n| {
            let mut row = cells(&full_row());
            row[6] = CellValue::Number(n as f64);
            row
        })
        .collect();
    let sequential: Vec<String> = rows
        .iter()
        .map(|r| codec.convert_row(r).unwrap().0)
        .collect();

    let shared = &codec;
    let parallel: Vec<String> = std::thread::scope(|scope| {
        let handles: Vec<_> = rows
            .iter()
            .map(|r| scope.spawn(move || shared.convert_row(r).unwrap().0))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(parallel, sequential);
    assert!(sequential[7].contains("<Numero>8</Numero>"));
}
