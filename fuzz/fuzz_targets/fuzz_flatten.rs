#![no_main]

use fattura::core::*;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(tree) = parse_xml(s) {
            let tags: IdTagTable = vec![
                ("2".parse::<SchemaId>().unwrap(), "FatturaElettronicaBody"),
                ("2.2".parse().unwrap(), "DatiBeniServizi"),
                ("2.2.1".parse().unwrap(), "DettaglioLinee"),
                ("2.2.1.4".parse().unwrap(), "Descrizione"),
            ]
            .into_iter()
            .collect();
            let mut columns = ColumnIdMap::with_width(2);
            columns.insert(1, "2.2.1.4".parse().unwrap());
            let row = flatten(&tree, &resolve(&tags), &columns, 2);
            assert_eq!(row.len(), 2);
        }
    }
});
