#![no_main]

use fattura::core::*;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let mut columns = ColumnIdMap::with_width(2);
        columns.insert(1, "2.2.1.4".parse().unwrap());
        let row: Vec<CellValue> = s.split('\t').map(CellValue::from).collect();
        let (values, _) = collect(&row, &columns);
        if let Some(items) = values.get(&"2.2.1.4".parse().unwrap()) {
            assert!(!items.is_empty());
        }
    }
});
