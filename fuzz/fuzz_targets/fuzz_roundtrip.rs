#![no_main]

use fattura::core::*;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // Legend tags are not checked as XML names, so parsing the output may
        // fail; no stage may panic.
        let legend = Sheet::from_rows("Legenda", s.lines().map(|l| vec![l]));
        let Ok(tags) = discover(&legend) else {
            return;
        };
        let paths = resolve(&tags);
        let profile = SchemaProfile::fattura();
        let values: ValueList = tags.iter().map(|(id, tag)| (id.clone(), vec![tag])).collect();
        let (tree, _) = materialize(&values, &paths, &MaterializePolicy::new(&profile));
        if let Ok(xml) = serialize(&tree, &SerializeOptions::default()) {
            let _ = parse_xml(&xml);
        }
    }
});
