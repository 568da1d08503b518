//! # fattura
//!
//! Bidirectional codec between ID-annotated spreadsheets and Fattura
//! Elettronica XML.
//!
//! A legend sheet labels schema positions with dotted numeric IDs
//! (`2.2.1.4 <Descrizione>`). From it the codec derives the element path
//! of every ID, turns each data row into one XML document, and flattens
//! documents back into fixed-width rows. Multi-valued cells are JSON
//! arrays and fan out into repeated sibling groups.
//!
//! ## Quick Start
//!
//! ```rust
//! use fattura::core::*;
//!
//! let sheet = Sheet::from_rows(
//!     "Fattura",
//!     vec![
//!         vec!["ID e Nome", ""],
//!         vec!["2 <FatturaElettronicaBody>", ""],
//!         vec!["2.2 <DatiBeniServizi>", ""],
//!         vec!["2.2.1 <DettaglioLinee>", ""],
//!         vec!["2.2.1.4 <Descrizione>", ""],
//!         vec!["2.2.1.9 <PrezzoTotale>", ""],
//!         vec!["2.2.1.4 <Descrizione>", "2.2.1.9 <PrezzoTotale>"],
//!         vec![r#"["Pane", "Latte"]"#, r#"["1.20", "0.90"]"#],
//!     ],
//! );
//!
//! let codec = Codec::from_sheet(&sheet, CodecOptions::default()).unwrap();
//! let report = codec.rows_to_documents(&sheet);
//! assert_eq!(report.documents.len(), 1);
//! assert_eq!(report.documents[0].filename, "invoice_1.xml");
//! assert_eq!(report.documents[0].xml.matches("<DettaglioLinee>").count(), 2);
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `core` (default) | Schema discovery, materialization, serialization, flattening |
//! | `workbook` (default) | `.xlsx` input and output via calamine / rust_xlsxwriter |
//! | `validation` | Fattura Elettronica field checks and code tables |
//! | `all` | Everything |

#[cfg(feature = "core")]
pub mod core;

#[cfg(feature = "workbook")]
pub mod workbook;

#[cfg(feature = "validation")]
pub mod validation;

// Re-export core types at crate root for convenience
#[cfg(feature = "core")]
pub use crate::core::*;
