//! Field checks for generated Fattura Elettronica documents.
//!
//! [`FatturaValidator`] implements [`DocumentValidator`](crate::core::DocumentValidator)
//! and is attached to a codec with
//! [`Codec::with_validator`](crate::core::Codec::with_validator). Accepted
//! code values come from an injected [`ReferenceData`].
//!
//! # Example
//!
//! ```
//! use fattura::core::{parse_xml, DocumentValidator};
//! use fattura::validation::FatturaValidator;
//!
//! let tree = parse_xml("<FatturaElettronica><FatturaElettronicaBody>\
//!     <DatiGenerali><DatiGeneraliDocumento><Divisa>EURO</Divisa>\
//!     </DatiGeneraliDocumento></DatiGenerali></FatturaElettronicaBody></FatturaElettronica>").unwrap();
//! let errors = FatturaValidator::default().validate(&tree);
//! assert_eq!(errors.len(), 1);
//! assert_eq!(errors[0].schema_id.as_deref(), Some("2.1.1.2"));
//! ```

mod codes;
mod reference;
mod validator;

pub use codes::{
    is_known_country_code, is_known_currency_code, is_known_document_type,
    is_known_fiscal_regime, is_known_transmission_format,
};
pub use reference::ReferenceData;
pub use validator::FatturaValidator;
