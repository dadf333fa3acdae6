//! geotab-core: Core library for geocoding tables of US addresses
//!
//! This library provides functionality to:
//! - Load address tables from CSV files or spreadsheets
//! - Tag free-text street addresses into their components
//! - Normalize street addresses into geocoding query fragments
//! - Geocode every row and annotate it with coordinates and match quality
//! - Write the annotated table back out as CSV

pub mod error;
pub mod geocoder;
pub mod normalizer;
pub mod parser;
pub mod processor;
pub mod table;
pub mod tagger;
pub mod writer;

pub use error::{Error, Result};
pub use geocoder::{GeocodeMatch, GeocodeRequest, GeocodeResponse, Geocoder, GeocoderConfig, HttpGeocoder};
pub use normalizer::normalize;
pub use parser::{load_table, parse_csv, parse_csv_str, parse_spreadsheet, AddressColumns};
pub use processor::{process, OutputColumns, ProcessReport, ProcessorOptions, RowState};
pub use table::{CellValue, Column, Row, Table};
pub use tagger::{AddressType, Component, TaggedAddress};
pub use writer::{write_csv, write_csv_to};
