//! Row processor: normalize, geocode and annotate every row of a table
//!
//! Each row ends in exactly one [`RowState`]. Failures are contained per
//! row, so one bad address never stops the run and the table keeps its
//! row count and order.

use crate::error::{Error, Result};
use crate::geocoder::{GeocodeRequest, GeocodeResponse, Geocoder};
use crate::normalizer::normalize;
use crate::parser::AddressColumns;
use crate::table::{CellValue, Table};
use tracing::{debug, info, warn};

/// Default number of rows between progress notices
pub const PROGRESS_INTERVAL: usize = 49;

/// Placeholder coordinate written before processing
pub const SENTINEL_COORDINATE: f64 = 9.99991;
pub const SENTINEL_ADDRESS_SENT: &str = "address sent";
pub const SENTINEL_LOCATION_TYPE: &str = "unprocessed";
pub const SENTINEL_ADDRESS_RETURNED: &str = "address returned";

/// Indices of the columns the processor writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputColumns {
    pub new_lat: usize,
    pub new_lon: usize,
    pub address_sent: usize,
    pub location_type: usize,
    pub address_returned: usize,
}

impl OutputColumns {
    pub const NEW_LAT: &'static str = "NewLat";
    pub const NEW_LON: &'static str = "NewLon";
    pub const ADDRESS_SENT: &'static str = "address_sent";
    pub const LOCATION_TYPE: &'static str = "location_type";
    pub const ADDRESS_RETURNED: &'static str = "address_returned";

    /// Add the output columns (or reset existing ones) with sentinel values
    pub fn initialize(table: &mut Table) -> Self {
        let text = |s: &str| CellValue::String(s.to_string());
        Self {
            new_lat: table.set_column(Self::NEW_LAT, CellValue::Float(SENTINEL_COORDINATE)),
            new_lon: table.set_column(Self::NEW_LON, CellValue::Float(SENTINEL_COORDINATE)),
            address_sent: table.set_column(Self::ADDRESS_SENT, text(SENTINEL_ADDRESS_SENT)),
            location_type: table.set_column(Self::LOCATION_TYPE, text(SENTINEL_LOCATION_TYPE)),
            address_returned: table.set_column(Self::ADDRESS_RETURNED, text(SENTINEL_ADDRESS_RETURNED)),
        }
    }
}

/// Terminal state of one row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowState {
    /// All output fields hold the service's answer
    Succeeded,
    /// Coordinates zeroed, returned address empty
    NoMatch,
    /// Output fields left where they were when the failure happened
    Errored,
}

/// Processor settings
#[derive(Debug, Clone, Copy)]
pub struct ProcessorOptions {
    /// Emit a progress notice for each row that did not error and whose
    /// `index % progress_interval == 0`
    pub progress_interval: usize,
}

impl Default for ProcessorOptions {
    fn default() -> Self {
        Self {
            progress_interval: PROGRESS_INTERVAL,
        }
    }
}

/// What happened to each row during a run
#[derive(Debug, Clone, Default)]
pub struct ProcessReport {
    /// One state per row, in table order
    pub states: Vec<RowState>,
    pub progress_notices: usize,
}

impl ProcessReport {
    pub fn count(&self, state: RowState) -> usize {
        self.states.iter().filter(|s| **s == state).count()
    }

    pub fn succeeded(&self) -> usize {
        self.count(RowState::Succeeded)
    }

    pub fn no_match(&self) -> usize {
        self.count(RowState::NoMatch)
    }

    pub fn errored(&self) -> usize {
        self.count(RowState::Errored)
    }
}

/// Geocode every row of `table` in place
///
/// Only a missing required column fails the call; row-level errors are
/// logged and recorded as [`RowState::Errored`].
pub fn process<G: Geocoder + ?Sized>(
    table: &mut Table,
    geocoder: &G,
    options: &ProcessorOptions,
) -> Result<ProcessReport> {
    let input = AddressColumns::resolve(table)?;
    let output = OutputColumns::initialize(table);
    let interval = options.progress_interval.max(1);

    let mut report = ProcessReport {
        states: Vec::with_capacity(table.row_count()),
        progress_notices: 0,
    };

    for index in 0..table.row_count() {
        let state = match process_row(table, index, &input, &output, geocoder) {
            Ok(state) => {
                // errored rows never reach the notice
                if index % interval == 0 {
                    info!("Done with {} records.", index + 1);
                    report.progress_notices += 1;
                }
                state
            }
            Err(e) => {
                let street = table
                    .cell(index, input.street)
                    .map(CellValue::to_string_value)
                    .unwrap_or_default();
                warn!("There was a problem with: {}: {}", street, e);
                RowState::Errored
            }
        };
        report.states.push(state);
    }

    info!(
        "Processed {} rows: {} succeeded, {} no match, {} errored",
        report.states.len(),
        report.succeeded(),
        report.no_match(),
        report.errored()
    );

    Ok(report)
}

fn process_row<G: Geocoder + ?Sized>(
    table: &mut Table,
    index: usize,
    input: &AddressColumns,
    output: &OutputColumns,
    geocoder: &G,
) -> Result<RowState> {
    let street = required_text(table, index, input.street, AddressColumns::STREET)?;
    let city = required_text(table, index, input.city, AddressColumns::CITY)?;

    // Zip is deliberately left out; the state filter bounds the search
    let address = format!("{},{}", normalize(&street), city).replace(' ', "+");
    table.set_cell(index, output.address_sent, CellValue::String(address.clone()));

    let state = required_text(table, index, input.state, AddressColumns::STATE)?;
    let request = GeocodeRequest::new(address, state);

    match geocoder.geocode(&request)? {
        GeocodeResponse::Match(found) => {
            table.set_cell(index, output.address_returned, CellValue::String(found.formatted_address));
            table.set_cell(index, output.location_type, CellValue::String(found.location_type));
            table.set_cell(index, output.new_lat, CellValue::Float(found.lat));
            table.set_cell(index, output.new_lon, CellValue::Float(found.lng));
            Ok(RowState::Succeeded)
        }
        GeocodeResponse::NoMatch {
            status,
            error_message,
        } => {
            debug!(
                "no match for '{}': {}{}",
                request.address,
                status,
                error_message.map(|m| format!(" ({})", m)).unwrap_or_default()
            );
            // location_type keeps its sentinel
            table.set_cell(index, output.address_returned, CellValue::String(String::new()));
            table.set_cell(index, output.new_lat, CellValue::Float(0.0));
            table.set_cell(index, output.new_lon, CellValue::Float(0.0));
            Ok(RowState::NoMatch)
        }
    }
}

fn required_text(table: &Table, row: usize, col: usize, column: &str) -> Result<String> {
    match table.cell(row, col) {
        Some(cell) if !cell.is_empty() => Ok(cell.to_string_value()),
        _ => Err(Error::MissingField {
            column: column.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geocoder::GeocodeMatch;
    use crate::parser::parse_csv_str;
    use std::cell::RefCell;

    struct FakeGeocoder<F> {
        respond: F,
        requests: RefCell<Vec<GeocodeRequest>>,
    }

    impl<F> FakeGeocoder<F>
    where
        F: Fn(&GeocodeRequest) -> Result<GeocodeResponse>,
    {
        fn new(respond: F) -> Self {
            Self {
                respond,
                requests: RefCell::new(Vec::new()),
            }
        }
    }

    impl<F> Geocoder for FakeGeocoder<F>
    where
        F: Fn(&GeocodeRequest) -> Result<GeocodeResponse>,
    {
        fn geocode(&self, request: &GeocodeRequest) -> Result<GeocodeResponse> {
            self.requests.borrow_mut().push(request.clone());
            (self.respond)(request)
        }
    }

    fn springfield_match() -> GeocodeResponse {
        GeocodeResponse::Match(GeocodeMatch {
            formatted_address: "123 Main St, Springfield, IL".to_string(),
            location_type: "ROOFTOP".to_string(),
            lat: 39.8,
            lng: -89.6,
        })
    }

    fn zero_results() -> GeocodeResponse {
        GeocodeResponse::NoMatch {
            status: "ZERO_RESULTS".to_string(),
            error_message: None,
        }
    }

    fn single_row_table() -> Table {
        parse_csv_str(
            "Street,City,State,Zip\n123 Main St,Springfield,IL,62701\n",
            "test.csv",
        )
        .unwrap()
    }

    fn cell(table: &Table, row: usize, name: &str) -> CellValue {
        let col = table.find_column(name).unwrap().index;
        table.cell(row, col).unwrap().clone()
    }

    fn text(s: &str) -> CellValue {
        CellValue::String(s.to_string())
    }

    #[test]
    fn test_successful_row() {
        let mut table = single_row_table();
        let geocoder = FakeGeocoder::new(|_| Ok(springfield_match()));

        let report = process(&mut table, &geocoder, &ProcessorOptions::default()).unwrap();

        assert_eq!(report.states, vec![RowState::Succeeded]);
        assert_eq!(cell(&table, 0, "address_sent"), text("123+Main+St,Springfield"));
        assert_eq!(cell(&table, 0, "address_returned"), text("123 Main St, Springfield, IL"));
        assert_eq!(cell(&table, 0, "location_type"), text("ROOFTOP"));
        assert_eq!(cell(&table, 0, "NewLat"), CellValue::Float(39.8));
        assert_eq!(cell(&table, 0, "NewLon"), CellValue::Float(-89.6));

        let requests = geocoder.requests.borrow();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0], GeocodeRequest::new("123+Main+St,Springfield", "IL"));
    }

    #[test]
    fn test_city_spaces_become_plus() {
        let mut table = parse_csv_str(
            "Street,City,State,Zip\n9 Elm Ave,East Peoria,IL,61611\n",
            "test.csv",
        )
        .unwrap();
        let geocoder = FakeGeocoder::new(|_| Ok(zero_results()));

        process(&mut table, &geocoder, &ProcessorOptions::default()).unwrap();

        assert_eq!(cell(&table, 0, "address_sent"), text("9+Elm+Ave,East+Peoria"));
    }

    #[test]
    fn test_no_match_zeroes_coordinates() {
        let mut table = single_row_table();
        let geocoder = FakeGeocoder::new(|_| Ok(zero_results()));

        let report = process(&mut table, &geocoder, &ProcessorOptions::default()).unwrap();

        assert_eq!(report.states, vec![RowState::NoMatch]);
        assert_eq!(cell(&table, 0, "NewLat"), CellValue::Float(0.0));
        assert_eq!(cell(&table, 0, "NewLon"), CellValue::Float(0.0));
        assert_eq!(cell(&table, 0, "address_returned"), text(""));
        assert_eq!(cell(&table, 0, "address_sent"), text("123+Main+St,Springfield"));
        assert_eq!(cell(&table, 0, "location_type"), text(SENTINEL_LOCATION_TYPE));
    }

    #[test]
    fn test_geocoder_error_keeps_sentinels_but_records_sent_address() {
        let mut table = single_row_table();
        let geocoder =
            FakeGeocoder::new(|_| Err(Error::MalformedResponse("connection reset".to_string())));

        let report = process(&mut table, &geocoder, &ProcessorOptions::default()).unwrap();

        assert_eq!(report.states, vec![RowState::Errored]);
        assert_eq!(cell(&table, 0, "NewLat"), CellValue::Float(SENTINEL_COORDINATE));
        assert_eq!(cell(&table, 0, "NewLon"), CellValue::Float(SENTINEL_COORDINATE));
        assert_eq!(cell(&table, 0, "location_type"), text(SENTINEL_LOCATION_TYPE));
        assert_eq!(cell(&table, 0, "address_returned"), text(SENTINEL_ADDRESS_RETURNED));
        assert_eq!(cell(&table, 0, "address_sent"), text("123+Main+St,Springfield"));
    }

    #[test]
    fn test_missing_street_errors_before_sending() {
        let mut table = parse_csv_str(
            "Street,City,State,Zip\n,Springfield,IL,62701\n",
            "test.csv",
        )
        .unwrap();
        let geocoder = FakeGeocoder::new(|_| Ok(springfield_match()));

        let report = process(&mut table, &geocoder, &ProcessorOptions::default()).unwrap();

        assert_eq!(report.states, vec![RowState::Errored]);
        assert_eq!(cell(&table, 0, "address_sent"), text(SENTINEL_ADDRESS_SENT));
        assert!(geocoder.requests.borrow().is_empty());
    }

    #[test]
    fn test_missing_state_errors_after_recording_sent_address() {
        let mut table = parse_csv_str(
            "Street,City,State,Zip\n123 Main St,Springfield,,62701\n",
            "test.csv",
        )
        .unwrap();
        let geocoder = FakeGeocoder::new(|_| Ok(springfield_match()));

        let report = process(&mut table, &geocoder, &ProcessorOptions::default()).unwrap();

        assert_eq!(report.states, vec![RowState::Errored]);
        assert_eq!(cell(&table, 0, "address_sent"), text("123+Main+St,Springfield"));
        assert_eq!(cell(&table, 0, "NewLat"), CellValue::Float(SENTINEL_COORDINATE));
        assert!(geocoder.requests.borrow().is_empty());
    }

    #[test]
    fn test_mixed_outcomes_preserve_rows_and_order() {
        let mut table = parse_csv_str(
            "Street,City,State,Zip\n\
             123 Main St,Springfield,IL,62701\n\
             1 Nowhere Rd,Gone,IL,60000\n\
             5 Broken Way,Oops,IL,60001\n\
             123 Main St,Springfield,IL,62701\n",
            "test.csv",
        )
        .unwrap();
        let geocoder = FakeGeocoder::new(|req: &GeocodeRequest| {
            if req.address.starts_with("1+Nowhere") {
                Ok(zero_results())
            } else if req.address.starts_with("5+Broken") {
                Err(Error::MalformedResponse("bad".to_string()))
            } else {
                Ok(springfield_match())
            }
        });

        let report = process(&mut table, &geocoder, &ProcessorOptions::default()).unwrap();

        assert_eq!(table.row_count(), 4);
        assert_eq!(
            report.states,
            vec![
                RowState::Succeeded,
                RowState::NoMatch,
                RowState::Errored,
                RowState::Succeeded
            ]
        );
        assert_eq!(cell(&table, 1, "Street"), text("1 Nowhere Rd"));
        assert_eq!(cell(&table, 2, "Street"), text("5 Broken Way"));
        // duplicate addresses are looked up again
        assert_eq!(geocoder.requests.borrow().len(), 4);
        assert_eq!((report.succeeded(), report.no_match(), report.errored()), (2, 1, 1));
    }

    #[test]
    fn test_zip_passes_through_untouched() {
        let mut table = parse_csv_str(
            "Street,City,State,Zip\n1 Beacon St,Boston,MA,02108\n",
            "test.csv",
        )
        .unwrap();
        let geocoder = FakeGeocoder::new(|_| Ok(zero_results()));

        process(&mut table, &geocoder, &ProcessorOptions::default()).unwrap();

        assert_eq!(cell(&table, 0, "Zip"), text("02108"));
        assert!(!geocoder.requests.borrow()[0].address.contains("02108"));
    }

    fn hundred_row_table() -> Table {
        let mut csv = String::from("Street,City,State,Zip\n");
        for i in 0..100 {
            csv.push_str(&format!("{} Main St,Springfield,IL,62701\n", i + 1));
        }
        parse_csv_str(&csv, "test.csv").unwrap()
    }

    #[test]
    fn test_progress_every_49_rows() {
        let mut table = hundred_row_table();
        let geocoder = FakeGeocoder::new(|_| Ok(zero_results()));

        let report = process(&mut table, &geocoder, &ProcessorOptions::default()).unwrap();

        assert_eq!(report.states.len(), 100);
        assert_eq!(report.progress_notices, 3);
    }

    #[test]
    fn test_errored_row_skips_progress_notice() {
        let mut table = hundred_row_table();
        let geocoder = FakeGeocoder::new(|req: &GeocodeRequest| {
            if req.address.starts_with("50+") {
                Err(Error::MalformedResponse("bad".to_string()))
            } else {
                Ok(zero_results())
            }
        });

        let report = process(&mut table, &geocoder, &ProcessorOptions::default()).unwrap();

        assert_eq!(report.states.len(), 100);
        assert_eq!(report.states[49], RowState::Errored);
        assert_eq!(report.progress_notices, 2);
    }

    #[test]
    fn test_custom_progress_interval() {
        let mut table = single_row_table();
        let geocoder = FakeGeocoder::new(|_| Ok(zero_results()));
        let options = ProcessorOptions {
            progress_interval: 0,
        };

        let report = process(&mut table, &geocoder, &options).unwrap();
        assert_eq!(report.progress_notices, 1);
    }

    #[test]
    fn test_missing_column_is_fatal() {
        let mut table = parse_csv_str("Street,City,Zip\n123 Main St,Springfield,62701\n", "test.csv").unwrap();
        let geocoder = FakeGeocoder::new(|_| Ok(springfield_match()));

        let result = process(&mut table, &geocoder, &ProcessorOptions::default());
        assert!(matches!(result, Err(Error::MissingColumn { .. })));
        assert!(geocoder.requests.borrow().is_empty());
    }

    #[test]
    fn test_rerun_resets_existing_output_columns() {
        let mut table = parse_csv_str(
            "Street,City,State,Zip,NewLat\n123 Main St,Springfield,IL,62701,1.5\n",
            "test.csv",
        )
        .unwrap();
        let geocoder = FakeGeocoder::new(|_| Err(Error::MalformedResponse("bad".to_string())));

        process(&mut table, &geocoder, &ProcessorOptions::default()).unwrap();

        assert_eq!(table.column_count(), 9);
        assert_eq!(cell(&table, 0, "NewLat"), CellValue::Float(SENTINEL_COORDINATE));
    }
}
