//! Rule-based tagger for free-text US addresses
//!
//! Splits an address into tokens and labels each one with the address
//! component it most likely belongs to (house number, street name, street
//! type, unit, PO box, place, state, ZIP). Two entry points are provided:
//!
//! - [`tag`] groups contiguous tokens into whole components and refuses
//!   addresses where a label shows up in two separate places.
//! - [`parse`] returns the raw per-token labels and only fails when there is
//!   nothing to label.
//!
//! Commas delimit segments. The first segment is read as the street line;
//! later segments are read as unit or locality information.

use crate::error::{Error, Result};
use std::fmt;

/// Address component labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Component {
    AddressNumber,
    StreetNamePreDirectional,
    StreetName,
    StreetNamePostType,
    StreetNamePostDirectional,
    IntersectionSeparator,
    SecondStreetNamePreDirectional,
    SecondStreetName,
    SecondStreetNamePostType,
    SecondStreetNamePostDirectional,
    OccupancyType,
    OccupancyIdentifier,
    UspsBoxType,
    UspsBoxId,
    PlaceName,
    StateName,
    ZipCode,
}

impl Component {
    pub fn as_str(&self) -> &'static str {
        match self {
            Component::AddressNumber => "AddressNumber",
            Component::StreetNamePreDirectional => "StreetNamePreDirectional",
            Component::StreetName => "StreetName",
            Component::StreetNamePostType => "StreetNamePostType",
            Component::StreetNamePostDirectional => "StreetNamePostDirectional",
            Component::IntersectionSeparator => "IntersectionSeparator",
            Component::SecondStreetNamePreDirectional => "SecondStreetNamePreDirectional",
            Component::SecondStreetName => "SecondStreetName",
            Component::SecondStreetNamePostType => "SecondStreetNamePostType",
            Component::SecondStreetNamePostDirectional => "SecondStreetNamePostDirectional",
            Component::OccupancyType => "OccupancyType",
            Component::OccupancyIdentifier => "OccupancyIdentifier",
            Component::UspsBoxType => "USPSBoxType",
            Component::UspsBoxId => "USPSBoxID",
            Component::PlaceName => "PlaceName",
            Component::StateName => "StateName",
            Component::ZipCode => "ZipCode",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Overall shape of a tagged address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressType {
    StreetAddress,
    Intersection,
    PoBox,
    Ambiguous,
}

/// An address grouped into labeled components, in input order
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedAddress {
    pub components: Vec<(Component, String)>,
    pub address_type: AddressType,
}

impl TaggedAddress {
    /// Text of a component, if the address has one
    pub fn get(&self, component: Component) -> Option<&str> {
        self.components
            .iter()
            .find(|(c, _)| *c == component)
            .map(|(_, text)| text.as_str())
    }
}

/// Label every token of `address`
pub fn parse(address: &str) -> Result<Vec<(String, Component)>> {
    let tokens = tokenize(address);
    if tokens.is_empty() {
        return Err(Error::EmptyAddress);
    }

    let labels = label_tokens(&tokens);
    Ok(tokens.into_iter().map(|t| t.text).zip(labels).collect())
}

/// Group an address into components
///
/// Fails with [`Error::RepeatedLabel`] when a label occurs in two
/// non-contiguous runs, e.g. `"12 Main St 40 Oak Ave"`.
pub fn tag(address: &str) -> Result<TaggedAddress> {
    let parsed = parse(address)?;

    let mut components: Vec<(Component, String)> = Vec::new();
    for (text, label) in parsed {
        match components.last_mut() {
            Some((last, joined)) if *last == label => {
                joined.push(' ');
                joined.push_str(&text);
            }
            _ => {
                if components.iter().any(|(c, _)| *c == label) {
                    return Err(Error::RepeatedLabel {
                        label: label.to_string(),
                        address: address.to_string(),
                    });
                }
                components.push((label, text));
            }
        }
    }

    let has = |c: Component| components.iter().any(|(l, _)| *l == c);
    let address_type = if has(Component::UspsBoxType) {
        AddressType::PoBox
    } else if has(Component::IntersectionSeparator) {
        AddressType::Intersection
    } else if has(Component::AddressNumber) || has(Component::StreetName) {
        AddressType::StreetAddress
    } else {
        AddressType::Ambiguous
    };

    Ok(TaggedAddress {
        components,
        address_type,
    })
}

#[derive(Debug, Clone)]
struct Token {
    text: String,
    segment: usize,
}

fn tokenize(address: &str) -> Vec<Token> {
    address
        .split(',')
        .map(|segment| segment.split_whitespace().collect::<Vec<_>>())
        .filter(|words| !words.is_empty())
        .enumerate()
        .flat_map(|(segment, words)| {
            words.into_iter().map(move |w| Token {
                text: w.to_string(),
                segment,
            })
        })
        .collect()
}

/// Lowercased token with periods dropped, for dictionary lookups
fn key(token: &str) -> String {
    token.trim_matches('.').replace('.', "").to_lowercase()
}

const STREET_TYPES: &[&str] = &[
    "aly", "alley", "ave", "av", "avenue", "blvd", "boulevard", "cir", "circle", "ct", "court",
    "cv", "cove", "ctr", "center", "dr", "drive", "expy", "expressway", "fwy", "freeway", "hwy",
    "highway", "holw", "hollow", "ln", "lane", "loop", "pass", "path", "pike", "pkwy", "parkway",
    "pl", "place", "plz", "plaza", "pt", "point", "rd", "road", "rdg", "ridge", "row", "run", "sq",
    "square", "st", "street", "ter", "terrace", "tpke", "turnpike", "trl", "trail", "walk", "way",
    "xing", "crossing",
];

const DIRECTIONALS: &[&str] = &[
    "n", "s", "e", "w", "ne", "nw", "se", "sw", "north", "south", "east", "west", "northeast",
    "northwest", "southeast", "southwest",
];

const OCCUPANCY_TYPES: &[&str] = &[
    "apt", "apartment", "unit", "ste", "suite", "fl", "floor", "rm", "room", "bldg", "building",
    "dept", "lot", "spc", "space", "trlr",
];

const INTERSECTION_SEPARATORS: &[&str] = &["&", "and", "at", "@"];

const STATE_ABBREVIATIONS: &[&str] = &[
    "al", "ak", "az", "ar", "ca", "co", "ct", "de", "dc", "fl", "ga", "hi", "id", "il", "in", "ia",
    "ks", "ky", "la", "me", "md", "ma", "mi", "mn", "ms", "mo", "mt", "ne", "nv", "nh", "nj", "nm",
    "ny", "nc", "nd", "oh", "ok", "or", "pa", "ri", "sc", "sd", "tn", "tx", "ut", "vt", "va", "wa",
    "wv", "wi", "wy", "pr", "gu", "vi", "as", "mp",
];

const STATE_NAMES: &[&str] = &[
    "alabama", "alaska", "arizona", "arkansas", "california", "colorado", "connecticut",
    "delaware", "florida", "georgia", "hawaii", "idaho", "illinois", "indiana", "iowa", "kansas",
    "kentucky", "louisiana", "maine", "maryland", "massachusetts", "michigan", "minnesota",
    "mississippi", "missouri", "montana", "nebraska", "nevada", "ohio", "oklahoma", "oregon",
    "pennsylvania", "tennessee", "texas", "utah", "vermont", "virginia", "washington", "wisconsin",
    "wyoming",
];

const TWO_WORD_STATE_NAMES: &[&str] = &[
    "new hampshire", "new jersey", "new mexico", "new york", "north carolina", "north dakota",
    "rhode island", "south carolina", "south dakota", "west virginia", "puerto rico",
];

fn is_street_type(token: &str) -> bool {
    STREET_TYPES.contains(&key(token).as_str())
}

fn is_directional(token: &str) -> bool {
    DIRECTIONALS.contains(&key(token).as_str())
}

fn is_intersection_separator(token: &str) -> bool {
    INTERSECTION_SEPARATORS.contains(&key(token).as_str())
}

fn is_occupancy_start(token: &str) -> bool {
    token.starts_with('#') || OCCUPANCY_TYPES.contains(&key(token).as_str())
}

fn is_zip(token: &str) -> bool {
    let digits = |s: &str, n: usize| s.len() == n && s.bytes().all(|b| b.is_ascii_digit());
    match token.split_once('-') {
        Some((five, four)) => digits(five, 5) && digits(four, 4),
        None => digits(token, 5),
    }
}

fn is_state_abbreviation(token: &str) -> bool {
    token.len() == 2 && STATE_ABBREVIATIONS.contains(&key(token).as_str())
}

/// House numbers start with a digit: `123`, `123A`, `12-14`. Ordinals such
/// as `5th` are street names.
fn is_address_number(token: &str) -> bool {
    if !token.starts_with(|c: char| c.is_ascii_digit()) {
        return false;
    }
    let lower = token.to_lowercase();
    let is_ordinal = ["st", "nd", "rd", "th"].iter().any(|suffix| {
        lower
            .strip_suffix(suffix)
            .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
    });
    !is_ordinal
}

fn is_fraction(token: &str) -> bool {
    matches!(token.split_once('/'), Some((a, b))
        if !a.is_empty() && !b.is_empty()
            && a.bytes().all(|c| c.is_ascii_digit())
            && b.bytes().all(|c| c.is_ascii_digit()))
}

/// Number of tokens at `i` that spell a PO box designator, if any
fn box_prefix_len(tokens: &[Token], i: usize) -> Option<usize> {
    let word = |j: usize| tokens.get(j).map(|t| key(&t.text));
    match word(i).as_deref() {
        Some("po") | Some("pob") if word(i + 1).as_deref() == Some("box") => Some(2),
        Some("pob") => Some(1),
        Some("post") if word(i + 1).as_deref() == Some("office") && word(i + 2).as_deref() == Some("box") => {
            Some(3)
        }
        Some("box") => Some(1),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Start,
    PreStreet,
    Street,
    AfterType,
}

fn street_label(first: Component, second: Component, is_second: bool) -> Component {
    if is_second {
        second
    } else {
        first
    }
}

fn label_tokens(tokens: &[Token]) -> Vec<Component> {
    let mut labels = vec![Component::PlaceName; tokens.len()];
    let street_end = label_street(tokens, &mut labels);
    label_locality(tokens, street_end, &mut labels);
    labels
}

/// Label the street line. Returns the index of the first token left for
/// the locality pass.
fn label_street(tokens: &[Token], labels: &mut [Component]) -> usize {
    let end = tokens
        .iter()
        .position(|t| t.segment > 0)
        .unwrap_or(tokens.len());
    let line = &tokens[..end];

    let mut phase = Phase::Start;
    let mut second = false;
    let mut street_words = 0;
    let mut i = 0;

    while i < end {
        let text = line[i].text.as_str();
        let next = line.get(i + 1).map(|t| t.text.as_str());

        match phase {
            Phase::Start => {
                if let Some(n) = box_prefix_len(line, i) {
                    labels[i..i + n].fill(Component::UspsBoxType);
                    i += n;
                    if i < end {
                        labels[i] = Component::UspsBoxId;
                        i += 1;
                    }
                    return i;
                }
                if is_address_number(text) {
                    labels[i] = Component::AddressNumber;
                    i += 1;
                    if line.get(i).is_some_and(|t| is_fraction(&t.text)) {
                        labels[i] = Component::AddressNumber;
                        i += 1;
                    }
                }
                phase = Phase::PreStreet;
            }
            Phase::PreStreet => {
                street_words = 0;
                if is_directional(text) && next.is_some_and(|n| !is_street_type(n) && !is_occupancy_start(n)) {
                    labels[i] = street_label(
                        Component::StreetNamePreDirectional,
                        Component::SecondStreetNamePreDirectional,
                        second,
                    );
                    i += 1;
                }
                phase = Phase::Street;
            }
            Phase::Street => {
                if street_words > 0 {
                    if is_street_type(text) {
                        labels[i] = street_label(
                            Component::StreetNamePostType,
                            Component::SecondStreetNamePostType,
                            second,
                        );
                        i += 1;
                        phase = Phase::AfterType;
                        continue;
                    }
                    if is_locality_tail(line, i) {
                        return i;
                    }
                    if is_occupancy_start(text) {
                        i = label_occupancy(line, i, labels);
                        phase = Phase::AfterType;
                        continue;
                    }
                    if is_intersection_separator(text) {
                        labels[i] = Component::IntersectionSeparator;
                        i += 1;
                        second = true;
                        phase = Phase::PreStreet;
                        continue;
                    }
                    if is_directional(text) && next.map_or(true, is_occupancy_start) {
                        labels[i] = street_label(
                            Component::StreetNamePostDirectional,
                            Component::SecondStreetNamePostDirectional,
                            second,
                        );
                        i += 1;
                        phase = Phase::AfterType;
                        continue;
                    }
                }
                labels[i] = street_label(Component::StreetName, Component::SecondStreetName, second);
                street_words += 1;
                i += 1;
            }
            Phase::AfterType => {
                let after_type = matches!(
                    labels[i - 1],
                    Component::StreetNamePostType | Component::SecondStreetNamePostType
                );
                if after_type && is_directional(text) {
                    labels[i] = street_label(
                        Component::StreetNamePostDirectional,
                        Component::SecondStreetNamePostDirectional,
                        second,
                    );
                    i += 1;
                } else if is_locality_tail(line, i) {
                    return i;
                } else if is_occupancy_start(text) {
                    i = label_occupancy(line, i, labels);
                } else if is_intersection_separator(text) {
                    labels[i] = Component::IntersectionSeparator;
                    i += 1;
                    second = true;
                    phase = Phase::PreStreet;
                } else if is_address_number(text) && line[i + 1..].iter().any(|t| is_street_type(&t.text)) {
                    // A second full street address on the same line
                    labels[i] = Component::AddressNumber;
                    i += 1;
                    phase = Phase::PreStreet;
                } else {
                    return i;
                }
            }
        }
    }

    end
}

/// Label a unit designator at `i` and its identifier. Returns the next index.
fn label_occupancy(line: &[Token], i: usize, labels: &mut [Component]) -> usize {
    let text = line[i].text.as_str();
    if text.starts_with('#') && text.len() > 1 {
        labels[i] = Component::OccupancyIdentifier;
        return i + 1;
    }

    labels[i] = Component::OccupancyType;
    if i + 1 < line.len() {
        labels[i + 1] = Component::OccupancyIdentifier;
        return i + 2;
    }
    i + 1
}

/// True when the tokens from `i` to the end of the line are only a state
/// and/or ZIP code
fn is_locality_tail(line: &[Token], i: usize) -> bool {
    let rest: Vec<&str> = line[i..].iter().map(|t| t.text.as_str()).collect();
    let rest = match rest.split_last() {
        Some((last, init)) if is_zip(last) => init,
        _ => &rest[..],
    };
    match rest {
        [] => i < line.len(),
        [one] => is_state_abbreviation(one),
        [a, b] => TWO_WORD_STATE_NAMES.contains(&format!("{} {}", key(a), key(b)).as_str()),
        _ => false,
    }
}

/// Label everything after the street line: unit segments, place, state, ZIP
fn label_locality(tokens: &[Token], start: usize, labels: &mut [Component]) {
    let mut remaining: Vec<usize> = Vec::new();
    let mut i = start;

    while i < tokens.len() {
        let starts_segment = i == 0 || tokens[i - 1].segment != tokens[i].segment;
        if starts_segment && tokens[i].segment > 0 && is_occupancy_start(&tokens[i].text) {
            let seg_end = tokens[i..]
                .iter()
                .position(|t| t.segment != tokens[i].segment)
                .map_or(tokens.len(), |p| i + p);
            i = label_occupancy(&tokens[..seg_end], i, labels);
            continue;
        }
        remaining.push(i);
        i += 1;
    }

    if let Some(&last) = remaining.last() {
        if is_zip(&tokens[last].text) {
            labels[last] = Component::ZipCode;
            remaining.pop();
        }
    }

    let n = remaining.len();
    if n >= 3 {
        let (a, b) = (remaining[n - 2], remaining[n - 1]);
        let pair = format!("{} {}", key(&tokens[a].text), key(&tokens[b].text));
        if TWO_WORD_STATE_NAMES.contains(&pair.as_str()) {
            labels[a] = Component::StateName;
            labels[b] = Component::StateName;
            remaining.truncate(n - 2);
        }
    }

    if remaining.len() == n {
        if let Some(&last) = remaining.last() {
            let text = &tokens[last].text;
            let full_name = n > 1 && STATE_NAMES.contains(&key(text).as_str());
            if is_state_abbreviation(text) || full_name {
                labels[last] = Component::StateName;
                remaining.pop();
            }
        }
    }

    for idx in remaining {
        labels[idx] = Component::PlaceName;
    }
}
