//! Static town -> region lookup for the 26 HDB towns present in the resale
//! extracts from March 2012 onward. Pure function, no I/O; towns outside the
//! table map to "Unknown", which downstream treats as a valid category.

pub const UNKNOWN_CATEGORY: &str = "Unknown";

pub fn category_of(town: &str) -> &'static str {
    match town {
        "BISHAN" | "BUKIT MERAH" | "BUKIT TIMAH" | "CENTRAL AREA" | "GEYLANG"
        | "KALLANG/WHAMPOA" | "MARINE PARADE" | "QUEENSTOWN" | "TOA PAYOH" => "Central",
        "BEDOK" | "PASIR RIS" | "TAMPINES" => "East",
        "SEMBAWANG" | "WOODLANDS" | "YISHUN" => "North",
        "ANG MO KIO" | "HOUGANG" | "PUNGGOL" | "SENGKANG" | "SERANGOON" => "North-East",
        "BUKIT BATOK" | "BUKIT PANJANG" | "CHOA CHU KANG" | "CLEMENTI" | "JURONG EAST"
        | "JURONG WEST" => "West",
        _ => UNKNOWN_CATEGORY,
    }
}

/// All towns the default catalog expects, in lexical order. The loader and
/// aggregator use the count of this set as the cardinality contract.
pub const KNOWN_TOWNS: [&str; 26] = [
    "ANG MO KIO",
    "BEDOK",
    "BISHAN",
    "BUKIT BATOK",
    "BUKIT MERAH",
    "BUKIT PANJANG",
    "BUKIT TIMAH",
    "CENTRAL AREA",
    "CHOA CHU KANG",
    "CLEMENTI",
    "GEYLANG",
    "HOUGANG",
    "JURONG EAST",
    "JURONG WEST",
    "KALLANG/WHAMPOA",
    "MARINE PARADE",
    "PASIR RIS",
    "PUNGGOL",
    "QUEENSTOWN",
    "SEMBAWANG",
    "SENGKANG",
    "SERANGOON",
    "TAMPINES",
    "TOA PAYOH",
    "WOODLANDS",
    "YISHUN",
];
