use crate::reconcile::types::Category;

/// Keyword → category, checked in order. The first keyword contained in the
/// lowercased type string wins, so overlapping keywords resolve by position.
static KEYWORDS: &[(&str, Category)] = &[
    ("starlink", Category::Starlink),
    ("gps", Category::Gps),
    ("gnss", Category::Gps),
    ("lora", Category::Lora),
    ("arduino", Category::Arduino),
    ("adsb", Category::Adsb),
    ("aircraft", Category::Adsb),
    ("thermal", Category::Thermal),
    ("probe", Category::Thermal),
    ("system", Category::System),
    ("monitor", Category::System),
    ("wifi", Category::Wifi),
    ("bluetooth", Category::Bluetooth),
    ("ble", Category::Bluetooth),
];

/// Location priority per category. Lower wins.
///
/// `adsb` sits just above `unknown`: its extraction describes the receiver
/// station and is easily confused with reported aircraft positions.
static PRIORITIES: &[(Category, u32)] = &[
    (Category::Starlink, 1),
    (Category::Gps, 2),
    (Category::Lora, 3),
    (Category::Arduino, 4),
    (Category::Thermal, 5),
    (Category::System, 6),
    (Category::Wifi, 7),
    (Category::Bluetooth, 8),
    (Category::Geolocated, 9),
    (Category::Adsb, 99),
    (Category::Unknown, 100),
];

/// Maps a free-form device or sensor type string to a [`Category`].
///
/// Unmatched strings (including the empty string) classify as
/// [`Category::Geolocated`].
pub fn classify(device_type: &str) -> Category {
    let lowered = device_type.to_lowercase();
    KEYWORDS
        .iter()
        .find(|(keyword, _)| lowered.contains(keyword))
        .map(|(_, category)| *category)
        .unwrap_or(Category::Geolocated)
}

/// Returns the resolution priority of `category` (lower is preferred).
pub fn priority(category: Category) -> u32 {
    PRIORITIES
        .iter()
        .find(|(c, _)| *c == category)
        .map(|(_, p)| *p)
        .unwrap_or(100)
}
