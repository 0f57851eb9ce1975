use std::collections::HashMap;

/// Bundled station directory: display name paired with the opaque upstream
/// telecode the query endpoint expects.
pub static STATION_MAP: [(&str, &str); 34] = [
    ("北京", "BJP"),
    ("北京南", "VNP"),
    ("北京西", "BXP"),
    ("上海", "SHH"),
    ("上海虹桥", "AOH"),
    ("天津", "TJP"),
    ("广州", "GZQ"),
    ("广州南", "IZQ"),
    ("深圳", "SZQ"),
    ("深圳北", "IOQ"),
    ("成都", "CDW"),
    ("成都东", "ICW"),
    ("重庆", "CQW"),
    ("重庆北", "CUW"),
    ("南京", "NJH"),
    ("南京南", "NKH"),
    ("杭州", "HZH"),
    ("杭州东", "HGH"),
    ("武汉", "WHN"),
    ("西安", "XAY"),
    ("西安北", "EAY"),
    ("长沙", "CSQ"),
    ("郑州", "ZZF"),
    ("青岛", "QDK"),
    ("济南", "JNK"),
    ("沈阳", "SYT"),
    ("哈尔滨", "HBB"),
    ("大连", "DLT"),
    ("昆明", "KMM"),
    ("贵阳", "GIW"),
    ("兰州", "LZJ"),
    ("福州", "FZS"),
    ("厦门", "XMS"),
    ("合肥", "HFH"),
];

/// Read-only display-name → station-code lookup, built once at startup and
/// passed explicitly to the query flow.
pub struct StationTable {
    codes: HashMap<&'static str, &'static str>,
}

impl StationTable {
    /// Table backed by the bundled station directory.
    pub fn bundled() -> Self {
        Self::from_pairs(&STATION_MAP)
    }

    pub fn from_pairs(pairs: &[(&'static str, &'static str)]) -> Self {
        StationTable {
            codes: pairs.iter().copied().collect(),
        }
    }

    pub fn code(&self, name: &str) -> Option<&'static str> {
        self.codes.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}
