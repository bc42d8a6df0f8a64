use std::collections::HashMap;

/// Home venue attributes that feed the home-advantage and weather factors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StadiumInfo {
    pub city: &'static str,
    pub state: &'static str,
    /// Enclosed venue (dome or fixed roof)
    pub dome: bool,
}

/// Directory of home stadiums keyed by provider team ID. Passed into the
/// engine as a value so alternative tables (or an empty one) can be
/// supplied in tests.
#[derive(Debug, Clone, Default)]
pub struct StadiumDirectory {
    stadiums: HashMap<&'static str, StadiumInfo>,
}

impl StadiumDirectory {
    pub fn get(&self, team_id: &str) -> Option<&StadiumInfo> {
        self.stadiums.get(team_id)
    }

    /// The 32 current NFL home venues, keyed by ESPN team ID.
    pub fn nfl() -> Self {
        let entries: [(&'static str, &'static str, &'static str, bool); 32] = [
            ("1", "Atlanta", "GA", true),
            ("2", "Buffalo", "NY", false),
            ("3", "Chicago", "IL", false),
            ("4", "Cincinnati", "OH", false),
            ("5", "Cleveland", "OH", false),
            ("6", "Arlington", "TX", true),
            ("7", "Denver", "CO", false),
            ("8", "Detroit", "MI", true),
            ("9", "Green Bay", "WI", false),
            ("10", "Nashville", "TN", false),
            ("11", "Indianapolis", "IN", true),
            ("12", "Kansas City", "MO", false),
            ("13", "Las Vegas", "NV", true),
            ("14", "Los Angeles", "CA", false),
            ("15", "Miami Gardens", "FL", false),
            ("16", "Minneapolis", "MN", true),
            ("17", "Foxborough", "MA", false),
            ("18", "New Orleans", "LA", true),
            ("19", "East Rutherford", "NJ", false),
            ("20", "East Rutherford", "NJ", false),
            ("21", "Philadelphia", "PA", false),
            ("22", "Glendale", "AZ", true),
            ("23", "Pittsburgh", "PA", false),
            ("24", "Los Angeles", "CA", false),
            ("25", "Santa Clara", "CA", false),
            ("26", "Seattle", "WA", false),
            ("27", "Tampa", "FL", false),
            ("28", "Landover", "MD", false),
            ("29", "Charlotte", "NC", false),
            ("30", "Jacksonville", "FL", false),
            ("33", "Baltimore", "MD", false),
            ("34", "Houston", "TX", true),
        ];
        let stadiums = entries
            .into_iter()
            .map(|(id, city, state, dome)| (id, StadiumInfo { city, state, dome }))
            .collect();
        StadiumDirectory { stadiums }
    }
}
