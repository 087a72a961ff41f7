use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Official publication series a citation points into.
///
/// Names are compared after trimming and dropping the optional dot in
/// `"BGBl."`; anything unknown is kept verbatim in [`Gazette::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Gazette {
    BgblI,
    BgblII,
    VkBl,
    BAnz,
    BAnzAt,
    RGBl,
    Other(String),
}

impl Gazette {
    pub fn parse(name: &str) -> Self {
        let normalized = name.trim().replace("BGBl.", "BGBl");
        let normalized = normalized.split_whitespace().collect::<Vec<_>>().join(" ");
        match normalized.as_str() {
            "BGBl I" => Gazette::BgblI,
            "BGBl II" => Gazette::BgblII,
            "VkBl" => Gazette::VkBl,
            "BAnz" => Gazette::BAnz,
            "BAnz AT" => Gazette::BAnzAt,
            "RGBl" => Gazette::RGBl,
            _ => Gazette::Other(name.trim().to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Gazette::BgblI => "BGBl I",
            Gazette::BgblII => "BGBl II",
            Gazette::VkBl => "VkBl",
            Gazette::BAnz => "BAnz",
            Gazette::BAnzAt => "BAnz AT",
            Gazette::RGBl => "RGBl",
            Gazette::Other(name) => name,
        }
    }

    /// Part number of the Bundesgesetzblatt, `None` for every other series.
    pub fn bgbl_part(&self) -> Option<u8> {
        match self {
            Gazette::BgblI => Some(1),
            Gazette::BgblII => Some(2),
            _ => None,
        }
    }
}

impl fmt::Display for Gazette {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Gazette {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Gazette::parse(s))
    }
}

impl From<String> for Gazette {
    fn from(value: String) -> Self {
        Gazette::parse(&value)
    }
}

impl From<Gazette> for String {
    fn from(value: Gazette) -> Self {
        value.name().to_string()
    }
}
