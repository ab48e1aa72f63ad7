//! Attribution models and dimension-name rewriting.
//!
//! The reporting API resolves attribution from the dimension name itself
//! (`ym:s:lastTrafficSource`, `ym:s:firstUTMCampaign`, ...). Requests never
//! carry attribution as a separate query parameter; the model is spliced
//! into every dimension instead.

use crate::error::{MetrikaError, Result};
use std::fmt;
use std::str::FromStr;

/// Accepted attribution values, in the order the service documents them.
pub const VALUES: &[&str] = &[
    "automatic",
    "last",
    "first",
    "lastsign",
    "last_yandex_direct_click",
    "cross_device_first",
    "cross_device_last",
    "cross_device_last_significant",
    "cross_device_last_yandex_direct_click",
];

/// Attribution model deciding which touchpoint gets credit for a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribution {
    /// Service-chosen model.
    Automatic,
    /// Last traffic source.
    Last,
    /// First traffic source.
    First,
    /// Last significant traffic source.
    LastSignificant,
    /// Last click from a Direct ad.
    LastDirectClick,
    /// First source across devices.
    CrossDeviceFirst,
    /// Last source across devices.
    CrossDeviceLast,
    /// Last significant source across devices.
    CrossDeviceLastSignificant,
    /// Last Direct click across devices.
    CrossDeviceLastDirectClick,
}

impl Attribution {
    /// Every model, in the same order as [`VALUES`].
    pub const ALL: [Attribution; 9] = [
        Self::Automatic,
        Self::Last,
        Self::First,
        Self::LastSignificant,
        Self::LastDirectClick,
        Self::CrossDeviceFirst,
        Self::CrossDeviceLast,
        Self::CrossDeviceLastSignificant,
        Self::CrossDeviceLastDirectClick,
    ];

    /// Value accepted on input and spliced into dimension names.
    pub fn as_str(self) -> &'static str {
        self.spellings()[0]
    }

    /// Canonical spelling followed by the camelCase and flat lowercase
    /// variants recognised inside existing dimension names.
    pub fn spellings(self) -> [&'static str; 3] {
        match self {
            Self::Automatic => ["automatic", "automatic", "automatic"],
            Self::Last => ["last", "last", "last"],
            Self::First => ["first", "first", "first"],
            Self::LastSignificant => ["lastsign", "lastSign", "lastsign"],
            Self::LastDirectClick => [
                "last_yandex_direct_click",
                "lastYandexDirectClick",
                "lastyandexdirectclick",
            ],
            Self::CrossDeviceFirst => [
                "cross_device_first",
                "crossDeviceFirst",
                "crossdevicefirst",
            ],
            Self::CrossDeviceLast => ["cross_device_last", "crossDeviceLast", "crossdevicelast"],
            Self::CrossDeviceLastSignificant => [
                "cross_device_last_significant",
                "crossDeviceLastSignificant",
                "crossdevicelastsignificant",
            ],
            Self::CrossDeviceLastDirectClick => [
                "cross_device_last_yandex_direct_click",
                "crossDeviceLastYandexDirectClick",
                "crossdevicelastyandexdirectclick",
            ],
        }
    }

    /// Comma-separated list of every accepted value.
    pub fn valid_values() -> String {
        VALUES.join(", ")
    }

    /// Find the attribution prefix at the start of a dimension base name.
    ///
    /// Returns the model and the length of the matched spelling. The longest
    /// spelling wins, and a spelling only counts when the next character
    /// starts the PascalCase base name.
    pub fn detect(name: &str) -> Option<(Attribution, usize)> {
        Self::ALL
            .iter()
            .flat_map(|model| model.spellings().into_iter().map(move |s| (*model, s)))
            .filter(|(_, spelling)| {
                name.strip_prefix(*spelling)
                    .and_then(|rest| rest.chars().next())
                    .is_some_and(|c| c.is_ascii_uppercase())
            })
            .max_by_key(|(_, spelling)| spelling.len())
            .map(|(model, spelling)| (model, spelling.len()))
    }
}

impl fmt::Display for Attribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Attribution {
    type Err = MetrikaError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| {
                MetrikaError::invalid(format!(
                    "attribution '{s}' is not valid; expected one of: {}",
                    Self::valid_values()
                ))
            })
    }
}

/// Encode `model` into a `prefix:scope:name` dimension identifier.
///
/// An existing attribution prefix on the base name is replaced; otherwise
/// the model is inserted directly before the base name.
pub fn rewrite_dimension(dimension: &str, model: Attribution) -> String {
    let (head, name) = match dimension.rsplit_once(':') {
        Some((head, name)) => (Some(head), name),
        None => (None, dimension),
    };

    let base = match Attribution::detect(name) {
        Some((_, len)) => &name[len..],
        None => name,
    };

    match head {
        Some(head) => format!("{head}:{model}{base}"),
        None => format!("{model}{base}"),
    }
}

/// Rewrite every dimension in a list.
pub fn rewrite_dimensions(dimensions: &[String], model: Attribution) -> Vec<String> {
    dimensions
        .iter()
        .map(|d| rewrite_dimension(d, model))
        .collect()
}
