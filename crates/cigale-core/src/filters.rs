use crate::domain::{BandSelection, CigaleError, CigaleResult};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

const HST_INSTRUMENTS: &str = "uvis, acs";
const JWST_INSTRUMENTS: &str = "nircam, miri";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Observatory {
    Hst,
    Jwst,
}

impl Observatory {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hst => "hst",
            Self::Jwst => "jwst",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Instrument {
    Acs,
    Uvis,
    Nircam,
    Miri,
}

impl Instrument {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Acs => "acs",
            Self::Uvis => "uvis",
            Self::Nircam => "nircam",
            Self::Miri => "miri",
        }
    }

    pub const fn observatory(self) -> Observatory {
        match self {
            Self::Acs | Self::Uvis => Observatory::Hst,
            Self::Nircam | Self::Miri => Observatory::Jwst,
        }
    }

    /// Camera segment of the dotted filter name.
    const fn filter_segment(self) -> &'static str {
        match self {
            Self::Acs => "wfc",
            Self::Uvis => "wfc3",
            Self::Nircam => "nircam",
            Self::Miri => "miri",
        }
    }

    pub fn filter_name(self, band: &str, err: bool) -> String {
        let suffix = if err { "err" } else { "" };
        format!(
            "{}.{}.{}{}",
            self.observatory().as_str(),
            self.filter_segment(),
            band,
            suffix
        )
    }
}

impl Display for Instrument {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

impl FromStr for Instrument {
    type Err = CigaleError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "acs" => Ok(Self::Acs),
            "uvis" => Ok(Self::Uvis),
            "nircam" => Ok(Self::Nircam),
            "miri" => Ok(Self::Miri),
            other => Err(CigaleError::InvalidInstrument {
                observatory: "hst or jwst",
                instrument: other.to_string(),
                expected: "acs, uvis, nircam, miri",
            }),
        }
    }
}

pub fn hst_filter_name(band: &str, instrument: &str, err: bool) -> CigaleResult<String> {
    let instrument = match instrument {
        "uvis" => Instrument::Uvis,
        "acs" => Instrument::Acs,
        other => {
            return Err(CigaleError::InvalidInstrument {
                observatory: "hst",
                instrument: other.to_string(),
                expected: HST_INSTRUMENTS,
            });
        }
    };
    Ok(instrument.filter_name(band, err))
}

pub fn jwst_filter_name(band: &str, instrument: &str, err: bool) -> CigaleResult<String> {
    let instrument = match instrument {
        "nircam" => Instrument::Nircam,
        "miri" => Instrument::Miri,
        other => {
            return Err(CigaleError::InvalidInstrument {
                observatory: "jwst",
                instrument: other.to_string(),
                expected: JWST_INSTRUMENTS,
            });
        }
    };
    Ok(instrument.filter_name(band, err))
}

/// Bands of the selection paired with their instrument, in the order
/// ACS, UVIS, NIRCam, MIRI.
fn selected_bands(selection: &BandSelection) -> Vec<(Instrument, &str)> {
    let mut bands = Vec::new();
    if let Some(hst) = &selection.hst {
        bands.extend(hst.acs.iter().map(|band| (Instrument::Acs, band.as_str())));
        bands.extend(hst.uvis.iter().map(|band| (Instrument::Uvis, band.as_str())));
    }
    if let Some(jwst) = &selection.jwst {
        bands.extend(jwst.nircam.iter().map(|band| (Instrument::Nircam, band.as_str())));
        bands.extend(jwst.miri.iter().map(|band| (Instrument::Miri, band.as_str())));
    }
    bands
}

pub fn band_name_list(selection: &BandSelection) -> Vec<String> {
    selected_bands(selection)
        .into_iter()
        .map(|(instrument, band)| instrument.filter_name(band, false))
        .collect()
}

/// Every flux column name directly followed by its error column name.
pub fn band_name_list_with_errors(selection: &BandSelection) -> Vec<String> {
    selected_bands(selection)
        .into_iter()
        .flat_map(|(instrument, band)| {
            [
                instrument.filter_name(band, false),
                instrument.filter_name(band, true),
            ]
        })
        .collect()
}
