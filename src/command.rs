//! Command and settings tables for Novatek camera firmware.
//!
//! The camera accepts numeric command codes as HTTP query parameters.  Codes
//! and their legal values were recovered by probing VicTsing 4K firmware; the
//! firmware crashes on unsupported values, so everything sent over the wire
//! must come from these tables (or from the explicit `raw` escape hatch).

use std::str::FromStr;

/// Firmware status code returned when a command fails outright.
pub const ERROR_STATUS: i32 = -256;

/// `par` value that starts a movie recording (command 2001).
pub const START: &str = "1";
/// `par` value that stops a movie recording (command 2001).
pub const STOP: &str = "0";

// ── Named commands ────────────────────────────────────────────────────────────

/// Commands that take no parameter or a free-form `str=` parameter.
pub const COMMANDS: &[(&str, &str)] = &[
    ("CONFIG",           "3014"),
    ("DATE",             "3005"),
    ("DISK_SPACE",       "3017"),
    ("MODE_PHOTO_MOVIE", "3001"),
    ("MOVIE_REMAINING",  "2009"),
    ("PHOTOS_REMAINING", "1003"),
    ("SNAP",             "1001"),
    ("START_STOP",       "2001"),
    ("STATUS_MODE",      "3016"),
    ("TIME",             "3006"),
    ("VERSION",          "3012"),
    ("WIFI_NAME",        "3003"),
    ("WIFI_PW",          "3004"),
];

/// Resolve a command name to its numeric code (case-insensitive).
pub fn command_code(name: &str) -> Option<&'static str> {
    COMMANDS
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, c)| *c)
}

// ── Configurable settings ─────────────────────────────────────────────────────

/// A configurable setting: the wire `par` value for a chosen value is its
/// zero-based index in `values`.
#[derive(Debug)]
pub struct Setting {
    pub code:   &'static str,
    pub name:   &'static str,
    pub values: &'static [&'static str],
}

/// All settings the firmware is known to accept over WiFi.
///
/// Codes 2011-2017 and 3009/3033 exist but either crash the camera or have
/// unknown semantics; they are deliberately absent.  The gyroscope and diving
/// mode settings cannot be changed over WiFi at all.
pub const SETTINGS: &[Setting] = &[
    Setting {
        code: "1002",
        name: "Photo_Image_Size",
        values: &[
            "20M_5120x3840", "16M_4608x3456", "12M_4032x3024", "10M_3648x2736",
            "8M_3264x2448", "5M_2592x1944", "3M_2048x1536", "VGA_640x480",
            "1.2M_1280x960", "2M_1920x1080",
        ],
    },
    Setting {
        code: "1006",
        name: "Sharpness",
        values: &["High", "Normal", "Medium"],
    },
    Setting {
        code: "1007",
        name: "White_Balance",
        values: &["Auto", "Daylight", "Cloudy", "Tungsten", "Fluorescent"],
    },
    Setting {
        code: "1009",
        name: "ISO",
        values: &["Auto", "100", "200", "400"],
    },
    Setting {
        code: "2002",
        name: "Movie_Resolution",
        values: &[
            "UHD_24fps", "QHD_30fps", "3MHD_30fps", "FHD_96fps", "FHD_60fps",
            "FHD_30fps", "HD_120fps", "HD_60fps", "HD_30fps", "WVGA_30fps",
            "VGA_240fps", "VGA_30fps", "QVGA_30fps",
        ],
    },
    Setting {
        code: "2003",
        name: "Cyclic_Record",
        values: &["Off", "3min", "5min", "10min"],
    },
    Setting {
        code: "2004",
        name: "HDR/WDR",
        values: &["Off", "On"],
    },
    Setting {
        code: "2005",
        name: "Exposure",
        values: &[
            "+2.0", "+5/3", "+4/3", "+1.0", "+2/3", "+1/3", "+0.0", "-1/3",
            "-2/3", "-1.0", "-4/3", "-5/3", "-2.0",
        ],
    },
    Setting {
        code: "2006",
        name: "Motion_Detection",
        values: &["Off", "On"],
    },
    Setting {
        code: "2007",
        name: "Audio",
        values: &["Off", "On"],
    },
    Setting {
        code: "2008",
        name: "Date_Stamping",
        values: &["Off", "On"],
    },
    Setting {
        code: "3007",
        name: "Auto_Power_Off",
        values: &["Off", "1min", "3min", "5min", "10min"],
    },
    Setting {
        code: "3008",
        name: "Language",
        values: &[
            "English", "French", "German", "Spanish", "Italian", "Portuguese",
            "Russian", "Unknown_1", "Unknown_2", "Unknown_3", "Polish",
            "Unknown_4",
        ],
    },
    Setting {
        code: "3010",
        name: "Format",
        values: &["Cancel", "OK"],
    },
    Setting {
        code: "3011",
        name: "Default_Setting",
        values: &["Cancel", "OK"],
    },
    Setting {
        code: "3025",
        name: "Frequency",
        values: &["50Hz", "60Hz"],
    },
    Setting {
        code: "3026",
        name: "Rotate",
        values: &["Off", "On"],
    },
];

/// Look up a setting by its human-readable name (case-insensitive).
pub fn setting_by_name(name: &str) -> Option<&'static Setting> {
    SETTINGS.iter().find(|s| s.name.eq_ignore_ascii_case(name))
}

/// Look up a setting by its numeric command code.
pub fn setting_by_code(code: &str) -> Option<&'static Setting> {
    SETTINGS.iter().find(|s| s.code == code)
}

impl Setting {
    /// Wire `par` value for a human-readable value (case-insensitive).
    pub fn par_for_value(&self, value: &str) -> Option<usize> {
        self.values
            .iter()
            .position(|v| v.eq_ignore_ascii_case(value))
    }

    /// Human-readable value for a status index from the settings dump.
    pub fn value_for_status(&self, status: i32) -> Option<&'static str> {
        usize::try_from(status)
            .ok()
            .and_then(|i| self.values.get(i))
            .copied()
    }
}

// ── Capture mode ──────────────────────────────────────────────────────────────

/// Capture mode selected via command 3001.
///
/// Modes 2-4 behave oddly on this firmware (the timed modes are accepted but
/// not always honoured); the mode query (3016) always reports 0 regardless.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Photo,
    Movie,
    TimedMovie,
    TimedPhoto,
}

impl Mode {
    /// Wire `par` value for command 3001.
    pub fn par(self) -> &'static str {
        match self {
            Mode::Photo      => "0",
            Mode::Movie      => "1",
            Mode::TimedMovie => "3",
            Mode::TimedPhoto => "4",
        }
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "photo"  => Ok(Mode::Photo),
            "movie"  => Ok(Mode::Movie),
            "tmovie" => Ok(Mode::TimedMovie),
            "tphoto" => Ok(Mode::TimedPhoto),
            _ => Err(format!("unrecognised mode {s:?} (photo|movie|tphoto|tmovie)")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_lookup_is_case_insensitive() {
        assert_eq!(command_code("snap"), Some("1001"));
        assert_eq!(command_code("Wifi_Name"), Some("3003"));
        assert_eq!(command_code("NO_SUCH"), None);
    }

    #[test]
    fn setting_lookup_by_name_and_code() {
        let s = setting_by_name("white_balance").unwrap();
        assert_eq!(s.code, "1007");
        assert_eq!(setting_by_code("2002").unwrap().name, "Movie_Resolution");
        assert!(setting_by_code("2013").is_none());
    }

    #[test]
    fn par_index_matches_wire_order() {
        let s = setting_by_name("ISO").unwrap();
        assert_eq!(s.par_for_value("auto"), Some(0));
        assert_eq!(s.par_for_value("400"), Some(3));
        assert_eq!(s.par_for_value("800"), None);
    }

    #[test]
    fn status_index_decodes_to_value() {
        let s = setting_by_code("2003").unwrap();
        assert_eq!(s.value_for_status(1), Some("3min"));
        assert_eq!(s.value_for_status(-1), None);
        assert_eq!(s.value_for_status(99), None);
    }

    #[test]
    fn mode_parses_and_maps() {
        assert_eq!("TPHOTO".parse::<Mode>().unwrap(), Mode::TimedPhoto);
        assert_eq!(Mode::TimedMovie.par(), "3");
        assert!("timelapse".parse::<Mode>().is_err());
    }
}
