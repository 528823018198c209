//! Option names with a stable meaning across backends.

pub const SOURCE: &str = "source";
pub const MODE: &str = "mode";
pub const DEPTH: &str = "depth";
pub const RESOLUTION: &str = "resolution";
pub const X_RESOLUTION: &str = "x-resolution";
pub const Y_RESOLUTION: &str = "y-resolution";
pub const TOP_LEFT_X: &str = "tl-x";
pub const TOP_LEFT_Y: &str = "tl-y";
pub const BOTTOM_RIGHT_X: &str = "br-x";
pub const BOTTOM_RIGHT_Y: &str = "br-y";
pub const PAGE_WIDTH: &str = "page-width";
pub const PAGE_HEIGHT: &str = "page-height";
pub const PREVIEW: &str = "preview";
pub const WAIT_FOR_BUTTON: &str = "wait-for-button";
pub const GAMMA_VECTOR: &str = "gamma-table";
pub const GAMMA_VECTOR_R: &str = "red-gamma-table";
pub const GAMMA_VECTOR_G: &str = "green-gamma-table";
pub const GAMMA_VECTOR_B: &str = "blue-gamma-table";

pub const PAGE_SIZE: &str = "scankit:page-size";
pub const BATCH_MODE: &str = "scankit:batch-mode";
pub const BATCH_DELAY: &str = "scankit:batch-delay";
pub const INVERT_COLORS: &str = "scankit:invert-colors";

/// `SANE_VALUE_SCAN_MODE_COLOR`.
pub const SCAN_MODE_COLOR: &str = "Color";

pub fn is_gamma_vector(name: &str) -> bool {
    matches!(
        name,
        GAMMA_VECTOR | GAMMA_VECTOR_R | GAMMA_VECTOR_G | GAMMA_VECTOR_B
    )
}

/// Source names that feed pages on their own.
pub fn is_multi_page_source(source: &str) -> bool {
    ["Automatic Document Feeder", "ADF", "Duplex"]
        .iter()
        .any(|pattern| source.contains(pattern))
}

/// Well-known options a session can look up without knowing the backend.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    strum::Display,
    strum::IntoStaticStr,
    strum::EnumString,
    strum::EnumIter,
)]
pub enum OptionName {
    #[strum(serialize = "source")]
    Source,
    #[strum(serialize = "mode")]
    ScanMode,
    #[strum(serialize = "depth")]
    BitDepth,
    #[strum(serialize = "resolution")]
    Resolution,
    #[strum(serialize = "x-resolution")]
    XResolution,
    #[strum(serialize = "y-resolution")]
    YResolution,
    #[strum(serialize = "tl-x")]
    TopLeftX,
    #[strum(serialize = "tl-y")]
    TopLeftY,
    #[strum(serialize = "br-x")]
    BottomRightX,
    #[strum(serialize = "br-y")]
    BottomRightY,
    #[strum(serialize = "film-type")]
    FilmType,
    #[strum(serialize = "negative")]
    Negative,
    #[strum(serialize = "scankit:invert-colors")]
    InvertColors,
    #[strum(serialize = "scankit:page-size")]
    PageSize,
    #[strum(serialize = "threshold")]
    Threshold,
    #[strum(serialize = "preview")]
    Preview,
    #[strum(serialize = "wait-for-button")]
    WaitForButton,
    #[strum(serialize = "brightness")]
    Brightness,
    #[strum(serialize = "contrast")]
    Contrast,
    #[strum(serialize = "gamma-table")]
    Gamma,
    #[strum(serialize = "red-gamma-table")]
    GammaRed,
    #[strum(serialize = "green-gamma-table")]
    GammaGreen,
    #[strum(serialize = "blue-gamma-table")]
    GammaBlue,
    #[strum(serialize = "black-level")]
    BlackLevel,
    #[strum(serialize = "white-level")]
    WhiteLevel,
    #[strum(serialize = "scankit:batch-mode")]
    BatchMode,
    #[strum(serialize = "scankit:batch-delay")]
    BatchDelay,
}
