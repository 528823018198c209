use bitflags::bitflags;
use std::ops::RangeInclusive;

/// Owned copy of a `SANE_Option_Descriptor`.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionDescriptor {
    pub name: String,
    pub title: String,
    pub description: String,
    pub ty: ValueType,
    pub unit: Unit,
    /// Size of the value buffer in bytes.
    pub size: usize,
    pub capabilities: Capabilities,
    pub constraint: Constraint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Bool,
    Int,
    Fixed,
    String,
    Button,
    Group,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Unit {
    #[default]
    None,
    Pixel,
    Bit,
    Mm,
    Dpi,
    Percent,
    Microsecond,
    /// Only used by client-side options, SANE has no such unit.
    Second,
}

bitflags! {
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Capabilities: u32 {
        const SOFT_SELECT = 1 << 0;
        const HARD_SELECT = 1 << 1;
        const SOFT_DETECT = 1 << 2;
        const EMULATED = 1 << 3;
        const AUTOMATIC = 1 << 4;
        const INACTIVE = 1 << 5;
        const ADVANCED = 1 << 6;

        const _ = !0;
    }
}

bitflags! {
    /// Info bits returned by `sane_control_option`.
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ControlInfo: u32 {
        const INEXACT = 1 << 0;
        const RELOAD_OPTIONS = 1 << 1;
        const RELOAD_PARAMS = 1 << 2;

        const _ = !0;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    None,
    Range {
        range: RangeInclusive<i32>,
        quant: i32,
    },
    WordList(Vec<i32>),
    StringList(Vec<String>),
}

impl OptionDescriptor {
    pub fn is_settable(&self) -> bool {
        self.capabilities.contains(Capabilities::SOFT_SELECT)
    }

    pub fn is_detectable(&self) -> bool {
        self.capabilities.contains(Capabilities::SOFT_DETECT)
    }

    pub fn is_active(&self) -> bool {
        !self.capabilities.contains(Capabilities::INACTIVE)
    }
}

/// Pixel format of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameFormat {
    Gray,
    RGB,
    Red,
    Green,
    Blue,
}

/// Result of `sane_get_parameters`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parameters {
    pub format: FrameFormat,
    pub last_frame: bool,
    pub bytes_per_line: usize,
    pub pixels_per_line: usize,
    /// `None` when the number of lines is not known in advance, e.g. hand scanners.
    pub lines: Option<usize>,
    pub depth: usize,
}
