use crate::utils::{cstr2bstr, cstr2string};
use bstr::ByteSlice;
use libsane_sys::*;
use scankit::{
    Capabilities, Constraint, FrameFormat, OptionDescriptor, Parameters, SaneError, Unit,
    ValueType,
};
use std::ops;

pub fn descriptor_from_raw(desc: &SANE_Option_Descriptor) -> OptionDescriptor {
    OptionDescriptor {
        name: unsafe { cstr2string(desc.name) },
        title: unsafe { cstr2string(desc.title) },
        description: unsafe { cstr2string(desc.desc) },
        ty: value_type(desc.type_),
        unit: unit(desc.unit),
        size: usize::try_from(desc.size).unwrap_or(0),
        capabilities: Capabilities::from_bits_retain(desc.cap as u32),
        constraint: unsafe { constraint(desc.constraint_type, desc.constraint) },
    }
}

fn value_type(ty: SANE_Value_Type) -> ValueType {
    match ty {
        SANE_Value_Type_SANE_TYPE_BOOL => ValueType::Bool,
        SANE_Value_Type_SANE_TYPE_INT => ValueType::Int,
        SANE_Value_Type_SANE_TYPE_FIXED => ValueType::Fixed,
        SANE_Value_Type_SANE_TYPE_STRING => ValueType::String,
        SANE_Value_Type_SANE_TYPE_BUTTON => ValueType::Button,
        _ => ValueType::Group,
    }
}

fn unit(unit: SANE_Unit) -> Unit {
    match unit {
        SANE_Unit_SANE_UNIT_PIXEL => Unit::Pixel,
        SANE_Unit_SANE_UNIT_BIT => Unit::Bit,
        SANE_Unit_SANE_UNIT_MM => Unit::Mm,
        SANE_Unit_SANE_UNIT_DPI => Unit::Dpi,
        SANE_Unit_SANE_UNIT_PERCENT => Unit::Percent,
        SANE_Unit_SANE_UNIT_MICROSECOND => Unit::Microsecond,
        _ => Unit::None,
    }
}

unsafe fn constraint(
    ty: SANE_Constraint_Type,
    constraint: SANE_Option_Descriptor__bindgen_ty_1,
) -> Constraint {
    match ty {
        SANE_Constraint_Type_SANE_CONSTRAINT_RANGE => match constraint.range.as_ref() {
            Some(range) => Constraint::Range {
                range: ops::RangeInclusive::new(range.min, range.max),
                quant: range.quant,
            },
            None => Constraint::None,
        },
        SANE_Constraint_Type_SANE_CONSTRAINT_WORD_LIST => {
            let list = constraint.word_list;
            if list.is_null() {
                return Constraint::None;
            }

            // The first word is the number of entries.
            let len = usize::try_from(*list).unwrap_or(0);
            Constraint::WordList(std::slice::from_raw_parts(list.add(1), len).to_vec())
        }
        SANE_Constraint_Type_SANE_CONSTRAINT_STRING_LIST => {
            let list = constraint.string_list;
            if list.is_null() {
                return Constraint::None;
            }

            let values = (0..)
                .map_while(|offset| cstr2bstr(*list.add(offset)))
                .map(|value| value.to_str_lossy().into_owned())
                .collect();

            Constraint::StringList(values)
        }
        _ => Constraint::None,
    }
}

pub fn parameters_from_raw(params: &SANE_Parameters) -> scankit::Result<Parameters> {
    let format = match params.format {
        SANE_Frame_SANE_FRAME_GRAY => FrameFormat::Gray,
        SANE_Frame_SANE_FRAME_RGB => FrameFormat::RGB,
        SANE_Frame_SANE_FRAME_RED => FrameFormat::Red,
        SANE_Frame_SANE_FRAME_GREEN => FrameFormat::Green,
        SANE_Frame_SANE_FRAME_BLUE => FrameFormat::Blue,
        format => {
            log::warn!("Unsupported frame format {format}");
            return Err(SaneError::Unsupported);
        }
    };

    Ok(Parameters {
        format,
        last_frame: params.last_frame != 0,
        bytes_per_line: usize::try_from(params.bytes_per_line).unwrap_or(0),
        pixels_per_line: usize::try_from(params.pixels_per_line).unwrap_or(0),
        // -1 when the height is unknown.
        lines: usize::try_from(params.lines).ok(),
        depth: usize::try_from(params.depth).unwrap_or(0),
    })
}
