use super::{BaseOption, OptionEvent, OptionModel, OptionState, OptionType};
use crate::{descriptor::Unit, names, value::Value};

/// How much a page may exceed the scan area and still be offered, in mm.
const WIGGLE_ROOM: f64 = 2.0;

const CUSTOM: &str = "Custom";

/// Paper sizes in portrait orientation, in mm.
const CATALOG: &[(&str, f64, f64)] = &[
    ("A3", 297.0, 420.0),
    ("A4", 210.0, 297.0),
    ("A5", 148.0, 210.0),
    ("A6", 105.0, 148.0),
    ("Letter", 215.9, 279.4),
    ("Legal", 215.9, 355.6),
    ("Tabloid", 279.4, 431.8),
    ("B3", 353.0, 500.0),
    ("B4", 250.0, 353.0),
    ("B5", 176.0, 250.0),
    ("B6", 125.0, 176.0),
    ("Envelope C5", 162.0, 229.0),
    ("Envelope US 10", 104.8, 241.3),
    ("Envelope DL", 110.0, 220.0),
    ("Executive", 184.15, 266.7),
    ("Folio", 210.0, 330.0),
    ("Ledger", 431.8, 279.4),
    ("JIS B3", 364.0, 515.0),
    ("JIS B4", 257.0, 364.0),
    ("JIS B5", 182.0, 257.0),
    ("JIS B6", 128.0, 182.0),
];

/// A named paper size. `wiggle_*` is zero or negative: the amount the page
/// exceeds the scan area it was offered for.
#[derive(Debug, Clone, PartialEq)]
pub struct PageSize {
    pub name: String,
    pub width: f64,
    pub height: f64,
    pub wiggle_width: f64,
    pub wiggle_height: f64,
}

impl PageSize {
    fn custom() -> Self {
        Self {
            name: CUSTOM.to_owned(),
            width: 0.0,
            height: 0.0,
            wiggle_width: 0.0,
            wiggle_height: 0.0,
        }
    }

    fn fitting(name: String, width: f64, height: f64, max_width: f64, max_height: f64) -> Option<Self> {
        if width - WIGGLE_ROOM > max_width || height - WIGGLE_ROOM > max_height {
            return None;
        }

        Some(Self {
            name,
            width,
            height,
            wiggle_width: (max_width - width).min(0.0),
            wiggle_height: (max_height - height).min(0.0),
        })
    }

    pub fn is_custom(&self) -> bool {
        self.name == CUSTOM
    }

    /// The area actually scanned for this page, in mm.
    pub fn effective_size(&self) -> (f64, f64) {
        (self.width + self.wiggle_width, self.height + self.wiggle_height)
    }
}

/// Predefined scan area sizes. The session keeps the geometry options and this
/// selection consistent.
#[derive(Debug)]
pub struct PageSizeOption {
    base: BaseOption,
    sizes: Vec<PageSize>,
    current: usize,
}

impl PageSizeOption {
    pub fn new() -> Self {
        Self {
            base: BaseOption::synthetic(),
            sizes: vec![PageSize::custom()],
            current: 0,
        }
    }

    /// Rebuilds the catalog for a scan area of `max_width` × `max_height` mm
    /// and selects "Custom".
    pub fn rebuild(&mut self, max_width: f64, max_height: f64) {
        let portrait = CATALOG.iter().filter_map(|(name, width, height)| {
            PageSize::fitting(name.to_string(), *width, *height, max_width, max_height)
        });

        let landscape = CATALOG.iter().filter_map(|(name, width, height)| {
            PageSize::fitting(format!("Landscape {name}"), *height, *width, max_width, max_height)
        });

        self.sizes = std::iter::once(PageSize::custom())
            .chain(portrait)
            .chain(landscape)
            .collect();
        self.current = 0;

        log::debug!(
            "{} page sizes fit into {max_width:.1} x {max_height:.1} mm",
            self.sizes.len() - 1
        );

        self.base.end_reload();
    }

    /// Drops the catalog when the device has no usable geometry.
    pub fn clear(&mut self) {
        self.sizes = vec![PageSize::custom()];
        self.current = 0;
    }

    pub fn sizes(&self) -> &[PageSize] {
        &self.sizes
    }

    pub fn current(&self) -> &PageSize {
        &self.sizes[self.current]
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Selects entry `index` without touching the geometry.
    pub fn set_current_index(&mut self, index: usize) {
        if index < self.sizes.len() && index != self.current {
            self.current = index;
            let name = self.sizes[index].name.clone();
            self.base.emit(OptionEvent::ValueChanged(Value::String(name)));
        }
    }

    /// Falls back to "Custom" after the geometry was edited directly.
    pub fn set_custom(&mut self) {
        self.set_current_index(0);
    }

    /// First non-custom entry scanning `width` × `height` mm.
    pub fn position(&self, width: f64, height: f64, tolerance: f64) -> Option<usize> {
        self.sizes.iter().enumerate().skip(1).find_map(|(index, size)| {
            let (w, h) = size.effective_size();
            ((w - width).abs() <= tolerance && (h - height).abs() <= tolerance).then_some(index)
        })
    }
}

impl Default for PageSizeOption {
    fn default() -> Self {
        Self::new()
    }
}

impl OptionModel for PageSizeOption {
    fn base(&self) -> &BaseOption {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseOption {
        &mut self.base
    }

    fn option_type(&self) -> OptionType {
        match self.sizes.len() {
            1 => OptionType::DetectFail,
            _ => OptionType::ValueList,
        }
    }

    fn name(&self) -> &str {
        names::PAGE_SIZE
    }

    fn title(&self) -> &str {
        "Scan area size"
    }

    fn description(&self) -> &str {
        "Select a predefined page size for the scanning area."
    }

    fn state(&self) -> OptionState {
        match self.sizes.len() {
            1 => OptionState::Hidden,
            _ => OptionState::Active,
        }
    }

    /// The catalog is rebuilt by the session, which knows the geometry.
    fn read_option(&mut self) {}

    fn value(&self) -> Option<Value> {
        Some(Value::String(self.current().name.clone()))
    }

    fn set_value(&mut self, value: &Value) -> bool {
        let Value::String(name) = value else {
            return false;
        };

        if *name == self.current().name {
            return true;
        }

        let Some(index) = self.sizes.iter().position(|size| size.name == *name) else {
            return false;
        };

        self.current = index;
        let size = &self.sizes[index];
        if !size.is_custom() {
            let (width, height) = size.effective_size();
            self.base.emit(OptionEvent::PageSizeSelected { width, height });
        }
        self.base.emit(OptionEvent::ValueChanged(Value::String(name.clone())));

        true
    }

    fn value_list(&self) -> Vec<Value> {
        self.internal_value_list()
    }

    fn internal_value_list(&self) -> Vec<Value> {
        self.sizes
            .iter()
            .map(|size| Value::String(size.name.clone()))
            .collect()
    }

    fn unit(&self) -> Unit {
        Unit::None
    }

    fn value_size(&self) -> usize {
        1
    }

    fn value_as_string(&self) -> String {
        self.current().name.clone()
    }

    fn needs_polling(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(option: &PageSizeOption) -> Vec<&str> {
        option.sizes().iter().map(|size| size.name.as_str()).collect()
    }

    #[test]
    fn a4_flatbed_catalog() {
        let mut option = PageSizeOption::new();
        assert_eq!(option.state(), OptionState::Hidden);
        assert_eq!(option.option_type(), OptionType::DetectFail);

        // Typical A4 flatbed, slightly narrower than Letter.
        option.rebuild(215.0, 297.0);
        let names = names(&option);

        assert_eq!(names[0], "Custom");
        assert!(names.contains(&"A4"));
        assert!(names.contains(&"Letter"));
        assert!(names.contains(&"Landscape A5"));
        assert!(!names.contains(&"A3"));
        assert!(!names.contains(&"Legal"));
        assert!(!names.contains(&"Landscape A4"));

        assert_eq!(option.state(), OptionState::Active);
        assert_eq!(option.take_events(), vec![OptionEvent::Reloaded]);

        let letter = &option.sizes()[option.position(215.0, 279.4, 0.01).unwrap()];
        assert_eq!(letter.name, "Letter");
        assert!((letter.wiggle_width + 0.9).abs() < 1e-9);
        assert_eq!(letter.wiggle_height, 0.0);
    }

    #[test]
    fn selecting_entries() {
        let mut option = PageSizeOption::new();
        option.rebuild(215.9, 355.6);
        option.take_events();

        assert!(option.set_value(&Value::from("A5")));
        assert_eq!(
            option.take_events(),
            vec![
                OptionEvent::PageSizeSelected {
                    width: 148.0,
                    height: 210.0
                },
                OptionEvent::ValueChanged(Value::from("A5")),
            ]
        );

        assert!(option.set_value(&Value::from("A5")));
        assert!(option.take_events().is_empty());

        assert!(!option.set_value(&Value::from("A0")));
        assert!(!option.set_value(&Value::from(4)));
        assert_eq!(option.value_as_string(), "A5");

        option.set_custom();
        assert_eq!(option.value(), Some(Value::from("Custom")));
        assert_eq!(
            option.take_events(),
            vec![OptionEvent::ValueChanged(Value::from("Custom"))]
        );
    }

    #[test]
    fn tiny_area_offers_nothing() {
        let mut option = PageSizeOption::new();
        option.rebuild(50.0, 50.0);
        assert_eq!(names(&option), vec!["Custom"]);
        assert_eq!(option.state(), OptionState::Hidden);
    }
}
