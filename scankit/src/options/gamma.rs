use super::{write_option, BaseOption, OptionEvent, OptionModel, OptionState, OptionType};
use crate::{
    backend::DeviceHandle,
    codec::{values_to_words, words_to_values},
    descriptor::Constraint,
    value::Value,
};
use std::sync::Arc;

/// Samples taken when estimating the curve parameters of a long table.
const APPROXIMATIONS: usize = 16;

/// Brightness, contrast and gamma of a curve. Gamma is in percent, 100 is linear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Curve {
    brightness: i32,
    contrast: i32,
    gamma: i32,
}

impl Curve {
    const IDENTITY: Self = Self {
        brightness: 0,
        contrast: 0,
        gamma: 100,
    };

    fn parse(value: &Value) -> Option<Self> {
        let values: Vec<i32> = match value {
            Value::String(text) => text
                .split(':')
                .map(|part| part.trim().parse().ok())
                .collect::<Option<_>>()?,
            Value::IntList(values) => values.clone(),
            _ => return None,
        };

        match values[..] {
            [brightness, contrast, gamma] => Some(Self {
                brightness,
                contrast,
                gamma,
            }),
            _ => None,
        }
    }

    fn to_value(self) -> Value {
        Value::IntList(vec![self.brightness, self.contrast, self.gamma])
    }

    /// Samples the curve into a table of `len` entries in `0..=max`.
    fn table(self, len: usize, max: i32) -> Vec<i32> {
        let max = max as f64;
        let exponent = 100.0 / self.gamma as f64;
        let contrast = 200.0 / (100.0 - self.contrast as f64) - 1.0;
        let half = max / 2.0;
        let brightness = self.brightness as f64 * max / 100.0;

        (0..len)
            .map(|i| {
                let x = (i as f64 / len as f64).powf(exponent) * max;
                let x = contrast * (x - half) + half;
                let x = x + brightness + 0.5;
                x.clamp(0.0, max) as i32
            })
            .collect()
    }

    /// Best-effort estimate of the parameters a table was generated with.
    ///
    /// Flat regions at both ends are skipped, then the exponent, the contrast
    /// factor and the brightness shift are averaged over evenly spread sample
    /// pairs. `None` for flat tables.
    fn estimate(table: &[i32], max: i32) -> Option<Self> {
        if table.len() < 2 || max <= 0 {
            return None;
        }

        let last = table.len() - 1;
        let mut begin = 0;
        let mut end = last;
        while begin < end && table[begin] == table[0] {
            begin += 1;
        }
        while end > begin && table[end] == table[last] {
            end -= 1;
        }

        if begin == end {
            return None;
        }

        let len = table.len() as f64;
        let max = max as f64;
        let at = |i: usize| table[i] as f64;

        let mut gamma = Estimate::default();
        let mut contrast = Estimate::default();
        let mut brightness = Estimate::default();

        let guess_gamma = |i1: usize, i2: usize, step: usize, gamma: &mut Estimate| {
            let diff1 = at(i1 + step) - at(i1 - step);
            let diff2 = at(i2 + step) - at(i2 - step);
            if diff1 == 0.0 || diff2 == 0.0 {
                return;
            }

            let step_proportion = i2 as f64 / i1 as f64;
            let diff_proportion = diff2 / diff1;
            gamma.add((step_proportion * diff_proportion).ln() / step_proportion.ln());
        };

        let guess_contrast = |i1: usize, i2: usize, exponent: f64, contrast: &mut Estimate| {
            let scaled_diff = (at(i2) - at(i1)) / max;
            let span = (i2 as f64 / len).powf(exponent) - (i1 as f64 / len).powf(exponent);
            if span != 0.0 {
                contrast.add(scaled_diff / span);
            }
        };

        let guess_brightness = |i: usize, exponent: f64, factor: f64, brightness: &mut Estimate| {
            let scaled = at(i) / max;
            let curve = ((i as f64 / len).powf(exponent) - 0.5) * factor + 0.5;
            brightness.add(scaled - curve);
        };

        if end - begin <= 32 {
            if end - begin > 4 {
                guess_gamma(begin + 2, end - 2, 2, &mut gamma);
            }
            let exponent = gamma.mean().unwrap_or(1.0);

            guess_contrast(begin, end, exponent, &mut contrast);
            let factor = contrast.mean().unwrap_or(1.0);

            guess_brightness((begin + end) / 2, exponent, factor, &mut brightness);
        } else {
            let pairs = sample_pairs(begin, end);

            for (i1, i2, step) in &pairs {
                guess_gamma(*i1, *i2, *step, &mut gamma);
            }
            let exponent = gamma.mean().unwrap_or(1.0);

            for (i1, i2, _) in &pairs {
                guess_contrast(*i1, *i2, exponent, &mut contrast);
            }
            let factor = contrast.mean().unwrap_or(1.0);

            for (i1, _, _) in &pairs {
                guess_brightness(*i1, exponent, factor, &mut brightness);
            }
        }

        let exponent = gamma.mean().unwrap_or(1.0);
        let factor = contrast.mean().unwrap_or(1.0);
        let shift = brightness.mean().unwrap_or(0.0);

        Some(Self {
            brightness: (shift * 100.0) as i32,
            contrast: (100.0 - 200.0 / (factor + 1.0)) as i32,
            gamma: (100.0 / exponent) as i32,
        })
    }
}

#[derive(Debug, Default)]
struct Estimate {
    sum: f64,
    count: usize,
}

impl Estimate {
    fn add(&mut self, value: f64) {
        if value.is_finite() {
            self.sum += value;
            self.count += 1;
        }
    }

    fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

/// Index pairs at least four steps apart, spread evenly over `begin..=end`,
/// with a margin of one step so neighbours can be sampled.
fn sample_pairs(begin: usize, end: usize) -> Vec<(usize, usize, usize)> {
    let step = (end - begin) / 8;
    let low = begin + step + 1;
    let high = end - step - 2;
    let slack = high.saturating_sub(low + 4 * step);
    let last = APPROXIMATIONS - 1;

    (0..APPROXIMATIONS)
        .map(|k| {
            let i1 = low + slack * k / last;
            let i2 = high - slack * (last - k) / last;
            (i1, i2, step)
        })
        .collect()
}

/// Gamma table exposed as brightness, contrast and gamma.
#[derive(Debug)]
pub struct GammaOption {
    base: BaseOption,
    table: Vec<i32>,
    max: i32,
    curve: Curve,
}

impl GammaOption {
    pub(crate) fn new(device: Arc<dyn DeviceHandle>, index: i32) -> Self {
        Self {
            base: BaseOption::new(device, index),
            table: Vec::new(),
            max: 0,
            curve: Curve::IDENTITY,
        }
    }

    /// The full transfer curve as last written or read.
    pub fn table(&self) -> &[i32] {
        &self.table
    }
}

impl OptionModel for GammaOption {
    fn base(&self) -> &BaseOption {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseOption {
        &mut self.base
    }

    fn option_type(&self) -> OptionType {
        OptionType::Gamma
    }

    fn read_option(&mut self) {
        self.base.begin_reload();

        let len = self.base.value_size();
        if self.table.len() != len {
            self.table = (0..len as i32).collect();
        }

        self.max = match self.base.descriptor().map(|desc| &desc.constraint) {
            Some(Constraint::Range { range, .. }) => *range.end(),
            _ => 0,
        };

        self.base.end_reload();
    }

    fn read_value(&mut self) {
        let Some(data) = self.base.read_data(OptionType::Gamma) else {
            return;
        };

        let table = words_to_values(&data);
        if table == self.table {
            return;
        }
        self.table = table;

        let curve = Curve::estimate(&self.table, self.max).unwrap_or(Curve::IDENTITY);
        if curve != self.curve {
            self.curve = curve;
            self.base.emit(OptionEvent::ValueChanged(curve.to_value()));
        }
    }

    fn value(&self) -> Option<Value> {
        match self.state() {
            OptionState::Hidden => None,
            _ => Some(self.curve.to_value()),
        }
    }

    /// Accepts `"brightness:contrast:gamma"` or a list of three integers.
    fn set_value(&mut self, value: &Value) -> bool {
        if self.state() != OptionState::Active {
            return false;
        }

        let Some(curve) = Curve::parse(value) else {
            return false;
        };

        let table = curve.table(self.table.len(), self.max);
        if curve == self.curve && table == self.table {
            return true;
        }

        self.curve = curve;
        self.table = table;

        let mut data = values_to_words(&self.table);
        if !write_option(self, &mut data) {
            return false;
        }

        self.base.emit(OptionEvent::ValueChanged(self.curve.to_value()));
        true
    }

    fn maximum_value(&self) -> Option<Value> {
        Some(Value::Int(self.max))
    }

    /// Number of entries in the table.
    fn value_size(&self) -> usize {
        self.table.len()
    }

    fn value_as_string(&self) -> String {
        if self.state() == OptionState::Hidden {
            return String::new();
        }

        let Curve {
            brightness,
            contrast,
            gamma,
        } = self.curve;
        format!("{brightness}:{contrast}:{gamma}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_curve() {
        let table = Curve::IDENTITY.table(256, 255);
        for (i, entry) in table.iter().enumerate() {
            assert_eq!(*entry, (255.0 * i as f64 / 256.0).round() as i32);
        }
    }

    #[test]
    fn parses_both_forms() {
        let expected = Curve {
            brightness: 10,
            contrast: -5,
            gamma: 120,
        };
        assert_eq!(Curve::parse(&Value::from("10:-5:120")), Some(expected));
        assert_eq!(Curve::parse(&Value::from(vec![10, -5, 120])), Some(expected));
        assert_eq!(Curve::parse(&Value::from("10:-5")), None);
        assert_eq!(Curve::parse(&Value::from("a:b:c")), None);
        assert_eq!(Curve::parse(&Value::from(7)), None);
    }

    #[test]
    fn estimate_recovers_generated_curves() {
        for curve in [
            Curve::IDENTITY,
            Curve {
                brightness: 0,
                contrast: 0,
                gamma: 50,
            },
            Curve {
                brightness: 10,
                contrast: 20,
                gamma: 100,
            },
        ] {
            let table = curve.table(4096, 65535);
            let estimated = Curve::estimate(&table, 65535).unwrap();

            assert!((estimated.gamma - curve.gamma).abs() <= 2, "{curve:?} -> {estimated:?}");
            assert!((estimated.contrast - curve.contrast).abs() <= 2, "{curve:?} -> {estimated:?}");
            assert!(
                (estimated.brightness - curve.brightness).abs() <= 2,
                "{curve:?} -> {estimated:?}"
            );
        }
    }

    #[test]
    fn flat_tables_have_no_estimate() {
        assert_eq!(Curve::estimate(&[7; 64], 255), None);
        assert_eq!(Curve::estimate(&[], 255), None);
    }

    #[test]
    fn sample_pairs_stay_in_bounds() {
        for (begin, end) in [(0, 33), (1, 254), (10, 4000)] {
            for (i1, i2, step) in sample_pairs(begin, end) {
                assert!(i1 >= begin + step + 1);
                assert!(i2 + step <= end);
                assert!(i2 - i1 >= 4 * step);
            }
        }
    }
}
