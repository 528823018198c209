//! Scripted in-memory scanner used by the tests.

use crate::{
    auth::{Authentication, Credentials},
    backend::{Backend, DeviceHandle, DeviceInfo},
    codec::{double_to_fixed, read_word, string_to_bytes, value_to_word, WORD_SIZE},
    descriptor::{
        Capabilities, Constraint, ControlInfo, FrameFormat, OptionDescriptor, Parameters, Unit,
        ValueType,
    },
    result::{Result, SaneError},
};
use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex, MutexGuard,
    },
    thread,
    time::Duration,
};

pub fn descriptor(
    name: &str,
    ty: ValueType,
    unit: Unit,
    size: usize,
    constraint: Constraint,
) -> OptionDescriptor {
    OptionDescriptor {
        name: name.to_owned(),
        title: name.to_owned(),
        description: String::new(),
        ty,
        unit,
        size,
        capabilities: Capabilities::SOFT_SELECT | Capabilities::SOFT_DETECT,
        constraint,
    }
}

pub fn bool_option(name: &str) -> OptionDescriptor {
    descriptor(name, ValueType::Bool, Unit::None, WORD_SIZE, Constraint::None)
}

pub fn int_range(name: &str, unit: Unit, min: i32, max: i32, quant: i32) -> OptionDescriptor {
    let constraint = Constraint::Range {
        range: min..=max,
        quant,
    };
    descriptor(name, ValueType::Int, unit, WORD_SIZE, constraint)
}

pub fn fixed_range(name: &str, unit: Unit, min: f64, max: f64) -> OptionDescriptor {
    let constraint = Constraint::Range {
        range: double_to_fixed(min)..=double_to_fixed(max),
        quant: 0,
    };
    descriptor(name, ValueType::Fixed, unit, WORD_SIZE, constraint)
}

pub fn word_list(name: &str, unit: Unit, words: &[i32]) -> OptionDescriptor {
    let constraint = Constraint::WordList(words.to_vec());
    descriptor(name, ValueType::Int, unit, WORD_SIZE, constraint)
}

pub fn string_list(name: &str, entries: &[&str]) -> OptionDescriptor {
    let size = entries.iter().map(|entry| entry.len() + 1).max().unwrap_or(1);
    let constraint = Constraint::StringList(entries.iter().map(|entry| entry.to_string()).collect());
    descriptor(name, ValueType::String, Unit::None, size, constraint)
}

pub fn string(name: &str, size: usize) -> OptionDescriptor {
    descriptor(name, ValueType::String, Unit::None, size, Constraint::None)
}

pub fn button(name: &str) -> OptionDescriptor {
    descriptor(name, ValueType::Button, Unit::None, 0, Constraint::None)
}

pub fn gamma(name: &str, len: usize, max: i32) -> OptionDescriptor {
    let constraint = Constraint::Range {
        range: 0..=max,
        quant: 0,
    };
    descriptor(name, ValueType::Int, Unit::None, len * WORD_SIZE, constraint)
}

/// A hardware sensor: readable, not writable.
pub fn sensor(name: &str) -> OptionDescriptor {
    OptionDescriptor {
        capabilities: Capabilities::SOFT_DETECT | Capabilities::HARD_SELECT,
        ..bool_option(name)
    }
}

pub fn word(value: i32) -> Vec<u8> {
    value_to_word(value).to_vec()
}

pub fn fixed(value: f64) -> Vec<u8> {
    word(double_to_fixed(value))
}

pub fn text(value: &str, size: usize) -> Vec<u8> {
    string_to_bytes(value, size)
}

/// Frame delivered by one `start`.
#[derive(Debug, Clone)]
pub struct Frame {
    pub parameters: Parameters,
    pub data: Vec<u8>,
}

impl Frame {
    pub fn gray(width: usize, height: usize, fill: u8) -> Self {
        Self {
            parameters: Parameters {
                format: FrameFormat::Gray,
                last_frame: true,
                bytes_per_line: width,
                pixels_per_line: width,
                lines: Some(height),
                depth: 8,
            },
            data: vec![fill; width * height],
        }
    }
}

struct Slot {
    descriptor: OptionDescriptor,
    data: Vec<u8>,
    response: ControlInfo,
    fail_writes: bool,
    writes: usize,
}

pub struct FakeDevice {
    slots: Mutex<Vec<Slot>>,
    frames: Mutex<VecDeque<Frame>>,
    current: Mutex<Option<(Frame, usize)>>,
    cancelled: AtomicBool,
    stalled: AtomicBool,
    starts: AtomicUsize,
    cancels: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl FakeDevice {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            slots: Mutex::new(Vec::new()),
            frames: Mutex::new(VecDeque::new()),
            current: Mutex::new(None),
            cancelled: AtomicBool::new(false),
            stalled: AtomicBool::new(false),
            starts: AtomicUsize::new(0),
            cancels: AtomicUsize::new(0),
        })
    }

    /// A4 flatbed with an optional document feeder and a scan button.
    pub fn flatbed() -> Arc<Self> {
        let device = Self::new();
        device.add(
            string_list("source", &["Flatbed", "Automatic Document Feeder"]),
            text("Flatbed", 26),
        );
        device.add(string_list("mode", &["Lineart", "Gray", "Color"]), text("Gray", 8));
        device.add(word_list("depth", Unit::Bit, &[1, 8, 16]), word(8));
        device.add(
            word_list("resolution", Unit::Dpi, &[75, 150, 300, 600]),
            word(150),
        );
        device.add(fixed_range("tl-x", Unit::Mm, 0.0, 215.9), fixed(0.0));
        device.add(fixed_range("tl-y", Unit::Mm, 0.0, 297.0), fixed(0.0));
        device.add(fixed_range("br-x", Unit::Mm, 0.0, 215.9), fixed(215.9));
        device.add(fixed_range("br-y", Unit::Mm, 0.0, 297.0), fixed(297.0));
        device.add(bool_option("preview"), word(0));
        device.add(sensor("scan"), word(0));
        device
    }

    /// Appends an option and returns its index.
    pub fn add(&self, descriptor: OptionDescriptor, mut data: Vec<u8>) -> i32 {
        data.resize(descriptor.size, 0);

        let mut slots = lock(&self.slots);
        slots.push(Slot {
            descriptor,
            data,
            response: ControlInfo::empty(),
            fail_writes: false,
            writes: 0,
        });
        slots.len() as i32
    }

    pub fn index_of(&self, name: &str) -> i32 {
        lock(&self.slots)
            .iter()
            .position(|slot| slot.descriptor.name == name)
            .map(|position| position as i32 + 1)
            .unwrap_or(-1)
    }

    fn with_slot<T>(&self, index: i32, f: impl FnOnce(&mut Slot) -> T) -> Option<T> {
        let mut slots = lock(&self.slots);
        let position = usize::try_from(index).ok()?.checked_sub(1)?;
        slots.get_mut(position).map(f)
    }

    pub fn update_descriptor(&self, index: i32, f: impl FnOnce(&mut OptionDescriptor)) {
        self.with_slot(index, |slot| {
            f(&mut slot.descriptor);
            slot.data.resize(slot.descriptor.size, 0);
        });
    }

    /// Changes a value behind the frontend's back.
    pub fn set_raw(&self, index: i32, mut data: Vec<u8>) {
        self.with_slot(index, |slot| {
            data.resize(slot.descriptor.size, 0);
            slot.data = data;
        });
    }

    pub fn raw(&self, index: i32) -> Vec<u8> {
        self.with_slot(index, |slot| slot.data.clone()).unwrap_or_default()
    }

    pub fn word(&self, index: i32) -> i32 {
        read_word(&self.raw(index))
    }

    /// Info bits returned by every write to `index`.
    pub fn respond_with(&self, index: i32, info: ControlInfo) {
        self.with_slot(index, |slot| slot.response = info);
    }

    pub fn fail_writes(&self, index: i32) {
        self.with_slot(index, |slot| slot.fail_writes = true);
    }

    pub fn writes(&self, index: i32) -> usize {
        self.with_slot(index, |slot| slot.writes).unwrap_or(0)
    }

    pub fn push_frame(&self, frame: Frame) {
        lock(&self.frames).push_back(frame);
    }

    /// Makes `read` block until the scan is cancelled, like a slow scanner.
    pub fn stall_reads(&self) {
        self.stalled.store(true, Ordering::SeqCst);
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn cancels(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }
}

impl DeviceHandle for FakeDevice {
    fn option_descriptor(&self, index: i32) -> Option<OptionDescriptor> {
        if index == 0 {
            return Some(OptionDescriptor {
                capabilities: Capabilities::SOFT_DETECT,
                ..descriptor("", ValueType::Int, Unit::None, WORD_SIZE, Constraint::None)
            });
        }

        self.with_slot(index, |slot| slot.descriptor.clone())
    }

    fn get_value(&self, index: i32, data: &mut [u8]) -> Result<()> {
        let value = match index {
            0 => word(lock(&self.slots).len() as i32 + 1),
            _ => self.raw(index),
        };

        let len = value.len().min(data.len());
        data[..len].copy_from_slice(&value[..len]);
        Ok(())
    }

    fn set_value(&self, index: i32, data: &mut [u8]) -> Result<ControlInfo> {
        self.with_slot(index, |slot| {
            slot.writes += 1;
            if slot.fail_writes {
                return Err(SaneError::Inval);
            }

            let mut info = slot.response;
            if let Constraint::Range { range, .. } = &slot.descriptor.constraint {
                if slot.descriptor.size == WORD_SIZE && data.len() >= WORD_SIZE {
                    let requested = read_word(data);
                    let clamped = requested.clamp(*range.start(), *range.end());
                    if clamped != requested {
                        data[..WORD_SIZE].copy_from_slice(&value_to_word(clamped));
                        info |= ControlInfo::INEXACT;
                    }
                }
            }

            let len = data.len().min(slot.data.len());
            slot.data[..len].copy_from_slice(&data[..len]);
            Ok(info)
        })
        .unwrap_or(Err(SaneError::Inval))
    }

    fn parameters(&self) -> Result<Parameters> {
        if let Some((frame, _)) = lock(&self.current).as_ref() {
            return Ok(frame.parameters);
        }
        if let Some(frame) = lock(&self.frames).front() {
            return Ok(frame.parameters);
        }
        Ok(Frame::gray(0, 0, 0).parameters)
    }

    fn start(&self) -> Result<()> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        self.cancelled.store(false, Ordering::SeqCst);

        let frame = lock(&self.frames).pop_front().ok_or(SaneError::NoDocs)?;
        *lock(&self.current) = Some((frame, 0));
        Ok(())
    }

    fn read(&self, buf: &mut [u8]) -> Result<usize> {
        while self.stalled.load(Ordering::SeqCst) && !self.cancelled.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(1));
        }

        if self.cancelled.load(Ordering::SeqCst) {
            return Err(SaneError::Cancelled);
        }

        let mut current = lock(&self.current);
        let Some((frame, position)) = current.as_mut() else {
            return Err(SaneError::EOF);
        };

        let remaining = &frame.data[*position..];
        if remaining.is_empty() {
            *current = None;
            return Err(SaneError::EOF);
        }

        let len = remaining.len().min(buf.len());
        buf[..len].copy_from_slice(&remaining[..len]);
        *position += len;
        Ok(len)
    }

    fn cancel(&self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
        self.cancelled.store(true, Ordering::SeqCst);
        *lock(&self.current) = None;
    }
}

pub struct FakeBackend {
    devices: Mutex<Vec<(DeviceInfo, Arc<FakeDevice>)>>,
    open_errors: Mutex<HashMap<String, SaneError>>,
    auth: Mutex<Option<Arc<Authentication>>>,
    seen_credentials: Mutex<Option<Credentials>>,
    refs_at_exit: Mutex<Vec<usize>>,
    init_calls: AtomicUsize,
    exit_calls: AtomicUsize,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            devices: Mutex::new(Vec::new()),
            open_errors: Mutex::new(HashMap::new()),
            auth: Mutex::new(None),
            seen_credentials: Mutex::new(None),
            refs_at_exit: Mutex::new(Vec::new()),
            init_calls: AtomicUsize::new(0),
            exit_calls: AtomicUsize::new(0),
        })
    }

    pub fn add_device(&self, name: &str, ty: &str, device: Arc<FakeDevice>) {
        let info = DeviceInfo {
            name: name.to_owned(),
            vendor: "Noname".to_owned(),
            model: "frontend-tester".to_owned(),
            ty: ty.to_owned(),
        };
        lock(&self.devices).push((info, device));
    }

    pub fn fail_open(&self, name: &str, err: SaneError) {
        lock(&self.open_errors).insert(name.to_owned(), err);
    }

    /// Credentials the authorization callback produced at the last open.
    pub fn seen_credentials(&self) -> Option<Credentials> {
        lock(&self.seen_credentials).clone()
    }

    pub fn init_calls(&self) -> usize {
        self.init_calls.load(Ordering::SeqCst)
    }

    pub fn exit_calls(&self) -> usize {
        self.exit_calls.load(Ordering::SeqCst)
    }

    /// Reference counts of the registered devices at the last `exit`.
    pub fn device_refs_at_exit(&self) -> Vec<usize> {
        lock(&self.refs_at_exit).clone()
    }
}

impl Backend for FakeBackend {
    fn init(&self, auth: Arc<Authentication>) -> Result<i32> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        *lock(&self.auth) = Some(auth);
        Ok(0x0101_0000)
    }

    fn exit(&self) {
        self.exit_calls.fetch_add(1, Ordering::SeqCst);
        *lock(&self.refs_at_exit) = lock(&self.devices)
            .iter()
            .map(|(_, device)| Arc::strong_count(device))
            .collect();
        *lock(&self.auth) = None;
    }

    fn devices(&self, _local_only: bool) -> Result<Vec<DeviceInfo>> {
        Ok(lock(&self.devices).iter().map(|(info, _)| info.clone()).collect())
    }

    fn open(&self, name: &str) -> Result<Arc<dyn DeviceHandle>> {
        let credentials = lock(&self.auth)
            .as_ref()
            .and_then(|auth| auth.credentials(name));
        *lock(&self.seen_credentials) = credentials;

        if let Some(err) = lock(&self.open_errors).get(name) {
            return Err(*err);
        }

        lock(&self.devices)
            .iter()
            .find(|(info, _)| info.name == name)
            .map(|(_, device)| device.clone() as Arc<dyn DeviceHandle>)
            .ok_or(SaneError::Inval)
    }
}
