//! An open scanner and everything hanging off it.
//!
//! The session owns the option list and drives the acquisition thread. It is
//! single threaded: timers are deadlines checked by [`Session::process`], and
//! [`Session::next_events`] waits for the next deadline or worker message.

mod scanning;

pub use scanning::{AreaDetector, ScanArea};

use crate::{
    backend::{DeviceHandle, DeviceInfo, DeviceType},
    codec::word_to_value,
    codec::WORD_SIZE,
    context::{Context, ContextGuard},
    descriptor::Unit,
    names::{self, OptionName},
    options::{OptionEvent, OptionModel, PageSizeOption, ScanOption},
    options::{BatchDelayOption, BatchModeOption, InvertOption},
    result::{OpenStatus, Result, SaneError, ScanStatus},
    scan::{self, ScanImage, ScanThread, WorkerMessage},
    value::Value,
};
use regex::Regex;
use scanning::ScanState;
use std::{
    collections::{BTreeMap, HashMap, VecDeque},
    str::FromStr,
    sync::{Arc, LazyLock, MutexGuard},
    time::{Duration, Instant},
};
use tokio::sync::mpsc;

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const VALUE_RELOAD_DELAY: Duration = Duration::from_millis(5);
const BATCH_TICK: Duration = Duration::from_secs(1);

/// How long [`Session::next_events`] sleeps when nothing is scheduled.
const IDLE_WAIT: Duration = Duration::from_secs(3600);

/// Network pixma backends stall for a second on every option read.
static POLLING_EXCLUDED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"pixma.*\d+\.\d+\.\d+\.\d+").expect("polling exclusion pattern is valid")
});

const GEOMETRY: [OptionName; 4] = [
    OptionName::TopLeftX,
    OptionName::TopLeftY,
    OptionName::BottomRightX,
    OptionName::BottomRightY,
];

/// Notifications for the user interface.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// `index` is the position in [`Session::options`].
    OptionValueChanged {
        index: usize,
        name: String,
        value: Value,
    },
    OptionReloaded {
        index: usize,
    },
    /// A hardware button changed state.
    ButtonPressed {
        name: String,
        title: String,
        pressed: bool,
    },
    /// `None` while the device warms up.
    ScanProgress(Option<u8>),
    ImageReady {
        image: ScanImage,
        preview: bool,
    },
    /// Areas found on the last preview, as fractions of the full scan area.
    PreviewAreas(Vec<ScanArea>),
    /// Seconds until the next page in timed batch mode.
    BatchModeCountDown(i32),
    ScanFinished {
        status: ScanStatus,
        message: String,
    },
    UserMessage {
        status: ScanStatus,
        message: String,
    },
    AvailableDevices(Vec<DeviceInfo>),
}

#[derive(Debug, Default)]
struct Deadlines {
    poll: Option<Instant>,
    reload_values: Option<Instant>,
    batch: Option<Instant>,
}

impl Deadlines {
    fn next(&self) -> Option<Instant> {
        [self.poll, self.reload_values, self.batch]
            .into_iter()
            .flatten()
            .min()
    }
}

fn due(deadline: &mut Option<Instant>, now: Instant) -> bool {
    match deadline {
        Some(at) if *at <= now => {
            *deadline = None;
            true
        }
        _ => false,
    }
}

pub struct Session {
    context: ContextGuard,
    device: Option<Arc<dyn DeviceHandle>>,
    device_name: String,
    vendor: String,
    model: String,
    devices: Vec<DeviceInfo>,

    options: Vec<ScanOption>,
    locations: HashMap<OptionName, usize>,
    poll_list: Vec<usize>,
    polling_allowed: bool,
    multi_page: bool,
    wait_for_button: bool,

    events: VecDeque<SessionEvent>,
    deadlines: Deadlines,

    state: ScanState,
    cancel_requested: bool,
    batch_counter: i32,
    preview_dpi: f64,
    area_detector: Option<Box<dyn AreaDetector>>,

    worker: Option<ScanThread>,
    tx: mpsc::UnboundedSender<WorkerMessage>,
    rx: mpsc::UnboundedReceiver<WorkerMessage>,
}

impl Session {
    /// Creates a session without a device. Initializes the backend if this is
    /// the first user of `context`.
    pub fn new(context: &Arc<Context>) -> Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();

        Ok(Self {
            context: context.acquire()?,
            device: None,
            device_name: String::new(),
            vendor: String::new(),
            model: String::new(),
            devices: Vec::new(),
            options: Vec::new(),
            locations: HashMap::new(),
            poll_list: Vec::new(),
            polling_allowed: true,
            multi_page: false,
            wait_for_button: false,
            events: VecDeque::new(),
            deadlines: Deadlines::default(),
            state: ScanState::Idle,
            cancel_requested: false,
            batch_counter: 0,
            preview_dpi: 0.0,
            area_detector: None,
            worker: None,
            tx,
            rx,
        })
    }

    pub fn open_device(&mut self, name: &str) -> OpenStatus {
        if self.device.is_some() || name.is_empty() {
            return OpenStatus::Failed;
        }

        if self.devices.is_empty() {
            if let Err(err) = self.refresh_devices(DeviceType::AllDevices) {
                log::debug!("Failed to list devices: {err}");
            }
        }

        let device = match self.context.backend().open(name) {
            Ok(device) => device,
            Err(SaneError::AccessDenied) => {
                log::info!("Access to '{name}' denied");
                return OpenStatus::AccessDenied;
            }
            Err(err) => {
                log::warn!("Failed to open '{name}': {err}");
                return OpenStatus::Failed;
            }
        };

        let Some(count) = option_count(device.as_ref()) else {
            log::warn!("Failed to read the number of options of '{name}'");
            self.context.authentication().clear_device_auth(name);
            return OpenStatus::Failed;
        };

        log::info!("Opened '{name}' with {count} options");

        self.device_name = name.to_owned();
        (self.vendor, self.model) = self
            .devices
            .iter()
            .find(|info| info.name == name)
            .map(|info| (info.vendor.clone(), info.model.clone()))
            .unwrap_or_default();

        self.options = (1..count)
            .map(|index| ScanOption::new(device.clone(), index))
            .collect();
        self.options.push(ScanOption::PageSize(PageSizeOption::new()));
        self.options.push(ScanOption::BatchMode(BatchModeOption::new()));
        self.options.push(ScanOption::BatchDelay(BatchDelayOption::new()));
        self.options.push(ScanOption::Invert(InvertOption::new()));

        for option in &mut self.options {
            option.take_events();
        }

        self.locations = self
            .options
            .iter()
            .enumerate()
            .filter_map(|(position, option)| {
                OptionName::from_str(option.name())
                    .ok()
                    .map(|name| (name, position))
            })
            .collect();

        self.poll_list = self
            .options
            .iter()
            .enumerate()
            .filter(|(_, option)| option.needs_polling())
            .map(|(position, _)| position)
            .collect();

        self.multi_page = self
            .value(OptionName::Source)
            .is_some_and(|source| names::is_multi_page_source(&source.to_text()));
        self.wait_for_button = self
            .value(OptionName::WaitForButton)
            .and_then(|value| value.to_bool())
            .unwrap_or(false);

        self.polling_allowed = !POLLING_EXCLUDED.is_match(name);
        if !self.polling_allowed {
            log::info!("Not polling options of '{name}'");
        }

        self.worker = Some(ScanThread::new(device.clone(), self.tx.clone()));
        self.device = Some(device);

        self.compute_page_sizes();
        for option in &mut self.options {
            option.take_events();
        }

        self.write(OptionName::ScanMode, names::SCAN_MODE_COLOR);
        self.write(OptionName::BitDepth, 8);
        self.write(OptionName::Resolution, 300);

        self.start_polling(Instant::now());
        self.dispatch();

        OpenStatus::Succeeded
    }

    /// Opens a device that asked for credentials on the first attempt.
    pub fn open_restricted_device(&mut self, name: &str, username: &str, password: &str) -> OpenStatus {
        self.context
            .authentication()
            .set_device_auth(name, username, password);

        let status = self.open_device(name);
        if status != OpenStatus::Succeeded {
            self.context.authentication().clear_device_auth(name);
        }
        status
    }

    /// Returns `false` when no device was open.
    pub fn close_device(&mut self) -> bool {
        if self.device.is_none() {
            return false;
        }

        self.stop_scan();

        // The device has to be closed before the context can shut the backend down.
        if let Some(worker) = self.worker.take() {
            worker.shutdown();
        }
        (self.tx, self.rx) = mpsc::unbounded_channel();

        self.context
            .authentication()
            .clear_device_auth(&self.device_name);

        log::info!("Closed '{}'", self.device_name);

        self.device = None;
        self.device_name.clear();
        self.vendor.clear();
        self.model.clear();
        self.options.clear();
        self.locations.clear();
        self.poll_list.clear();
        self.multi_page = false;
        self.wait_for_button = false;
        self.deadlines = Deadlines::default();
        self.state = ScanState::Idle;

        true
    }

    pub fn is_open(&self) -> bool {
        self.device.is_some()
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn device_vendor(&self) -> &str {
        &self.vendor
    }

    pub fn device_model(&self) -> &str {
        &self.model
    }

    /// Lists devices and emits [`SessionEvent::AvailableDevices`]. Refused while
    /// a device is open, since some backends can't list devices then.
    pub fn reload_devices_list(&mut self, ty: DeviceType) -> bool {
        if self.device.is_some() {
            return false;
        }

        match self.refresh_devices(ty) {
            Ok(()) => {
                let devices = self.devices.clone();
                self.events.push_back(SessionEvent::AvailableDevices(devices));
                true
            }
            Err(err) => {
                log::warn!("Failed to list devices: {err}");
                self.events.push_back(SessionEvent::AvailableDevices(Vec::new()));
                false
            }
        }
    }

    fn refresh_devices(&mut self, ty: DeviceType) -> Result<()> {
        let devices = self.context.backend().devices(false)?;
        self.devices = devices.into_iter().filter(|device| ty.accepts(device)).collect();

        for device in &self.devices {
            log::debug!("Found device {device}");
        }
        Ok(())
    }

    pub fn devices(&self) -> &[DeviceInfo] {
        &self.devices
    }

    pub fn options(&self) -> &[ScanOption] {
        &self.options
    }

    /// A well-known option, if the device has it.
    pub fn option(&self, name: OptionName) -> Option<&ScanOption> {
        self.locations
            .get(&name)
            .and_then(|position| self.options.get(*position))
    }

    pub fn option_by_name(&self, name: &str) -> Option<&ScanOption> {
        self.position_of(name)
            .and_then(|position| self.options.get(position))
    }

    fn position_of(&self, name: &str) -> Option<usize> {
        self.options.iter().position(|option| option.name() == name)
    }

    /// Sets the option at `index` in [`Session::options`].
    pub fn set_option_value(&mut self, index: usize, value: impl Into<Value>) -> bool {
        let Some(option) = self.options.get_mut(index) else {
            return false;
        };

        let value = value.into();
        let written = option.set_value(&value);
        if !written {
            log::debug!("Option '{}' refused '{value}'", option.name());
        }

        self.dispatch();
        written
    }

    /// Current values of all options that have a text form.
    pub fn options_map(&self) -> BTreeMap<String, String> {
        self.options
            .iter()
            .filter(|option| !option.name().is_empty())
            .filter_map(|option| {
                let value = option.value_as_string();
                (!value.is_empty()).then(|| (option.name().to_owned(), value))
            })
            .collect()
    }

    /// Applies a map from [`Session::options_map`]. Source and mode go first as
    /// they change the other options, resolutions go last as backends adjust
    /// them to the area. Returns how many values were taken, `None` while
    /// closed or scanning.
    pub fn set_options_map(&mut self, map: &BTreeMap<String, String>) -> Option<usize> {
        if self.device.is_none() || self.is_busy() {
            return None;
        }

        const FIRST: [&str; 2] = [names::SOURCE, names::MODE];
        const LAST: [&str; 3] = [names::RESOLUTION, names::X_RESOLUTION, names::Y_RESOLUTION];

        let mut applied = 0;
        let mut apply = |session: &mut Self, name: &str| {
            let (Some(text), Some(position)) = (map.get(name), session.position_of(name)) else {
                return;
            };

            if session.options[position].set_value(&Value::String(text.clone())) {
                applied += 1;
            } else {
                log::debug!("Option '{name}' refused '{text}'");
            }
            session.dispatch();
        };

        for name in FIRST {
            apply(self, name);
        }

        let others: Vec<String> = self
            .options
            .iter()
            .map(|option| option.name().to_owned())
            .filter(|name| !name.is_empty() && !FIRST.contains(&name.as_str()) && !LAST.contains(&name.as_str()))
            .collect();
        for name in &others {
            apply(self, name);
        }

        for name in LAST {
            apply(self, name);
        }

        Some(applied)
    }

    /// Resolution used for previews. Values below 25 pick one automatically.
    pub fn set_preview_resolution(&mut self, dpi: f64) {
        self.preview_dpi = dpi;
    }

    pub fn set_area_detector(&mut self, detector: Box<dyn AreaDetector>) {
        self.area_detector = Some(detector);
    }

    pub fn is_busy(&self) -> bool {
        self.state != ScanState::Idle
    }

    /// The image being acquired. Hold the guard briefly, the worker waits on it.
    pub fn lock_scan_image(&self) -> Option<MutexGuard<'_, ScanImage>> {
        self.worker
            .as_ref()
            .map(|worker| scan::lock_image(worker.image()))
    }

    pub fn take_events(&mut self) -> Vec<SessionEvent> {
        self.events.drain(..).collect()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.next()
    }

    /// Handles worker messages and everything scheduled up to `now`.
    pub fn process(&mut self, now: Instant) {
        while let Ok(message) = self.rx.try_recv() {
            self.handle_worker_message(message, now);
        }

        if due(&mut self.deadlines.reload_values, now) {
            self.reload_values();
        }

        if due(&mut self.deadlines.poll, now) {
            self.poll();
            self.start_polling(now);
        }

        if due(&mut self.deadlines.batch, now) {
            self.batch_tick(now);
        }

        self.dispatch();
    }

    /// Waits until something happens and returns the resulting events.
    pub async fn next_events(&mut self) -> Vec<SessionEvent> {
        loop {
            self.process(Instant::now());
            if !self.events.is_empty() {
                return self.take_events();
            }

            let wake = self
                .next_deadline()
                .unwrap_or_else(|| Instant::now() + IDLE_WAIT);
            let sleep = tokio::time::sleep_until(tokio::time::Instant::from_std(wake));

            let message = tokio::select! {
                message = self.rx.recv() => message,
                _ = sleep => None,
            };

            if let Some(message) = message {
                self.handle_worker_message(message, Instant::now());
            }
        }
    }

    fn handle_worker_message(&mut self, message: WorkerMessage, now: Instant) {
        match message {
            WorkerMessage::Progress(progress) => {
                self.events.push_back(SessionEvent::ScanProgress(Some(progress)))
            }
            WorkerMessage::Finished(result) => self.acquisition_finished(result, now),
        }
    }

    fn value(&self, name: OptionName) -> Option<Value> {
        self.option(name).and_then(|option| option.value())
    }

    fn double(&self, name: OptionName) -> Option<f64> {
        self.value(name).and_then(|value| value.to_double())
    }

    /// Sets a well-known option without dispatching its events.
    fn write(&mut self, name: OptionName, value: impl Into<Value>) -> bool {
        let Some(position) = self.locations.get(&name).copied() else {
            return false;
        };
        self.options[position].set_value(&value.into())
    }

    fn store(&mut self, name: OptionName) {
        if let Some(position) = self.locations.get(&name).copied() {
            self.options[position].store_current_data();
        }
    }

    fn restore(&mut self, name: OptionName) {
        if let Some(position) = self.locations.get(&name).copied() {
            self.options[position].restore_saved_data();
        }
    }

    fn page_size(&self) -> Option<&PageSizeOption> {
        match self.option(OptionName::PageSize)? {
            ScanOption::PageSize(option) => Some(option),
            _ => None,
        }
    }

    fn page_size_mut(&mut self) -> Option<&mut PageSizeOption> {
        let position = *self.locations.get(&OptionName::PageSize)?;
        match &mut self.options[position] {
            ScanOption::PageSize(option) => Some(option),
            _ => None,
        }
    }

    fn batch_mode(&self) -> bool {
        matches!(
            self.option(OptionName::BatchMode),
            Some(ScanOption::BatchMode(option)) if option.is_enabled()
        )
    }

    fn batch_delay(&self) -> i32 {
        match self.option(OptionName::BatchDelay) {
            Some(ScanOption::BatchDelay(option)) => option.delay(),
            _ => 0,
        }
    }

    fn invert_colors(&self) -> bool {
        matches!(
            self.option(OptionName::InvertColors),
            Some(ScanOption::Invert(option)) if option.is_checked()
        )
    }

    fn resolution_name(&self) -> OptionName {
        if self.locations.contains_key(&OptionName::Resolution) {
            OptionName::Resolution
        } else {
            OptionName::XResolution
        }
    }

    fn current_dpi(&self) -> Option<f64> {
        self.double(self.resolution_name())
    }

    /// Geometry values in pixels are converted with the current resolution.
    fn to_mm(&self, name: OptionName, value: f64) -> f64 {
        match (self.option(name).map(|option| option.unit()), self.current_dpi()) {
            (Some(Unit::Pixel), Some(dpi)) if dpi > 1.0 => value / (dpi / 25.4),
            _ => value,
        }
    }

    fn from_mm(&self, name: OptionName, value: f64) -> f64 {
        match (self.option(name).map(|option| option.unit()), self.current_dpi()) {
            (Some(Unit::Pixel), Some(dpi)) if dpi > 1.0 => value * (dpi / 25.4),
            _ => value,
        }
    }

    /// Distance in mm within which a coordinate still matches a page size.
    fn tolerance(&self, name: OptionName) -> f64 {
        self.option(name)
            .and_then(|option| option.step_value())
            .and_then(|step| step.to_double())
            .map_or(0.0, |step| self.to_mm(name, step))
            .max(0.01)
    }

    fn dispatch(&mut self) {
        loop {
            let pending: Vec<(usize, OptionEvent)> = self
                .options
                .iter_mut()
                .enumerate()
                .flat_map(|(position, option)| {
                    option
                        .take_events()
                        .into_iter()
                        .map(move |event| (position, event))
                })
                .collect();

            if pending.is_empty() {
                break;
            }

            let mut reload = false;
            for (position, event) in pending {
                match event {
                    OptionEvent::ValueChanged(value) => self.value_changed(position, value),
                    OptionEvent::OptionsNeedReload => reload = true,
                    OptionEvent::ValuesNeedReload => {
                        self.deadlines.reload_values = Some(Instant::now() + VALUE_RELOAD_DELAY)
                    }
                    OptionEvent::Reloaded => self
                        .events
                        .push_back(SessionEvent::OptionReloaded { index: position }),
                    OptionEvent::PageSizeSelected { width, height } => {
                        self.apply_page_size(width, height)
                    }
                }
            }

            if reload {
                self.reload_options();
            }
        }
    }

    fn value_changed(&mut self, position: usize, value: Value) {
        let option = &self.options[position];

        if let (true, Value::Bool(pressed)) = (self.poll_list.contains(&position), &value) {
            self.events.push_back(SessionEvent::ButtonPressed {
                name: option.name().to_owned(),
                title: option.title().to_owned(),
                pressed: *pressed,
            });
            return;
        }

        let name = option.name().to_owned();
        let known = OptionName::from_str(&name).ok();

        self.events.push_back(SessionEvent::OptionValueChanged {
            index: position,
            name,
            value: value.clone(),
        });

        match known {
            Some(OptionName::Source) => {
                self.multi_page = names::is_multi_page_source(&value.to_text());
            }
            Some(OptionName::WaitForButton) => {
                self.wait_for_button = value.to_bool().unwrap_or(false);
            }
            Some(name @ (OptionName::TopLeftX | OptionName::TopLeftY)) => {
                if self.double(name).is_some_and(|value| value != 0.0) {
                    self.fall_back_to_custom();
                }
            }
            Some(name @ (OptionName::BottomRightX | OptionName::BottomRightY)) => {
                self.check_page_edge(name);
            }
            _ => {}
        }
    }

    fn fall_back_to_custom(&mut self) {
        if let Some(page) = self.page_size_mut() {
            if page.current_index() != 0 {
                page.set_custom();
            }
        }
    }

    fn check_page_edge(&mut self, name: OptionName) {
        let Some(page) = self.page_size() else {
            return;
        };
        if page.current_index() == 0 {
            return;
        }

        let (width, height) = page.current().effective_size();
        let expected = match name {
            OptionName::BottomRightX => width,
            _ => height,
        };

        let Some(actual) = self.double(name).map(|value| self.to_mm(name, value)) else {
            return;
        };

        if (actual - expected).abs() > self.tolerance(name) {
            log::debug!("'{name}' moved to {actual:.2} mm, page size is now custom");
            self.fall_back_to_custom();
        }
    }

    fn apply_page_size(&mut self, width: f64, height: f64) {
        log::debug!("Apply page size {width} x {height} mm");

        if let (Some(page_width), Some(page_height)) =
            (self.position_of(names::PAGE_WIDTH), self.position_of(names::PAGE_HEIGHT))
        {
            self.options[page_width].set_value(&Value::Double(width));
            self.options[page_height].set_value(&Value::Double(height));
        }

        self.write(OptionName::TopLeftX, 0.0);
        self.write(OptionName::TopLeftY, 0.0);

        let width = self.from_mm(OptionName::BottomRightX, width);
        let height = self.from_mm(OptionName::BottomRightY, height);
        self.write(OptionName::BottomRightX, width);
        self.write(OptionName::BottomRightY, height);
    }

    /// Rebuilds the page size catalog from the largest possible scan area.
    ///
    /// Some backends cap the bottom-right range to the selected page width and
    /// height, so those are maximized while measuring and restored afterwards.
    fn compute_page_sizes(&mut self) {
        let page_options = self
            .position_of(names::PAGE_WIDTH)
            .zip(self.position_of(names::PAGE_HEIGHT));

        if let Some((width, height)) = page_options {
            for position in [width, height] {
                let option = &mut self.options[position];
                option.store_current_data();
                if let Some(max) = option.maximum_value() {
                    option.set_value(&max);
                }
            }
        }

        let max_edge = |name: OptionName| {
            self.option(name)
                .and_then(|option| option.maximum_value())
                .and_then(|max| max.to_double())
                .map(|max| self.to_mm(name, max))
        };

        let geometry_complete = GEOMETRY.iter().all(|name| self.locations.contains_key(name));
        let max_area = max_edge(OptionName::BottomRightX).zip(max_edge(OptionName::BottomRightY));

        if let Some(page) = self.page_size_mut() {
            match max_area {
                Some((width, height)) if geometry_complete => page.rebuild(width, height),
                _ => page.clear(),
            }
        }

        if let Some((width, height)) = page_options {
            self.options[height].restore_saved_data();
            self.options[width].restore_saved_data();
        }
    }

    /// Re-reads every option after a write changed the option layout, keeping
    /// the scan area and its page size.
    fn reload_options(&mut self) {
        log::debug!("Reloading all options");

        let area = GEOMETRY.map(|name| self.value(name));

        for option in &mut self.options {
            option.read_option();
            option.read_value();
        }

        self.compute_page_sizes();

        for (name, value) in GEOMETRY.into_iter().zip(area) {
            if let Some(value) = value {
                self.write(name, value);
            }
        }

        let matched = self.matching_page_size().unwrap_or(0);
        if let Some(page) = self.page_size_mut() {
            page.set_current_index(matched);
        }
    }

    fn matching_page_size(&self) -> Option<usize> {
        let [tl_x, tl_y, br_x, br_y] = GEOMETRY.map(|name| self.double(name));
        if tl_x != Some(0.0) || tl_y != Some(0.0) {
            return None;
        }

        let width = self.to_mm(OptionName::BottomRightX, br_x?);
        let height = self.to_mm(OptionName::BottomRightY, br_y?);
        let tolerance = self
            .tolerance(OptionName::BottomRightX)
            .max(self.tolerance(OptionName::BottomRightY));

        self.page_size()?.position(width, height, tolerance)
    }

    fn reload_values(&mut self) {
        for option in &mut self.options {
            option.read_value();
        }
    }

    /// Runs a scheduled value reload right away.
    fn flush_value_reload(&mut self) {
        if self.deadlines.reload_values.take().is_some() {
            self.reload_values();
        }
    }

    fn start_polling(&mut self, now: Instant) {
        if self.polling_allowed && !self.poll_list.is_empty() && !self.is_busy() {
            self.deadlines.poll = Some(now + POLL_INTERVAL);
        }
    }

    fn stop_polling(&mut self) {
        self.deadlines.poll = None;
    }

    fn poll(&mut self) {
        for position in &self.poll_list {
            self.options[*position].read_value();
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close_device();
    }
}

fn option_count(device: &dyn DeviceHandle) -> Option<i32> {
    device.option_descriptor(0)?;

    let mut data = [0u8; WORD_SIZE];
    device.get_value(0, &mut data).ok()?;
    Some(word_to_value(data)).filter(|count| *count > 0)
}
