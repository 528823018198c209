use super::{Session, SessionEvent, BATCH_TICK, GEOMETRY};
use crate::{
    names::OptionName,
    options::OptionModel,
    result::{Result, SaneError, ScanStatus},
    scan::{self, ScanImage, ScanSettings},
};
use std::{collections::VecDeque, time::Instant};

const STOPPED_BY_USER: &str = "Scanning stopped by user.";

/// Smallest resolution worth previewing with.
const MIN_PREVIEW_DPI: f64 = 25.0;

/// Preview size the automatic resolution aims for, in pixels.
const PREVIEW_PIXELS: usize = 300;

const MAX_PREVIEW_DPI: f64 = 600.0;

/// A rectangle as fractions of the full scan area, `0.0..=1.0` on both axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanArea {
    pub tl_x: f64,
    pub tl_y: f64,
    pub br_x: f64,
    pub br_y: f64,
}

impl ScanArea {
    pub const FULL: Self = Self {
        tl_x: 0.0,
        tl_y: 0.0,
        br_x: 1.0,
        br_y: 1.0,
    };
}

/// Finds documents on a preview image.
pub trait AreaDetector: Send {
    fn find_areas(&mut self, image: &ScanImage) -> Vec<ScanArea>;
}

#[derive(Debug, Clone, PartialEq)]
pub(super) enum ScanState {
    Idle,
    /// Remembers the page size to restore afterwards.
    Preview { page_size: usize },
    /// Areas still to be scanned after the current one.
    Final { selections: VecDeque<ScanArea> },
}

/// Options changed for a preview and restored after it.
const PREVIEW_OPTIONS: [OptionName; 9] = [
    OptionName::BitDepth,
    OptionName::Resolution,
    OptionName::XResolution,
    OptionName::YResolution,
    OptionName::Preview,
    OptionName::TopLeftX,
    OptionName::TopLeftY,
    OptionName::BottomRightX,
    OptionName::BottomRightY,
];

impl Session {
    /// Scans the whole area at a low resolution. Options are restored when the
    /// preview is done.
    pub fn start_preview(&mut self) -> bool {
        if self.device.is_none() || self.is_busy() {
            return false;
        }

        self.cancel_requested = false;

        for name in PREVIEW_OPTIONS {
            self.store(name);
        }
        let page_size = self.page_size().map_or(0, |page| page.current_index());

        self.select_area(ScanArea::FULL);

        let dpi = self.preview_resolution();
        log::debug!("Preview at {dpi} DPI");

        if self.double(OptionName::BitDepth) == Some(16.0) {
            self.write(OptionName::BitDepth, 8);
        }
        self.write(OptionName::Preview, true);

        self.start_acquisition(ScanState::Preview { page_size });
        true
    }

    /// Scans `selections` one after another, or the current area when empty.
    pub fn start_scan(&mut self, selections: Vec<ScanArea>) -> bool {
        if self.device.is_none() || self.is_busy() {
            return false;
        }

        self.cancel_requested = false;

        let mut selections = VecDeque::from(selections);
        if let Some(first) = selections.pop_front() {
            self.select_area(first);
        }

        self.start_acquisition(ScanState::Final { selections });
        true
    }

    /// Cancels the running acquisition or a pending batch page.
    pub fn stop_scan(&mut self) {
        let Some(device) = &self.device else {
            return;
        };

        self.cancel_requested = true;

        if let Some(worker) = self.worker.as_ref().filter(|worker| worker.is_running()) {
            worker.cancel();
            device.cancel();
        }

        if self.deadlines.batch.take().is_some() {
            self.events.push_back(SessionEvent::BatchModeCountDown(0));
            self.scan_is_finished(ScanStatus::NoError, STOPPED_BY_USER);
        }
    }

    fn select_area(&mut self, area: ScanArea) {
        let max = |session: &Self, name: OptionName| {
            session
                .option(name)
                .and_then(|option| option.maximum_value())
                .and_then(|max| max.to_double())
        };

        let (Some(width), Some(height)) = (
            max(self, OptionName::BottomRightX),
            max(self, OptionName::BottomRightY),
        ) else {
            return;
        };

        let [tl_x, tl_y, br_x, br_y] = GEOMETRY;
        self.write(tl_x, area.tl_x * width);
        self.write(tl_y, area.tl_y * height);
        self.write(br_x, area.br_x * width);
        self.write(br_y, area.br_y * height);
    }

    /// Explicit preview resolution, or the smallest one giving a preview of at
    /// least 300x300 pixels.
    fn preview_resolution(&mut self) -> f64 {
        let name = self.resolution_name();

        if self.preview_dpi >= MIN_PREVIEW_DPI {
            self.write_resolution(name, self.preview_dpi);
            return self.preview_dpi;
        }

        let Some(device) = self.device.clone() else {
            return MIN_PREVIEW_DPI;
        };

        let min = self
            .option(name)
            .and_then(|option| option.minimum_value())
            .and_then(|min| min.to_double())
            .unwrap_or(MIN_PREVIEW_DPI)
            .max(MIN_PREVIEW_DPI);

        let mut dpi = min;
        loop {
            self.write_resolution(name, dpi);

            match device.parameters() {
                Ok(parameters) if parameters.pixels_per_line == 0 => {
                    // No size information, nothing to probe with.
                    dpi = min;
                    self.write_resolution(name, dpi);
                    break;
                }
                Ok(parameters)
                    if parameters.pixels_per_line >= PREVIEW_PIXELS
                        && parameters.lines.map_or(true, |lines| lines >= PREVIEW_PIXELS) =>
                {
                    break
                }
                Ok(_) => {}
                Err(err) => {
                    log::debug!("Failed to read parameters: {err}");
                    break;
                }
            }

            if dpi > MAX_PREVIEW_DPI {
                break;
            }
            dpi += MIN_PREVIEW_DPI;
        }

        self.double(name).unwrap_or(dpi)
    }

    /// Backends without a common resolution get the same value on both axes.
    fn write_resolution(&mut self, name: OptionName, dpi: f64) {
        self.write(name, dpi);
        if name == OptionName::XResolution {
            self.write(OptionName::YResolution, dpi);
        }
    }

    fn start_acquisition(&mut self, state: ScanState) {
        self.flush_value_reload();
        self.dispatch();
        self.stop_polling();

        self.state = state;
        self.events.push_back(SessionEvent::ScanProgress(None));
        self.start_worker();
    }

    fn start_worker(&mut self) {
        let settings = ScanSettings {
            dpi: self.current_dpi().unwrap_or(0.0) as i32,
            invert: self.invert_colors(),
        };

        if let Some(worker) = &mut self.worker {
            worker.start(settings);
        }
    }

    fn restart_worker(&mut self) {
        self.events.push_back(SessionEvent::ScanProgress(None));
        self.start_worker();
    }

    fn scan_image(&self) -> ScanImage {
        self.worker
            .as_ref()
            .map(|worker| scan::lock_image(worker.image()).clone())
            .unwrap_or_default()
    }

    pub(super) fn acquisition_finished(&mut self, result: Result<()>, now: Instant) {
        match std::mem::replace(&mut self.state, ScanState::Idle) {
            ScanState::Idle => log::debug!("Acquisition finished while idle"),
            ScanState::Preview { page_size } => self.preview_finished(result, page_size),
            ScanState::Final { selections } => {
                self.state = ScanState::Final { selections };
                self.final_finished(result, now);
            }
        }
    }

    fn preview_finished(&mut self, result: Result<()>, page_size: usize) {
        if let Some(device) = &self.device {
            device.cancel();
        }

        for name in PREVIEW_OPTIONS {
            self.restore(name);
        }
        if let Some(page) = self.page_size_mut() {
            page.set_current_index(page_size);
        }
        self.dispatch();

        if let Err(err) = result {
            return self.acquisition_failed(err);
        }

        let image = self.scan_image();
        let areas = self
            .area_detector
            .as_mut()
            .map(|detector| detector.find_areas(&image));

        self.events.push_back(SessionEvent::ImageReady {
            image,
            preview: true,
        });
        if let Some(areas) = areas {
            self.events.push_back(SessionEvent::PreviewAreas(areas));
        }

        self.scan_is_finished(ScanStatus::NoError, "");
    }

    fn final_finished(&mut self, result: Result<()>, now: Instant) {
        if let Err(err) = result {
            return self.acquisition_failed(err);
        }

        let image = self.scan_image();
        self.events.push_back(SessionEvent::ImageReady {
            image,
            preview: false,
        });

        if self.cancel_requested {
            return self.scan_is_finished(ScanStatus::NoError, STOPPED_BY_USER);
        }

        // The feeder continues with the next sheet, no cancel in between.
        if self.multi_page {
            log::debug!("Scanning the next page from the document feeder");
            return self.restart_worker();
        }

        if self.batch_mode() {
            if let Some(device) = &self.device {
                device.cancel();
            }
            self.batch_counter = 0;
            return self.batch_tick(now);
        }

        if self.wait_for_button {
            log::debug!("Waiting for the scan button");
            return self.restart_worker();
        }

        let next = match &mut self.state {
            ScanState::Final { selections } => selections.pop_front(),
            _ => None,
        };
        if let Some(area) = next {
            if let Some(device) = &self.device {
                device.cancel();
            }
            self.select_area(area);
            self.flush_value_reload();
            self.dispatch();
            return self.restart_worker();
        }

        self.scan_is_finished(ScanStatus::NoError, "");
    }

    pub(super) fn batch_tick(&mut self, now: Instant) {
        let delay = self.batch_delay();
        self.events
            .push_back(SessionEvent::BatchModeCountDown(delay - self.batch_counter));

        if self.batch_counter >= delay {
            self.deadlines.batch = None;
            self.restart_worker();
        } else {
            self.deadlines.batch = Some(now + BATCH_TICK);
        }

        self.batch_counter += 1;
    }

    fn acquisition_failed(&mut self, err: SaneError) {
        match err.severity() {
            None => {
                let message = if self.cancel_requested {
                    STOPPED_BY_USER.to_owned()
                } else {
                    err.to_string()
                };
                self.scan_is_finished(ScanStatus::NoError, &message);
            }
            Some(status) => {
                log::warn!("Scan failed: {err}");
                self.events.push_back(SessionEvent::UserMessage {
                    status,
                    message: err.to_string(),
                });
                self.scan_is_finished(status, &err.to_string());
            }
        }
    }

    fn scan_is_finished(&mut self, status: ScanStatus, message: &str) {
        if let Some(device) = &self.device {
            device.cancel();
        }

        self.state = ScanState::Idle;
        self.deadlines.batch = None;
        self.start_polling(Instant::now());

        self.events.push_back(SessionEvent::ScanFinished {
            status,
            message: message.to_owned(),
        });
    }
}

