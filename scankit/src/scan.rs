//! Acquisition thread.
//!
//! The worker reads frames from the device into a shared [`ScanImage`] and
//! reports progress to the session over an unbounded channel. It never touches
//! options: everything it needs is passed in [`ScanSettings`].

use crate::{
    backend::DeviceHandle,
    descriptor::{FrameFormat, Parameters},
    result::{Result, SaneError},
};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard,
    },
    thread::{self, JoinHandle},
};
use tokio::sync::mpsc;

const WINDOW_SIZE: usize = 128 * 1024;

/// Minimum progress change worth reporting, in percent.
const PROGRESS_STEP: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFormat {
    #[default]
    Invalid,
    BlackWhite,
    Gray8,
    Gray16,
    Rgb8,
    Rgb16,
}

impl ImageFormat {
    fn from_parameters(parameters: &Parameters) -> Result<Self> {
        let format = match (parameters.format, parameters.depth) {
            (FrameFormat::Gray, 1) => Self::BlackWhite,
            (FrameFormat::Gray, 8) => Self::Gray8,
            (FrameFormat::Gray, 16) => Self::Gray16,
            (_, 8) => Self::Rgb8,
            (_, 16) => Self::Rgb16,
            (format, depth) => {
                log::warn!("Unsupported frame: {format:?} with depth {depth}");
                return Err(SaneError::Unsupported);
            }
        };
        Ok(format)
    }
}

/// Raw image as delivered by the device. Rows are `bytes_per_line` apart,
/// 16-bit samples are in host byte order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanImage {
    pub width: usize,
    pub height: usize,
    pub bytes_per_line: usize,
    pub format: ImageFormat,
    pub dpi: i32,
    pub data: Vec<u8>,
}

impl ScanImage {
    pub fn is_empty(&self) -> bool {
        self.format == ImageFormat::Invalid || self.data.is_empty()
    }

    fn reset(&mut self, parameters: &Parameters, format: ImageFormat, dpi: i32) {
        let bytes_per_line = match parameters.format {
            FrameFormat::Red | FrameFormat::Green | FrameFormat::Blue => {
                parameters.bytes_per_line * 3
            }
            _ => parameters.bytes_per_line,
        };

        self.width = parameters.pixels_per_line;
        self.height = parameters.lines.unwrap_or(0);
        self.bytes_per_line = bytes_per_line;
        self.format = format;
        self.dpi = dpi;
        self.data.clear();
        self.data.resize(bytes_per_line * self.height, 0);
    }

    fn write(&mut self, offset: usize, bytes: &[u8]) {
        let end = offset + bytes.len();
        if self.data.len() < end {
            self.data.resize(end, 0);
        }
        self.data[offset..end].copy_from_slice(bytes);
    }

    /// Stores one channel of a three-pass frame.
    fn write_channel(&mut self, offset: usize, bytes: &[u8], frame_line: usize, sample: usize, channel: usize) {
        for (i, byte) in bytes.iter().enumerate() {
            let position = offset + i;
            let line = position / frame_line;
            let within = position % frame_line;
            let target = line * self.bytes_per_line
                + (within / sample) * 3 * sample
                + channel * sample
                + within % sample;

            if self.data.len() <= target {
                self.data.resize(self.data.len().max(target + 1).max((line + 1) * self.bytes_per_line), 0);
            }
            self.data[target] = *byte;
        }
    }

    fn finish(&mut self, invert: bool) {
        if self.bytes_per_line > 0 {
            self.height = self.data.len().div_ceil(self.bytes_per_line);
            self.data.resize(self.height * self.bytes_per_line, 0);
        }

        if invert {
            self.data.iter_mut().for_each(|byte| *byte ^= 0xFF);
        }
    }
}

/// What the session passes to one acquisition.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ScanSettings {
    pub dpi: i32,
    pub invert: bool,
}

#[derive(Debug)]
pub(crate) enum WorkerMessage {
    Progress(u8),
    Finished(Result<()>),
}

pub(crate) struct ScanThread {
    device: Arc<dyn DeviceHandle>,
    image: Arc<Mutex<ScanImage>>,
    cancel: Arc<AtomicBool>,
    tx: mpsc::UnboundedSender<WorkerMessage>,
    handle: Option<JoinHandle<()>>,
}

pub(crate) fn lock_image(image: &Mutex<ScanImage>) -> MutexGuard<'_, ScanImage> {
    image.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ScanThread {
    pub fn new(device: Arc<dyn DeviceHandle>, tx: mpsc::UnboundedSender<WorkerMessage>) -> Self {
        Self {
            device,
            image: Arc::new(Mutex::new(ScanImage::default())),
            cancel: Arc::new(AtomicBool::new(false)),
            tx,
            handle: None,
        }
    }

    pub fn image(&self) -> &Arc<Mutex<ScanImage>> {
        &self.image
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Asks the running acquisition to stop. It finishes with `SaneError::Cancelled`.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Stops the acquisition and waits until the thread has released the device.
    pub fn shutdown(mut self) {
        self.cancel();

        let Some(handle) = self.handle.take() else {
            return;
        };
        if !handle.is_finished() {
            self.device.cancel();
        }
        if handle.join().is_err() {
            log::error!("Scan thread panicked");
        }
    }

    pub fn start(&mut self, settings: ScanSettings) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Previous scan thread panicked");
            }
        }

        self.cancel.store(false, Ordering::SeqCst);

        let device = self.device.clone();
        let image = self.image.clone();
        let cancel = self.cancel.clone();
        let tx = self.tx.clone();

        let spawned = thread::Builder::new()
            .name("scan".to_owned())
            .spawn(move || {
                let result = acquire(device.as_ref(), &image, &cancel, &tx, settings);
                if let Err(err) = &result {
                    log::debug!("Scan ended with: {err}");
                }
                _ = tx.send(WorkerMessage::Finished(result));
            });

        match spawned {
            Ok(handle) => self.handle = Some(handle),
            Err(err) => {
                log::error!("Failed to spawn scan thread: {err}");
                _ = self.tx.send(WorkerMessage::Finished(Err(SaneError::NoMem)));
            }
        }
    }
}

fn acquire(
    device: &dyn DeviceHandle,
    image: &Mutex<ScanImage>,
    cancel: &AtomicBool,
    tx: &mpsc::UnboundedSender<WorkerMessage>,
    settings: ScanSettings,
) -> Result<()> {
    macro_rules! send_state {
        ($state:expr) => {
            if tx.send($state).is_err() {
                log::debug!("Progress receiver was dropped");
                device.cancel();
                return Err(SaneError::Cancelled);
            }
        };
    }
    macro_rules! check_cancellation {
        () => {
            if cancel.load(Ordering::SeqCst) {
                log::debug!("Scan cancelled");
                device.cancel();
                return Err(SaneError::Cancelled);
            }
        };
    }

    let mut frame_index = 0;
    let mut previous_progress = 0;

    loop {
        check_cancellation!();
        device.start()?;

        check_cancellation!();
        let parameters = device.parameters()?;
        log::debug!("Start frame {frame_index} with parameters {parameters:?}");

        let channel = match parameters.format {
            FrameFormat::Red => Some(0),
            FrameFormat::Green => Some(1),
            FrameFormat::Blue => Some(2),
            FrameFormat::Gray | FrameFormat::RGB => None,
        };

        if frame_index == 0 {
            let format = ImageFormat::from_parameters(&parameters)?;
            lock_image(image).reset(&parameters, format, settings.dpi);
            send_state!(WorkerMessage::Progress(0));
        }

        let frames = if channel.is_some() { 3 } else { 1 };
        let frame_size = parameters.lines.map(|lines| lines * parameters.bytes_per_line);
        let sample = (parameters.depth / 8).max(1);

        let mut buf = vec![0u8; WINDOW_SIZE];
        let mut offset = 0;

        loop {
            check_cancellation!();

            let read = match device.read(&mut buf) {
                Ok(read) => read,
                Err(SaneError::EOF) => break,
                Err(err) => return Err(err),
            };

            {
                let mut image = lock_image(image);
                match channel {
                    Some(channel) if parameters.bytes_per_line > 0 => image.write_channel(
                        offset,
                        &buf[..read],
                        parameters.bytes_per_line,
                        sample,
                        channel,
                    ),
                    _ => image.write(offset, &buf[..read]),
                }
            }
            offset += read;

            let Some(frame_size) = frame_size.filter(|size| *size > 0) else {
                continue;
            };

            let done = (frame_index % frames) * frame_size + offset.min(frame_size);
            let progress = (done * 100 / (frames * frame_size)) as u8;

            log::trace!("Scan progress {offset} of {frame_size} bytes ({progress}%)");

            if progress >= previous_progress + PROGRESS_STEP {
                send_state!(WorkerMessage::Progress(progress));
                previous_progress = progress;
            }
        }

        frame_index += 1;
        if parameters.last_frame {
            break;
        }
    }

    lock_image(image).finish(settings.invert);

    log::debug!("Scan done");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{FakeDevice, Frame};

    fn run(device: Arc<FakeDevice>, settings: ScanSettings) -> (Result<()>, Vec<u8>, ScanImage) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut thread = ScanThread::new(device, tx);
        thread.start(settings);

        let mut progress = Vec::new();
        loop {
            match rx.blocking_recv() {
                Some(WorkerMessage::Progress(value)) => progress.push(value),
                Some(WorkerMessage::Finished(result)) => {
                    let image = lock_image(thread.image()).clone();
                    return (result, progress, image);
                }
                None => panic!("worker dropped the channel"),
            }
        }
    }

    #[test]
    fn gray_page() {
        let device = FakeDevice::new();
        device.push_frame(Frame::gray(4, 3, 0x40));

        let (result, progress, image) = run(device, ScanSettings { dpi: 300, invert: false });
        result.unwrap();

        assert_eq!(progress.first(), Some(&0));
        assert_eq!(progress.last(), Some(&100));
        assert_eq!(image.format, ImageFormat::Gray8);
        assert_eq!((image.width, image.height, image.dpi), (4, 3, 300));
        assert_eq!(image.data, vec![0x40; 12]);
    }

    #[test]
    fn inverted_colors() {
        let device = FakeDevice::new();
        device.push_frame(Frame::gray(2, 2, 0x0F));

        let (result, _, image) = run(device, ScanSettings { dpi: 75, invert: true });
        result.unwrap();
        assert_eq!(image.data, vec![0xF0; 4]);
    }

    #[test]
    fn three_pass_frames_are_interleaved() {
        let device = FakeDevice::new();
        for (format, fill, last_frame) in [
            (FrameFormat::Red, 1, false),
            (FrameFormat::Green, 2, false),
            (FrameFormat::Blue, 3, true),
        ] {
            let mut frame = Frame::gray(2, 2, fill);
            frame.parameters.format = format;
            frame.parameters.last_frame = last_frame;
            device.push_frame(frame);
        }

        let (result, _, image) = run(device.clone(), ScanSettings::default());
        result.unwrap();

        assert_eq!(device.starts(), 3);
        assert_eq!(image.format, ImageFormat::Rgb8);
        assert_eq!(image.bytes_per_line, 6);
        assert_eq!(image.data, [1, 2, 3].repeat(4));
    }

    #[test]
    fn unknown_height_grows_the_image() {
        let device = FakeDevice::new();
        let mut frame = Frame::gray(3, 5, 9);
        frame.parameters.lines = None;
        device.push_frame(frame);

        let (result, progress, image) = run(device, ScanSettings::default());
        result.unwrap();

        assert_eq!(progress, vec![0]);
        assert_eq!(image.height, 5);
        assert_eq!(image.data.len(), 15);
    }

    #[test]
    fn empty_feeder() {
        let device = FakeDevice::new();
        let (result, progress, _) = run(device, ScanSettings::default());
        assert_eq!(result, Err(SaneError::NoDocs));
        assert!(progress.is_empty());
    }

    #[test]
    fn unsupported_depth() {
        let device = FakeDevice::new();
        let mut frame = Frame::gray(2, 2, 0);
        frame.parameters.depth = 4;
        device.push_frame(frame);

        let (result, _, _) = run(device, ScanSettings::default());
        assert_eq!(result, Err(SaneError::Unsupported));
    }
}
