mod config;
mod output;

use anyhow::{anyhow, bail, Context as _};
use argh::FromArgs;
use config::Config;
use log::Level;
use scankit::{
    Context, DeviceType, OpenStatus, OptionModel, OptionState, OptionType, ScanArea, ScanStatus,
    Session, SessionEvent,
};
use std::{collections::BTreeMap, fs, path::PathBuf, pin::pin, process};

#[derive(FromArgs)]
/// Command line scanner front end
struct Args {
    /// path to config
    #[argh(option)]
    config: Option<PathBuf>,

    /// enable extra logs
    #[argh(switch)]
    verbose: bool,

    #[argh(subcommand)]
    command: Command,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Command {
    List(ListArgs),
    Options(OptionsArgs),
    Preview(PreviewArgs),
    Scan(ScanArgs),
}

#[derive(FromArgs)]
/// list available devices
#[argh(subcommand, name = "list")]
struct ListArgs {
    /// include cameras and virtual devices
    #[argh(switch)]
    all: bool,
}

#[derive(FromArgs)]
/// show the options of a device
#[argh(subcommand, name = "options")]
struct OptionsArgs {
    /// device name, defaults to the one in the config
    #[argh(positional)]
    device: Option<String>,

    /// write the current values to this file
    #[argh(option)]
    save: Option<PathBuf>,
}

#[derive(FromArgs)]
/// scan a low resolution preview of the whole area
#[argh(subcommand, name = "preview")]
struct PreviewArgs {
    /// device name, defaults to the one in the config
    #[argh(positional)]
    device: Option<String>,

    /// preview resolution, automatic when not given
    #[argh(option)]
    dpi: Option<f64>,

    /// output file
    #[argh(option, default = "PathBuf::from(\"preview.png\")")]
    output: PathBuf,
}

#[derive(FromArgs)]
/// scan pages
#[argh(subcommand, name = "scan")]
struct ScanArgs {
    /// device name, defaults to the one in the config
    #[argh(positional)]
    device: Option<String>,

    /// directory for the scanned pages
    #[argh(option)]
    output: Option<PathBuf>,

    /// area to scan as fractions "tl-x,tl-y,br-x,br-y", may be repeated
    #[argh(option, from_str_fn(parse_area))]
    area: Vec<ScanArea>,

    /// option value as "name=value", may be repeated
    #[argh(option, short = 'o')]
    set: Vec<String>,
}

fn parse_area(value: &str) -> Result<ScanArea, String> {
    let fractions = value
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| format!("invalid area '{value}': {err}"))?;

    let [tl_x, tl_y, br_x, br_y] = fractions[..] else {
        return Err(format!("area '{value}' needs four values"));
    };

    if [tl_x, tl_y, br_x, br_y].iter().any(|v| !(0.0..=1.0).contains(v)) || tl_x >= br_x || tl_y >= br_y {
        return Err(format!("area '{value}' is not inside 0..1"));
    }

    Ok(ScanArea {
        tl_x,
        tl_y,
        br_x,
        br_y,
    })
}

fn parse_assignments(values: &[String]) -> anyhow::Result<BTreeMap<String, String>> {
    values
        .iter()
        .map(|value| {
            value
                .split_once('=')
                .map(|(name, value)| (name.trim().to_owned(), value.trim().to_owned()))
                .ok_or_else(|| anyhow!("option '{value}' should look like name=value"))
        })
        .collect()
}

#[tokio::main]
async fn main() {
    let args: Args = argh::from_env();

    if let Err(err) = simple_logger::init_with_level(if args.verbose {
        Level::Trace
    } else {
        Level::Info
    }) {
        eprintln!("Failed to initialize logger: {err}");
    }

    hello(&args);

    if let Err(err) = run(args).await {
        log::error!("{err:#}");
        process::exit(1);
    }
}

fn hello(args: &Args) {
    log::info!(
        "{bin} version {version}, commit {commit}, config from {config_path}, verbose {verbose}",
        bin = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
        commit = env!("GIT_COMMIT_HASH"),
        config_path = args
            .config
            .as_ref()
            .map_or("(none)".into(), |path| path.display().to_string()),
        verbose = if args.verbose { "on" } else { "off" },
    );
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = match &args.config {
        Some(path) => Config::read_from(path).context("reading config")?,
        None => Config::default(),
    };

    if args.verbose {
        log::debug!("Use config {config:#?}");
    }

    let context = Context::new(libsane::SaneBackend::new());
    let mut session = Session::new(&context).context("initializing sane")?;

    match args.command {
        Command::List(list) => list_devices(&mut session, list.all),
        Command::Options(options) => {
            open(&mut session, &config, options.device)?;
            print_options(&session);

            if let Some(path) = options.save {
                config::write_options(&path, session.device_name(), &session.options_map())
                    .context("saving options")?;
                log::info!("Saved options to '{}'", path.display());
            }
            Ok(())
        }
        Command::Preview(preview) => {
            open(&mut session, &config, preview.device)?;
            session.set_preview_resolution(preview.dpi.unwrap_or(config.scan.preview_dpi));

            if !session.start_preview() {
                bail!("device refused to start a preview");
            }

            let path = preview.output;
            drive(&mut session, |image, _| output::save_png(&image, &path)).await
        }
        Command::Scan(scan) => {
            open(&mut session, &config, scan.device)?;

            let overrides = parse_assignments(&scan.set)?;
            apply_options(&mut session, &overrides);

            let dir = scan.output.unwrap_or(config.scan.output.clone());
            fs::create_dir_all(&dir).with_context(|| format!("creating '{}'", dir.display()))?;

            if !session.start_scan(scan.area) {
                bail!("device refused to start a scan");
            }

            let mut page = 0;
            drive(&mut session, |image, _| {
                page += 1;
                output::save_png(&image, &dir.join(format!("page-{page:03}.png")))
            })
            .await
        }
    }
}

fn list_devices(session: &mut Session, all: bool) -> anyhow::Result<()> {
    let ty = match all {
        true => DeviceType::AllDevices,
        false => DeviceType::NoCameraAndVirtualDevices,
    };

    if !session.reload_devices_list(ty) {
        bail!("failed to list devices");
    }

    for event in session.take_events() {
        let SessionEvent::AvailableDevices(devices) = event else {
            continue;
        };

        if devices.is_empty() {
            log::info!("No devices found");
        }
        for device in devices {
            println!("{device}");
        }
    }

    Ok(())
}

fn open(session: &mut Session, config: &Config, device: Option<String>) -> anyhow::Result<()> {
    let name = device
        .or_else(|| config.scan.device.clone())
        .ok_or_else(|| anyhow!("device is not specified on the command line or in the config"))?;

    log::debug!("Use scanner '{name}'");

    match session.open_device(&name) {
        OpenStatus::Succeeded => {}
        OpenStatus::AccessDenied => {
            let auth = config
                .auth
                .get(&name)
                .ok_or_else(|| anyhow!("device '{name}' needs credentials in [auth.\"{name}\"]"))?;

            match session.open_restricted_device(&name, &auth.username, &auth.password) {
                OpenStatus::Succeeded => {}
                status => bail!("failed to open device '{name}' with credentials ({status:?})"),
            }
        }
        OpenStatus::Failed => bail!("failed to open device '{name}'"),
    }

    log::info!(
        "Opened '{name}' ({} {})",
        session.device_vendor(),
        session.device_model()
    );

    apply_options(session, &config.device_options(&name));
    Ok(())
}

fn apply_options(session: &mut Session, options: &BTreeMap<String, String>) {
    if options.is_empty() {
        return;
    }

    let applied = session.set_options_map(options).unwrap_or(0);
    if applied < options.len() {
        log::warn!("Applied {applied} of {} option values", options.len());
    } else {
        log::debug!("Applied {applied} option values");
    }
}

fn print_options(session: &Session) {
    for option in session.options() {
        if option.option_type() == OptionType::DetectFail || option.state() == OptionState::Hidden {
            continue;
        }

        let mut line = format!("{:<24} {}", option.name(), option.value_as_string());

        let choices = option.value_list();
        if !choices.is_empty() {
            let choices: Vec<String> = choices.iter().map(ToString::to_string).collect();
            line += &format!(" [{}]", choices.join("|"));
        } else if let (Some(min), Some(max)) = (option.minimum_value(), option.maximum_value()) {
            line += &format!(" [{min}..{max}]");
        }

        if option.state() == OptionState::Disabled {
            line += " (read only)";
        }

        println!("{line}");
        log::debug!("{:?}: {}", option.option_type(), option.title());
    }
}

/// Forwards session events until the scan finishes. Ctrl-C stops the scan.
async fn drive(
    session: &mut Session,
    mut on_image: impl FnMut(scankit::ScanImage, bool) -> anyhow::Result<()>,
) -> anyhow::Result<()> {
    let mut ctrl_c = pin!(tokio::signal::ctrl_c());
    let mut stopping = false;

    loop {
        let events = tokio::select! {
            events = session.next_events() => Some(events),
            _ = &mut ctrl_c, if !stopping => None,
        };

        let Some(events) = events else {
            log::info!("Stopping scan");
            stopping = true;
            session.stop_scan();
            continue;
        };

        for event in events {
            match event {
                SessionEvent::ScanProgress(None) => log::info!("Preparing scan"),
                SessionEvent::ScanProgress(Some(progress)) => log::info!("Progress {progress}%"),
                SessionEvent::ImageReady { image, preview } => on_image(image, preview)?,
                SessionEvent::PreviewAreas(areas) => {
                    for area in areas {
                        log::info!("Found document at {area:?}");
                    }
                }
                SessionEvent::BatchModeCountDown(seconds) => {
                    log::info!("Next page in {seconds} s")
                }
                SessionEvent::ButtonPressed { title, pressed, .. } => {
                    log::info!("Button '{title}' {}", if pressed { "pressed" } else { "released" })
                }
                SessionEvent::UserMessage { status, message } => match status {
                    ScanStatus::ErrorGeneral => log::error!("{message}"),
                    _ => log::info!("{message}"),
                },
                SessionEvent::ScanFinished { status, message } => {
                    return match status {
                        ScanStatus::ErrorGeneral => Err(anyhow!("scan failed: {message}")),
                        _ => {
                            log::info!("Scan finished {message}");
                            Ok(())
                        }
                    };
                }
                event => log::debug!("Event {event:?}"),
            }
        }
    }
}
