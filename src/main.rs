//! CI step entry point: start a headless Android emulator, resolve its adb
//! serial, wait for boot, and publish the serial for later pipeline steps.

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use avdstart::adb::Adb;
use avdstart::avd;
use avdstart::emulator::{self, Emulator};
use avdstart::error::Error;
use avdstart::exec::SystemExecutor;
use avdstart::export;
use avdstart::resolve::DEFAULT_POLL_INTERVAL;
use avdstart::session::{Session, SessionConfig};

/// Start an Android virtual device and block until it is usable.
#[derive(Parser)]
#[command(name = "avdstart")]
#[command(about = "Start a headless Android emulator and wait until it is ready")]
struct Cli {
    /// Name of the AVD image to start (must exist under ~/.android/avd)
    #[arg(long, env = "emulator_name")]
    emulator_name: Option<String>,

    /// Skin to launch with; empty or omitted means -noskin
    #[arg(long, env = "skin")]
    skin: Option<String>,

    /// Free-form options appended verbatim to the emulator command line
    #[arg(long, env = "emulator_options", default_value = "", allow_hyphen_values = true)]
    emulator_options: String,

    /// Wait until the device reports fully booted
    #[arg(long, env = "wait_for_boot", default_value_t = true, action = clap::ArgAction::Set)]
    wait_for_boot: bool,

    /// Android SDK root (must contain platform-tools/adb)
    #[arg(long, env = "android_home")]
    android_home: Option<PathBuf>,

    /// Seconds to wait for the new device serial to appear
    #[arg(long, env = "serial_timeout", default_value_t = 120)]
    serial_timeout: u64,

    /// Seconds to wait for the three boot signals
    #[arg(long, env = "boot_timeout", default_value_t = 600)]
    boot_timeout: u64,

    /// File the emulator's combined output is redirected to
    #[arg(long, default_value = "emulator.log")]
    log_path: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(serial) => {
            println!();
            println!("{}", format!("Emulator ({}) is ready to use", serial).green().bold());
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!();
            eprintln!("{}", format!("{:#}", err).red().bold());
            ExitCode::FAILURE
        }
    }
}

/// Inputs that survived fail-fast validation.
#[derive(Debug)]
struct Inputs {
    image: String,
    skin: Option<String>,
    options: Vec<String>,
    android_home: PathBuf,
}

/// Validate the configured inputs against the discoverable images.
///
/// Runs before any process is launched: a missing or typo'd image name must
/// fail fast here, not time out ten minutes later.
fn validate(cli: &Cli, images: &[String]) -> Result<Inputs, Error> {
    let image = cli
        .emulator_name
        .clone()
        .filter(|name| !name.is_empty())
        .ok_or_else(|| Error::Config("missing required input: emulator_name".into()))?;

    let android_home = cli
        .android_home
        .clone()
        .filter(|home| !home.as_os_str().is_empty())
        .ok_or_else(|| Error::Config("missing required input: android_home".into()))?;
    if !android_home.is_dir() {
        return Err(Error::Config(format!(
            "android_home does not exist: {}",
            android_home.display()
        )));
    }

    if !images.contains(&image) {
        return Err(Error::Config(format!("AVD image not found: {}", image)));
    }

    Ok(Inputs {
        image,
        skin: cli.skin.clone().filter(|skin| !skin.is_empty()),
        options: emulator::split_options(&cli.emulator_options)?,
        android_home,
    })
}

fn run(cli: Cli) -> Result<String> {
    print_configs(&cli);

    println!();
    println!("{}", "Validate AVD image".blue().bold());
    let avd_dir = avd::default_avd_dir()
        .ok_or_else(|| Error::Config("cannot determine home directory".into()))?;
    let images = avd::list_avd_images(&avd_dir)?;

    let inputs = match validate(&cli, &images) {
        Ok(inputs) => inputs,
        Err(err) => {
            if !images.is_empty() {
                println!("  available AVD images:");
                for name in &images {
                    println!("  * {}", name);
                }
            }
            return Err(err.into());
        }
    };
    println!("  {} AVD image ({}) exists", "✓".green(), inputs.image);

    let adb = Adb::new(&inputs.android_home)?;
    let emulator = Emulator::new(&inputs.android_home)?;

    let config = SessionConfig {
        image: inputs.image,
        skin: inputs.skin,
        options: inputs.options,
        wait_for_boot: cli.wait_for_boot,
        serial_timeout: Duration::from_secs(cli.serial_timeout),
        boot_timeout: Duration::from_secs(cli.boot_timeout),
        poll_interval: DEFAULT_POLL_INTERVAL,
        log_path: cli.log_path.clone(),
    };

    let mut session = Session::new(&adb, &emulator, config);
    let serial = session.run()?;

    // Best-effort: the device is usable even if publication fails
    if let Err(err) = export::publish_serial(&SystemExecutor, &serial) {
        eprintln!(
            "  {} failed to export {}: {:#}",
            "WARN:".yellow(),
            export::SERIAL_ENV_KEY,
            err
        );
    }

    Ok(serial)
}

fn print_configs(cli: &Cli) {
    println!("{}", "Configs:".blue().bold());
    println!("  emulator_name: {}", cli.emulator_name.as_deref().unwrap_or(""));
    println!("  skin: {}", cli.skin.as_deref().unwrap_or(""));
    println!("  emulator_options: {}", cli.emulator_options);
    println!("  wait_for_boot: {}", cli.wait_for_boot);
    println!(
        "  android_home: {}",
        cli.android_home
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_default()
    );
    println!("  serial_timeout: {}s", cli.serial_timeout);
    println!("  boot_timeout: {}s", cli.boot_timeout);
}
