//! ideviceinfo
//!
//! Shows information about a connected device, toggles AssistiveTouch, and
//! probes USB descriptors for a device serial.

use anyhow::{Context, Result};
use clap::builder::NonEmptyStringValueParser;
use clap::{ArgGroup, Parser};
use cli::assistive::{self, ASSISTIVE_LABEL, AssistiveAction, AssistiveResult};
use cli::config::{self, ToolConfig};
use cli::domains::{DomainTable, known_domains_help};
use cli::find;
use cli::output::{self, OutputFormat};
use cli::session::{LockdownSession, Lookup, SessionError, SessionTarget};
use common::setup_logging;
use std::io::{self, Write};
use std::process::ExitCode;
use tracing::{debug, info, warn};

const EXIT_DEVICE_ERROR: u8 = 255;
const EXIT_USAGE: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "ideviceinfo")]
#[command(about = "Show information about a connected device.")]
#[command(long_about = "
Show information about a connected device.

Queries lockdownd on the device for the value of KEY in DOMAIN. Without a
domain or key the whole default domain is printed.

EXAMPLES:
    # Everything in the default domain of the first USB device
    ideviceinfo

    # One key from one domain, as an XML plist
    ideviceinfo -q com.apple.mobile.battery -k BatteryCurrentCapacity -x

    # Is the device with this UDID attached with product id 0x12a8?
    ideviceinfo -u 00008030-001A2D1E0C38802E -f 0x12a8
")]
#[command(after_help = known_domains_help())]
#[command(disable_version_flag = true)]
#[command(group(ArgGroup::new("accessibility").args(["assistive", "reset", "get"])))]
struct Args {
    /// Target specific device by UDID
    #[arg(short, long, value_name = "UDID", value_parser = NonEmptyStringValueParser::new())]
    udid: Option<String>,

    /// Connect to network device
    #[arg(short, long)]
    network: bool,

    /// Use a simple connection to avoid auto-pairing with the device
    #[arg(short, long)]
    simple: bool,

    /// Query the specified domain
    #[arg(short = 'q', long, value_name = "NAME", value_parser = NonEmptyStringValueParser::new())]
    domain: Option<String>,

    /// Query the specified key
    #[arg(short, long, value_name = "NAME", value_parser = NonEmptyStringValueParser::new())]
    key: Option<String>,

    /// Output information as an XML plist
    #[arg(short = 'x', long)]
    xml: bool,

    /// Enable communication debugging
    #[arg(short, long)]
    debug: bool,

    /// Print version information
    #[arg(short = 'v', long)]
    version: bool,

    /// Enable AssistiveTouch
    #[arg(short, long)]
    assistive: bool,

    /// Disable AssistiveTouch
    #[arg(short, long)]
    reset: bool,

    /// Print the AssistiveTouch setting
    #[arg(short, long)]
    get: bool,

    /// Print TRUE if the device given by --udid is attached with product id PID
    #[arg(short, long, value_name = "PID")]
    find: Option<String>,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Save default configuration to default location and exit
    #[arg(long)]
    save_config: bool,
}

impl Args {
    fn assistive_action(&self) -> Option<AssistiveAction> {
        if self.assistive {
            Some(AssistiveAction::Enable)
        } else if self.reset {
            Some(AssistiveAction::Disable)
        } else if self.get {
            Some(AssistiveAction::Get)
        } else {
            None
        }
    }

    fn lookup(&self) -> Lookup {
        if self.network {
            Lookup::Network
        } else {
            Lookup::Usb
        }
    }

    fn format(&self) -> OutputFormat {
        if self.xml {
            OutputFormat::Xml
        } else {
            OutputFormat::KeyValue
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("ERROR: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<ExitCode> {
    if args.version {
        println!("ideviceinfo {}", env!("CARGO_PKG_VERSION"));
        return Ok(ExitCode::SUCCESS);
    }

    // Handle --save-config flag early (before loading config)
    if args.save_config {
        let config = ToolConfig::default();
        let path = ToolConfig::default_path();
        config.save(&path).context("Failed to save configuration")?;
        println!("Configuration saved to: {}", path.display());
        return Ok(ExitCode::SUCCESS);
    }

    let config = match args.config.as_deref() {
        Some(path) => config::load_config(path).context("Failed to load configuration")?,
        None => ToolConfig::load_or_default(),
    };

    let log_level = if args.debug {
        "debug"
    } else {
        args.log_level
            .as_deref()
            .unwrap_or(&config.general.log_level)
    };
    setup_logging(log_level).context("Failed to setup logging")?;
    debug!("ideviceinfo v{}, log level {}", env!("CARGO_PKG_VERSION"), log_level);

    if let Some(pid) = args.find.as_deref() {
        return find_mode(pid, args.udid.as_deref(), &config).await;
    }

    if let Some(action) = args.assistive_action() {
        return assistive_mode(&args, action).await;
    }

    query_mode(&args, &config).await
}

async fn find_mode(pid: &str, udid: Option<&str>, config: &ToolConfig) -> Result<ExitCode> {
    if pid.is_empty() {
        return Ok(ExitCode::SUCCESS);
    }

    let product_id = match find::parse_product_id(pid) {
        Ok(id) => id,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            return Ok(ExitCode::from(EXIT_USAGE));
        }
    };

    let outcome = find::find_driver(product_id, udid, config.resolver_config()?).await;
    info!("Probe for {:04x} finished: {}", product_id, outcome.sentinel());

    let mut stdout = io::stdout().lock();
    write!(stdout, "{}", outcome.sentinel())?;
    stdout.flush()?;
    Ok(ExitCode::SUCCESS)
}

async fn assistive_mode(args: &Args, action: AssistiveAction) -> Result<ExitCode> {
    let target = SessionTarget {
        udid: args.udid.as_deref(),
        lookup: args.lookup(),
        label: ASSISTIVE_LABEL,
        handshake: true,
    };

    let mut session = match LockdownSession::connect(&target).await {
        Ok(session) => session,
        Err(e) => {
            // Connection failures go to stdout in this mode
            println!("ERROR: {}", connect_failure(e, &target));
            return Ok(ExitCode::from(EXIT_DEVICE_ERROR));
        }
    };

    let mut stdout = io::stdout().lock();
    match assistive::run(&mut session, action).await {
        Ok(AssistiveResult::Set) => write!(stdout, "1")?,
        Ok(AssistiveResult::Value(value)) => output::write_key_value(&mut stdout, &value)?,
        Err(e) => debug!("AssistiveTouch request on {} failed: {}", session.udid(), e),
    }
    stdout.flush()?;
    Ok(ExitCode::SUCCESS)
}

async fn query_mode(args: &Args, config: &ToolConfig) -> Result<ExitCode> {
    let domains = DomainTable::new(config.domains.extra.clone());
    if let Some(domain) = args.domain.as_deref()
        && !domains.is_known(domain)
    {
        warn!("Sending query with unknown domain \"{}\"", domain);
    }

    let target = SessionTarget {
        udid: args.udid.as_deref(),
        lookup: args.lookup(),
        label: &config.general.label,
        handshake: !args.simple,
    };

    let mut session = match LockdownSession::connect(&target).await {
        Ok(session) => session,
        Err(e @ (SessionError::DeviceNotFound { .. } | SessionError::Usbmuxd(_))) => {
            println!("ERROR: {}", connect_failure(e, &target));
            return Ok(ExitCode::from(EXIT_DEVICE_ERROR));
        }
        Err(e) => {
            eprintln!("ERROR: {}", e);
            return Ok(ExitCode::from(EXIT_DEVICE_ERROR));
        }
    };

    match session
        .get_value(args.domain.as_deref(), args.key.as_deref())
        .await
    {
        Ok(value) => {
            let mut stdout = io::stdout().lock();
            output::write_value(&mut stdout, &value, args.format())?;
            stdout.flush()?;
        }
        Err(e) => debug!("Query on {} failed: {}", session.udid(), e),
    }

    Ok(ExitCode::SUCCESS)
}

/// An unreachable usbmuxd is reported the same way as a missing device
fn connect_failure(e: SessionError, target: &SessionTarget<'_>) -> SessionError {
    match e {
        SessionError::Usbmuxd(source) => {
            debug!("usbmuxd unavailable: {}", source);
            SessionError::DeviceNotFound {
                udid: target.udid.map(str::to_string),
            }
        }
        other => other,
    }
}
