use anyhow::{anyhow, bail, Context, Result};
use biocapture::api::{ApprovalRequest, EnquiryBundle, ImageBundle, ImageSet};
use biocapture::image::load_image_file;
use biocapture::media::StillImageDevice;
use biocapture::session::{DocumentSide, DocumentType, SessionAction, Thumb};
use biocapture::{
    views, Activity, BioCaptureConfig, CaptureController, EnrollmentController, EnrollmentEvent,
    EventBus, EventFilter, EventReceiver, FingerprintDevice, FingerprintScanner, ImagingBackend,
    ImagingClient, LookupOutcome, Route, SessionStore, Step, StepView,
};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "biocapture")]
#[command(about = "Biometric enrollment client for the imaging backend")]
#[command(version)]
#[command(long_about = "Drives a biometric enrollment session (photo and signature, \
identification documents, thumbprints, review) against the imaging backend, and offers the \
image search, approval and enquiry screens from the command line.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "biocapture.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the enrollment steps enabled on the backend
    Steps,
    /// Show or change which activities are enabled
    Activities {
        #[arg(long, value_name = "BOOL")]
        identification: Option<bool>,
        #[arg(long, value_name = "BOOL")]
        fingerprint: Option<bool>,
    },
    /// Run an enrollment for a route such as `capture-1234` or `update-1234`
    Enroll(EnrollArgs),
    /// Look up approved and pending images for a relation
    Search { relation_no: String },
    /// Approve pending images
    Approve(DecisionArgs),
    /// Reject pending images
    Reject {
        #[command(flatten)]
        decision: DecisionArgs,
        #[arg(long)]
        reason: String,
    },
    /// Read-only customer enquiry
    Enquiry { customer_id: String },
    /// Relation details by encrypted id
    View { encrypted_id: String },
}

#[derive(ClapArgs, Debug)]
struct EnrollArgs {
    /// Route segment, e.g. `capture-1234`
    route: String,

    #[arg(long)]
    batch: Option<String>,

    /// Photo file, captured through the still image device
    #[arg(long)]
    photo: Option<PathBuf>,

    /// Signature file
    #[arg(long)]
    signature: Option<PathBuf>,

    /// Identification document as `type=front[,back]`, repeatable
    #[arg(long = "document", value_parser = parse_document)]
    documents: Vec<DocumentArg>,

    #[arg(long)]
    thumb1: Option<PathBuf>,

    #[arg(long)]
    thumb2: Option<PathBuf>,

    /// Scan thumbprints with the local fingerprint device
    #[arg(long)]
    scan: bool,
}

#[derive(ClapArgs, Debug)]
struct DecisionArgs {
    relation_no: String,
    #[arg(long)]
    batch: String,
    #[arg(long)]
    cust_no: String,
}

#[derive(Debug, Clone)]
struct DocumentArg {
    doc_type: DocumentType,
    front: PathBuf,
    back: Option<PathBuf>,
}

fn parse_document(value: &str) -> std::result::Result<DocumentArg, String> {
    let (doc_type, files) = value
        .split_once('=')
        .ok_or_else(|| format!("expected type=front[,back], got '{}'", value))?;
    let doc_type = doc_type
        .parse::<DocumentType>()
        .map_err(|e| e.to_string())?;
    let mut files = files.split(',').filter(|f| !f.is_empty());
    let front = files
        .next()
        .map(PathBuf::from)
        .ok_or_else(|| "a front image is required".to_string())?;

    Ok(DocumentArg {
        doc_type,
        front,
        back: files.next().map(PathBuf::from),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    init_logging(&args)?;

    info!("Starting biocapture v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    let config = match BioCaptureConfig::load_from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if args.validate_config {
        match config.validate() {
            Ok(()) => {
                info!("Configuration validation successful");
                println!("✓ Configuration is valid");
                return Ok(());
            }
            Err(e) => {
                error!("Configuration validation failed: {}", e);
                eprintln!("✗ Configuration validation failed: {}", e);
                std::process::exit(1);
            }
        }
    }
    config.validate()?;

    let backend = Arc::new(ImagingClient::new(&config.backend)?);
    match args.command.unwrap_or(Command::Steps) {
        Command::Steps => show_steps(&config, backend).await,
        Command::Activities {
            identification,
            fingerprint,
        } => update_activities(&config, backend, identification, fingerprint).await,
        Command::Enroll(enroll) => run_enrollment(&config, backend, enroll).await,
        Command::Search { relation_no } => {
            let outcome = backend.search_images(&relation_no).await;
            print_lookup(&outcome);
            if let Some(bundle) = &outcome.data {
                print_images(bundle);
            }
            Ok(())
        }
        Command::Approve(decision) => {
            let request = approval_request(&config, decision);
            print_lookup(&backend.approve_image(&request).await);
            Ok(())
        }
        Command::Reject { decision, reason } => {
            let request = approval_request(&config, decision);
            print_lookup(&backend.reject_image(&request, &reason).await);
            Ok(())
        }
        Command::Enquiry { customer_id } => {
            print_record(&backend.fetch_enquiry(&customer_id).await);
            Ok(())
        }
        Command::View { encrypted_id } => {
            print_record(&backend.fetch_relation_details(&encrypted_id).await);
            Ok(())
        }
    }
}

fn new_controller(
    config: &BioCaptureConfig,
    backend: Arc<ImagingClient>,
) -> EnrollmentController<ImagingClient> {
    let event_bus = Arc::new(EventBus::new(config.system.event_bus_capacity));
    let store = Arc::new(SessionStore::new(event_bus));
    EnrollmentController::new(store, backend)
}

async fn show_steps(config: &BioCaptureConfig, backend: Arc<ImagingClient>) -> Result<()> {
    let controller = new_controller(config, backend);
    controller.load_activities().await;

    let state = controller.store().snapshot();
    for item in views::sidebar(&state) {
        println!("{}. {}", item.step.id(), item.title);
    }
    Ok(())
}

async fn update_activities(
    config: &BioCaptureConfig,
    backend: Arc<ImagingClient>,
    identification: Option<bool>,
    fingerprint: Option<bool>,
) -> Result<()> {
    let controller = new_controller(config, backend);
    let mut activity = controller.load_activities().await;

    if identification.is_none() && fingerprint.is_none() {
        for entry in [Activity::Image, Activity::Identification, Activity::Fingerprint] {
            println!("{:<16} {}", entry.as_str(), activity.is_enabled(entry));
        }
        return Ok(());
    }

    if let Some(enabled) = identification {
        activity.set_enabled(Activity::Identification, enabled)?;
    }
    if let Some(enabled) = fingerprint {
        activity.set_enabled(Activity::Fingerprint, enabled)?;
    }

    let outcome = controller.save_activities(activity).await;
    if !outcome.success {
        bail!("Saving activities failed: {}", outcome.describe());
    }
    println!("✓ Activities saved");
    Ok(())
}

async fn run_enrollment(
    config: &BioCaptureConfig,
    backend: Arc<ImagingClient>,
    args: EnrollArgs,
) -> Result<()> {
    let route = Route::parse(&args.route)?;
    let mode = route
        .enrollment_mode()
        .ok_or_else(|| anyhow!("'{}' does not open the enrollment wizard", route))?;

    let controller = new_controller(config, backend);
    let store = Arc::clone(controller.store());
    let notifications = spawn_notifications(&store.event_bus());

    store.dispatch(SessionAction::SetRelation(Some(route.id.clone())));
    store.dispatch(SessionAction::SetMode(mode));
    store.dispatch(SessionAction::SetBatch(args.batch.clone()));
    controller.load_activities().await;

    while !store.select(|s| s.is_completed) {
        let step = store.select(|s| s.current_step);
        fill_step(config, &controller, &args, step).await?;
        print_step(&views::render_current(&store.snapshot()));

        if let Err(e) = controller.submit_current_step().await {
            if let Some(api_error) = e.api_error() {
                debug!(kind = api_error.kind(), "Backend error detail: {:?}", api_error);
            }
            bail!("{}", e);
        }
    }

    notifications.abort();
    println!("✓ Enrollment for {} completed", route.id);
    Ok(())
}

async fn fill_step(
    config: &BioCaptureConfig,
    controller: &EnrollmentController<ImagingClient>,
    args: &EnrollArgs,
    step: Step,
) -> Result<()> {
    let store = controller.store();
    match step {
        Step::PhotoSignature => {
            if let Some(path) = &args.photo {
                let device = Arc::new(StillImageDevice::new(&config.media, path));
                let mut capture = CaptureController::new(device, store.event_bus());
                capture.enter_capture().await?;
                let photo = capture.capture_and_leave().await?;
                store.dispatch(SessionAction::SetPhoto(Some(photo)));
            }
            if let Some(path) = &args.signature {
                let signature = load_image_file(path)
                    .await
                    .with_context(|| format!("reading signature {}", path.display()))?;
                store.dispatch(SessionAction::SetSignature(Some(signature)));
            }
        }
        Step::Identification => {
            let existing = store.select(|s| s.identification.len());
            for (offset, document) in args.documents.iter().enumerate() {
                let index = existing + offset;
                store.dispatch(SessionAction::AddDocument(Some(document.doc_type)));
                let sides = [
                    (DocumentSide::Front, Some(&document.front)),
                    (DocumentSide::Back, document.back.as_ref()),
                ];
                for (side, path) in sides {
                    if let Some(path) = path {
                        let image = load_image_file(path)
                            .await
                            .with_context(|| format!("reading {}", path.display()))?;
                        store.dispatch(SessionAction::SetDocumentSide {
                            index,
                            side,
                            image: Some(image),
                        });
                    }
                }
            }
        }
        Step::Fingerprint => {
            if args.scan {
                let device = FingerprintDevice::new(&config.fingerprint)?;
                device.init().await?;
                controller.capture_fingerprint(&device, Thumb::First).await?;
                if let Err(e) = controller.capture_fingerprint(&device, Thumb::Second).await {
                    warn!("Continuing with one thumbprint: {}", e);
                }
            }
            for (thumb, path) in [(Thumb::First, &args.thumb1), (Thumb::Second, &args.thumb2)] {
                if let Some(path) = path {
                    let image = load_image_file(path)
                        .await
                        .with_context(|| format!("reading {}", path.display()))?;
                    store.dispatch(SessionAction::SetThumbprint {
                        thumb,
                        image: Some(image),
                    });
                }
            }
        }
        Step::Review => {}
    }
    Ok(())
}

/// Print submission results as they happen, like the notification toasts
fn spawn_notifications(event_bus: &EventBus) -> tokio::task::JoinHandle<()> {
    let mut receiver = EventReceiver::new(
        event_bus.subscribe(),
        EventFilter::EventTypes(vec![
            "step_submitted",
            "submission_failed",
            "activity_config_loaded",
            "enrollment_completed",
        ]),
        "cli-notifications".to_string(),
    );

    tokio::spawn(async move {
        while let Ok(event) = receiver.recv().await {
            match event {
                EnrollmentEvent::SubmissionFailed { .. } => {
                    eprintln!("✗ {}", event.description())
                }
                _ => println!("• {}", event.description()),
            }
        }
    })
}

fn approval_request(config: &BioCaptureConfig, decision: DecisionArgs) -> ApprovalRequest {
    ApprovalRequest {
        relation_no: decision.relation_no,
        batch: decision.batch,
        cust_no: decision.cust_no,
        actor: config.operator.name.clone(),
        hostname: config.operator.hostname.clone(),
        terminal_ip: config.operator.terminal_ip.clone(),
    }
}

fn print_step(view: &StepView) {
    println!("[{}/{}] {}", view.position, view.total, view.title);
    for field in &view.fields {
        println!("  {} {}", if field.present { "✓" } else { "·" }, field.label);
    }
    for missing in &view.missing {
        println!("  missing: {}", missing);
    }
}

fn print_lookup<T>(outcome: &LookupOutcome<T>) {
    let mark = if outcome.is_success() { "✓" } else { "✗" };
    println!("{} {}", mark, outcome.message);
}

fn print_images(bundle: &ImageBundle) {
    for (label, set) in [("approved", &bundle.approved), ("unapproved", &bundle.unapproved)] {
        print_image_set(label, set);
    }
}

fn print_image_set(label: &str, set: &ImageSet) {
    if set.is_empty() {
        println!("{}: none", label);
        return;
    }
    println!(
        "{}: batch {}, photo {}, signature {}",
        label,
        set.batch().unwrap_or("-"),
        if set.photo().is_some() { "present" } else { "missing" },
        if set.signature().is_some() { "present" } else { "missing" }
    );
}

fn print_record(outcome: &LookupOutcome<EnquiryBundle>) {
    print_lookup(outcome);
    if let Some(record) = &outcome.data {
        for (key, value) in record.display_pairs() {
            println!("  {:<24} {}", key, value);
        }
    }
}

fn init_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("biocapture={}", log_level)));

    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("compact") => fmt::layer()
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
        Some("pretty") | None => fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer()
                .with_target(true)
                .with_thread_ids(args.debug)
                .with_file(args.debug)
                .with_line_number(args.debug)
                .boxed()
        }
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .try_init()
        .map_err(|e| anyhow!("failed to initialize logging: {}", e))?;

    Ok(())
}

/// Print default configuration in TOML format
fn print_default_config() -> Result<()> {
    println!("# biocapture configuration file");
    println!("# Every key may be overridden with BIOCAPTURE__<SECTION>__<KEY>");
    println!();
    println!("{}", BioCaptureConfig::default().to_toml()?);
    Ok(())
}
