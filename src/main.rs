use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use penarm::{
    encode_program, init_logging, list_ports, plan_drawing, Artwork, CalibrationStore, Config,
    JobHandle, JobStatus, LogFormat, PlotterSession,
};
use penarm_settings::{default_calibration_path, default_config_path};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "penarm", version, about = "Draw vector artwork with a pen-holding robot arm")]
struct Cli {
    /// Configuration file (JSON or TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Calibration file
    #[arg(long, global = true)]
    calibration: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List serial ports an arm may be attached to
    Ports,
    /// Write the default configuration file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Plan an artwork against the stored calibration and print the G-code
    Plan {
        /// Artwork JSON file
        artwork: PathBuf,
        /// Write G-code here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Emit the motion program as JSON instead of G-code
        #[arg(long)]
        json: bool,
    },
    /// Capture the drawing rectangle and resting position
    Calibrate {
        /// Serial port (defaults to the configured port)
        #[arg(short, long)]
        port: Option<String>,
        /// Park at the default resting position instead of capturing one
        #[arg(long)]
        default_resting: bool,
    },
    /// Draw an artwork
    Draw {
        /// Artwork JSON file
        artwork: PathBuf,
        /// Serial port (defaults to the configured port)
        #[arg(short, long)]
        port: Option<String>,
    },
    /// Draw the calibration rectangle and its diagonals
    TestPattern {
        /// Serial port (defaults to the configured port)
        #[arg(short, long)]
        port: Option<String>,
    },
}

fn config_path(cli: &Cli) -> anyhow::Result<PathBuf> {
    match &cli.config {
        Some(path) => Ok(path.clone()),
        None => Ok(default_config_path()?),
    }
}

fn calibration_path(cli: &Cli) -> anyhow::Result<PathBuf> {
    match &cli.calibration {
        Some(path) => Ok(path.clone()),
        None => Ok(default_calibration_path()?),
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let path = config_path(cli)?;
    Config::load_or_default(&path).with_context(|| format!("loading {}", path.display()))
}

async fn wait_for_enter(prompt: &str) -> anyhow::Result<()> {
    println!("{}", prompt);
    tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        std::io::stdin().read_line(&mut line).map(|_| ())
    })
    .await??;
    Ok(())
}

/// Print progress until the job ends; Ctrl-C cancels it.
async fn follow(mut handle: JobHandle) -> anyhow::Result<()> {
    let mut progress = handle
        .take_progress()
        .context("progress stream already taken")?;
    let cancel = handle.cancel_token();
    loop {
        tokio::select! {
            event = progress.next() => match event {
                Some(event) => {
                    println!("[{}/{}] {}", event.completed, event.total, event.message);
                    if event.is_final() {
                        break;
                    }
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::warn!("Cancelling {}", handle.id());
                cancel.cancel();
            }
        }
    }

    match handle.wait().await? {
        JobStatus::Completed => Ok(()),
        JobStatus::Cancelled => {
            println!("Cancelled");
            Ok(())
        }
        JobStatus::Failed(e) => bail!("job failed: {}", e),
        other => bail!("job ended in unexpected state {}", other),
    }
}

/// Connect, home and restore the stored calibration.
async fn open_calibrated(cli: &Cli, port: Option<&str>) -> anyhow::Result<PlotterSession> {
    let config = load_config(cli)?;
    let store = CalibrationStore::file(calibration_path(cli)?);
    let mut session = PlotterSession::new(config, store);
    session.connect_serial(port).await?;

    let calibration = session.calibration().clone();
    let operator = calibration.begin_session()?;
    let arm = session.arm()?;
    operator.connect(arm)?;
    operator.home(arm).await?;
    operator
        .restore()
        .context("no usable calibration, run `penarm calibrate` first")?;
    drop(operator);
    Ok(session)
}

async fn calibrate(cli: &Cli, port: Option<&str>, default_resting: bool) -> anyhow::Result<()> {
    let config = load_config(cli)?;
    let pen_lift = config.motion.pen_lift_height;
    let store = CalibrationStore::file(calibration_path(cli)?);
    let mut session = PlotterSession::new(config, store);
    session.connect_serial(port).await?;

    let calibration = session.calibration().clone();
    let operator = calibration.begin_session()?;
    let arm = session.arm()?;
    operator.connect(arm)?;
    operator.home(arm).await?;

    let mut points = vec!["first drawing corner (pen touching the paper)", "opposite corner"];
    if !default_resting {
        points.push("resting position");
    }
    for point in points {
        operator.unlock_motors(arm).await?;
        wait_for_enter(&format!("Move the arm to the {}, then press Enter", point)).await?;
        operator.lock_motors(arm).await?;
        let position = operator.capture(arm).await?;
        println!("Captured {}", position);
    }
    if default_resting {
        operator.use_default_resting()?;
    }

    let frame = operator.finalize(pen_lift)?;
    let area = frame.drawing_area();
    println!(
        "Calibrated: {:.1} x {:.1} mm, pen down at Z{:.2}, up at Z{:.2}",
        area.width(),
        area.height(),
        frame.z_draw,
        frame.z_up
    );
    drop(operator);
    session.disconnect();
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(if cli.log_json {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    })?;

    match &cli.command {
        Command::Ports => {
            for port in list_ports()? {
                println!("{}\t{}", port.port_name, port.description);
            }
        }
        Command::InitConfig { force } => {
            let path = config_path(&cli)?;
            if path.exists() && !force {
                bail!("{} exists, use --force to overwrite", path.display());
            }
            Config::default().save_to_file(&path)?;
            println!("Wrote {}", path.display());
        }
        Command::Plan {
            artwork,
            output,
            json,
        } => {
            let config = load_config(&cli)?;
            let store = CalibrationStore::file(calibration_path(&cli)?);
            let frame = store
                .load()?
                .context("no calibration stored, run `penarm calibrate` first")?
                .to_frame()?;
            let artwork = Artwork::load_from_file(artwork)?;
            let plan = plan_drawing(&artwork, &config, &frame)?;
            let text = if *json {
                serde_json::to_string_pretty(&plan.program)? + "\n"
            } else {
                encode_program(&plan.program).join("\n") + "\n"
            };
            match output {
                Some(path) => {
                    std::fs::write(path, text)?;
                    println!(
                        "Wrote {} commands for {} strokes to {}",
                        plan.program.len(),
                        plan.strokes.len(),
                        path.display()
                    );
                }
                None => print!("{}", text),
            }
        }
        Command::Calibrate {
            port,
            default_resting,
        } => calibrate(&cli, port.as_deref(), *default_resting).await?,
        Command::Draw { artwork, port } => {
            let artwork = Artwork::load_from_file(artwork)?;
            let mut session = open_calibrated(&cli, port.as_deref()).await?;
            let handle = session.start_drawing(&artwork)?;
            let result = follow(handle).await;
            session.disconnect();
            result?;
        }
        Command::TestPattern { port } => {
            let mut session = open_calibrated(&cli, port.as_deref()).await?;
            let handle = session.start_test_pattern()?;
            let result = follow(handle).await;
            session.disconnect();
            result?;
        }
    }

    Ok(())
}
