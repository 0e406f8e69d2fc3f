//! tz-sim - headless assembly and gear train simulator
//!
//! Builds assemblies from short descriptions, runs gear train sweeps and
//! keyframe playback, and inspects saved assembly documents.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use glam::Vec3;
use tz_core::{
    Assembly, AssemblyBuilder, AssemblyTemplate, ConfigManager, FnObserver, GearMesh, GearSpec,
    JointType, KinematicChain, KinematicSimulator, MotionPlayer, SimConfig,
};

#[derive(Parser)]
#[command(name = "tz-sim")]
#[command(about = "Assembly positioning and gear train simulator", long_about = None)]
struct Cli {
    /// RON configuration file (defaults are used if it does not exist)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build an assembly from a text description
    Build {
        /// Description, e.g. "3 gears meshed"
        description: String,
        /// Force a template instead of detecting one (gear_train, bearing_assembly, ...)
        #[arg(short, long)]
        template: Option<AssemblyTemplate>,
        /// Write the solved assembly as JSON
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Simulate a gear train driven by its first gear
    Gears {
        /// Tooth counts of consecutive gears
        #[arg(long, value_delimiter = ',', default_values_t = [20, 40, 30])]
        teeth: Vec<u32>,
        /// Driver speed
        #[arg(long, default_value_t = 100.0)]
        rpm: f32,
        /// Simulated seconds
        #[arg(long, default_value_t = 1.0)]
        duration: f32,
    },
    /// Play keyframes on a single revolute joint
    Play {
        /// Keyframes as TIME:ANGLE pairs
        #[arg(long, value_delimiter = ',', value_parser = parse_keyframe, default_value = "0:0,1:1.5,2:0")]
        keyframes: Vec<(f32, f32)>,
        /// Seconds per step
        #[arg(long, default_value_t = 0.25)]
        dt: f32,
        /// Number of steps
        #[arg(long, default_value_t = 8)]
        steps: usize,
        /// Wrap around at the last keyframe
        #[arg(long = "loop")]
        looping: bool,
    },
    /// Display information about an assembly document
    Info {
        /// Path to the assembly JSON file
        file: PathBuf,
    },
}

fn parse_keyframe(raw: &str) -> Result<(f32, f32), String> {
    let (time, angle) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected TIME:ANGLE, got '{}'", raw))?;
    let time = time.trim().parse::<f32>().map_err(|e| format!("bad time '{}': {}", time, e))?;
    let angle = angle.trim().parse::<f32>().map_err(|e| format!("bad angle '{}': {}", angle, e))?;
    Ok((time, angle))
}

fn main() -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tz_sim=info,tz_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => ConfigManager::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?
            .config()
            .clone(),
        None => SimConfig::new(),
    };

    match cli.command {
        Commands::Build {
            description,
            template,
            out,
        } => build(&config, &description, template, out.as_deref())?,
        Commands::Gears {
            teeth,
            rpm,
            duration,
        } => gears(&config, &teeth, rpm, duration)?,
        Commands::Play {
            keyframes,
            dt,
            steps,
            looping,
        } => play(&config, &keyframes, dt, steps, looping)?,
        Commands::Info { file } => show_info(&file)?,
    }

    Ok(())
}

fn build(
    config: &SimConfig,
    description: &str,
    template: Option<AssemblyTemplate>,
    out: Option<&Path>,
) -> Result<()> {
    let builder = AssemblyBuilder::new()
        .with_config(config.builder.clone())
        .with_solver_config(config.solver.clone());
    let assembly = match template {
        Some(template) => builder.build_template(template, description),
        None => builder.build_from_text(description),
    };

    print_assembly(&assembly);

    if let Some(path) = out {
        assembly
            .save(path)
            .with_context(|| format!("failed to save assembly to {}", path.display()))?;
        println!("Saved to {}", path.display());
    }
    Ok(())
}

fn gears(config: &SimConfig, teeth: &[u32], rpm: f32, duration: f32) -> Result<()> {
    let specs: Vec<GearSpec> = teeth
        .iter()
        .enumerate()
        .map(|(i, t)| GearSpec::new(format!("gear_{}", i + 1), *t))
        .collect();
    let Some(driver) = specs.first().map(|g| g.id.clone()) else {
        anyhow::bail!("at least one gear is required");
    };

    let mut sim = KinematicSimulator::with_config(config.playback.clone());
    sim.setup_gear_train(&specs)?;

    for ratio in sim.gear_ratios() {
        println!("{} -> {}: {:.3}", ratio.gear1, ratio.gear2, ratio.ratio);
    }

    let report = sim.simulate_rotation(&driver, rpm, duration);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn play(
    config: &SimConfig,
    keyframes: &[(f32, f32)],
    dt: f32,
    steps: usize,
    looping: bool,
) -> Result<()> {
    let mut chain = KinematicChain::new("Demo Arm");
    let base = chain.add_link("base", 1.0)?;
    let arm = chain.add_link("arm", 1.0)?;
    let joint = chain.add_joint(JointType::Revolute, Some(base), arm, Vec3::Z)?;

    let mut player = MotionPlayer::new(chain, GearMesh::new()).with_config(&config.playback);
    for (time, angle) in keyframes {
        player.add_keyframe(*time, [(joint.to_string(), *angle)])?;
    }
    player.register_observer(FnObserver::new(
        "log",
        |time, positions: &BTreeMap<String, f32>| tracing::debug!(time, ?positions, "step"),
    ));

    player.play(looping);
    for _ in 0..steps {
        let positions = player.step(dt);
        let applied = player.chain().get_joint(joint).map_or(0.0, |j| j.position());
        println!(
            "t={:.3} requested={:?} applied={:.4}",
            player.current_time(),
            positions.get(&joint.to_string()),
            applied
        );
    }
    player.stop();

    println!("{}", serde_json::to_string_pretty(&player.snapshot())?);
    Ok(())
}

fn print_assembly(assembly: &Assembly) {
    println!("Assembly: {}", assembly.name);
    println!("Parts: {}", assembly.part_count());
    for part in assembly.parts_iter() {
        let t = part.transform;
        println!(
            "  {} '{}' [{}] at ({:.1}, {:.1}, {:.1})",
            part.id, part.name, part.part_type, t.x, t.y, t.z
        );
    }
    println!("Constraints: {}", assembly.constraints().len());
    for constraint in assembly.constraints() {
        println!(
            "  {} {} {} -> {} (satisfied: {})",
            constraint.id,
            constraint.constraint_type(),
            constraint.part1,
            constraint.part2,
            constraint.satisfied
        );
    }
}

fn show_info(path: &Path) -> Result<()> {
    let assembly = Assembly::load(path)
        .with_context(|| format!("failed to load assembly from {}", path.display()))?;
    print_assembly(&assembly);

    if !assembly.metadata.author.is_empty() {
        println!("Author: {}", assembly.metadata.author);
    }
    println!("Format version: {}", assembly.metadata.version);

    match assembly.validate() {
        Ok(()) => println!("Validation: ok"),
        Err(errors) => {
            for error in errors {
                println!("Validation: {}", error);
            }
        }
    }
    Ok(())
}
