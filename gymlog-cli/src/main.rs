use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{ArgGroup, Parser, Subcommand};
use dotenvy::dotenv;
use log::info;

use gymlog::config::{self, Config};
use gymlog::db::models::{Exercise, NewHistoricPr};
use gymlog::db::operations::{
    ProgramRef, add_historic_pr, find_exercise, get_all_programs, get_historic_prs,
    get_muscles_for_exercise, get_or_create_exercise, get_or_create_muscle, link_exercise_muscle,
};
use gymlog::db::{SqlitePool, connect, reset_database};
use gymlog::errors::GymError;
use gymlog::loader::load_paths;
use gymlog::logging::init_logger;
use gymlog::parser::PlannerMarkup;
use gymlog::workbook::{ImportOptions, export_program, import_workbook};

#[derive(Parser, Debug)]
#[command(version, about = "gymlog - training planner loader and workout log", long_about = None)]
struct Args {
    /// SQLite database, e.g. sqlite://gym.db
    #[arg(long, global = true)]
    database_url: Option<String>,
    /// off, error, warn, info, debug or trace
    #[arg(long, global = true)]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply pending schema migrations
    Migrate,
    /// Delete every row, keeping the schema
    Reset,
    /// Load HTML planner files (directories expand to their .html files)
    Load {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Program the blocks belong to; a new unnamed program when omitted
        #[arg(short, long)]
        program: Option<String>,
    },
    /// Write a program's blocks to <output-dir>/<program>.xlsx
    #[command(group(ArgGroup::new("target").required(true).args(["id", "program"])))]
    Export {
        #[arg(long)]
        id: Option<i64>,
        #[arg(short, long)]
        program: Option<String>,
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
    /// Import the logs filled into an exported workbook
    Import { path: PathBuf },
    /// List programs
    Programs,
    /// Historic personal records
    Pr {
        #[command(subcommand)]
        action: PrCommand,
    },
    /// Exercise to muscle associations
    Muscle {
        #[command(subcommand)]
        action: MuscleCommand,
    },
}

#[derive(Subcommand, Debug)]
enum PrCommand {
    Add {
        #[arg(short, long)]
        exercise: String,
        /// YYYY-MM-DD
        #[arg(short, long)]
        date: NaiveDate,
        #[arg(short, long)]
        reps: i64,
        #[arg(short, long)]
        weight: f64,
    },
    List {
        #[arg(short, long)]
        exercise: String,
    },
}

#[derive(Subcommand, Debug)]
enum MuscleCommand {
    Link {
        #[arg(short, long)]
        exercise: String,
        #[arg(short, long)]
        muscle: String,
    },
    List {
        #[arg(short, long)]
        exercise: String,
    },
}

/// Environment configuration with the command line flags taking precedence.
fn load_config(args: &Args) -> Result<Config> {
    let mut overrides = HashMap::new();
    if let Some(url) = &args.database_url {
        overrides.insert(config::DATABASE_URL, url.clone());
    }
    if let Some(level) = &args.log_level {
        overrides.insert(config::LOG_LEVEL, level.clone());
    }
    let config =
        Config::from_lookup(|key| overrides.get(key).cloned().or_else(|| env::var(key).ok()))?;
    Ok(config)
}

async fn find_exercise_or_fail(pool: &SqlitePool, name: &str) -> Result<Exercise> {
    find_exercise(pool, name)
        .await?
        .ok_or_else(|| GymError::not_found(format!("exercise '{name}'")).into())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args = Args::parse();
    let config = load_config(&args)?;
    init_logger(config.log_level);

    let pool = connect(&config.database_url)
        .await
        .with_context(|| format!("opening {}", config.database_url))?;

    match args.command {
        Commands::Migrate => {
            println!("Database is up to date");
        }
        Commands::Reset => {
            reset_database(&pool).await?;
            println!("All rows deleted");
        }
        Commands::Load { paths, program } => {
            let reports =
                load_paths(&pool, &paths, program.as_deref(), &PlannerMarkup::default()).await?;
            for report in reports {
                if report.block_created {
                    println!(
                        "{}: block '{}' loaded ({} workouts, {} sets, {} new exercises)",
                        report.program,
                        report.block.description,
                        report.workouts,
                        report.sets,
                        report.new_exercises
                    );
                } else {
                    println!(
                        "{}: block '{}' already present, skipped",
                        report.program, report.block.description
                    );
                }
            }
        }
        Commands::Export {
            id,
            program,
            output_dir,
        } => {
            let target = match (id, program) {
                (Some(id), _) => ProgramRef::Id(id),
                (None, Some(desc)) => ProgramRef::Description(desc),
                (None, None) => anyhow::bail!("either --id or --program is required"),
            };
            let output_dir = output_dir.unwrap_or_else(|| config.export_dir.clone());
            let report = export_program(&pool, &target, &output_dir).await?;
            println!(
                "{}: {} sheets written, {} already present",
                report.path.display(),
                report.written.len(),
                report.skipped.len()
            );
        }
        Commands::Import { path } => {
            let report = import_workbook(&pool, &path, &ImportOptions::default()).await?;
            println!(
                "{}: {} workouts and {} sets logged, {} workouts without overall RPE skipped",
                report.program, report.workouts, report.sets, report.skipped
            );
        }
        Commands::Programs => {
            for program in get_all_programs(&pool).await? {
                match &program.objective {
                    Some(objective) => println!("{program} - {objective}"),
                    None => println!("{program}"),
                }
            }
        }
        Commands::Pr { action } => match action {
            PrCommand::Add {
                exercise,
                date,
                reps,
                weight,
            } => {
                let mut conn = pool.acquire().await?;
                let exercise = get_or_create_exercise(&mut conn, &exercise).await?;
                let pr = add_historic_pr(
                    &mut *conn,
                    &NewHistoricPr {
                        exercise_id: exercise.id,
                        date_pr: date,
                        reps,
                        weight,
                        date_reg: Local::now().date_naive(),
                    },
                )
                .await?;
                info!("Recorded PR #{} for {}", pr.id, exercise.description);
                println!("{}: {pr}", exercise.description);
            }
            PrCommand::List { exercise } => {
                let exercise = find_exercise_or_fail(&pool, &exercise).await?;
                for pr in get_historic_prs(&pool, exercise.id).await? {
                    println!("{pr}");
                }
            }
        },
        Commands::Muscle { action } => match action {
            MuscleCommand::Link { exercise, muscle } => {
                let mut conn = pool.acquire().await?;
                let exercise = get_or_create_exercise(&mut conn, &exercise).await?;
                let muscle = get_or_create_muscle(&mut conn, &muscle).await?;
                if link_exercise_muscle(&mut *conn, exercise.id, muscle.id).await? {
                    println!("{} now works {}", exercise.description, muscle.description);
                } else {
                    println!(
                        "{} already linked to {}",
                        exercise.description, muscle.description
                    );
                }
            }
            MuscleCommand::List { exercise } => {
                let exercise = find_exercise_or_fail(&pool, &exercise).await?;
                for muscle in get_muscles_for_exercise(&pool, exercise.id).await? {
                    println!("{}", muscle.description);
                }
            }
        },
    }

    Ok(())
}
