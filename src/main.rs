mod cli;

use std::fs::OpenOptions;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::Parser;

use captrack::catalog::{self, CapabilityPatch, MilestonePatch, MilestoneRef, NewCapability};
use captrack::dates::{parse_plan_date, DateLike, DateRange};
use captrack::model::{AppData, CapabilityStatus, Phase, PhaseDates, RagStatus};
use captrack::store::Store;
use captrack::timeline::{TimelineConfig, Window};
use captrack::{db, output, persist, plans, tui};
use cli::{CapCommand, CapFields, Cli, Command, MilestoneCommand, PlanCommand, WindowArgs};

fn default_db_path() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".captrack").join("captrack.db"))
}

fn resolve_db_path(cli_db: Option<String>) -> Result<String> {
    match cli_db {
        Some(p) => Ok(p),
        None => {
            let path = default_db_path()?;
            Ok(path
                .to_str()
                .context("default DB path is not valid UTF-8")?
                .to_string())
        }
    }
}

fn ensure_db_dir(db_path: &str) -> Result<()> {
    if let Some(parent) = std::path::Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
    }
    Ok(())
}

fn open_store(db_path: &str) -> Result<Store> {
    let conn = db::open(db_path)?;
    db::init(&conn)?;
    let store = Store::open(conn)?;
    if let Some(err) = store.load_error() {
        eprintln!("warning: stored data could not be read and was ignored: {err}");
    }
    Ok(store)
}

/// Log to stderr, or to `CAPTRACK_LOG_FILE` when set (the TUI owns the terminal).
fn setup_logging() -> Result<()> {
    let env = env_logger::Env::default().filter_or("CAPTRACK_LOG", "warn");
    let mut builder = env_logger::Builder::from_env(env);
    if let Ok(path) = std::env::var("CAPTRACK_LOG_FILE") {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open log file {path}"))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.format_timestamp_secs().init();
    Ok(())
}

/// Parse a user-supplied date, rejecting anything unrecognisable.
fn parse_date_arg(s: &str) -> Result<DateTime<Utc>> {
    match DateLike::from(s).to_instant() {
        Some(dt) => Ok(dt),
        None => bail!("invalid date '{s}': use YYYY-MM-DD or RFC 3339"),
    }
}

fn parse_day_arg(s: &str) -> Result<NaiveDate> {
    Ok(parse_date_arg(s)?.date_naive())
}

/// Split `START..END`; either side may be empty.
fn parse_range_arg(s: &str) -> Result<(Option<DateLike>, Option<DateLike>)> {
    let Some((start, end)) = s.split_once("..") else {
        bail!("invalid phase range '{s}': expected START..END");
    };
    let side = |v: &str| -> Result<Option<DateLike>> {
        let v = v.trim();
        if v.is_empty() {
            return Ok(None);
        }
        parse_date_arg(v)?;
        Ok(Some(DateLike::from(v)))
    };
    Ok((side(start)?, side(end)?))
}

/// Overlay the phase flags on `base`: given dates replace, absent ones fall back.
fn overlay_phases(base: PhaseDates, flags: [(Phase, Option<String>); 5]) -> Result<PhaseDates> {
    let mut phases = base;
    for (phase, flag) in flags {
        let Some(flag) = flag else { continue };
        let (start, end) = parse_range_arg(&flag)?;
        let current = base.range(phase);
        phases.set_range(
            phase,
            DateRange::new(
                parse_plan_date(start, current.start),
                parse_plan_date(end, current.end),
            ),
        );
    }
    Ok(phases)
}

fn timeline_config(args: &WindowArgs) -> Result<TimelineConfig> {
    let default = Window::default_for(Utc::now().date_naive());
    let from = match &args.from {
        Some(s) => parse_day_arg(s)?,
        None => default.start().date_naive(),
    };
    let to = match &args.to {
        Some(s) => parse_day_arg(s)?,
        None => default.end().date_naive(),
    };
    Ok(TimelineConfig::new(Window::from_dates(from, to)?, args.month_width))
}

fn parse_status(s: Option<String>) -> Result<Option<CapabilityStatus>> {
    s.map(|s| CapabilityStatus::parse(&s)).transpose()
}

fn parse_rag(s: Option<String>) -> Result<Option<RagStatus>> {
    s.map(|s| RagStatus::parse(&s)).transpose()
}

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    setup_logging()?;
    let db_path = resolve_db_path(cli.db)?;
    ensure_db_dir(&db_path)?;

    match cli.command {
        Command::Cap(cmd) => run_cap(&mut open_store(&db_path)?, cmd),
        Command::Milestone(cmd) => run_milestone(&mut open_store(&db_path)?, cmd),
        Command::Plan(cmd) => run_plan(&mut open_store(&db_path)?, cmd),

        Command::Timeline { window } => {
            let config = timeline_config(&window)?;
            let store = open_store(&db_path)?;
            let lanes = store.lanes()?;
            print!("{}", output::format_timeline(&lanes, &config, Utc::now()));
            Ok(())
        }

        Command::Tui {
            window,
            poll_interval,
        } => {
            let config = timeline_config(&window)?;
            let mut store = open_store(&db_path)?;
            tui::run(&db_path, &mut store, config, poll_interval)
        }

        Command::Check => {
            let store = open_store(&db_path)?;
            let problems = store.verify()?;
            let orphaned = catalog::orphaned_plan_ids(store.data());
            print!("{}", output::format_problems(&problems, &orphaned));
            if !problems.is_empty() {
                bail!("{} consistency problem(s) found", problems.len());
            }
            eprintln!("Plans are consistent");
            Ok(())
        }

        Command::Export { output: path } => {
            let store = open_store(&db_path)?;
            let json = persist::to_json_pretty(store.data())?;
            match path {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("failed to write {path}"))?;
                    eprintln!("Exported to '{path}'");
                }
                None => println!("{json}"),
            }
            Ok(())
        }

        Command::Import { file } => {
            let text =
                std::fs::read_to_string(&file).with_context(|| format!("failed to read {file}"))?;
            let data: AppData = persist::from_json(&text)?;
            let problems = plans::check_consistency(&data.roadmap_plans);
            for p in &problems {
                eprintln!("warning: {p}");
            }
            let mut store = open_store(&db_path)?;
            store.replace_all(data)?;
            eprintln!(
                "Imported {} capabilities, {} milestones, {} plans",
                store.data().capabilities.len(),
                store.data().milestones.len(),
                store.data().roadmap_plans.len()
            );
            Ok(())
        }
    }
}

fn run_cap(store: &mut Store, cmd: CapCommand) -> Result<()> {
    match cmd {
        CapCommand::Add { name, fields } => {
            let CapFields {
                lead,
                sme,
                ba,
                status,
                rag,
                notes,
                milestone,
            } = fields;
            let mut new = NewCapability::named(&name);
            new.lead = lead.unwrap_or_default();
            new.sme = sme.unwrap_or_default();
            new.ba = ba.unwrap_or_default();
            new.notes = notes.unwrap_or_default();
            new.milestone = milestone;
            if let Some(status) = parse_status(status)? {
                new.status = status;
            }
            if let Some(rag) = parse_rag(rag)? {
                new.rag_status = rag;
            }
            let id = store.add_capability(new)?;
            println!("{id}");
            eprintln!("Added capability '{}'", name.trim());
        }

        CapCommand::Edit {
            capability,
            name,
            fields,
            clear_milestone,
        } => {
            let id = catalog::find_capability(store.data(), &capability)?.id.clone();
            let milestone = if clear_milestone {
                Some(None)
            } else {
                fields.milestone.map(Some)
            };
            let patch = CapabilityPatch {
                name,
                lead: fields.lead,
                sme: fields.sme,
                ba: fields.ba,
                status: parse_status(fields.status)?,
                rag_status: parse_rag(fields.rag)?,
                notes: fields.notes,
                milestone,
            };
            store.update_capability(&id, patch)?;
            eprintln!("Updated capability '{capability}'");
        }

        CapCommand::Rm { capability } => {
            let cap = match catalog::find_capability(store.data(), &capability) {
                Ok(cap) => cap.clone(),
                Err(_) => {
                    eprintln!("No capability '{capability}'; nothing removed");
                    return Ok(());
                }
            };
            let plan_count = store.history(&cap.id).len();
            store.delete_capability(&cap.id)?;
            eprintln!("Removed capability '{}' and {plan_count} plan(s)", cap.name);
        }

        CapCommand::List { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(store.capabilities())?);
            } else {
                print!(
                    "{}",
                    output::format_capability_list(store.capabilities(), store.plans())
                );
            }
        }

        CapCommand::Show { capability, json } => {
            let data = store.data();
            let cap = catalog::find_capability(data, &capability)?;
            let milestone = catalog::resolve_milestone(data, cap);
            let detail = output::CapabilityDetail {
                capability: cap,
                milestone_date: match milestone {
                    MilestoneRef::Resolved(m) => Some(m.date),
                    _ => None,
                },
                milestone_missing: matches!(milestone, MilestoneRef::Dangling(_)),
                active_plan: store.active_plan(&cap.id)?,
                plan_versions: store.history(&cap.id).len(),
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&detail)?);
            } else {
                print!("{}", output::format_capability_detail(&detail, milestone));
            }
        }
    }
    Ok(())
}

fn run_milestone(store: &mut Store, cmd: MilestoneCommand) -> Result<()> {
    match cmd {
        MilestoneCommand::Add { name, date } => {
            let date = parse_date_arg(&date)?;
            let id = store.add_milestone(&name, date)?;
            println!("{id}");
            eprintln!("Added milestone '{}'", name.trim());
        }

        MilestoneCommand::Edit {
            milestone,
            name,
            date,
        } => {
            let id = catalog::find_milestone(store.data(), &milestone)?.id.clone();
            let patch = MilestonePatch {
                name,
                date: date.as_deref().map(parse_date_arg).transpose()?,
            };
            store.update_milestone(&id, patch)?;
            eprintln!("Updated milestone '{milestone}'");
        }

        MilestoneCommand::Rm { milestone } => {
            let id = match catalog::find_milestone(store.data(), &milestone) {
                Ok(m) => m.id.clone(),
                Err(_) => {
                    eprintln!("No milestone '{milestone}'; nothing removed");
                    return Ok(());
                }
            };
            store.delete_milestone(&id)?;
            eprintln!("Removed milestone '{milestone}'");
        }

        MilestoneCommand::List { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(&store.data().milestones)?);
            } else {
                print!("{}", output::format_milestones(&store.data().milestones));
            }
        }
    }
    Ok(())
}

fn run_plan(store: &mut Store, cmd: PlanCommand) -> Result<()> {
    match cmd {
        PlanCommand::Set {
            capability,
            start,
            requirements,
            design,
            development,
            cst,
            uat,
        } => {
            let cap = catalog::find_capability(store.data(), &capability)?.clone();
            let base = match store.active_plan(&cap.id)? {
                Some(plan) if start.is_none() => plan.phases,
                _ => {
                    let start = match start {
                        Some(s) => parse_day_arg(&s)?,
                        None => Utc::now().date_naive(),
                    };
                    PhaseDates::sequential(start)
                }
            };
            let phases = overlay_phases(
                base,
                [
                    (Phase::Requirements, requirements),
                    (Phase::Design, design),
                    (Phase::Development, development),
                    (Phase::Cst, cst),
                    (Phase::Uat, uat),
                ],
            )?;
            let id = store.update_plan(&cap.id, phases)?;
            let plan = store
                .plan(&id)
                .context("new plan missing after save")?;
            print!("{}", output::format_plan(plan));
            eprintln!("Saved version {} for '{}'", plan.version, cap.name);
        }

        PlanCommand::Rm {
            capability,
            version,
        } => {
            let cap = catalog::find_capability(store.data(), &capability)?.clone();
            let Some(plan) = plans::find_version(store.plans(), &cap.id, version) else {
                eprintln!("No version {version} for '{}'; nothing removed", cap.name);
                return Ok(());
            };
            let plan_id = plan.id.clone();
            store.delete_plan(&plan_id)?;
            eprintln!("Removed version {version} of '{}'", cap.name);
            if let Some(active) = store.active_plan(&cap.id)? {
                eprintln!("Active version is now {}", active.version);
            }
        }

        PlanCommand::History { capability, json } => {
            let cap = catalog::find_capability(store.data(), &capability)?;
            let history = store.history(&cap.id);
            if json {
                println!("{}", serde_json::to_string_pretty(&history)?);
            } else {
                print!("{}", output::format_history(&history));
            }
        }

        PlanCommand::Show {
            capability,
            version,
            json,
        } => {
            let cap = catalog::find_capability(store.data(), &capability)?;
            let plan = match version {
                Some(v) => plans::find_version(store.plans(), &cap.id, v),
                None => store.active_plan(&cap.id)?,
            };
            let Some(plan) = plan else {
                bail!("no such plan for '{}'", cap.name);
            };
            if json {
                println!("{}", serde_json::to_string_pretty(plan)?);
            } else {
                print!("{}", output::format_plan(plan));
            }
        }
    }
    Ok(())
}
