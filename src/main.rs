mod aggregate;
mod clock;
mod config;
mod domain;
mod error;
mod logging;
mod storage;
mod store;
mod ticker;
mod ui;

use std::error::Error;
use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::{error, info};

use crate::aggregate::{calculate_durations, calculate_progress, goal_status};
use crate::clock::{Clock, SystemClock};
use crate::config::resolve_settings;
use crate::domain::{
	Activity, GoalType, UNKNOWN_ACTIVITY_ID, UNKNOWN_ACTIVITY_LABEL, active_activity, day_key,
	format_minutes, parse_day_key,
};
use crate::error::TrackerError;
use crate::logging::enable_logging;
use crate::storage::{FileRecords, RecordStore};
use crate::store::{ActivityLog, ActivityStore};
use crate::ticker::TickerHandle;
use crate::ui::run_dashboard;

#[derive(Debug, Parser)]
#[command(name = "activity-timer", about = "Track which activity fills your day")]
struct Cli {
	#[arg(long, help = "Directory holding the activity records")]
	state_dir: Option<PathBuf>,
	#[arg(long, help = "Config file, defaults to <state dir>/config.toml")]
	config: Option<PathBuf>,
	#[arg(long, help = "Also print logs to stderr")]
	log: bool,
	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
	Dashboard,
	Add {
		#[arg(long)]
		label: String,
		#[arg(long, help = "Daily goal in minutes")]
		goal_minutes: Option<u32>,
		#[arg(long, help = "more, less or neutral")]
		goal_type: Option<GoalType>,
	},
	Edit {
		#[arg(long)]
		id: String,
		#[arg(long)]
		label: Option<String>,
		#[arg(long)]
		goal_minutes: Option<u32>,
		#[arg(long)]
		goal_type: Option<GoalType>,
		#[arg(long, conflicts_with_all = ["goal_minutes", "goal_type"])]
		clear_goal: bool,
	},
	Delete {
		#[arg(long)]
		id: String,
	},
	List,
	Switch {
		activity: String,
	},
	Stop,
	Summary {
		#[arg(long)]
		day: Option<String>,
	},
	Progress,
	Watch {
		#[arg(long, help = "Stop after this many ticks")]
		ticks: Option<u64>,
	},
	Debug,
}

fn main() {
	if let Err(err) = run() {
		error!("{err}");
		eprintln!("error: {err}");
		std::process::exit(1);
	}
}

fn run() -> Result<(), Box<dyn Error>> {
	let cli = Cli::parse();
	let settings = resolve_settings(cli.state_dir, cli.config)?;
	let command = cli.command.unwrap_or(Command::Dashboard);

	let show_stderr = cli.log && !matches!(command, Command::Dashboard);
	if let Err(err) = enable_logging(&settings.state_dir, &settings.config.log_level, show_stderr) {
		eprintln!("warning: logging disabled: {err}");
	}
	info!(state_dir = %settings.state_dir.display(), "opened activity records");

	let mut store = ActivityLog::new(FileRecords::new(&settings.state_dir));
	let clock = SystemClock;

	match command {
		Command::Dashboard => {
			run_dashboard(&mut store, &clock, settings.config.tick())?;
		}
		Command::Add {
			label,
			goal_minutes,
			goal_type,
		} => {
			let mut activity = Activity::new(label, None);
			activity.time_goal = goal_minutes;
			activity.goal_type = goal_type;
			let id = activity.id.clone();
			store.create_activity(activity)?;
			println!("created activity {id}");
		}
		Command::Edit {
			id,
			label,
			goal_minutes,
			goal_type,
			clear_goal,
		} => {
			let mut activity = store
				.get_activity(&id)
				.ok_or_else(|| TrackerError::not_found(&id))?;
			if let Some(label) = label {
				activity.label = label;
			}
			if clear_goal {
				activity.time_goal = None;
				activity.goal_type = None;
			}
			if goal_minutes.is_some() {
				activity.time_goal = goal_minutes;
			}
			if goal_type.is_some() {
				activity.goal_type = goal_type;
			}
			store.update_activity(&id, activity)?;
			println!("updated activity {id}");
		}
		Command::Delete { id } => {
			store.delete_activity(&id)?;
			println!("deleted activity {id} and its history");
		}
		Command::List => print_activities(&store),
		Command::Switch { activity } => {
			let now = clock.now();
			store.record_switch(&day_key(now.date_naive()), &activity, now.timestamp_millis())?;
			println!("tracking {}", activity_label(&store, &activity));
		}
		Command::Stop => {
			let now = clock.now();
			store.record_switch(
				&day_key(now.date_naive()),
				UNKNOWN_ACTIVITY_ID,
				now.timestamp_millis(),
			)?;
			println!("tracking stopped");
		}
		Command::Summary { day } => {
			let day = parse_day(day.as_deref(), &clock)?;
			print_summary(&store, &clock, day);
		}
		Command::Progress => print_progress(&store, &clock),
		Command::Watch { ticks } => watch(&store, &clock, settings.config.tick(), ticks)?,
		Command::Debug => {
			let (activities, times) = store.raw_records();
			println!("activities:\n{activities}\n\nactivity times:\n{times}");
		}
	}

	Ok(())
}

fn parse_day(input: Option<&str>, clock: &dyn Clock) -> Result<NaiveDate, Box<dyn Error>> {
	match input {
		Some(raw) => Ok(parse_day_key(raw)?),
		None => Ok(clock.today()),
	}
}

fn activity_label<R: RecordStore>(store: &ActivityLog<R>, activity_id: &str) -> String {
	if activity_id == UNKNOWN_ACTIVITY_ID {
		return UNKNOWN_ACTIVITY_LABEL.to_string();
	}
	store
		.get_activity(activity_id)
		.map(|activity| activity.label)
		.unwrap_or_else(|| format!("deleted activity {activity_id}"))
}

fn print_activities<R: RecordStore>(store: &ActivityLog<R>) {
	let activities = store.list_activities();
	if activities.is_empty() {
		println!("no activities yet");
		return;
	}

	for activity in activities {
		let goal = activity
			.goal()
			.map(|(minutes, goal_type)| format!("{minutes} min/day ({goal_type})"))
			.unwrap_or_else(|| "no goal".to_string());
		println!("{} | {} | {}", activity.id, activity.label, goal);
	}
}

fn print_summary<R: RecordStore>(store: &ActivityLog<R>, clock: &dyn Clock, day: NaiveDate) {
	let intervals = store.day_intervals(&day_key(day));
	let summary = calculate_durations(&intervals, day, &clock.now());

	println!("summary for {}", day_key(day));
	for (activity_id, minutes) in summary.sorted() {
		println!("{} | {}", format_minutes(minutes), activity_label(store, &activity_id));
	}
	println!(
		"\nelapsed {} | tracked {}",
		format_minutes(summary.elapsed_minutes),
		format_minutes(summary.total_tracked_minutes)
	);
}

fn print_progress<R: RecordStore>(store: &ActivityLog<R>, clock: &dyn Clock) {
	let now = clock.now();
	let intervals = store.day_intervals(&day_key(now.date_naive()));
	let summary = calculate_durations(&intervals, now.date_naive(), &now);

	let mut printed = false;
	for activity in store.list_activities() {
		let Some((goal, _)) = activity.goal() else {
			continue;
		};
		let minutes = summary.minutes_for(&activity.id);
		let status = goal_status(&activity, minutes)
			.map(|status| format!("{status:?}"))
			.unwrap_or_default();
		println!(
			"{:>5.1}% | {} of {goal} min | {} | {}",
			calculate_progress(&activity, &intervals, now.timestamp_millis()),
			format_minutes(minutes),
			activity.label,
			status
		);
		printed = true;
	}

	if !printed {
		println!("no activities with a daily goal");
	}
}

fn watch<R: RecordStore>(
	store: &ActivityLog<R>,
	clock: &dyn Clock,
	tick: std::time::Duration,
	ticks: Option<u64>,
) -> Result<(), Box<dyn Error>> {
	let ticker = TickerHandle::spawn(tick)?;
	let mut seen = 0;

	while ticks.is_none_or(|limit| seen < limit) {
		let Some(tick) = ticker.wait_tick() else {
			break;
		};
		seen += 1;

		let now = clock.now();
		let day = now.date_naive();
		let intervals = store.day_intervals(&day_key(day));
		let summary = calculate_durations(&intervals, day, &now);
		let active = active_activity(&intervals);
		println!(
			"#{} {} {} | unknown {} | tracked {}",
			tick.sequence,
			activity_label(store, active),
			format_minutes(summary.minutes_for(active)),
			format_minutes(summary.unknown_minutes()),
			format_minutes(summary.total_tracked_minutes)
		);
	}

	ticker.cancel();
	Ok(())
}
