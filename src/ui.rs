use std::error::Error;
use std::io;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Local, NaiveDate};
use crossterm::event::{self, Event as CEvent, KeyCode, KeyEventKind};
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode};
use crossterm::{ExecutableCommand, execute};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use tracing::{info, warn};

use crate::aggregate::{GoalStatus, calculate_durations, goal_percent, goal_status};
use crate::clock::Clock;
use crate::domain::{
	Activity, GoalType, UNKNOWN_ACTIVITY_ID, UNKNOWN_ACTIVITY_LABEL, active_activity, day_key,
	format_minutes,
};
use crate::storage::RecordStore;
use crate::store::{ActivityLog, ActivityStore, toggle_activity};
use crate::ticker::TickerHandle;

const INPUT_POLL: StdDuration = StdDuration::from_millis(100);
const GOAL_BAR_WIDTH: usize = 20;
const ACTIVE_MARKER_COLOR: Color = Color::Yellow;
const HIGHLIGHT_BACKGROUND_COLOR: Color = Color::Rgb(42, 45, 52);
const GOOD_GOAL_COLOR: Color = Color::Rgb(34, 197, 94);
const BAD_GOAL_COLOR: Color = Color::Rgb(239, 68, 68);
const NEUTRAL_GOAL_COLOR: Color = Color::Rgb(59, 130, 246);

pub fn run_dashboard<R: RecordStore>(
	store: &mut ActivityLog<R>,
	clock: &dyn Clock,
	tick: StdDuration,
) -> Result<(), Box<dyn Error>> {
	enable_raw_mode()?;
	let mut stdout = io::stdout();
	stdout.execute(EnterAlternateScreen)?;
	let backend = CrosstermBackend::new(stdout);
	let mut terminal = Terminal::new(backend)?;

	let result = run_event_loop(&mut terminal, store, clock, tick);

	disable_raw_mode()?;
	execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
	terminal.show_cursor()?;

	result
}

fn run_event_loop<R: RecordStore>(
	terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
	store: &mut ActivityLog<R>,
	clock: &dyn Clock,
	tick: StdDuration,
) -> Result<(), Box<dyn Error>> {
	let ticker = TickerHandle::spawn(tick)?;
	let mut app = App::new(clock.today());
	let mut view = build_view(&app, store, clock.now());
	let mut redraw = true;

	loop {
		if redraw {
			app.clamp_selection(&view);
			terminal.draw(|frame| draw_dashboard(frame, &app, &view))?;
			redraw = false;
		}

		if event::poll(INPUT_POLL)? {
			if let CEvent::Key(key) = event::read()? {
				if key.kind != KeyEventKind::Press {
					continue;
				}

				let should_quit = match &app.mode {
					InputMode::Prompt(_) => handle_prompt_key(&mut app, key.code, store),
					InputMode::Select(_) => handle_select_key(&mut app, key.code, store),
					InputMode::Normal => handle_normal_key(&mut app, key.code, store, clock, &view),
				};

				if should_quit {
					break;
				}
				view = build_view(&app, store, clock.now());
				redraw = true;
			}
		}

		if ticker.try_tick().is_some() {
			view = build_view(&app, store, clock.now());
			redraw = true;
		}
	}

	ticker.cancel();
	Ok(())
}

fn draw_dashboard(frame: &mut Frame, app: &App, view: &ViewModel) {
	let layout = Layout::default()
		.direction(Direction::Vertical)
		.constraints([Constraint::Length(4), Constraint::Min(6), Constraint::Length(5)])
		.split(frame.area());

	render_header(frame, layout[0], app, view);
	match app.screen {
		Screen::Debug => render_debug_panel(frame, layout[1], view),
		Screen::Today | Screen::History => render_activity_panel(frame, layout[1], app, view),
	}
	render_footer(frame, layout[2], app);

	if let InputMode::Select(select) = &app.mode {
		render_select_popup(frame, select);
	}
}

fn render_header(frame: &mut Frame, area: Rect, app: &App, view: &ViewModel) {
	let title = match app.screen {
		Screen::Today => "Today".to_string(),
		Screen::History => "History".to_string(),
		Screen::Debug => "Debug".to_string(),
	};

	let mut lines = Vec::new();
	if app.screen == Screen::Today {
		lines.push(Line::from(vec![
			Span::styled(
				format_minutes(view.active_minutes),
				Style::default().add_modifier(Modifier::BOLD),
			),
			Span::raw(format!("  {}", view.active_label)),
		]));
	} else {
		lines.push(Line::from(Span::styled(
			view.day.format("%A, %d %B %Y").to_string(),
			Style::default().add_modifier(Modifier::BOLD),
		)));
	}
	lines.push(Line::from(format!(
		"elapsed {} | tracked {}",
		format_minutes(view.elapsed_minutes),
		format_minutes(view.total_tracked_minutes)
	)));

	let header = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title));
	frame.render_widget(header, area);
}

fn render_activity_panel(frame: &mut Frame, area: Rect, app: &App, view: &ViewModel) {
	let items = view
		.rows
		.iter()
		.map(|row| ListItem::new(render_activity_row(row)))
		.collect::<Vec<_>>();

	let mut state = ListState::default();
	if !view.rows.is_empty() {
		state.select(Some(app.selected.min(view.rows.len() - 1)));
	}

	let list = List::new(items)
		.block(
			Block::default()
				.borders(Borders::ALL)
				.title(format!("Activities | {}", day_key(view.day))),
		)
		.highlight_style(Style::default().bg(HIGHLIGHT_BACKGROUND_COLOR).add_modifier(Modifier::BOLD));

	frame.render_stateful_widget(list, area, &mut state);
}

fn render_activity_row(row: &ActivityRow) -> Line<'static> {
	let marker = if row.is_active {
		Span::styled("> ", Style::default().fg(ACTIVE_MARKER_COLOR).add_modifier(Modifier::BOLD))
	} else {
		Span::raw("  ")
	};

	let mut spans = vec![
		marker,
		Span::raw(format!("{} ", format_minutes(row.minutes))),
		Span::raw(row.label.clone()),
	];

	if let (Some(percent), Some(status)) = (row.goal_percent, row.goal_status) {
		let filled = ((percent.min(100.0) / 100.0) * GOAL_BAR_WIDTH as f64).round() as usize;
		spans.push(Span::raw(" ["));
		spans.push(Span::styled("=".repeat(filled), goal_style(status)));
		spans.push(Span::raw(" ".repeat(GOAL_BAR_WIDTH - filled.min(GOAL_BAR_WIDTH))));
		spans.push(Span::raw(format!("] {percent:.0}%")));
	}

	Line::from(spans)
}

fn goal_style(status: GoalStatus) -> Style {
	let color = match status.is_good() {
		Some(true) => GOOD_GOAL_COLOR,
		Some(false) => BAD_GOAL_COLOR,
		None => NEUTRAL_GOAL_COLOR,
	};
	Style::default().fg(color)
}

fn render_debug_panel(frame: &mut Frame, area: Rect, view: &ViewModel) {
	let (activities, times) = view
		.debug_dump
		.clone()
		.unwrap_or_else(|| ("[]".to_string(), "{}".to_string()));

	let mut lines = vec![Line::from(Span::styled(
		"Activities:",
		Style::default().add_modifier(Modifier::BOLD),
	))];
	lines.extend(activities.lines().map(|line| Line::from(line.to_string())));
	lines.push(Line::from(""));
	lines.push(Line::from(Span::styled(
		"Activity Times:",
		Style::default().add_modifier(Modifier::BOLD),
	)));
	lines.extend(times.lines().map(|line| Line::from(line.to_string())));

	let panel = Paragraph::new(lines)
		.wrap(Wrap { trim: false })
		.block(Block::default().borders(Borders::ALL).title("Stored records"));
	frame.render_widget(panel, area);
}

fn render_footer(frame: &mut Frame, area: Rect, app: &App) {
	let footer_lines = match &app.mode {
		InputMode::Normal => vec![
			Line::from("arrows/jk select | Enter/space switch | u stop | h/l previous/next day | t today | q quit"),
			Line::from("n new activity | e edit | d delete | D debug records"),
			Line::from(app.status.clone()),
		],
		InputMode::Prompt(prompt) => vec![
			Line::from(prompt.title.clone()),
			Line::from(format!("> {}", prompt.input)),
			Line::from("Enter submit | Esc cancel"),
			Line::from(app.status.clone()),
		],
		InputMode::Select(select) => vec![
			Line::from(select.title.clone()),
			Line::from(format!(
				"Selected: {}",
				select
					.selected_option()
					.map(|option| option.label.as_str())
					.unwrap_or("(none)")
			)),
			Line::from("j/k or arrows move | Enter choose | Esc cancel"),
		],
	};

	let footer = Paragraph::new(footer_lines).block(Block::default().borders(Borders::ALL).title("Shortcuts"));
	frame.render_widget(footer, area);
}

fn render_select_popup(frame: &mut Frame, select: &SelectState) {
	let area = centered_rect(50, 40, frame.area());
	frame.render_widget(Clear, area);

	let items = select
		.options
		.iter()
		.map(|option| ListItem::new(option.label.clone()))
		.collect::<Vec<_>>();

	let list = List::new(items)
		.block(Block::default().borders(Borders::ALL).title(select.title.clone()))
		.highlight_symbol(">> ")
		.highlight_style(Style::default().bg(HIGHLIGHT_BACKGROUND_COLOR));

	let mut state = ListState::default();
	if !select.options.is_empty() {
		state.select(Some(select.selected.min(select.options.len() - 1)));
	}
	frame.render_stateful_widget(list, area, &mut state);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
	let popup_layout = Layout::default()
		.direction(Direction::Vertical)
		.constraints([
			Constraint::Percentage((100 - percent_y) / 2),
			Constraint::Percentage(percent_y),
			Constraint::Percentage((100 - percent_y) / 2),
		])
		.split(area);
	Layout::default()
		.direction(Direction::Horizontal)
		.constraints([
			Constraint::Percentage((100 - percent_x) / 2),
			Constraint::Percentage(percent_x),
			Constraint::Percentage((100 - percent_x) / 2),
		])
		.split(popup_layout[1])[1]
}

fn handle_normal_key<R: RecordStore>(
	app: &mut App,
	code: KeyCode,
	store: &mut ActivityLog<R>,
	clock: &dyn Clock,
	view: &ViewModel,
) -> bool {
	match code {
		KeyCode::Char('q') => return true,
		KeyCode::Esc => {
			if app.screen == Screen::Today {
				return true;
			}
			app.screen = Screen::Today;
			app.status = "Back to today".to_string();
		}
		KeyCode::Up | KeyCode::Char('k') => app.selected = app.selected.saturating_sub(1),
		KeyCode::Down | KeyCode::Char('j') => {
			app.selected = (app.selected + 1).min(view.rows.len().saturating_sub(1));
		}
		KeyCode::Enter | KeyCode::Char(' ') => {
			if app.screen != Screen::Today {
				app.status = "Switch activities from the today view (t)".to_string();
			} else if let Some(row) = view.rows.get(app.selected) {
				app.status = switch_to(store, clock, &row.id);
			}
		}
		KeyCode::Char('u') => app.status = switch_to(store, clock, UNKNOWN_ACTIVITY_ID),
		KeyCode::Left | KeyCode::Char('h') => {
			if app.screen == Screen::History {
				app.reference_day -= Duration::days(1);
			} else {
				app.screen = Screen::History;
				app.reference_day = clock.today();
			}
		}
		KeyCode::Right | KeyCode::Char('l') => {
			if app.screen == Screen::History {
				if app.reference_day >= clock.today() {
					app.screen = Screen::Today;
				} else {
					app.reference_day += Duration::days(1);
				}
			}
		}
		KeyCode::Char('t') => {
			app.screen = Screen::Today;
			app.reference_day = clock.today();
		}
		KeyCode::Char('D') => {
			app.screen = if app.screen == Screen::Debug {
				Screen::Today
			} else {
				Screen::Debug
			};
		}
		KeyCode::Char('n') => {
			app.mode = InputMode::Prompt(PromptState::new(
				"Activity name (required)",
				PromptKind::Label { editing: None },
			));
		}
		KeyCode::Char('e') => match editable_row(app, store, view) {
			Ok(activity) => {
				app.mode = InputMode::Prompt(PromptState::with_input(
					format!("Rename {}", activity.label),
					PromptKind::Label {
						editing: Some(activity.id.clone()),
					},
					activity.label,
				));
			}
			Err(message) => app.status = message,
		},
		KeyCode::Char('d') => match editable_row(app, store, view) {
			Ok(activity) => {
				app.mode = InputMode::Select(build_delete_confirm_select(activity));
			}
			Err(message) => app.status = message,
		},
		_ => {}
	}

	false
}

fn editable_row<R: RecordStore>(
	app: &App,
	store: &ActivityLog<R>,
	view: &ViewModel,
) -> Result<Activity, String> {
	let row = view
		.rows
		.get(app.selected)
		.ok_or_else(|| "no activity selected".to_string())?;
	if row.id == UNKNOWN_ACTIVITY_ID {
		return Err(format!("{UNKNOWN_ACTIVITY_LABEL} cannot be edited or deleted"));
	}
	store
		.get_activity(&row.id)
		.ok_or_else(|| format!("activity not found: {}", row.id))
}

fn switch_to<R: RecordStore>(store: &mut ActivityLog<R>, clock: &dyn Clock, activity_id: &str) -> String {
	let now = clock.now();
	match toggle_activity(store, &day_key(now.date_naive()), activity_id, now.timestamp_millis()) {
		Ok(active) if active == UNKNOWN_ACTIVITY_ID => "Tracking stopped".to_string(),
		Ok(active) => format!("Tracking {}", activity_label(store, &active)),
		Err(err) => {
			warn!("switch to {activity_id} failed: {err}");
			format!("error: {err}")
		}
	}
}

fn handle_prompt_key<R: RecordStore>(app: &mut App, code: KeyCode, store: &mut ActivityLog<R>) -> bool {
	match code {
		KeyCode::Esc => {
			app.mode = InputMode::Normal;
			app.status = "Input cancelled".to_string();
		}
		KeyCode::Backspace => {
			if let InputMode::Prompt(prompt) = &mut app.mode {
				prompt.input.pop();
			}
		}
		KeyCode::Char(value) => {
			if let InputMode::Prompt(prompt) = &mut app.mode {
				prompt.input.push(value);
			}
		}
		KeyCode::Enter => {
			let prompt = match std::mem::replace(&mut app.mode, InputMode::Normal) {
				InputMode::Prompt(prompt) => prompt,
				InputMode::Normal | InputMode::Select(_) => return false,
			};

			match submit_prompt(prompt.clone(), store) {
				Ok(PromptOutcome::NextPrompt(next_prompt)) => {
					app.mode = InputMode::Prompt(next_prompt);
					app.status.clear();
				}
				Ok(PromptOutcome::Select(select)) => app.mode = InputMode::Select(select),
				Ok(PromptOutcome::Done(message)) => {
					app.mode = InputMode::Normal;
					app.status = message;
				}
				Err(err) => {
					app.mode = InputMode::Prompt(prompt);
					app.status = format!("error: {err}");
				}
			}
		}
		_ => {}
	}

	false
}

fn handle_select_key<R: RecordStore>(app: &mut App, code: KeyCode, store: &mut ActivityLog<R>) -> bool {
	match code {
		KeyCode::Esc => {
			app.mode = InputMode::Normal;
			app.status = "Selection cancelled".to_string();
		}
		KeyCode::Up | KeyCode::Char('k') => {
			if let InputMode::Select(select) = &mut app.mode {
				select.move_selection(-1);
			}
		}
		KeyCode::Down | KeyCode::Char('j') => {
			if let InputMode::Select(select) = &mut app.mode {
				select.move_selection(1);
			}
		}
		KeyCode::Enter => {
			let select = match std::mem::replace(&mut app.mode, InputMode::Normal) {
				InputMode::Select(select) => select,
				InputMode::Normal | InputMode::Prompt(_) => return false,
			};

			match submit_select(select.clone(), store) {
				Ok(message) => app.status = message,
				Err(err) => {
					app.mode = InputMode::Select(select);
					app.status = format!("error: {err}");
				}
			}
		}
		_ => {}
	}

	false
}

fn submit_prompt<R: RecordStore>(prompt: PromptState, store: &mut ActivityLog<R>) -> Result<PromptOutcome, String> {
	match prompt.kind {
		PromptKind::Label { editing } => {
			let label = required_text(&prompt.input, "activity name")?;
			let current_goal = editing
				.as_deref()
				.and_then(|id| store.get_activity(id))
				.and_then(|activity| activity.time_goal)
				.map(|minutes| minutes.to_string())
				.unwrap_or_default();
			Ok(PromptOutcome::NextPrompt(PromptState::with_input(
				"Daily goal in minutes (empty for none)",
				PromptKind::GoalMinutes { editing, label },
				current_goal,
			)))
		}
		PromptKind::GoalMinutes { editing, label } => match parse_goal_minutes(&prompt.input)? {
			Some(minutes) => {
				let current = editing
					.as_deref()
					.and_then(|id| store.get_activity(id))
					.and_then(|activity| activity.goal_type);
				Ok(PromptOutcome::Select(build_goal_type_select(
					editing, label, minutes, current,
				)))
			}
			None => save_activity(store, editing, label, None).map(PromptOutcome::Done),
		},
	}
}

fn submit_select<R: RecordStore>(select: SelectState, store: &mut ActivityLog<R>) -> Result<String, String> {
	let selected_value = select
		.selected_option()
		.map(|option| option.value.clone())
		.ok_or_else(|| "no option selected".to_string())?;

	match select.kind {
		SelectKind::GoalType {
			editing,
			label,
			minutes,
		} => {
			let goal_type = selected_value.parse::<GoalType>()?;
			save_activity(store, editing, label, Some((minutes, goal_type)))
		}
		SelectKind::DeleteConfirm { activity_id, label } => {
			if selected_value != "delete" {
				return Ok("Delete cancelled".to_string());
			}
			store
				.delete_activity(&activity_id)
				.map_err(|err| err.to_string())?;
			Ok(format!("deleted activity: {label}"))
		}
	}
}

fn save_activity<R: RecordStore>(
	store: &mut ActivityLog<R>,
	editing: Option<String>,
	label: String,
	goal: Option<(u32, GoalType)>,
) -> Result<String, String> {
	let activity = Activity::new(label, goal);
	let saved_label = activity.label.clone();
	match editing {
		Some(id) => {
			store
				.update_activity(&id, activity)
				.map_err(|err| err.to_string())?;
			info!(activity = %id, "edited activity from dashboard");
			Ok(format!("updated activity: {saved_label}"))
		}
		None => {
			store.create_activity(activity).map_err(|err| err.to_string())?;
			Ok(format!("created activity: {saved_label}"))
		}
	}
}

fn build_goal_type_select(
	editing: Option<String>,
	label: String,
	minutes: u32,
	current: Option<GoalType>,
) -> SelectState {
	let options = GoalType::ALL
		.into_iter()
		.map(|goal_type| SelectOption::new(goal_type.describe(), goal_type.as_str()))
		.collect();
	let mut select = SelectState::new(
		format!("Goal type for {minutes} min/day"),
		SelectKind::GoalType {
			editing,
			label,
			minutes,
		},
		options,
	);
	select.selected = current
		.and_then(|current| GoalType::ALL.iter().position(|goal_type| *goal_type == current))
		.unwrap_or(0);
	select
}

fn build_delete_confirm_select(activity: Activity) -> SelectState {
	SelectState::new(
		format!("Delete {} and all of its history?", activity.label),
		SelectKind::DeleteConfirm {
			activity_id: activity.id,
			label: activity.label,
		},
		vec![
			SelectOption::new("Keep activity", "keep"),
			SelectOption::new("Delete activity", "delete"),
		],
	)
}

fn build_view<R: RecordStore>(app: &App, store: &ActivityLog<R>, now: DateTime<Local>) -> ViewModel {
	let today = now.date_naive();
	let day = match app.screen {
		Screen::History => app.reference_day,
		Screen::Today | Screen::Debug => today,
	};
	let intervals = store.day_intervals(&day_key(day));
	let summary = calculate_durations(&intervals, day, &now);
	let active_id = if day == today {
		active_activity(&intervals).to_string()
	} else {
		String::new()
	};

	let mut rows = vec![ActivityRow {
		id: UNKNOWN_ACTIVITY_ID.to_string(),
		label: UNKNOWN_ACTIVITY_LABEL.to_string(),
		minutes: summary.unknown_minutes(),
		goal_percent: None,
		goal_status: None,
		is_active: active_id == UNKNOWN_ACTIVITY_ID,
	}];
	for activity in store.list_activities() {
		let minutes = summary.minutes_for(&activity.id);
		rows.push(ActivityRow {
			goal_percent: goal_percent(&activity, minutes),
			goal_status: goal_status(&activity, minutes),
			is_active: active_id == activity.id,
			id: activity.id,
			label: activity.label,
			minutes,
		});
	}

	let (active_label, active_minutes) = rows
		.iter()
		.find(|row| row.is_active)
		.map(|row| (row.label.clone(), row.minutes))
		.unwrap_or_else(|| (UNKNOWN_ACTIVITY_LABEL.to_string(), summary.unknown_minutes()));

	ViewModel {
		day,
		rows,
		active_label,
		active_minutes,
		elapsed_minutes: summary.elapsed_minutes,
		total_tracked_minutes: summary.total_tracked_minutes,
		debug_dump: (app.screen == Screen::Debug).then(|| store.raw_records()),
	}
}

fn activity_label<R: RecordStore>(store: &ActivityLog<R>, activity_id: &str) -> String {
	store
		.get_activity(activity_id)
		.map(|activity| activity.label)
		.unwrap_or_else(|| UNKNOWN_ACTIVITY_LABEL.to_string())
}

fn required_text(input: &str, field_name: &str) -> Result<String, String> {
	let value = input.trim();
	if value.is_empty() {
		Err(format!("{field_name} is required"))
	} else {
		Ok(value.to_string())
	}
}

fn parse_goal_minutes(input: &str) -> Result<Option<u32>, String> {
	let value = input.trim();
	if value.is_empty() {
		return Ok(None);
	}
	match value.parse::<u32>() {
		Ok(0) => Ok(None),
		Ok(minutes) => Ok(Some(minutes)),
		Err(_) => Err(format!("`{value}` is not a whole number of minutes")),
	}
}

#[derive(Debug, Clone)]
enum PromptOutcome {
	NextPrompt(PromptState),
	Select(SelectState),
	Done(String),
}

#[derive(Debug, Clone)]
struct PromptState {
	title: String,
	input: String,
	kind: PromptKind,
}

impl PromptState {
	fn new(title: impl Into<String>, kind: PromptKind) -> Self {
		Self::with_input(title, kind, String::new())
	}

	fn with_input(title: impl Into<String>, kind: PromptKind, input: String) -> Self {
		Self {
			title: title.into(),
			input,
			kind,
		}
	}
}

#[derive(Debug, Clone)]
struct SelectState {
	title: String,
	options: Vec<SelectOption>,
	selected: usize,
	kind: SelectKind,
}

impl SelectState {
	fn new(title: impl Into<String>, kind: SelectKind, options: Vec<SelectOption>) -> Self {
		Self {
			title: title.into(),
			options,
			selected: 0,
			kind,
		}
	}

	fn move_selection(&mut self, delta: i32) {
		if self.options.is_empty() {
			self.selected = 0;
			return;
		}

		if delta > 0 {
			self.selected = (self.selected + delta as usize).min(self.options.len() - 1);
		} else {
			self.selected = self.selected.saturating_sub(delta.unsigned_abs() as usize);
		}
	}

	fn selected_option(&self) -> Option<&SelectOption> {
		self.options.get(self.selected)
	}
}

#[derive(Debug, Clone)]
struct SelectOption {
	label: String,
	value: String,
}

impl SelectOption {
	fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
		Self {
			label: label.into(),
			value: value.into(),
		}
	}
}

/// `editing` holds the id of the activity being edited; `None` creates one.
#[derive(Debug, Clone)]
enum PromptKind {
	Label {
		editing: Option<String>,
	},
	GoalMinutes {
		editing: Option<String>,
		label: String,
	},
}

#[derive(Debug, Clone)]
enum SelectKind {
	GoalType {
		editing: Option<String>,
		label: String,
		minutes: u32,
	},
	DeleteConfirm {
		activity_id: String,
		label: String,
	},
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
	Today,
	History,
	Debug,
}

#[derive(Debug, Clone)]
enum InputMode {
	Normal,
	Prompt(PromptState),
	Select(SelectState),
}

#[derive(Debug, Clone)]
struct App {
	screen: Screen,
	reference_day: NaiveDate,
	selected: usize,
	mode: InputMode,
	status: String,
}

impl App {
	fn new(today: NaiveDate) -> Self {
		Self {
			screen: Screen::Today,
			reference_day: today,
			selected: 0,
			mode: InputMode::Normal,
			status: "Ready".to_string(),
		}
	}

	fn clamp_selection(&mut self, view: &ViewModel) {
		self.selected = self.selected.min(view.rows.len().saturating_sub(1));
	}
}

struct ViewModel {
	day: NaiveDate,
	rows: Vec<ActivityRow>,
	active_label: String,
	active_minutes: f64,
	elapsed_minutes: f64,
	total_tracked_minutes: f64,
	debug_dump: Option<(String, String)>,
}

#[derive(Debug, Clone)]
struct ActivityRow {
	id: String,
	label: String,
	minutes: f64,
	goal_percent: Option<f64>,
	goal_status: Option<GoalStatus>,
	is_active: bool,
}

#[cfg(test)]
mod tests {
	use std::sync::LazyLock;

	use chrono::{Duration, Local, TimeZone};
	use crossterm::event::KeyCode;

	use crate::aggregate::GoalStatus;
	use crate::clock::{Clock, FixedClock};
	use crate::domain::{Activity, GoalType, UNKNOWN_ACTIVITY_ID, day_key};
	use crate::logging::TEST_LOGGING;
	use crate::storage::MemoryRecords;
	use crate::store::{ActivityLog, ActivityStore};

	use super::{
		App, InputMode, Screen, ViewModel, build_view, handle_normal_key, handle_prompt_key,
		handle_select_key,
	};

	fn clock() -> FixedClock {
		FixedClock(Local.with_ymd_and_hms(2026, 3, 10, 9, 30, 0).unwrap())
	}

	fn store_with(activities: &[Activity]) -> ActivityLog<MemoryRecords> {
		let mut store = ActivityLog::new(MemoryRecords::new());
		for activity in activities {
			store.create_activity(activity.clone()).expect("create should work");
		}
		store
	}

	fn view(app: &App, store: &ActivityLog<MemoryRecords>, clock: &FixedClock) -> ViewModel {
		build_view(app, store, clock.now())
	}

	fn type_text(app: &mut App, store: &mut ActivityLog<MemoryRecords>, text: &str) {
		for value in text.chars() {
			handle_prompt_key(app, KeyCode::Char(value), store);
		}
	}

	#[test]
	fn unknown_row_comes_first_and_absorbs_untracked_time() {
		let clock = clock();
		let store = store_with(&[Activity::new("Write", Some((60, GoalType::More)))]);
		let app = App::new(clock.today());

		let view = view(&app, &store, &clock);

		assert_eq!(view.rows[0].id, UNKNOWN_ACTIVITY_ID);
		assert!(view.rows[0].is_active);
		assert_eq!(view.rows[0].minutes, view.elapsed_minutes);
		assert_eq!(view.rows[1].goal_status, Some(GoalStatus::Behind));
	}

	#[test]
	fn enter_switches_and_second_enter_stops() {
		LazyLock::force(&TEST_LOGGING);
		let clock = clock();
		let write = Activity::new("Write", None);
		let mut store = store_with(&[write.clone()]);
		let mut app = App::new(clock.today());
		app.selected = 1;

		let before = view(&app, &store, &clock);
		handle_normal_key(&mut app, KeyCode::Enter, &mut store, &clock, &before);
		let after = view(&app, &store, &clock);
		assert!(after.rows[1].is_active);
		assert_eq!(after.active_label, "Write");

		handle_normal_key(&mut app, KeyCode::Enter, &mut store, &clock, &after);
		let stopped = view(&app, &store, &clock);
		assert!(stopped.rows[0].is_active);
		assert_eq!(store.day_intervals(&day_key(clock.today())).len(), 1);
	}

	#[test]
	fn create_flow_prompts_for_label_goal_and_type() {
		let clock = clock();
		let mut store = store_with(&[]);
		let mut app = App::new(clock.today());
		let current = view(&app, &store, &clock);

		handle_normal_key(&mut app, KeyCode::Char('n'), &mut store, &clock, &current);
		type_text(&mut app, &mut store, "Guitar");
		handle_prompt_key(&mut app, KeyCode::Enter, &mut store);
		type_text(&mut app, &mut store, "30");
		handle_prompt_key(&mut app, KeyCode::Enter, &mut store);
		assert!(matches!(app.mode, InputMode::Select(_)));
		handle_select_key(&mut app, KeyCode::Down, &mut store);
		handle_select_key(&mut app, KeyCode::Enter, &mut store);

		let activities = store.list_activities();
		assert_eq!(activities.len(), 1);
		assert_eq!(activities[0].label, "Guitar");
		assert_eq!(activities[0].goal(), Some((30, GoalType::Less)));
		assert!(matches!(app.mode, InputMode::Normal));
	}

	#[test]
	fn empty_label_keeps_prompt_open() {
		let clock = clock();
		let mut store = store_with(&[]);
		let mut app = App::new(clock.today());
		let current = view(&app, &store, &clock);

		handle_normal_key(&mut app, KeyCode::Char('n'), &mut store, &clock, &current);
		handle_prompt_key(&mut app, KeyCode::Enter, &mut store);

		assert!(matches!(app.mode, InputMode::Prompt(_)));
		assert!(app.status.starts_with("error:"));
		assert!(store.list_activities().is_empty());
	}

	#[test]
	fn edit_keeps_id_and_clears_goal_when_empty() {
		let clock = clock();
		let original = Activity::new("Chess", Some((20, GoalType::Neutral)));
		let mut store = store_with(&[original.clone()]);
		let mut app = App::new(clock.today());
		app.selected = 1;
		let current = view(&app, &store, &clock);

		handle_normal_key(&mut app, KeyCode::Char('e'), &mut store, &clock, &current);
		handle_prompt_key(&mut app, KeyCode::Enter, &mut store);
		for _ in 0..2 {
			handle_prompt_key(&mut app, KeyCode::Backspace, &mut store);
		}
		handle_prompt_key(&mut app, KeyCode::Enter, &mut store);

		let stored = store.get_activity(&original.id).expect("still present");
		assert_eq!(stored.label, "Chess");
		assert_eq!(stored.goal(), None);
	}

	#[test]
	fn edit_starts_goal_type_choice_on_current_type() {
		let clock = clock();
		let original = Activity::new("Social media", Some((40, GoalType::Less)));
		let mut store = store_with(&[original.clone()]);
		let mut app = App::new(clock.today());
		app.selected = 1;
		let current = view(&app, &store, &clock);

		handle_normal_key(&mut app, KeyCode::Char('e'), &mut store, &clock, &current);
		handle_prompt_key(&mut app, KeyCode::Enter, &mut store);
		handle_prompt_key(&mut app, KeyCode::Enter, &mut store);
		match &app.mode {
			InputMode::Select(select) => {
				assert_eq!(select.selected_option().map(|option| option.value.as_str()), Some("less"));
			}
			other => panic!("expected goal type select, got {other:?}"),
		}

		handle_select_key(&mut app, KeyCode::Enter, &mut store);
		let stored = store.get_activity(&original.id).expect("still present");
		assert_eq!(stored.goal(), Some((40, GoalType::Less)));
	}

	#[test]
	fn unknown_row_cannot_be_deleted() {
		let clock = clock();
		let mut store = store_with(&[Activity::new("Nap", None)]);
		let mut app = App::new(clock.today());
		let current = view(&app, &store, &clock);

		handle_normal_key(&mut app, KeyCode::Char('d'), &mut store, &clock, &current);

		assert!(matches!(app.mode, InputMode::Normal));
		assert!(app.status.contains("cannot be edited or deleted"));
	}

	#[test]
	fn delete_requires_confirmation() {
		let clock = clock();
		let nap = Activity::new("Nap", None);
		let mut store = store_with(&[nap.clone()]);
		let mut app = App::new(clock.today());
		app.selected = 1;
		let current = view(&app, &store, &clock);

		handle_normal_key(&mut app, KeyCode::Char('d'), &mut store, &clock, &current);
		handle_select_key(&mut app, KeyCode::Enter, &mut store);
		assert!(store.get_activity(&nap.id).is_some());

		handle_normal_key(&mut app, KeyCode::Char('d'), &mut store, &clock, &current);
		handle_select_key(&mut app, KeyCode::Down, &mut store);
		handle_select_key(&mut app, KeyCode::Enter, &mut store);
		assert!(store.get_activity(&nap.id).is_none());
	}

	#[test]
	fn history_navigation_moves_reference_day() {
		let clock = clock();
		let mut store = store_with(&[]);
		let mut app = App::new(clock.today());
		let current = view(&app, &store, &clock);

		handle_normal_key(&mut app, KeyCode::Left, &mut store, &clock, &current);
		handle_normal_key(&mut app, KeyCode::Left, &mut store, &clock, &current);
		assert_eq!(app.screen, Screen::History);
		assert_eq!(app.reference_day, clock.today() - Duration::days(1));

		let past = view(&app, &store, &clock);
		assert_eq!(past.elapsed_minutes, 1440.0);
		assert!(past.rows.iter().all(|row| !row.is_active));

		handle_normal_key(&mut app, KeyCode::Right, &mut store, &clock, &past);
		handle_normal_key(&mut app, KeyCode::Right, &mut store, &clock, &past);
		assert_eq!(app.screen, Screen::Today);
	}

	#[test]
	fn debug_view_carries_raw_records() {
		let clock = clock();
		let mut store = store_with(&[Activity::new("Tea", None)]);
		let mut app = App::new(clock.today());
		let current = view(&app, &store, &clock);

		handle_normal_key(&mut app, KeyCode::Char('D'), &mut store, &clock, &current);
		let debug = view(&app, &store, &clock);

		let (activities, _) = debug.debug_dump.expect("debug dump");
		assert!(activities.contains("\"label\": \"Tea\""));
	}
}
