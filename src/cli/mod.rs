use std::sync::Arc;

use chrono::NaiveDate;
use clap::{Args, Subcommand};
use serde_json::{Value, json};
use tracing::error;

use crate::{
    board::Board,
    bootstrap::{self, SessionState},
    coordinator::{Command, CommandOutcome, MutationCoordinator, MutationError, MutationOutcome},
    drag::DragTracker,
    session::AuthSession,
    settings::{self, Settings},
    store::{HttpTaskStore, StoreError},
    types::{Priority, Task, TaskDraft, TaskId, TaskPatch, TaskStatus},
};

const SCHEMA_VERSION: &str = "cli.v1";

#[derive(Debug, Clone, Subcommand)]
pub enum RootCommand {
    /// Show the board grouped by column.
    Board,
    Create(CreateArgs),
    Edit(EditArgs),
    /// Move a task to another column.
    Move(MoveArgs),
    /// Complete a drop gesture using only its payload.
    Drop(DropArgs),
    Delete(DeleteArgs),
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum ConfigCommand {
    Show,
    Set(ConfigSetArgs),
}

#[derive(Debug, Clone, Args)]
pub struct CreateArgs {
    #[arg(long, value_name = "TEXT")]
    pub title: String,

    #[arg(long, value_name = "TEXT", default_value = "")]
    pub description: String,

    #[arg(long, value_name = "LOW|MEDIUM|HIGH", default_value = "MEDIUM")]
    pub priority: Priority,

    #[arg(long, value_name = "YYYY-MM-DD")]
    pub due: Option<NaiveDate>,
}

#[derive(Debug, Clone, Args)]
pub struct EditArgs {
    #[arg(long, value_name = "TASK_ID")]
    pub id: TaskId,

    #[arg(long, value_name = "TEXT")]
    pub title: Option<String>,

    #[arg(long, value_name = "TEXT")]
    pub description: Option<String>,

    #[arg(long, value_name = "LOW|MEDIUM|HIGH")]
    pub priority: Option<Priority>,

    #[arg(long, value_name = "TODO|DOING|DONE")]
    pub status: Option<TaskStatus>,

    #[arg(long, value_name = "YYYY-MM-DD", conflicts_with = "clear_due")]
    pub due: Option<NaiveDate>,

    #[arg(long)]
    pub clear_due: bool,
}

#[derive(Debug, Clone, Args)]
pub struct MoveArgs {
    #[arg(long, value_name = "TASK_ID")]
    pub id: TaskId,

    #[arg(long, value_name = "TODO|DOING|DONE")]
    pub status: TaskStatus,
}

#[derive(Debug, Clone, Args)]
pub struct DropArgs {
    /// Raw payload carried by the drag gesture.
    #[arg(long, value_name = "TEXT")]
    pub payload: String,

    #[arg(long, value_name = "TODO|DOING|DONE")]
    pub column: TaskStatus,
}

#[derive(Debug, Clone, Args)]
pub struct DeleteArgs {
    #[arg(long, value_name = "TASK_ID")]
    pub id: TaskId,
}

#[derive(Debug, Clone, Args)]
pub struct ConfigSetArgs {
    #[arg(long, value_name = "URL")]
    pub api_url: Option<String>,

    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,
}

pub async fn run(command: RootCommand, json_output: bool, quiet: bool) -> i32 {
    match execute(command).await {
        Ok(output) => {
            print_success(output, json_output, quiet);
            0
        }
        Err(err) => {
            print_error(&err, json_output);
            err.exit_code
        }
    }
}

struct CommandOutput {
    command: &'static str,
    data: Value,
    text: String,
}

#[derive(Debug)]
struct CliError {
    exit_code: i32,
    code: &'static str,
    message: String,
}

type CliResult<T> = Result<T, CliError>;

struct Workspace {
    board: Arc<Board>,
    coordinator: MutationCoordinator<HttpTaskStore>,
}

async fn execute(command: RootCommand) -> CliResult<CommandOutput> {
    match command {
        RootCommand::Config { command } => execute_config_command(command),
        command => {
            let workspace = open_workspace().await?;
            execute_board_command(&workspace, command).await
        }
    }
}

async fn open_workspace() -> CliResult<Workspace> {
    let config = Settings::load().with_env_overrides().to_store_config();
    let session = Arc::new(AuthSession::new(settings::access_token_from_env()));
    let store = HttpTaskStore::new(config, Arc::clone(&session)).map_err(runtime_error)?;
    let board = Arc::new(Board::new());

    match bootstrap::bootstrap(&board, &store, &session).await {
        SessionState::SignedIn(_) => {}
        SessionState::SignedOut { reason } => {
            return Err(usage_error(
                "SIGN_IN_REQUIRED",
                format!("sign in required ({reason}); set {}", settings::ACCESS_TOKEN_ENV),
            ));
        }
    }
    if let Some(message) = board.load_error() {
        return Err(runtime_error_with_code("LOAD_FAILED", message));
    }

    let coordinator = MutationCoordinator::new(Arc::clone(&board), store);
    Ok(Workspace { board, coordinator })
}

async fn execute_board_command(
    workspace: &Workspace,
    command: RootCommand,
) -> CliResult<CommandOutput> {
    match command {
        RootCommand::Board => Ok(board_show(workspace)),
        RootCommand::Create(args) => task_create(workspace, args).await,
        RootCommand::Edit(args) => task_edit(workspace, args).await,
        RootCommand::Move(args) => task_move(workspace, args).await,
        RootCommand::Drop(args) => task_drop(workspace, args).await,
        RootCommand::Delete(args) => task_delete(workspace, args).await,
        RootCommand::Config { .. } => Err(runtime_error(
            "command does not operate on the board",
        )),
    }
}

fn board_show(workspace: &Workspace) -> CommandOutput {
    let board = &workspace.board;
    let columns = TaskStatus::ALL
        .iter()
        .map(|status| {
            json!({
                "status": status.as_str(),
                "label": status.label(),
                "tasks": board.column(*status).iter().map(task_json).collect::<Vec<_>>()
            })
        })
        .collect::<Vec<_>>();
    let user = board.user().map(|user| {
        json!({
            "email": user.email,
            "username": user.username
        })
    });

    CommandOutput {
        command: "board",
        data: json!({ "user": user, "columns": columns }),
        text: render_board_text(&board.tasks()),
    }
}

fn render_board_text(tasks: &[Task]) -> String {
    if tasks.is_empty() {
        return "No tasks found.".to_string();
    }

    let headers = ["Column", "ID", "Priority", "Due", "Title"];
    let rows = TaskStatus::ALL
        .iter()
        .flat_map(|status| {
            tasks
                .iter()
                .filter(move |task| task.status == *status)
                .map(task_row)
        })
        .collect::<Vec<_>>();

    render_text_table(&headers, &rows)
}

fn task_row(task: &Task) -> Vec<String> {
    vec![
        task.status.label().to_string(),
        task.id.to_string(),
        task.priority.label().to_string(),
        task.due_date
            .map(|due| due.to_string())
            .unwrap_or_else(|| "-".to_string()),
        task.title.replace('\n', " "),
    ]
}

fn render_text_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths = headers
        .iter()
        .map(|header| header.chars().count())
        .collect::<Vec<_>>();

    for row in rows {
        for (index, cell) in row.iter().enumerate() {
            widths[index] = widths[index].max(cell.chars().count());
        }
    }

    let border = format!(
        "+{}+",
        widths
            .iter()
            .map(|width| "-".repeat(*width + 2))
            .collect::<Vec<_>>()
            .join("+")
    );
    let format_row = |cells: Vec<&str>| {
        format!(
            "| {} |",
            cells
                .iter()
                .enumerate()
                .map(|(index, cell)| format!("{cell:<width$}", width = widths[index]))
                .collect::<Vec<_>>()
                .join(" | ")
        )
    };

    let mut lines = vec![border.clone(), format_row(headers.to_vec()), border.clone()];
    for row in rows {
        lines.push(format_row(row.iter().map(String::as_str).collect()));
    }
    lines.push(border);
    lines.join("\n")
}

async fn task_create(workspace: &Workspace, args: CreateArgs) -> CliResult<CommandOutput> {
    let draft = TaskDraft {
        title: args.title,
        description: args.description,
        priority: args.priority,
        status: TaskStatus::Todo,
        due_date: args.due,
    };
    let task = form_result(workspace.coordinator.dispatch(Command::Create(draft)).await)?;

    Ok(CommandOutput {
        command: "create",
        text: format!("created task {}: {}", task.id, task.title),
        data: json!({ "task": task_json(&task) }),
    })
}

fn edit_patch(args: &EditArgs) -> TaskPatch {
    TaskPatch {
        title: args.title.clone(),
        description: args.description.clone().map(Some),
        priority: args.priority,
        status: args.status,
        due_date: if args.clear_due {
            Some(None)
        } else {
            args.due.map(Some)
        },
    }
}

async fn task_edit(workspace: &Workspace, args: EditArgs) -> CliResult<CommandOutput> {
    let patch = edit_patch(&args);
    if patch.is_empty() {
        return Err(usage_error("EMPTY_EDIT", "nothing to change; pass at least one field"));
    }
    let command = Command::Edit {
        task_id: args.id,
        patch,
    };
    let task = form_result(workspace.coordinator.dispatch(command).await)?;

    Ok(CommandOutput {
        command: "edit",
        text: format!("updated task {}: {}", task.id, task.title),
        data: json!({ "task": task_json(&task) }),
    })
}

async fn task_move(workspace: &Workspace, args: MoveArgs) -> CliResult<CommandOutput> {
    require_task(&workspace.board, args.id)?;
    let command = Command::ChangeStatus {
        task_id: args.id,
        status: args.status,
    };
    board_command_output(workspace, "move", command).await
}

async fn task_drop(workspace: &Workspace, args: DropArgs) -> CliResult<CommandOutput> {
    let mut tracker = DragTracker::new();
    let Some(command) = tracker.drop_on(&workspace.board, args.column, Some(&args.payload)) else {
        return Ok(CommandOutput {
            command: "drop",
            text: "nothing to move".to_string(),
            data: json!({ "outcome": "ignored" }),
        });
    };
    board_command_output(workspace, "drop", command).await
}

async fn task_delete(workspace: &Workspace, args: DeleteArgs) -> CliResult<CommandOutput> {
    require_task(&workspace.board, args.id)?;
    board_command_output(workspace, "delete", Command::Delete { task_id: args.id }).await
}

async fn board_command_output(
    workspace: &Workspace,
    name: &'static str,
    command: Command,
) -> CliResult<CommandOutput> {
    let task_id = command.task_id();
    let outcome = match workspace.coordinator.dispatch(command).await {
        CommandOutcome::Board(outcome) => outcome,
        CommandOutcome::Form(_) => {
            return Err(runtime_error("unexpected form result for board command"));
        }
    };
    if outcome == MutationOutcome::RolledBack {
        return Err(runtime_error_with_code(
            "NOT_SAVED",
            "the store rejected the change; the board was restored",
        ));
    }

    let task = task_id.and_then(|id| workspace.board.task(id));
    let text = match (outcome, &task) {
        (MutationOutcome::Skipped, _) => "nothing to change".to_string(),
        (_, Some(task)) => format!("task {} is now in {}", task.id, task.status.label()),
        (_, None) => "task deleted".to_string(),
    };

    Ok(CommandOutput {
        command: name,
        text,
        data: json!({
            "outcome": outcome_label(outcome),
            "task": task.as_ref().map(task_json)
        }),
    })
}

fn execute_config_command(command: ConfigCommand) -> CliResult<CommandOutput> {
    match command {
        ConfigCommand::Show => {
            let settings = Settings::load().with_env_overrides();
            Ok(config_output("config show", &settings))
        }
        ConfigCommand::Set(args) => {
            if args.api_url.is_none() && args.timeout_ms.is_none() {
                return Err(usage_error(
                    "EMPTY_CONFIG",
                    "nothing to change; pass --api-url or --timeout-ms",
                ));
            }
            let mut settings = Settings::load();
            if let Some(url) = args.api_url {
                settings.api_base_url = url;
            }
            if let Some(timeout_ms) = args.timeout_ms {
                settings.request_timeout_ms = timeout_ms;
            }
            settings.validate();
            settings.save().map_err(runtime_error)?;
            Ok(config_output("config set", &settings))
        }
    }
}

fn config_output(command: &'static str, settings: &Settings) -> CommandOutput {
    let path = Settings::config_path()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let rows = vec![
        vec!["api_base_url".to_string(), settings.api_base_url.clone()],
        vec![
            "request_timeout_ms".to_string(),
            settings.request_timeout_ms.to_string(),
        ],
        vec!["path".to_string(), path.clone()],
    ];

    CommandOutput {
        command,
        data: json!({
            "api_base_url": settings.api_base_url,
            "request_timeout_ms": settings.request_timeout_ms,
            "path": path
        }),
        text: render_text_table(&["Setting", "Value"], &rows),
    }
}

fn require_task(board: &Board, id: TaskId) -> CliResult<()> {
    if board.task(id).is_none() {
        return Err(not_found_error("TASK_NOT_FOUND", format!("task {id} not found")));
    }
    Ok(())
}

fn form_result(outcome: CommandOutcome) -> CliResult<Task> {
    match outcome {
        CommandOutcome::Form(result) => result.map_err(mutation_error),
        CommandOutcome::Board(_) => Err(runtime_error("unexpected board result for form command")),
    }
}

fn outcome_label(outcome: MutationOutcome) -> &'static str {
    match outcome {
        MutationOutcome::Skipped => "skipped",
        MutationOutcome::Confirmed => "confirmed",
        MutationOutcome::RolledBack => "rolled_back",
        MutationOutcome::Superseded => "superseded",
    }
}

fn task_json(task: &Task) -> Value {
    json!({
        "id": task.id.get(),
        "title": task.title,
        "description": task.description,
        "priority": task.priority.as_str(),
        "status": task.status.as_str(),
        "due_date": task.due_date.map(|due| due.to_string())
    })
}

fn mutation_error(err: MutationError) -> CliError {
    match err {
        MutationError::Validation(message) => usage_error("VALIDATION_ERROR", message),
        MutationError::UnknownTask(id) => {
            not_found_error("TASK_NOT_FOUND", format!("task {id} not found"))
        }
        MutationError::SignedOut => usage_error("SIGN_IN_REQUIRED", "sign in required"),
        MutationError::Store(err) => store_error(err),
    }
}

fn store_error(err: StoreError) -> CliError {
    let code = err.code();
    match err {
        StoreError::Validation(_) | StoreError::Auth(_) => usage_error(code, err.to_string()),
        StoreError::NotFound(_) => not_found_error(code, err.to_string()),
        StoreError::Network(_) => runtime_error_with_code(code, err.to_string()),
    }
}

fn usage_error(code: &'static str, message: impl Into<String>) -> CliError {
    CliError {
        exit_code: 2,
        code,
        message: message.into(),
    }
}

fn not_found_error(code: &'static str, message: impl Into<String>) -> CliError {
    CliError {
        exit_code: 3,
        code,
        message: message.into(),
    }
}

fn runtime_error_with_code(code: &'static str, message: impl Into<String>) -> CliError {
    CliError {
        exit_code: 5,
        code,
        message: message.into(),
    }
}

fn runtime_error(err: impl std::fmt::Display) -> CliError {
    runtime_error_with_code("RUNTIME_ERROR", err.to_string())
}

fn print_success(output: CommandOutput, json_output: bool, quiet: bool) {
    if json_output {
        let payload = json!({
            "schema_version": SCHEMA_VERSION,
            "command": output.command,
            "data": output.data
        });
        match serde_json::to_string_pretty(&payload) {
            Ok(value) => println!("{value}"),
            Err(_) => println!("{}", payload),
        }
        return;
    }

    if quiet {
        return;
    }

    if output.text.is_empty() {
        println!("ok");
    } else {
        println!("{}", output.text);
    }
}

fn print_error(err: &CliError, json_output: bool) {
    error!(code = err.code, message = %err.message, "cli command failed");

    if json_output {
        let payload = json!({
            "schema_version": SCHEMA_VERSION,
            "error": {
                "code": err.code,
                "message": err.message
            }
        });
        match serde_json::to_string_pretty(&payload) {
            Ok(value) => eprintln!("{value}"),
            Err(_) => eprintln!("{}", payload),
        }
        return;
    }

    eprintln!("error[{}]: {}", err.code, err.message);
}
