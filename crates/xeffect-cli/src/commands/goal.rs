use clap::Subcommand;
use xeffect_core::request::{InboundEvent, Response, JSON_CONTENT_TYPE};
use xeffect_core::streak::parse_date;
use xeffect_core::{Config, GoalService, MarkCompleted, SqliteStore};

#[derive(Subcommand)]
pub enum GoalAction {
    /// Create a goal
    Create {
        /// Goal title
        #[arg(long)]
        title: String,
        /// Why the goal matters
        #[arg(long)]
        motivation: String,
    },
    /// Show a goal record as JSON
    Get {
        /// Goal ID
        id: String,
    },
    /// List all goals
    List,
    /// Check whether a day is marked complete
    Completed {
        /// Goal ID
        id: String,
        /// Day (YYYY-MM-DD)
        date: String,
    },
    /// Mark a day complete (or incomplete)
    Mark {
        /// Goal ID
        id: String,
        /// Day (YYYY-MM-DD)
        date: String,
        /// Clear the day instead of completing it
        #[arg(long)]
        incomplete: bool,
    },
    /// Submit a raw action request body
    Action {
        /// Goal ID
        id: String,
        /// Request body, e.g. '{"action":"mark_completed","is_completed":true,"date":"2024-01-01"}'
        #[arg(long)]
        body: String,
        /// Request Content-Type
        #[arg(long, default_value = JSON_CONTENT_TYPE)]
        content_type: String,
        /// Body is base64 encoded
        #[arg(long)]
        base64: bool,
    },
    /// Show the streak starting on a date
    Streak {
        /// Goal ID
        id: String,
        /// Streak start date (YYYY-MM-DD)
        start: String,
    },
}

fn open_service() -> Result<GoalService<SqliteStore>, Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let database = config.database_path()?;
    tracing::debug!(database = %database.display(), table = %config.store.table, "opening goal store");
    let store = SqliteStore::open(&database, &config.store.table)?;
    Ok(GoalService::new(store).with_max_retries(config.toggle.max_retries))
}

fn emit(response: Response) -> Result<(), Box<dyn std::error::Error>> {
    if !response.is_success() {
        return Err(response.body.into());
    }
    if !response.body.is_empty() {
        println!("{}", response.body);
    }
    Ok(())
}

pub fn run(action: GoalAction) -> Result<(), Box<dyn std::error::Error>> {
    let service = open_service()?;

    match action {
        GoalAction::Create { title, motivation } => {
            let body = serde_json::json!({ "title": title, "motivation": motivation });
            let id = service.create_from_event(&InboundEvent::json(body.to_string()))?;
            println!("{id}");
        }
        GoalAction::Get { id } => {
            emit(service.respond_to_get(&InboundEvent::for_goal(id, "")))?;
        }
        GoalAction::List => {
            let goals = service.list_goals()?;
            println!("{}", serde_json::to_string_pretty(&goals)?);
        }
        GoalAction::Completed { id, date } => {
            emit(service.respond_to_completed(&InboundEvent::for_goal(id, ""), &date))?;
        }
        GoalAction::Mark {
            id,
            date,
            incomplete,
        } => {
            let toggle = MarkCompleted {
                is_completed: !incomplete,
                date: parse_date(&date)?,
            };
            let mutation = service.mark_completed(&id, &toggle)?;
            println!("{}", mutation.kind());
        }
        GoalAction::Action {
            id,
            body,
            content_type,
            base64,
        } => {
            let event = InboundEvent {
                goal_id: Some(id),
                content_type: Some(content_type),
                body,
                is_base64_encoded: base64,
            };
            let response = service.respond_to_action(&event);
            println!("{}", response.status);
            emit(response)?;
        }
        GoalAction::Streak { id, start } => {
            let streak = service.streak(&id, &start)?;
            println!("{}", serde_json::to_string_pretty(&streak)?);
        }
    }
    Ok(())
}
