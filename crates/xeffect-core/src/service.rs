//! Goal service: the operations exposed to the request layer and the CLI.

use tracing::{debug, warn};
use uuid::Uuid;

use crate::adapter::StreakAdapter;
use crate::error::{CoreError, Result, StoreError};
use crate::goal::{Goal, GoalStreak, GoalSummary, NewGoal};
use crate::request::{
    completed_body, parse_action, parse_new_goal, GoalAction, InboundEvent, MarkCompleted,
    Response,
};
use crate::store::RecordStore;
use crate::streak::{decide, parse_date, Mutation};

/// Default number of extra attempts after a version conflict.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Orchestrates goal operations over a record store.
pub struct GoalService<S> {
    adapter: StreakAdapter<S>,
    max_retries: u32,
}

impl<S: RecordStore> GoalService<S> {
    pub fn new(store: S) -> Self {
        Self {
            adapter: StreakAdapter::new(store),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Set how many times a toggle is re-decided after a version conflict.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn store(&self) -> &S {
        self.adapter.store()
    }

    /// Create a goal with no completions and return its id.
    pub fn create_goal(&self, new_goal: NewGoal) -> Result<String> {
        new_goal.validate()?;
        let id = Uuid::new_v4().to_string();
        self.store().insert(&id, &Goal::new(new_goal))?;
        debug!(goal = %id, "created goal");
        Ok(id)
    }

    /// Full goal record.
    pub fn get_goal(&self, goal_id: &str) -> Result<Goal> {
        self.store()
            .get(goal_id)?
            .map(|stored| stored.goal)
            .ok_or_else(|| StoreError::NotFound(goal_id.to_string()).into())
    }

    /// Every goal's identity and descriptive fields.
    pub fn list_goals(&self) -> Result<Vec<GoalSummary>> {
        Ok(self
            .store()
            .scan()?
            .into_iter()
            .map(|stored| GoalSummary {
                uuid: stored.id,
                title: stored.goal.title,
                motivation: stored.goal.motivation,
            })
            .collect())
    }

    /// Whether `date` falls inside one of the goal's streaks.
    pub fn is_completed(&self, goal_id: &str, date: &str) -> Result<bool> {
        let date = parse_date(date)?;
        Ok(self.adapter.fetch(goal_id)?.index.contains(date))
    }

    /// The streak starting exactly on `start`, if any.
    pub fn streak(&self, goal_id: &str, start: &str) -> Result<Option<GoalStreak>> {
        parse_date(start)?;
        self.adapter.fetch_streak(goal_id, start)
    }

    /// Dispatch a decoded goal action.
    pub fn handle_action(&self, goal_id: &str, action: &GoalAction) -> Result<Mutation> {
        match action {
            GoalAction::MarkCompleted(toggle) => self.mark_completed(goal_id, toggle),
        }
    }

    /// Record one day as complete or incomplete.
    ///
    /// Fetches the goal, decides the mutation and applies it against the
    /// fetched version. A version conflict restarts the cycle from a fresh
    /// fetch, up to the configured number of retries.
    pub fn mark_completed(&self, goal_id: &str, toggle: &MarkCompleted) -> Result<Mutation> {
        let mut attempt = 0;
        loop {
            let snapshot = self.adapter.fetch(goal_id)?;
            let mutation = decide(&snapshot.index, toggle.date, toggle.is_completed);
            debug!(
                goal = %goal_id,
                date = %toggle.date,
                completed = toggle.is_completed,
                mutation = mutation.kind(),
                version = snapshot.version(),
                "decided streak mutation"
            );

            match self.adapter.apply(&snapshot, &mutation) {
                Ok(_) => return Ok(mutation),
                Err(CoreError::Store(err)) if err.is_conflict() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(goal = %goal_id, attempt, "{err}; retrying");
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Handle a goal action event: 201 on success, 400 with the error text
    /// otherwise.
    pub fn respond_to_action(&self, event: &InboundEvent) -> Response {
        let result = event
            .require_goal_id()
            .and_then(|goal_id| Ok((goal_id, parse_action(event)?)))
            .map_err(CoreError::from)
            .and_then(|(goal_id, action)| self.handle_action(goal_id, &action));
        respond(result.map(|_| Response::created()))
    }

    /// Decode a goal creation event and create the goal, returning its id.
    pub fn create_from_event(&self, event: &InboundEvent) -> Result<String> {
        self.create_goal(parse_new_goal(event)?)
    }

    /// Handle a goal creation event: 201 on success.
    pub fn respond_to_create(&self, event: &InboundEvent) -> Response {
        respond(self.create_from_event(event).map(|_| Response::created()))
    }

    /// Handle a goal read event: 200 with the goal as JSON.
    pub fn respond_to_get(&self, event: &InboundEvent) -> Response {
        let result = event
            .require_goal_id()
            .map_err(CoreError::from)
            .and_then(|goal_id| self.get_goal(goal_id))
            .and_then(|goal| {
                let body = serde_json::to_string(&goal).map_err(StoreError::from)?;
                Ok(Response::json(body))
            });
        respond(result)
    }

    /// Handle a completed-day lookup: 200 with `{"<date>": bool}`.
    pub fn respond_to_completed(&self, event: &InboundEvent, date: &str) -> Response {
        let result = event
            .require_goal_id()
            .map_err(CoreError::from)
            .and_then(|goal_id| self.is_completed(goal_id, date))
            .map(|completed| Response::json(completed_body(date, completed)));
        respond(result)
    }
}

fn respond(result: Result<Response>) -> Response {
    result.unwrap_or_else(|err| {
        warn!("request failed: {err}");
        Response::error(&err)
    })
}

/// Service version reported by the version endpoint.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub fn version_response() -> Response {
    Response::text(version())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{FieldOp, MemoryStore, StoredGoal};
    use std::cell::Cell;

    fn service() -> GoalService<MemoryStore> {
        GoalService::new(MemoryStore::new("xeffect_goals").unwrap())
    }

    fn mark(date: &str, is_completed: bool) -> MarkCompleted {
        MarkCompleted {
            is_completed,
            date: parse_date(date).unwrap(),
        }
    }

    fn new_goal() -> NewGoal {
        NewGoal {
            title: "Meditate".into(),
            motivation: "Calm".into(),
        }
    }

    #[test]
    fn create_get_and_list() {
        let svc = service();
        let id = svc.create_goal(new_goal()).unwrap();

        let goal = svc.get_goal(&id).unwrap();
        assert_eq!(goal.title, "Meditate");
        assert!(goal.streak_dates.is_empty());

        let list = svc.list_goals().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].uuid, id);
    }

    #[test]
    fn create_rejects_blank_fields() {
        let svc = service();
        let err = svc
            .create_goal(NewGoal {
                title: String::new(),
                motivation: "x".into(),
            })
            .unwrap_err();
        assert!(matches!(err, CoreError::Request(_)));
        assert!(svc.list_goals().unwrap().is_empty());
    }

    #[test]
    fn toggles_update_completion_lookup() {
        let svc = service();
        let id = svc.create_goal(new_goal()).unwrap();

        for day in ["2024-01-01", "2024-01-02", "2024-01-03"] {
            svc.mark_completed(&id, &mark(day, true)).unwrap();
        }
        assert!(svc.is_completed(&id, "2024-01-02").unwrap());
        assert!(!svc.is_completed(&id, "2024-01-04").unwrap());

        let mutation = svc.mark_completed(&id, &mark("2024-01-02", false)).unwrap();
        assert_eq!(mutation.kind(), "split");
        assert!(!svc.is_completed(&id, "2024-01-02").unwrap());
        assert!(svc.is_completed(&id, "2024-01-03").unwrap());

        let goal = svc.get_goal(&id).unwrap();
        assert_eq!(goal.streak_dates, ["2024-01-03", "2024-01-01"]);
        assert_eq!(goal.best_streak, 1);
    }

    #[test]
    fn repeated_toggle_is_noop() {
        let svc = service();
        let id = svc.create_goal(new_goal()).unwrap();
        svc.mark_completed(&id, &mark("2024-03-01", true)).unwrap();
        let again = svc.mark_completed(&id, &mark("2024-03-01", true)).unwrap();
        assert!(again.is_noop());
        let clear_missing = svc.mark_completed(&id, &mark("2024-03-05", false)).unwrap();
        assert!(clear_missing.is_noop());
    }

    #[test]
    fn streak_lookup_validates_date() {
        let svc = service();
        let id = svc.create_goal(new_goal()).unwrap();
        svc.mark_completed(&id, &mark("2024-03-01", true)).unwrap();

        assert_eq!(svc.streak(&id, "2024-03-01").unwrap().unwrap().length, 1);
        assert!(svc.streak(&id, "2024-03-02").unwrap().is_none());
        assert!(matches!(
            svc.streak(&id, "March 1st"),
            Err(CoreError::Streak(_))
        ));
    }

    #[test]
    fn unknown_goal_is_not_found() {
        let svc = service();
        let err = svc.mark_completed("nope", &mark("2024-03-01", true)).unwrap_err();
        assert!(matches!(err, CoreError::Store(StoreError::NotFound(_))));
    }

    /// Store that lets another writer sneak in before the first `n` updates.
    struct RacingStore {
        inner: MemoryStore,
        races_left: Cell<u32>,
    }

    impl RecordStore for RacingStore {
        fn table(&self) -> &str {
            self.inner.table()
        }
        fn insert(&self, id: &str, goal: &Goal) -> std::result::Result<(), StoreError> {
            self.inner.insert(id, goal)
        }
        fn get(&self, id: &str) -> std::result::Result<Option<StoredGoal>, StoreError> {
            self.inner.get(id)
        }
        fn get_streak(
            &self,
            id: &str,
            start: &str,
        ) -> std::result::Result<Option<GoalStreak>, StoreError> {
            self.inner.get_streak(id, start)
        }
        fn scan(&self) -> std::result::Result<Vec<StoredGoal>, StoreError> {
            self.inner.scan()
        }
        fn update(
            &self,
            id: &str,
            expected_version: u64,
            ops: &[FieldOp],
        ) -> std::result::Result<u64, StoreError> {
            if self.races_left.get() > 0 {
                self.races_left.set(self.races_left.get() - 1);
                let current = self.inner.get(id)?.map(|s| s.version).unwrap_or(0);
                self.inner.update(id, current, &[])?;
            }
            self.inner.update(id, expected_version, ops)
        }
    }

    fn racing_service(races: u32, max_retries: u32) -> (GoalService<RacingStore>, String) {
        let store = RacingStore {
            inner: MemoryStore::new("xeffect_goals").unwrap(),
            races_left: Cell::new(0),
        };
        let svc = GoalService::new(store).with_max_retries(max_retries);
        let id = svc.create_goal(new_goal()).unwrap();
        svc.store().races_left.set(races);
        (svc, id)
    }

    #[test]
    fn conflict_is_retried_from_fresh_snapshot() {
        let (svc, id) = racing_service(2, 3);
        let mutation = svc.mark_completed(&id, &mark("2024-05-01", true)).unwrap();
        assert_eq!(mutation.kind(), "create_new");
        assert_eq!(svc.get_goal(&id).unwrap().streak_dates, ["2024-05-01"]);
    }

    #[test]
    fn conflict_surfaces_after_retries_exhausted() {
        let (svc, id) = racing_service(5, 1);
        let err = svc.mark_completed(&id, &mark("2024-05-01", true)).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Store(StoreError::VersionConflict { .. })
        ));
        assert!(svc.get_goal(&id).unwrap().streak_dates.is_empty());
    }

    #[test]
    fn action_events_map_to_responses() {
        let svc = service();
        let id = svc.create_goal(new_goal()).unwrap();
        let body = r#"{"action":"mark_completed","is_completed":true,"date":"2024-07-01"}"#;

        let response = svc.respond_to_action(&InboundEvent::for_goal(&id, body));
        assert_eq!(response, Response::created());

        let completed = svc.respond_to_completed(&InboundEvent::for_goal(&id, ""), "2024-07-01");
        assert_eq!(completed.status, 200);
        assert_eq!(completed.body, r#"{"2024-07-01":true}"#);

        let missing_goal = svc.respond_to_action(&InboundEvent::json(body));
        assert_eq!(missing_goal.status, 400);
        assert!(missing_goal.body.contains("goal_id"));

        let unknown = svc.respond_to_action(&InboundEvent::for_goal("nope", body));
        assert_eq!(unknown.status, 400);
        assert!(unknown.body.contains("not found"));
    }

    #[test]
    fn out_of_range_date_is_a_bad_request() {
        let svc = service();
        let id = svc.create_goal(new_goal()).unwrap();
        for date in ["+262142-12-31", "-0001-01-01", "10000-01-01"] {
            let body = format!(
                r#"{{"action":"mark_completed","is_completed":true,"date":"{date}"}}"#
            );
            let response = svc.respond_to_action(&InboundEvent::for_goal(&id, body));
            assert_eq!(response.status, 400, "{date}");
            assert!(response.body.contains(date));
        }
        assert!(svc.get_goal(&id).unwrap().streak_dates.is_empty());

        let edge = r#"{"action":"mark_completed","is_completed":true,"date":"9999-12-31"}"#;
        assert_eq!(svc.respond_to_action(&InboundEvent::for_goal(&id, edge)).status, 201);
    }

    #[test]
    fn create_and_get_events() {
        let svc = service();
        let created = svc.respond_to_create(&InboundEvent::json(
            r#"{"title":"Sketch","motivation":"Portfolio"}"#,
        ));
        assert_eq!(created.status, 201);

        let id = svc.list_goals().unwrap().remove(0).uuid;
        let fetched = svc.respond_to_get(&InboundEvent::for_goal(&id, ""));
        assert_eq!(fetched.status, 200);
        let goal: Goal = serde_json::from_str(&fetched.body).unwrap();
        assert_eq!(goal.title, "Sketch");

        let rejected = svc.respond_to_create(&InboundEvent::json(r#"{"title":"Sketch"}"#));
        assert_eq!(rejected.status, 400);
    }

    #[test]
    fn create_from_event_returns_new_id() {
        let svc = service();
        let id = svc
            .create_from_event(&InboundEvent::json(r#"{"title":"Run","motivation":"Health"}"#))
            .unwrap();
        assert_eq!(svc.get_goal(&id).unwrap().title, "Run");

        let err = svc
            .create_from_event(&InboundEvent::json(r#"{"title":"","motivation":"x"}"#))
            .unwrap_err();
        assert!(matches!(err, CoreError::Request(_)));
        assert_eq!(svc.list_goals().unwrap().len(), 1);

        let missing = svc.respond_to_completed(&InboundEvent::json(""), "2024-01-01");
        assert_eq!(missing.status, 400);
        assert!(missing.body.contains("goal_id"));
    }

    #[test]
    fn version_matches_package() {
        assert_eq!(version(), "0.2.0");
        assert_eq!(version_response().body, "0.2.0");
    }
}
