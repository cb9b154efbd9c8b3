use ratatui::widgets::ListState;

use crate::dispatch::ActionMsg;
use crate::pipeline::{FeedPipeline, Pipeline, QueryStyle, ResultView, SearchPipeline};
use crate::settings::Settings;

/// Workflow states offered by the status selector.
pub const STATUSES: [&str; 5] = ["Open", "In Progress", "Reopened", "Resolved", "Closed"];

pub const DEFAULT_DAYS_PAST: &str = "5";

/// Form inputs, in focus order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Project,
    Status,
    DaysPast,
    User,
}

impl Field {
    const ORDER: [Field; 4] = [Field::Project, Field::Status, Field::DaysPast, Field::User];

    fn position(self) -> usize {
        Self::ORDER.iter().position(|f| *f == self).unwrap_or(0)
    }

    pub fn next(self) -> Self {
        Self::ORDER[(self.position() + 1) % Self::ORDER.len()]
    }

    pub fn previous(self) -> Self {
        Self::ORDER[(self.position() + Self::ORDER.len() - 1) % Self::ORDER.len()]
    }

    pub fn label(self) -> &'static str {
        match self {
            Field::Project => "Project",
            Field::Status => "Status",
            Field::DaysPast => "Days",
            Field::User => "User",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Search,
    Feed,
}

/// All state the popup shows. Only the UI thread touches it.
pub struct App {
    pub project: String,
    pub status_index: usize,
    pub days_past: String,
    pub user: String,
    pub focus: Field,
    /// The status line.
    pub status: String,
    /// Last rendered result; `None` until something finished.
    pub results: Option<ResultView>,
    /// List selection state for scrolling the results.
    pub list_state: ListState,
    /// Set once the reachability probe succeeded.
    pub ready: bool,
    /// Whether the user has requested to quit.
    pub quit: bool,
    host: String,
    query_style: QueryStyle,
}

impl App {
    pub fn new(settings: &Settings) -> Self {
        Self {
            project: settings.project.clone(),
            status_index: 0,
            days_past: DEFAULT_DAYS_PAST.into(),
            user: settings.user.clone(),
            focus: Field::Project,
            status: format!("Checking JIRA session at {}…", settings.host),
            results: None,
            list_state: ListState::default(),
            ready: false,
            quit: false,
            host: settings.host.clone(),
            query_style: settings.query_style,
        }
    }

    pub fn selected_status(&self) -> &'static str {
        STATUSES[self.status_index % STATUSES.len()]
    }

    // -- form editing --------------------------------------------------------

    pub fn focus_next(&mut self) {
        self.focus = self.focus.next();
    }

    pub fn focus_previous(&mut self) {
        self.focus = self.focus.previous();
    }

    pub fn cycle_status(&mut self, forward: bool) {
        self.status_index = if forward {
            (self.status_index + 1) % STATUSES.len()
        } else {
            (self.status_index + STATUSES.len() - 1) % STATUSES.len()
        };
    }

    /// Type into the focused field. The day count only takes digits and the
    /// status selector takes no text at all.
    pub fn push_char(&mut self, c: char) {
        match self.focus {
            Field::Project => self.project.push(c),
            Field::User => self.user.push(c),
            Field::DaysPast if c.is_ascii_digit() => self.days_past.push(c),
            Field::DaysPast | Field::Status => {}
        }
    }

    pub fn pop_char(&mut self) {
        match self.focus {
            Field::Project => {
                self.project.pop();
            }
            Field::User => {
                self.user.pop();
            }
            Field::DaysPast => {
                self.days_past.pop();
            }
            Field::Status => {}
        }
    }

    // -- actions -------------------------------------------------------------

    /// Build the pipeline for `action` and show its pending status.
    ///
    /// Returns `None` when nothing should be dispatched: the session has not
    /// been confirmed yet, or there is no user to ask about.
    pub fn start(&mut self, action: Action) -> Option<Box<dyn Pipeline>> {
        if !self.ready {
            return None;
        }
        let pipeline: Box<dyn Pipeline> = match action {
            Action::Search => Box::new(SearchPipeline::new(
                &self.host,
                &self.project,
                self.selected_status(),
                &self.days_past,
                self.query_style,
            )),
            Action::Feed => match FeedPipeline::new(&self.host, Some(&self.user), self.query_style) {
                Some(p) => Box::new(p),
                None => return None,
            },
        };
        self.status = pipeline.pending_status();
        Some(pipeline)
    }

    /// Fold a background result into the view. Results land in arrival
    /// order, so the last request to finish wins.
    pub fn apply(&mut self, msg: ActionMsg) {
        match msg {
            ActionMsg::Ready => {
                self.ready = true;
                self.status = format!("Connected to {}", self.host);
            }
            ActionMsg::Unreachable(e) | ActionMsg::Failed(e) => {
                self.status = format!("ERROR. {e}");
            }
            ActionMsg::Finished { status, view } => {
                self.status = match view.empty_message() {
                    Some(msg) => msg.to_string(),
                    None => status,
                };
                self.results = Some(view);
                self.list_state = ListState::default();
            }
        }
    }

    // -- navigation ----------------------------------------------------------

    fn result_count(&self) -> usize {
        self.results.as_ref().map_or(0, ResultView::len)
    }

    pub fn select_next(&mut self) {
        let len = self.result_count();
        if len == 0 {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => (i + 1).min(len - 1),
            None => 0,
        };
        self.list_state.select(Some(i));
    }

    pub fn select_previous(&mut self) {
        if self.result_count() == 0 {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => i.saturating_sub(1),
            None => 0,
        };
        self.list_state.select(Some(i));
    }

    pub fn select_first(&mut self) {
        if self.result_count() > 0 {
            self.list_state.select(Some(0));
        }
    }

    pub fn select_last(&mut self) {
        let len = self.result_count();
        if len > 0 {
            self.list_state.select(Some(len - 1));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{ActivityLine, IssueRow};

    fn ready_app() -> App {
        let mut app = App::new(&Settings::default());
        app.apply(ActionMsg::Ready);
        app
    }

    fn activity(n: usize) -> ResultView {
        ResultView::Activity(
            (0..n)
                .map(|i| ActivityLine {
                    when: format!("1/{}/2024, 12:00:00 AM", i + 1),
                    title: format!("entry {i}"),
                })
                .collect(),
        )
    }

    // -- construction --------------------------------------------------------

    #[test]
    fn new_app_uses_saved_settings() {
        let app = App::new(&Settings::default());
        assert_eq!(app.project, "Sunshine");
        assert_eq!(app.user, "nyx.linden");
        assert_eq!(app.selected_status(), "Open");
        assert_eq!(app.days_past, "5");
        assert!(!app.ready);
        assert!(app.results.is_none());
    }

    // -- form editing --------------------------------------------------------

    #[test]
    fn focus_cycles_both_ways() {
        let mut app = App::new(&Settings::default());
        app.focus_next();
        assert_eq!(app.focus, Field::Status);
        app.focus_previous();
        app.focus_previous();
        assert_eq!(app.focus, Field::User);
    }

    #[test]
    fn status_selector_wraps() {
        let mut app = App::new(&Settings::default());
        app.cycle_status(false);
        assert_eq!(app.selected_status(), "Closed");
        app.cycle_status(true);
        app.cycle_status(true);
        assert_eq!(app.selected_status(), "In Progress");
    }

    #[test]
    fn days_field_only_takes_digits() {
        let mut app = App::new(&Settings::default());
        app.focus = Field::DaysPast;
        app.push_char('x');
        app.push_char('0');
        assert_eq!(app.days_past, "50");
        app.pop_char();
        app.pop_char();
        assert_eq!(app.days_past, "");
    }

    #[test]
    fn typing_edits_focused_text_field() {
        let mut app = App::new(&Settings::default());
        app.focus = Field::User;
        app.pop_char();
        app.push_char('N');
        assert_eq!(app.user, "nyx.lindeN");
        app.focus = Field::Status;
        app.push_char('z');
        assert_eq!(app.selected_status(), "Open");
    }

    // -- actions -------------------------------------------------------------

    #[test]
    fn actions_wait_for_reachability() {
        let mut app = App::new(&Settings::default());
        assert!(app.start(Action::Search).is_none());
        assert!(app.start(Action::Feed).is_none());
    }

    #[test]
    fn search_sets_pending_status() {
        let mut app = ready_app();
        let pipeline = app.start(Action::Search).unwrap();
        assert!(pipeline.url().contains("/rest/api/2/search?jql=project=%22Sunshine%22"));
        assert_eq!(app.status, format!("Performing JIRA search for {}", pipeline.url()));
    }

    #[test]
    fn feed_without_user_dispatches_nothing() {
        let mut app = ready_app();
        app.user.clear();
        assert!(app.start(Action::Feed).is_none());
    }

    #[test]
    fn finished_result_replaces_view_and_status() {
        let mut app = ready_app();
        app.apply(ActionMsg::Finished {
            status: "Activity query: u".into(),
            view: activity(2),
        });
        assert_eq!(app.status, "Activity query: u");
        assert_eq!(app.results.as_ref().map(ResultView::len), Some(2));
    }

    #[test]
    fn empty_result_puts_message_on_status_line() {
        let mut app = ready_app();
        app.apply(ActionMsg::Finished {
            status: "Activity query: u".into(),
            view: ResultView::Empty("There are no activity results.".into()),
        });
        assert_eq!(app.status, "There are no activity results.");
    }

    #[test]
    fn failures_are_flattened_to_status_line() {
        let mut app = App::new(&Settings::default());
        app.apply(ActionMsg::Unreachable("Network Error".into()));
        assert_eq!(app.status, "ERROR. Network Error");
        assert!(!app.ready);

        let mut app = ready_app();
        app.apply(ActionMsg::Failed("boom".into()));
        assert_eq!(app.status, "ERROR. boom");
    }

    #[test]
    fn last_finished_result_wins() {
        let mut app = ready_app();
        app.apply(ActionMsg::Finished {
            status: "first".into(),
            view: activity(3),
        });
        app.apply(ActionMsg::Finished {
            status: "second".into(),
            view: ResultView::Issues(vec![IssueRow {
                id: "1".into(),
                key: "SUN-1".into(),
                status: "Open".into(),
                assignee: None,
                summary: "s".into(),
            }]),
        });
        assert_eq!(app.status, "second");
        assert!(matches!(app.results, Some(ResultView::Issues(_))));
    }

    // -- navigation ----------------------------------------------------------

    #[test]
    fn navigation_on_empty_is_noop() {
        let mut app = ready_app();
        app.select_next();
        app.select_previous();
        app.select_first();
        app.select_last();
        assert!(app.list_state.selected().is_none());
    }

    #[test]
    fn select_next_starts_at_zero_then_clamps() {
        let mut app = ready_app();
        app.apply(ActionMsg::Finished { status: String::new(), view: activity(3) });

        app.select_next();
        assert_eq!(app.list_state.selected(), Some(0));
        app.select_last();
        app.select_next();
        assert_eq!(app.list_state.selected(), Some(2));
    }

    #[test]
    fn select_previous_clamps_at_zero() {
        let mut app = ready_app();
        app.apply(ActionMsg::Finished { status: String::new(), view: activity(3) });

        app.select_last();
        app.select_previous();
        assert_eq!(app.list_state.selected(), Some(1));
        app.select_first();
        app.select_previous();
        assert_eq!(app.list_state.selected(), Some(0));
    }

    #[test]
    fn new_result_resets_selection() {
        let mut app = ready_app();
        app.apply(ActionMsg::Finished { status: String::new(), view: activity(3) });
        app.select_last();
        app.apply(ActionMsg::Finished { status: String::new(), view: activity(1) });
        assert!(app.list_state.selected().is_none());
    }
}
