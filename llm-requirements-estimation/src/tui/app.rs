use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use log::{debug, warn};
use requirements_estimation::{
    ArchitectureCache, BatchOrchestrator, BatchRequest, CalculationKey, Calculator, DataType, KvEstimate,
    ModelDirectory, ModelSummary, ResultCache, Settings,
};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::utils::{next_preset, prev_preset};

pub const ITEMS_PER_PAGE: usize = 10;
const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Results of directory calls made on behalf of the UI.
#[derive(Debug)]
pub enum AppEvent {
    ModelList(Vec<String>),
    ModelSummary(ModelSummary),
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Memory,
    Details,
}

impl Tab {
    pub const TITLES: [&'static str; 2] = ["Memory Requirements", "Model Details"];

    const fn toggled(self) -> Self {
        match self {
            Self::Memory => Self::Details,
            Self::Details => Self::Memory,
        }
    }

    pub const fn index(self) -> usize {
        match self {
            Self::Memory => 0,
            Self::Details => 1,
        }
    }
}

pub struct App {
    settings: Settings,
    directory: Arc<dyn ModelDirectory>,
    runtime: Handle,
    events_tx: UnboundedSender<(u64, AppEvent)>,
    events_rx: UnboundedReceiver<(u64, AppEvent)>,
    /// Bumped on every directory request; results tagged with an older value are dropped.
    request_generation: u64,
    orchestrator: BatchOrchestrator,

    pub model_ids: Vec<String>,
    pub cursor: usize,
    pub model: Option<ModelSummary>,
    pub users: u32,
    pub context_length: u32,

    pub loading: bool,
    pub error: Option<String>,
    pub search_mode: bool,
    pub search_input: String,
    pub show_help: bool,
    pub active_tab: Tab,
    pub should_quit: bool,
    spinner_frame: usize,
}

impl App {
    pub fn new(settings: Settings, directory: Arc<dyn ModelDirectory>, runtime: Handle) -> Self {
        let calculator = Calculator::new(
            Arc::clone(&directory),
            Arc::new(ArchitectureCache::new()),
            Arc::new(ResultCache::new(settings.cache_ttl)),
        )
        .with_forced_estimate(settings.force_estimate);
        let orchestrator = BatchOrchestrator::new(Arc::new(calculator), runtime.clone());
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Self {
            users: settings.default_users(),
            context_length: settings.default_context_length(),
            settings,
            directory,
            runtime,
            events_tx,
            events_rx,
            request_generation: 0,
            orchestrator,
            model_ids: Vec::new(),
            cursor: 0,
            model: None,
            loading: true,
            error: None,
            search_mode: false,
            search_input: String::new(),
            show_help: false,
            active_tab: Tab::Memory,
            should_quit: false,
            spinner_frame: 0,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn spinner(&self) -> &'static str {
        SPINNER_FRAMES[self.spinner_frame % SPINNER_FRAMES.len()]
    }

    /// True while any memory figure for the current configuration is outstanding.
    pub const fn is_calculating(&self) -> bool {
        self.orchestrator.is_batch_pending()
    }

    /// KV cache figure for `dtype` under the current configuration, if it has landed.
    pub fn kv_cache(&self, dtype: DataType) -> Option<KvEstimate> {
        let model = self.model.as_ref()?;
        let key = CalculationKey::new(model.model_id.clone(), self.users, self.context_length, dtype);
        self.orchestrator.cached_result(&key)
    }

    /// Advances the spinner and applies whatever background work has finished.
    pub fn tick(&mut self) {
        self.spinner_frame = self.spinner_frame.wrapping_add(1);
        while let Ok((generation, event)) = self.events_rx.try_recv() {
            if generation == self.request_generation {
                self.handle_event(event);
            } else {
                debug!("dropping superseded directory result: {event:?}");
            }
        }
        for completion in self.orchestrator.poll_completions() {
            debug!("{:?} -> {} GB", completion.key, completion.estimate.gigabytes);
        }
        self.refresh_expired();
    }

    /// Recalculates the shown configuration once any of its cached figures has aged out.
    fn refresh_expired(&mut self) {
        if self.loading || self.search_mode || self.model.is_none() || self.is_calculating() {
            return;
        }
        if DataType::ALL.iter().any(|&dtype| self.kv_cache(dtype).is_none()) {
            debug!("cached KV figures expired, recalculating");
            self.dispatch_batch();
        }
    }

    fn next_request(&mut self) -> (u64, UnboundedSender<(u64, AppEvent)>) {
        self.loading = true;
        self.request_generation = self.request_generation.wrapping_add(1);
        (self.request_generation, self.events_tx.clone())
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::ModelList(model_ids) => {
                self.loading = false;
                self.model_ids = model_ids;
                self.model = None;
                self.cursor = 0;
                self.error = None;
                self.orchestrator.clear();
            }
            AppEvent::ModelSummary(summary) => {
                self.loading = false;
                self.error = None;
                self.model = Some(summary);
                self.dispatch_batch();
            }
            AppEvent::Error(message) => {
                warn!("{message}");
                self.loading = false;
                self.error = Some(message);
                self.orchestrator.clear();
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }
        if self.search_mode {
            self.handle_search_key(key);
            return;
        }

        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('/') => {
                self.search_mode = true;
                self.search_input.clear();
                self.orchestrator.clear();
            }
            KeyCode::Char('?') => self.show_help = !self.show_help,
            KeyCode::Tab => {
                if self.model.is_some() {
                    self.active_tab = self.active_tab.toggled();
                }
            }
            KeyCode::Up | KeyCode::Char('k') => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => {
                if self.cursor + 1 < self.model_ids.len() {
                    self.cursor += 1;
                }
            }
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.model_ids.len().saturating_sub(1),
            KeyCode::PageUp => self.cursor = self.cursor.saturating_sub(ITEMS_PER_PAGE),
            KeyCode::PageDown => {
                self.cursor = (self.cursor + ITEMS_PER_PAGE).min(self.model_ids.len().saturating_sub(1));
            }
            KeyCode::Enter => self.select_model(),
            KeyCode::Char('+') => {
                if self.model.is_some() {
                    self.users = next_preset(&self.settings.user_counts, self.users);
                    self.dispatch_batch();
                }
            }
            KeyCode::Char('-') => {
                if self.model.is_some() {
                    self.users = prev_preset(&self.settings.user_counts, self.users);
                    self.dispatch_batch();
                }
            }
            KeyCode::Char('c') => {
                if self.model.is_some() {
                    self.context_length = next_preset(&self.settings.context_lengths, self.context_length);
                    self.dispatch_batch();
                }
            }
            _ => {}
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.search_mode = false,
            KeyCode::Enter => {
                self.search_mode = false;
                let query = self.search_input.trim().to_string();
                self.search(query);
            }
            KeyCode::Backspace => {
                self.search_input.pop();
            }
            KeyCode::Char(c) => self.search_input.push(c),
            _ => {}
        }
    }

    pub fn fetch_models(&mut self) {
        let (generation, tx) = self.next_request();
        let directory = Arc::clone(&self.directory);
        self.runtime.spawn(async move {
            let event = match directory.list_models().await {
                Ok(model_ids) => AppEvent::ModelList(model_ids),
                Err(err) => AppEvent::Error(format!("failed to fetch models: {err}")),
            };
            if tx.send((generation, event)).is_err() {
                debug!("explorer closed, dropping directory result");
            }
        });
    }

    fn search(&mut self, query: String) {
        let (generation, tx) = self.next_request();
        self.orchestrator.clear();
        let directory = Arc::clone(&self.directory);
        self.runtime.spawn(async move {
            let event = match directory.search_models(&query).await {
                Ok(model_ids) => AppEvent::ModelList(model_ids),
                Err(err) => AppEvent::Error(format!("failed to search models: {err}")),
            };
            if tx.send((generation, event)).is_err() {
                debug!("explorer closed, dropping directory result");
            }
        });
    }

    fn select_model(&mut self) {
        let Some(model_id) = self.model_ids.get(self.cursor).cloned() else {
            return;
        };
        let (generation, tx) = self.next_request();
        let directory = Arc::clone(&self.directory);
        self.runtime.spawn(async move {
            let event = match directory.fetch_model_summary(&model_id).await {
                Ok(summary) => AppEvent::ModelSummary(summary),
                Err(err) => AppEvent::Error(format!("failed to fetch {model_id}: {err}")),
            };
            if tx.send((generation, event)).is_err() {
                debug!("explorer closed, dropping directory result");
            }
        });
    }

    fn dispatch_batch(&mut self) {
        let Some(model) = &self.model else {
            return;
        };
        let request = BatchRequest {
            model_id: model.model_id.clone(),
            users: self.users,
            context_length: self.context_length,
            params_b: model.parameters_b,
        };
        self.orchestrator.on_parameter_change(&request);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::Local;
    use requirements_estimation::{ArchitectureConfig, DirectoryError, Method};

    struct StubDirectory;

    #[async_trait]
    impl ModelDirectory for StubDirectory {
        async fn list_models(&self) -> Result<Vec<String>, DirectoryError> {
            Ok((0..25).map(|i| format!("org/model-{i}")).collect())
        }

        async fn search_models(&self, query: &str) -> Result<Vec<String>, DirectoryError> {
            Ok(vec![format!("org/{query}")])
        }

        async fn fetch_model_summary(&self, model_id: &str) -> Result<ModelSummary, DirectoryError> {
            if model_id.ends_with("slow") {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
            Ok(summary(model_id))
        }

        async fn fetch_architecture(&self, _model_id: &str) -> Result<ArchitectureConfig, DirectoryError> {
            Err(DirectoryError::Status(401))
        }
    }

    fn summary(model_id: &str) -> ModelSummary {
        ModelSummary {
            model_id: model_id.to_string(),
            author: "org".to_string(),
            parameters_b: 3.0,
            downloads: 10,
            likes: 1,
            fetched_at: Local::now(),
        }
    }

    fn app() -> App {
        App::new(Settings::default(), Arc::new(StubDirectory), Handle::current())
    }

    fn app_with_ttl(cache_ttl: Duration) -> App {
        let settings = Settings {
            cache_ttl,
            ..Settings::default()
        };
        App::new(settings, Arc::new(StubDirectory), Handle::current())
    }

    fn press(app: &mut App, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    async fn settle(app: &mut App) {
        for _ in 0..200 {
            app.tick();
            if !app.is_calculating() && !app.loading {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("app never settled");
    }

    #[tokio::test]
    async fn initial_list_loads() {
        let mut app = app();
        app.fetch_models();
        settle(&mut app).await;
        assert_eq!(app.model_ids.len(), 25);
        assert!(app.model.is_none());
    }

    #[tokio::test]
    async fn navigation_is_clamped() {
        let mut app = app();
        app.handle_event(AppEvent::ModelList((0..25).map(|i| i.to_string()).collect()));
        press(&mut app, KeyCode::Up);
        assert_eq!(app.cursor, 0);
        press(&mut app, KeyCode::PageDown);
        press(&mut app, KeyCode::PageDown);
        press(&mut app, KeyCode::PageDown);
        assert_eq!(app.cursor, 24);
        press(&mut app, KeyCode::Char('k'));
        assert_eq!(app.cursor, 23);
        press(&mut app, KeyCode::Home);
        assert_eq!(app.cursor, 0);
        press(&mut app, KeyCode::End);
        assert_eq!(app.cursor, 24);
    }

    #[tokio::test]
    async fn selecting_a_model_fills_every_dtype() {
        let mut app = app();
        app.handle_event(AppEvent::ModelList(vec!["org/small".to_string()]));
        press(&mut app, KeyCode::Enter);
        assert!(app.loading);
        settle(&mut app).await;

        assert_eq!(app.model.as_ref().map(|m| m.model_id.as_str()), Some("org/small"));
        let fp16 = app.kv_cache(DataType::Float16).unwrap();
        assert_eq!(fp16.method, Method::Estimated);
        assert_eq!(fp16.gigabytes, 2.05);
        assert!(app.kv_cache(DataType::Int4).is_some());
    }

    #[tokio::test]
    async fn parameter_keys_need_a_model() {
        let mut app = app();
        press(&mut app, KeyCode::Char('+'));
        press(&mut app, KeyCode::Char('c'));
        assert_eq!((app.users, app.context_length), (1, 4096));
        assert!(!app.is_calculating());

        app.handle_event(AppEvent::ModelSummary(summary("org/small")));
        settle(&mut app).await;
        press(&mut app, KeyCode::Char('+'));
        press(&mut app, KeyCode::Char('c'));
        assert_eq!((app.users, app.context_length), (2, 8192));
        assert!(app.is_calculating());
        settle(&mut app).await;
        // 0.5 * 8.192 * 2 users
        assert_eq!(app.kv_cache(DataType::Float16).unwrap().gigabytes, 8.19);

        press(&mut app, KeyCode::Char('-'));
        press(&mut app, KeyCode::Char('-'));
        assert_eq!(app.users, 32);
    }

    #[tokio::test]
    async fn new_list_discards_pending_batch() {
        let mut app = app();
        app.handle_event(AppEvent::ModelSummary(summary("org/small")));
        assert!(app.is_calculating());
        app.handle_event(AppEvent::ModelList(vec!["org/other".to_string()]));
        assert!(!app.is_calculating());
        assert!(app.model.is_none());
        settle(&mut app).await;
        assert!(!app.is_calculating());
    }

    #[tokio::test]
    async fn search_mode_collects_query() {
        let mut app = app();
        press(&mut app, KeyCode::Char('/'));
        assert!(app.search_mode);
        for c in "qwenx".chars() {
            press(&mut app, KeyCode::Char(c));
        }
        press(&mut app, KeyCode::Backspace);
        // 'q' while searching is text, not quit
        assert!(!app.should_quit);
        press(&mut app, KeyCode::Enter);
        assert!(!app.search_mode);
        settle(&mut app).await;
        assert_eq!(app.model_ids, vec!["org/qwen".to_string()]);
    }

    #[tokio::test]
    async fn tab_and_quit() {
        let mut app = app();
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.active_tab, Tab::Memory);
        app.handle_event(AppEvent::ModelSummary(summary("org/small")));
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.active_tab, Tab::Details);
        app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn errors_clear_loading() {
        let mut app = app();
        app.handle_event(AppEvent::Error("boom".to_string()));
        assert!(!app.loading);
        assert_eq!(app.error.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn late_summary_for_earlier_selection_is_dropped() {
        let mut app = app();
        app.handle_event(AppEvent::ModelList(vec!["org/slow".to_string(), "org/fast".to_string()]));
        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Enter);
        settle(&mut app).await;
        assert_eq!(app.model.as_ref().map(|m| m.model_id.as_str()), Some("org/fast"));

        tokio::time::sleep(Duration::from_millis(150)).await;
        app.tick();
        assert_eq!(app.model.as_ref().map(|m| m.model_id.as_str()), Some("org/fast"));
        assert!(!app.is_calculating());
    }

    #[tokio::test]
    async fn expired_figures_are_recalculated() {
        let mut app = app_with_ttl(Duration::from_millis(200));
        app.handle_event(AppEvent::ModelSummary(summary("org/small")));
        settle(&mut app).await;
        assert!(app.kv_cache(DataType::Float16).is_some());

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert!(app.kv_cache(DataType::Float16).is_none());
        app.tick();
        assert!(app.is_calculating());
        settle(&mut app).await;
        assert_eq!(app.kv_cache(DataType::Float16).unwrap().gigabytes, 2.05);
    }
}
