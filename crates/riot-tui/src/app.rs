use std::sync::Arc;

use ratatui::widgets::ListState;
use tokio::sync::watch;

use riot_core::{
    Animal, AuthGate, ChatSession, Config, FeedState, GeminiClient, GeminiConfigUpdate,
    GeminiModel, HistoryStore, Poller, SendOutcome, Session, Snapshot, TelemetryClient,
};

/// Terminals narrower than this get the one-view-at-a-time layout
pub const COMPACT_WIDTH: u16 = 100;

const TEMPERATURE_STEP: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Login,
    Dashboard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Monitoring,
    Settings,
}

/// Which view the compact layout shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MobileView {
    Panel,
    Map,
    Chat,
}

impl MobileView {
    pub fn all() -> [MobileView; 3] {
        [MobileView::Panel, MobileView::Map, MobileView::Chat]
    }

    pub fn label(&self) -> &'static str {
        match self {
            MobileView::Panel => "Painel",
            MobileView::Map => "Mapa",
            MobileView::Chat => "Chat",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Animals,
    Chat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsField {
    ApiKey,
    Model,
    Temperature,
}

impl SettingsField {
    pub fn next(self) -> Self {
        match self {
            SettingsField::ApiKey => SettingsField::Model,
            SettingsField::Model => SettingsField::Temperature,
            SettingsField::Temperature => SettingsField::ApiKey,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            SettingsField::ApiKey => SettingsField::Temperature,
            SettingsField::Model => SettingsField::ApiKey,
            SettingsField::Temperature => SettingsField::Model,
        }
    }
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub screen: Screen,
    pub tab: Tab,
    pub mobile_view: MobileView,
    pub input_mode: InputMode,
    pub focus: FocusPane,
    /// Set by the renderer from the terminal width
    pub compact: bool,

    pub session: Session,
    poller: Poller,
    feed_rx: watch::Receiver<FeedState>,
    pub feed: FeedState,
    telemetry: Arc<TelemetryClient>,

    // Login state
    pub password_input: String,
    pub login_error: Option<String>,

    // Animal list state
    pub animal_state: ListState,

    // Chat state
    pub chat_input: String,
    pub chat_cursor: usize,
    pub chat_scroll: u16,
    pub chat_height: u16,
    pub chat_width: u16,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Settings state
    pub settings_field: SettingsField,
    pub api_key_input: String,
    pub show_api_key: bool,
    pub settings_notice: Option<String>,
}

impl App {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let telemetry = Arc::new(TelemetryClient::new(config.api_url()));
        let poller = Poller::spawn(telemetry.clone(), config.poll_interval());

        let mut chat = ChatSession::new(Arc::new(GeminiClient::new()), config.ai_timeout());
        match HistoryStore::default_location() {
            Ok(store) => chat = chat.with_store(store),
            Err(err) => tracing::warn!("chat history disabled: {}", err),
        }

        let session = Session::new(
            AuthGate::new(config.password()),
            chat,
            config.gemini(),
            config.user_location(),
        );

        Ok(Self::from_parts(session, poller, telemetry))
    }

    pub fn from_parts(session: Session, poller: Poller, telemetry: Arc<TelemetryClient>) -> Self {
        let mut feed_rx = poller.subscribe();
        let feed = feed_rx.borrow_and_update().clone();
        let api_key_input = session.gemini().api_key.clone();

        Self {
            should_quit: false,
            screen: Screen::Login,
            tab: Tab::Monitoring,
            mobile_view: MobileView::Panel,
            input_mode: InputMode::Editing,
            focus: FocusPane::Animals,
            compact: false,

            session,
            poller,
            feed_rx,
            feed,
            telemetry,

            password_input: String::new(),
            login_error: None,

            animal_state: ListState::default(),

            chat_input: String::new(),
            chat_cursor: 0,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,

            animation_frame: 0,

            settings_field: SettingsField::ApiKey,
            api_key_input,
            show_api_key: false,
            settings_notice: None,
        }
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.feed.snapshot
    }

    pub fn selected_animal(&self) -> Option<&Animal> {
        self.session.selected_animal(&self.feed.snapshot)
    }

    pub fn video_url(&self, animal_id: u32) -> String {
        self.telemetry.video_url(animal_id)
    }

    pub fn subscribe_feed(&self) -> watch::Receiver<FeedState> {
        self.poller.subscribe()
    }

    /// Switch layouts at the breakpoint, keeping the focused pane in view
    pub fn on_resize(&mut self, width: u16) {
        let compact = width < COMPACT_WIDTH;
        if compact && !self.compact {
            self.mobile_view = match self.focus {
                FocusPane::Animals => MobileView::Panel,
                FocusPane::Chat => MobileView::Chat,
            };
        }
        self.compact = compact;
    }

    /// Take the latest feed state if the poller published one
    pub fn sync_feed(&mut self) {
        if !self.feed_rx.has_changed().unwrap_or(false) {
            return;
        }
        self.feed = self.feed_rx.borrow_and_update().clone();

        let count = self.feed.snapshot.animals.len();
        match self.animal_state.selected() {
            Some(_) if count == 0 => self.animal_state.select(None),
            Some(idx) if idx >= count => self.animal_state.select(Some(count - 1)),
            None if count > 0 => self.animal_state.select(Some(0)),
            _ => {}
        }
    }

    /// Called on every tick
    pub async fn on_tick(&mut self) {
        self.tick_animation();
        self.sync_feed();
        if self.session.chat.poll_reply().await {
            self.scroll_chat_to_bottom();
        }
    }

    pub fn tick_animation(&mut self) {
        if self.session.chat.is_sending() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn shutdown(&self) {
        self.poller.shutdown();
    }

    // Login

    pub fn submit_login(&mut self) {
        match self.session.login(&self.password_input) {
            Ok(()) => {
                self.screen = Screen::Dashboard;
                self.tab = Tab::Monitoring;
                self.input_mode = InputMode::Normal;
                self.login_error = None;
                self.scroll_chat_to_bottom();
            }
            Err(err) => {
                self.login_error = Some(err.to_string());
            }
        }
        self.password_input.clear();
    }

    pub fn logout(&mut self) {
        self.session.logout();
        self.screen = Screen::Login;
        self.input_mode = InputMode::Editing;
        self.focus = FocusPane::Animals;
        self.mobile_view = MobileView::Panel;
        self.chat_input.clear();
        self.chat_cursor = 0;
        self.chat_scroll = 0;
        self.settings_notice = None;
        self.show_api_key = false;
    }

    // Animal list navigation

    pub fn animal_nav_down(&mut self) {
        let count = self.feed.snapshot.animals.len();
        if count == 0 {
            return;
        }
        let next = match self.animal_state.selected() {
            Some(i) => (i + 1).min(count - 1),
            None => 0,
        };
        self.animal_state.select(Some(next));
    }

    pub fn animal_nav_up(&mut self) {
        if self.feed.snapshot.animals.is_empty() {
            return;
        }
        let prev = self.animal_state.selected().map(|i| i.saturating_sub(1)).unwrap_or(0);
        self.animal_state.select(Some(prev));
    }

    pub fn animal_nav_first(&mut self) {
        if !self.feed.snapshot.animals.is_empty() {
            self.animal_state.select(Some(0));
        }
    }

    pub fn animal_nav_last(&mut self) {
        let count = self.feed.snapshot.animals.len();
        if count > 0 {
            self.animal_state.select(Some(count - 1));
        }
    }

    /// Make the highlighted row the selected animal
    pub fn select_highlighted(&mut self) {
        let id = self
            .animal_state
            .selected()
            .and_then(|idx| self.feed.snapshot.animals.get(idx))
            .map(|animal| animal.id);
        if let Some(id) = id {
            self.session.select_animal(id);
        }
    }

    pub fn deselect_animal(&mut self) {
        self.session.deselect_animal();
    }

    // Chat

    pub fn submit_chat(&mut self) {
        // Input is disabled while a question is outstanding
        if self.session.chat.is_sending() {
            return;
        }

        let snapshot = self.feed.snapshot.clone();
        match self.session.ask(&self.chat_input, &snapshot) {
            SendOutcome::Dispatched | SendOutcome::MissingApiKey => {
                self.chat_input.clear();
                self.chat_cursor = 0;
                self.input_mode = InputMode::Normal;
                self.scroll_chat_to_bottom();
            }
            SendOutcome::Empty | SendOutcome::Busy => {}
        }
    }

    pub fn scroll_chat_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_chat_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(self.chat_total_lines());
    }

    /// Scroll chat to bottom so the latest message (or "Pensando...") is visible
    pub fn scroll_chat_to_bottom(&mut self) {
        let total_lines = self.chat_total_lines();
        let visible_height = if self.chat_height > 0 { self.chat_height } else { 20 };

        self.chat_scroll = total_lines.saturating_sub(visible_height);
    }

    fn chat_total_lines(&self) -> u16 {
        // Default to 50 until the first render records the real width
        let wrap_width = if self.chat_width > 0 { self.chat_width as usize } else { 50 };

        let mut total_lines: usize = 0;
        for msg in self.session.chat.messages() {
            // Role line and the blank line after the message
            total_lines = total_lines.saturating_add(2);
            for line in msg.text.lines() {
                let char_count = line.chars().count();
                total_lines = total_lines.saturating_add(char_count / wrap_width + 1);
            }
            if !msg.sources.is_empty() {
                total_lines = total_lines.saturating_add(1 + msg.sources.len());
            }
        }

        if self.session.chat.is_sending() {
            total_lines = total_lines.saturating_add(2);
        }
        u16::try_from(total_lines).unwrap_or(u16::MAX)
    }

    // Settings

    pub fn apply_api_key(&mut self) {
        self.session.update_gemini(GeminiConfigUpdate {
            api_key: Some(self.api_key_input.clone()),
            ..Default::default()
        });

        self.settings_notice = Some(if self.session.gemini().has_api_key() {
            tracing::info!(key = %self.session.gemini().redacted_key(), "api key loaded");
            "Chave da API carregada com sucesso.".to_string()
        } else {
            "Chave da API removida.".to_string()
        });
    }

    pub fn cycle_model(&mut self, forward: bool) {
        let models = GeminiModel::all();
        let current = models
            .iter()
            .position(|m| *m == self.session.gemini().model)
            .unwrap_or(0);
        let next = if forward {
            (current + 1) % models.len()
        } else {
            (current + models.len() - 1) % models.len()
        };

        self.session.update_gemini(GeminiConfigUpdate {
            model: Some(models[next]),
            ..Default::default()
        });
    }

    pub fn adjust_temperature(&mut self, steps: i32) {
        let current = self.session.gemini().temperature;
        let target = current + steps as f32 * TEMPERATURE_STEP;
        // Snap to one decimal so repeated steps don't drift
        let target = (target * 10.0).round() / 10.0;

        self.session.update_gemini(GeminiConfigUpdate {
            temperature: Some(target),
            ..Default::default()
        });
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use riot_core::{AnimalStatus, Assistant, AssistantReply, GeminiConfig, SnapshotSource, UserLocation};
    use riot_core::chat::MISSING_KEY_TEXT;
    use riot_core::ChatMessage;
    use riot_core::models::{AnimalKind, Herd, Location};
    use std::time::Duration;

    struct FixedSource(Snapshot);

    #[async_trait]
    impl SnapshotSource for FixedSource {
        async fn fetch_snapshot(&self) -> riot_core::Result<Snapshot> {
            Ok(self.0.clone())
        }
    }

    struct EchoAssistant;

    #[async_trait]
    impl Assistant for EchoAssistant {
        async fn ask(
            &self,
            question: &str,
            _context: &str,
            _location: Option<UserLocation>,
            _config: &GeminiConfig,
        ) -> riot_core::Result<AssistantReply> {
            Ok(AssistantReply {
                text: format!("Resposta: {}", question),
                sources: Vec::new(),
            })
        }
    }

    fn animal(id: u32, name: &str, status: AnimalStatus) -> Animal {
        Animal {
            id,
            collar_id: format!("C-{:03}", id),
            herd_id: 1,
            name: name.to_string(),
            status,
            alert: None,
            location: Location { lat: -15.6, lng: -56.1 },
            temperature: 38.5,
            steps: 1200,
            kind: AnimalKind::Cow,
            breed: "Nelore".to_string(),
            age: 30,
            weight: 450.0,
            history: None,
        }
    }

    fn snapshot() -> Snapshot {
        Snapshot {
            animals: vec![
                animal(1, "Mimosa", AnimalStatus::Healthy),
                animal(2, "Estrela", AnimalStatus::Danger),
            ],
            herds: vec![Herd {
                id: 1,
                name: "Rebanho Norte".to_string(),
                region: "Pasto Norte".to_string(),
                location: Location { lat: -15.6, lng: -56.1 },
                polygon: Vec::new(),
            }],
        }
    }

    pub(crate) async fn app_with(gemini: GeminiConfig) -> App {
        let telemetry = Arc::new(TelemetryClient::new("http://127.0.0.1:9"));
        let poller = Poller::spawn(Arc::new(FixedSource(snapshot())), Duration::from_secs(60));
        poller.subscribe().wait_for(|state| !state.loading).await.unwrap();

        let chat = ChatSession::new(Arc::new(EchoAssistant), Duration::from_secs(5));
        let session = Session::new(AuthGate::new("riot2025"), chat, gemini, None);
        App::from_parts(session, poller, telemetry)
    }

    pub(crate) async fn logged_in_app() -> App {
        let mut app = app_with(GeminiConfig::default()).await;
        app.password_input = "riot2025".to_string();
        app.submit_login();
        app
    }

    #[tokio::test]
    async fn test_login_flow() {
        let mut app = app_with(GeminiConfig::default()).await;
        assert_eq!(app.screen, Screen::Login);

        app.password_input = "errada".to_string();
        app.submit_login();
        assert_eq!(app.screen, Screen::Login);
        assert_eq!(app.login_error.as_deref(), Some("Senha incorreta. Tente novamente."));
        assert!(app.password_input.is_empty());

        app.password_input = "riot2025".to_string();
        app.submit_login();
        assert_eq!(app.screen, Screen::Dashboard);
        assert!(app.login_error.is_none());
    }

    #[tokio::test]
    async fn test_feed_snapshot_and_selection() {
        let mut app = logged_in_app().await;
        assert_eq!(app.snapshot().animals.len(), 2);

        app.animal_nav_first();
        app.animal_nav_down();
        app.animal_nav_down();
        assert_eq!(app.animal_state.selected(), Some(1));

        app.select_highlighted();
        assert_eq!(app.selected_animal().map(|a| a.name.as_str()), Some("Estrela"));

        app.deselect_animal();
        assert!(app.selected_animal().is_none());
    }

    #[tokio::test]
    async fn test_chat_without_key_answers_locally() {
        let mut app = logged_in_app().await;
        app.chat_input = "Quantos animais?".to_string();
        app.submit_chat();

        let messages = app.session.chat.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[2].text, MISSING_KEY_TEXT);
        assert!(app.chat_input.is_empty());
    }

    #[tokio::test]
    async fn test_second_send_ignored_while_sending() {
        let gemini = GeminiConfig {
            api_key: "test-key".to_string(),
            ..GeminiConfig::default()
        };
        let mut app = app_with(gemini).await;
        app.password_input = "riot2025".to_string();
        app.submit_login();

        app.chat_input = "Oi".to_string();
        app.submit_chat();
        assert!(app.session.chat.is_sending());

        // A second submit while sending keeps the text and appends nothing
        app.chat_input = "De novo".to_string();
        app.submit_chat();
        assert_eq!(app.chat_input, "De novo");
        assert_eq!(app.session.chat.messages().len(), 2);

        assert!(app.session.chat.wait_reply().await);
        assert_eq!(app.session.chat.messages()[2].text, "Resposta: Oi");
    }

    #[tokio::test]
    async fn test_logout_returns_to_login() {
        let mut app = logged_in_app().await;
        app.animal_nav_first();
        app.select_highlighted();
        app.chat_input = "pergunta".to_string();
        app.submit_chat();

        app.logout();
        assert_eq!(app.screen, Screen::Login);
        assert!(app.selected_animal().is_none());
        assert_eq!(app.session.chat.messages().len(), 1);
        assert!(!app.session.is_authenticated());
    }

    #[tokio::test]
    async fn test_settings_temperature_and_model() {
        let mut app = logged_in_app().await;
        assert!((app.session.gemini().temperature - 0.7).abs() < 1e-6);

        app.adjust_temperature(3);
        assert!((app.session.gemini().temperature - 1.0).abs() < 1e-6);

        app.adjust_temperature(50);
        assert!((app.session.gemini().temperature - 2.0).abs() < 1e-6);

        app.adjust_temperature(-30);
        assert!(app.session.gemini().temperature.abs() < 1e-6);

        app.cycle_model(true);
        assert_eq!(app.session.gemini().model, GeminiModel::ProExp);
        app.cycle_model(true);
        assert_eq!(app.session.gemini().model, GeminiModel::Flash);
        app.cycle_model(false);
        assert_eq!(app.session.gemini().model, GeminiModel::ProExp);
    }

    #[tokio::test]
    async fn test_apply_api_key() {
        let mut app = logged_in_app().await;
        app.api_key_input = "  AIzaSyExample  ".to_string();
        app.apply_api_key();
        assert_eq!(app.session.gemini().api_key, "AIzaSyExample");
        assert!(app.settings_notice.is_some());
    }

    #[tokio::test]
    async fn test_long_restored_history_scrolls_without_overflow() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = HistoryStore::new(dir.path().join("chat_history.json"));
        let saved: Vec<ChatMessage> = (0..30_000)
            .map(|i| ChatMessage::user(format!("pergunta {}", i)))
            .collect();
        store.save(&saved).unwrap();

        let telemetry = Arc::new(TelemetryClient::new("http://127.0.0.1:9"));
        let poller = Poller::spawn(Arc::new(FixedSource(snapshot())), Duration::from_secs(60));
        let chat = ChatSession::new(Arc::new(EchoAssistant), Duration::from_secs(5)).with_store(store);
        assert_eq!(chat.messages().len(), 30_000);

        let session = Session::new(AuthGate::new("riot2025"), chat, GeminiConfig::default(), None);
        let mut app = App::from_parts(session, poller, telemetry);
        app.chat_height = 20;

        app.scroll_chat_to_bottom();
        assert_eq!(app.chat_scroll, u16::MAX - 20);

        app.scroll_chat_down(100);
        assert_eq!(app.chat_scroll, u16::MAX);
    }
}
