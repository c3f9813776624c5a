//! PageController: per-page state machine around the matching pipeline
//!
//! # States
//! `Idle -> Scanning -> FoundFields | NoFields`
//! `FoundFields -> AwaitingConfirmation | Filling`
//! `AwaitingConfirmation -> Filling | Idle` (accept / decline, dismiss, timeout)
//! `Filling -> Idle`
//! `NoFields` retries on a fixed budget, then rests in `Idle` until a
//! mutation, navigation, visibility change or manual trigger re-arms it.
//!
//! # Time
//! The controller never reads a clock for scheduling. The host reports time
//! through `advance(now_ms)` and every delay is an entry in an owned timer
//! queue, so tests drive it deterministically.

use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use url::Url;

use crate::config::{EngineConfig, Settings};
use crate::dom::{Dom, DomAction, NodeId, SelectorList};
use crate::fill::{fill_all, AutofillLedger, CorrectionPrompt, FillItem, FillReport};
use crate::learner::{container_for_click, container_for_enter, learn_from_form, FieldClassifier, LearnContext, LearnOutcome};
use crate::matcher::collector::{detect_fields, DetectedField};
use crate::matcher::confidence::Confidence;
use crate::matcher::identifier::MatchContext;
use crate::matcher::patterns::is_sensitive_key;
use crate::matcher::resolver::resolve;
use crate::matcher::site::{ManualMapping, SiteLearnedPatterns, SiteRegistry, DEFAULT_INPUT_SELECTORS};
use crate::profile::{ProfileData, ProfileStore, DEFAULT_PROFILE};

const PREVIEW_CHARS: usize = 18;

fn default_inputs() -> &'static SelectorList {
    static SELECTOR: OnceLock<SelectorList> = OnceLock::new();
    SELECTOR.get_or_init(|| SelectorList::from_parts(DEFAULT_INPUT_SELECTORS).unwrap())
}

fn form_like() -> &'static SelectorList {
    static SELECTOR: OnceLock<SelectorList> = OnceLock::new();
    SELECTOR.get_or_init(|| SelectorList::parse(r#"form, input, select, textarea, [role="form"]"#).unwrap())
}

// =============================================================================
// Page context
// =============================================================================

/// Host part of a URL, without credentials or port. Empty when the URL
/// does not parse or has no host.
pub fn hostname_of(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_owned))
        .unwrap_or_default()
}

/// `scheme://host[:port]` of a URL, `null` for opaque origins, empty when
/// the URL does not parse
pub fn origin_of(url: &str) -> String {
    Url::parse(url)
        .map(|u| u.origin().ascii_serialization())
        .unwrap_or_default()
}

/// Caches the controller reads on every scan
#[derive(Debug, Clone)]
pub struct PageContext {
    pub url: String,
    pub hostname: String,
    pub settings: Settings,
    pub profile: ProfileData,
    pub learned: SiteLearnedPatterns,
    pub disabled_sites: Vec<String>,
    pub locked_profiles: Vec<String>,
    pub profile_name: String,
}

impl PageContext {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            hostname: hostname_of(url),
            settings: Settings::default(),
            profile: ProfileData::seeded(),
            learned: SiteLearnedPatterns::new(),
            disabled_sites: Vec::new(),
            locked_profiles: Vec::new(),
            profile_name: DEFAULT_PROFILE.to_string(),
        }
    }

    pub fn set_url(&mut self, url: &str) {
        self.url = url.to_string();
        self.hostname = hostname_of(url);
    }

    /// Disabled entries match the hostname itself or any subdomain of it
    pub fn is_site_disabled(&self) -> bool {
        self.disabled_sites.iter().any(|site| {
            let site = site.trim().to_ascii_lowercase();
            !site.is_empty() && (self.hostname == site || self.hostname.ends_with(&format!(".{}", site)))
        })
    }

    pub fn is_profile_locked(&self) -> bool {
        self.locked_profiles.iter().any(|p| *p == self.profile_name)
    }

    /// Scanning and filling allowed on this page
    pub fn fill_active(&self) -> bool {
        self.settings.fill_active() && !self.is_site_disabled()
    }
}

/// Broadcast from the background context. Absent parts keep their value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileUpdate {
    pub form_data: Option<ProfileData>,
    pub settings: Option<Settings>,
    pub disabled_sites: Option<Vec<String>>,
    pub locked_profiles: Option<Vec<String>>,
    pub current_profile: Option<String>,
    pub site_learned_patterns: Option<SiteLearnedPatterns>,
}

// =============================================================================
// State, timers and events
// =============================================================================

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PageState {
    Idle,
    Scanning,
    FoundFields,
    NoFields,
    AwaitingConfirmation,
    Filling,
}

impl PageState {
    pub fn state_name(&self) -> &'static str {
        match self {
            PageState::Idle => "idle",
            PageState::Scanning => "scanning",
            PageState::FoundFields => "found_fields",
            PageState::NoFields => "no_fields",
            PageState::AwaitingConfirmation => "awaiting_confirmation",
            PageState::Filling => "filling",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScanReason {
    Initial,
    Retry,
    Mutation,
    UrlChange,
    Visibility,
    Manual,
}

#[derive(Debug, Clone, PartialEq)]
enum TimerKind {
    /// Scan wanted; the site wait (if any) starts when this fires
    ScanRequest { reason: ScanReason, epoch: u64, forced: bool },
    Scan { reason: ScanReason, epoch: u64, forced: bool },
    ConfirmationTimeout,
    Blur { element: NodeId },
    Learn { container: NodeId },
}

#[derive(Debug, Clone)]
struct Timer {
    id: u64,
    due_ms: u64,
    kind: TimerKind,
}

/// One fillable field as offered for confirmation
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FieldPreview {
    pub element: NodeId,
    pub field_key: String,
    pub category: String,
    /// `firstName` -> `First Name`
    pub display_name: String,
    pub value: String,
    /// Value shortened for display
    pub preview: String,
    pub confidence: Confidence,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationRequest {
    pub fields: Vec<FieldPreview>,
    /// A sensitive data type forced the confirmation
    pub sensitive: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DismissReason {
    Declined,
    Timeout,
    /// A forced scan replaced the pending confirmation
    Replaced,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScanStats {
    pub reason: ScanReason,
    pub fields_found: usize,
    pub fillable: usize,
    pub elapsed_us: u64,
}

/// Things the host should react to (render UI, persist, log)
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControllerEvent {
    ScanCompleted { stats: ScanStats },
    ScanSuppressed { reason: ScanReason },
    ConfirmationRequested { request: ConfirmationRequest },
    ConfirmationDismissed { reason: DismissReason },
    Filled { report: FillReport },
    Learned { outcome: LearnOutcome },
}

/// `first_name` / `firstName` -> `First Name`
pub fn format_field_name(name: &str) -> String {
    let mut spaced = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for c in name.chars() {
        if c == '_' {
            spaced.push(' ');
            prev_lower = false;
            continue;
        }
        if prev_lower && c.is_ascii_uppercase() {
            spaced.push(' ');
        }
        prev_lower = c.is_ascii_lowercase();
        spaced.push(c);
    }
    spaced
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn truncate(value: &str, max_chars: usize) -> String {
    if value.chars().count() > max_chars {
        let mut out: String = value.chars().take(max_chars).collect();
        out.push('…');
        out
    } else {
        value.to_string()
    }
}

// =============================================================================
// PageController
// =============================================================================

pub struct PageController {
    config: EngineConfig,
    ctx: PageContext,
    sites: SiteRegistry,
    dom: Dom,
    store: Box<dyn ProfileStore>,
    classifier: Option<Box<dyn FieldClassifier>>,
    state: PageState,
    started: bool,
    now_ms: u64,
    timers: Vec<Timer>,
    next_timer_id: u64,
    /// Navigation generation; retry timers from older generations are stale
    epoch: u64,
    retry_count: u32,
    debounce_timer: Option<u64>,
    confirmation_timer: Option<u64>,
    pending: Option<ConfirmationRequest>,
    detected: Vec<DetectedField>,
    ledger: AutofillLedger,
    events: Vec<ControllerEvent>,
    scan_count: usize,
    last_stats: Option<ScanStats>,
}

impl PageController {
    /// Controller for `url` with the profile loaded from `store`
    pub fn new(url: &str, dom: Dom, config: EngineConfig, store: Box<dyn ProfileStore>) -> Self {
        let mut ctx = PageContext::new(url);
        match store.get(&ctx.profile_name) {
            Ok(Some(profile)) => ctx.profile = profile,
            Ok(None) => {}
            Err(e) => console_error!("[FillCore] Error loading profile: {}", e),
        }
        Self {
            config,
            ctx,
            sites: SiteRegistry::builtin(),
            dom,
            store,
            classifier: None,
            state: PageState::Idle,
            started: false,
            now_ms: 0,
            timers: Vec::new(),
            next_timer_id: 0,
            epoch: 0,
            retry_count: 0,
            debounce_timer: None,
            confirmation_timer: None,
            pending: None,
            detected: Vec::new(),
            ledger: AutofillLedger::new(),
            events: Vec::new(),
            scan_count: 0,
            last_stats: None,
        }
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn state(&self) -> PageState {
        self.state
    }

    pub fn context(&self) -> &PageContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut PageContext {
        &mut self.ctx
    }

    pub fn dom(&self) -> &Dom {
        &self.dom
    }

    pub fn dom_mut(&mut self) -> &mut Dom {
        &mut self.dom
    }

    pub fn sites_mut(&mut self) -> &mut SiteRegistry {
        &mut self.sites
    }

    pub fn detected(&self) -> &[DetectedField] {
        &self.detected
    }

    pub fn pending_confirmation(&self) -> Option<&ConfirmationRequest> {
        self.pending.as_ref()
    }

    pub fn scan_count(&self) -> usize {
        self.scan_count
    }

    pub fn last_stats(&self) -> Option<&ScanStats> {
        self.last_stats.as_ref()
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    pub fn set_classifier(&mut self, classifier: Option<Box<dyn FieldClassifier>>) {
        self.classifier = classifier;
    }

    /// Drain events produced since the last call
    pub fn take_events(&mut self) -> Vec<ControllerEvent> {
        std::mem::take(&mut self.events)
    }

    // -------------------------------------------------------------------------
    // Timers
    // -------------------------------------------------------------------------

    fn schedule(&mut self, delay_ms: u64, kind: TimerKind) -> u64 {
        let id = self.next_timer_id;
        self.next_timer_id += 1;
        self.timers.push(Timer {
            id,
            due_ms: self.now_ms + delay_ms,
            kind,
        });
        id
    }

    fn cancel(&mut self, id: u64) {
        self.timers.retain(|t| t.id != id);
    }

    fn request_scan(&mut self, reason: ScanReason, delay_ms: u64, forced: bool) -> u64 {
        let epoch = self.epoch;
        self.schedule(delay_ms, TimerKind::ScanRequest { reason, epoch, forced })
    }

    /// Fire every timer due at or before `now_ms`, in due order, and return
    /// all events produced since the last drain
    pub fn advance(&mut self, now_ms: u64) -> Vec<ControllerEvent> {
        loop {
            let next = self
                .timers
                .iter()
                .enumerate()
                .filter(|(_, t)| t.due_ms <= now_ms)
                .min_by_key(|(_, t)| (t.due_ms, t.id))
                .map(|(i, _)| i);
            let Some(index) = next else { break };
            let timer = self.timers.remove(index);
            self.now_ms = self.now_ms.max(timer.due_ms);
            self.fire(timer);
        }
        self.now_ms = self.now_ms.max(now_ms);
        self.take_events()
    }

    fn fire(&mut self, timer: Timer) {
        match timer.kind {
            TimerKind::ScanRequest { reason, epoch, forced } => {
                if reason == ScanReason::Retry && epoch != self.epoch {
                    return;
                }
                if self.debounce_timer == Some(timer.id) {
                    self.debounce_timer = None;
                }
                let wait = self.site_wait_ms();
                if wait > 0 {
                    self.schedule(wait, TimerKind::Scan { reason, epoch, forced });
                } else {
                    self.run_scan(reason, forced);
                }
            }
            TimerKind::Scan { reason, epoch, forced } => {
                if reason == ScanReason::Retry && epoch != self.epoch {
                    return;
                }
                self.run_scan(reason, forced);
            }
            TimerKind::ConfirmationTimeout => {
                self.confirmation_timer = None;
                if self.state == PageState::AwaitingConfirmation {
                    self.dismiss(DismissReason::Timeout);
                }
            }
            TimerKind::Blur { element } => self.dom.blur(element),
            TimerKind::Learn { container } => {
                let classifier = self.classifier.take();
                let outcome = self.learn_now(container, classifier.as_deref());
                self.classifier = classifier;
                self.events.push(ControllerEvent::Learned { outcome });
            }
        }
    }

    fn site_wait_ms(&self) -> u64 {
        if !self.config.apply_site_wait {
            return 0;
        }
        self.sites
            .for_hostname(&self.ctx.hostname)
            .map(|site| site.wait_time_ms())
            .unwrap_or(0)
    }

    // -------------------------------------------------------------------------
    // Lifecycle entry points
    // -------------------------------------------------------------------------

    /// Arm the initial scan. Idempotent.
    pub fn start(&mut self, now_ms: u64) {
        self.now_ms = self.now_ms.max(now_ms);
        if self.started {
            return;
        }
        self.started = true;
        if self.ctx.fill_active() {
            self.request_scan(ScanReason::Initial, self.config.initial_scan_delay_ms, false);
        }
    }

    /// Replace the page model with a fresh snapshot of the same page.
    /// Autofill records and a pending confirmation follow their elements
    /// through the host keys.
    pub fn replace_dom(&mut self, dom: Dom) {
        let old = std::mem::replace(&mut self.dom, dom);
        let remap = |id: NodeId| old.host_key(id).and_then(|key| self.dom.find_by_host_key(key));
        let mut ledger = std::mem::take(&mut self.ledger);
        ledger.remap(&remap);
        if let Some(request) = self.pending.as_mut() {
            request.fields.retain_mut(|field| match remap(field.element) {
                Some(new) => {
                    field.element = new;
                    true
                }
                None => false,
            });
        }
        self.ledger = ledger;

        self.timers.retain_mut(|timer| {
            let node = match &mut timer.kind {
                TimerKind::Blur { element } => element,
                TimerKind::Learn { container } => container,
                _ => return true,
            };
            match remap(*node) {
                Some(new) => {
                    *node = new;
                    true
                }
                None => false,
            }
        });
        self.detected.clear();
    }

    /// Page actions recorded since the last drain, for the host to replay
    pub fn drain_actions(&mut self) -> Vec<DomAction> {
        self.dom.take_actions()
    }

    /// DOM nodes were added. Form-like additions re-arm a debounced scan
    /// (one pending timer, newest mutation wins). Returns whether a scan
    /// was scheduled.
    pub fn on_dom_mutation(&mut self, added: &[NodeId]) -> bool {
        if !self.ctx.fill_active() {
            return false;
        }
        let relevant = added.iter().any(|node| {
            form_like().matches(&self.dom, *node) || self.dom.query_selector(*node, form_like()).is_some()
        });
        if !relevant {
            return false;
        }
        if let Some(id) = self.debounce_timer.take() {
            self.cancel(id);
        }
        let id = self.request_scan(ScanReason::Mutation, self.config.mutation_debounce_ms, false);
        self.debounce_timer = Some(id);
        true
    }

    /// SPA navigation: new epoch, fresh retry budget, delayed scan
    pub fn on_url_change(&mut self, url: &str) {
        if url == self.ctx.url {
            return;
        }
        self.ctx.set_url(url);
        self.epoch += 1;
        self.retry_count = 0;
        if self.ctx.fill_active() {
            self.request_scan(ScanReason::UrlChange, self.config.url_change_delay_ms, false);
        }
    }

    pub fn on_visibility_change(&mut self, visible: bool) {
        if visible && self.ctx.fill_active() {
            self.request_scan(ScanReason::Visibility, self.config.visibility_delay_ms, false);
        }
    }

    /// Manual trigger: forced scan, replacing any pending confirmation
    pub fn trigger_fill(&mut self) -> Vec<ControllerEvent> {
        self.request_scan(ScanReason::Manual, 0, true);
        self.advance(self.now_ms)
    }

    /// Replace the caches with a background broadcast
    pub fn on_profile_updated(&mut self, update: ProfileUpdate) {
        if let Some(profile) = update.form_data {
            self.ctx.profile = profile;
        }
        if let Some(settings) = update.settings {
            self.ctx.settings = settings;
        }
        if let Some(sites) = update.disabled_sites {
            self.ctx.disabled_sites = sites;
        }
        if let Some(locked) = update.locked_profiles {
            self.ctx.locked_profiles = locked;
        }
        if let Some(name) = update.current_profile {
            self.ctx.profile_name = name;
        }
        if let Some(learned) = update.site_learned_patterns {
            self.ctx.learned = learned;
        }
    }

    // -------------------------------------------------------------------------
    // Scan
    // -------------------------------------------------------------------------

    fn run_scan(&mut self, reason: ScanReason, forced: bool) {
        if !self.ctx.fill_active() {
            self.state = PageState::Idle;
            return;
        }
        if self.state == PageState::AwaitingConfirmation {
            if !forced {
                self.events.push(ControllerEvent::ScanSuppressed { reason });
                return;
            }
            self.dismiss(DismissReason::Replaced);
        }

        self.state = PageState::Scanning;
        let started = instant::Instant::now();

        let site = self.sites.for_hostname(&self.ctx.hostname);
        let selector = site.map(|s| s.input_selector()).unwrap_or_else(|| default_inputs());
        let matcher = MatchContext {
            hostname: &self.ctx.hostname,
            site,
            learned: &self.ctx.learned,
            profile: &self.ctx.profile,
        };
        let fields = detect_fields(&matcher, &self.dom, selector);

        let fillable: Vec<FieldPreview> = fields
            .iter()
            .filter_map(|field| {
                let value = resolve(&field.field_key, &field.category, &self.ctx.profile)?;
                Some(FieldPreview {
                    element: field.element,
                    field_key: field.field_key.clone(),
                    category: field.category.clone(),
                    display_name: format_field_name(&field.field_key),
                    value: value.to_string(),
                    preview: truncate(value, PREVIEW_CHARS),
                    confidence: field.confidence,
                })
            })
            .collect();

        let stats = ScanStats {
            reason,
            fields_found: fields.len(),
            fillable: fillable.len(),
            elapsed_us: started.elapsed().as_micros() as u64,
        };
        self.detected = fields;
        self.scan_count += 1;
        self.last_stats = Some(stats.clone());
        self.events.push(ControllerEvent::ScanCompleted { stats });

        if self.detected.is_empty() {
            self.state = PageState::NoFields;
            if self.retry_count < self.config.max_retries {
                self.retry_count += 1;
                self.request_scan(ScanReason::Retry, self.config.retry_delay_ms, false);
            } else {
                self.state = PageState::Idle;
            }
            return;
        }

        self.state = PageState::FoundFields;
        if fillable.is_empty() {
            self.state = PageState::Idle;
            return;
        }

        let sensitive = fillable.iter().any(|f| is_sensitive_key(&f.field_key));
        let request = ConfirmationRequest {
            fields: fillable,
            sensitive,
        };
        if self.ctx.settings.show_confirmation || sensitive {
            self.state = PageState::AwaitingConfirmation;
            self.events.push(ControllerEvent::ConfirmationRequested {
                request: request.clone(),
            });
            self.pending = Some(request);
            let id = self.schedule(self.config.confirmation_timeout_ms, TimerKind::ConfirmationTimeout);
            self.confirmation_timer = Some(id);
        } else {
            self.fill_fields(request.fields);
        }
    }

    fn fill_fields(&mut self, fields: Vec<FieldPreview>) -> FillReport {
        self.state = PageState::Filling;
        let items: Vec<FillItem> = fields
            .into_iter()
            .map(|f| FillItem {
                element: f.element,
                value: f.value,
                field_key: f.field_key,
                category: f.category,
            })
            .collect();
        let report = fill_all(&mut self.dom, &mut self.ledger, &items);
        for element in report.filled_elements() {
            self.schedule(self.config.blur_delay_ms, TimerKind::Blur { element });
        }
        self.state = PageState::Idle;
        self.events.push(ControllerEvent::Filled { report: report.clone() });
        report
    }

    fn dismiss(&mut self, reason: DismissReason) {
        if let Some(id) = self.confirmation_timer.take() {
            self.cancel(id);
        }
        self.pending = None;
        self.state = PageState::Idle;
        self.events.push(ControllerEvent::ConfirmationDismissed { reason });
    }

    /// Fill the snapshot offered for confirmation
    pub fn accept_confirmation(&mut self) -> Option<FillReport> {
        if self.state != PageState::AwaitingConfirmation {
            return None;
        }
        if let Some(id) = self.confirmation_timer.take() {
            self.cancel(id);
        }
        let request = self.pending.take()?;
        Some(self.fill_fields(request.fields))
    }

    pub fn decline_confirmation(&mut self) {
        if self.state == PageState::AwaitingConfirmation {
            self.dismiss(DismissReason::Declined);
        }
    }

    // -------------------------------------------------------------------------
    // Learning
    // -------------------------------------------------------------------------

    /// Learn from `container` now, optionally with AI results. The outcome
    /// is returned, not queued as an event.
    pub fn learn_now(&mut self, container: NodeId, classifier: Option<&dyn FieldClassifier>) -> LearnOutcome {
        let learn_ctx = LearnContext {
            matcher: MatchContext {
                hostname: &self.ctx.hostname,
                site: self.sites.for_hostname(&self.ctx.hostname),
                learned: &self.ctx.learned,
                profile: &self.ctx.profile,
            },
            settings: &self.ctx.settings,
            profile_name: &self.ctx.profile_name,
            locked: self.ctx.is_profile_locked(),
        };
        let (outcome, updated) = learn_from_form(&learn_ctx, &self.dom, container, classifier, self.store.as_mut());
        if let Some(profile) = updated {
            self.ctx.profile = profile;
        }
        outcome
    }

    /// Form submit: learn immediately
    pub fn on_submit(&mut self, form: NodeId) -> LearnOutcome {
        let classifier = self.classifier.take();
        let outcome = self.learn_now(form, classifier.as_deref());
        self.classifier = classifier;
        outcome
    }

    /// Click anywhere; submit-like controls schedule learning of their
    /// container. Returns the container.
    pub fn on_click(&mut self, target: NodeId) -> Option<NodeId> {
        let container = container_for_click(&self.dom, target, self.config.nearest_form_hops)?;
        self.schedule(self.config.learn_delay_ms, TimerKind::Learn { container });
        Some(container)
    }

    /// Enter pressed in `target`
    pub fn on_enter_key(&mut self, target: NodeId) -> Option<NodeId> {
        let container = container_for_enter(&self.dom, target)?;
        self.schedule(self.config.learn_delay_ms, TimerKind::Learn { container });
        Some(container)
    }

    // -------------------------------------------------------------------------
    // Manual mapping and corrections
    // -------------------------------------------------------------------------

    /// Map `element` to `field_key` for this hostname. Returns the entry
    /// to persist, or `None` when the element has no id, name or placeholder.
    pub fn map_field(&mut self, element: NodeId, field_key: &str) -> Option<ManualMapping> {
        let element_key = SiteLearnedPatterns::normalized_key(&self.dom, element)?;
        let mapping = ManualMapping {
            hostname: self.ctx.hostname.clone(),
            element_key,
            field_key: field_key.to_string(),
        };
        self.ctx.learned.insert(mapping.clone());
        Some(mapping)
    }

    /// The user changed `element`; offer a correction if it was autofilled
    pub fn on_user_edit(&mut self, element: NodeId) -> Option<CorrectionPrompt> {
        self.ledger.on_user_edit(&self.dom, element)
    }

    pub fn on_node_removed(&mut self, node: NodeId) {
        self.dom.remove(node);
        self.ledger.prune(&self.dom);
    }

    pub fn ledger(&self) -> &AutofillLedger {
        &self.ledger
    }
}
