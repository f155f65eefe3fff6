//! Engine runtime - the single cooperative event loop
//!
//! One tokio task owns the `PlaybackResource` and every mounted player.
//! Callers talk to it through a cloneable `EngineHandle`; state changes
//! come back as `RuntimeEvent`s on a broadcast channel.
//!
//! Only code validation and URL resolution suspend. They run as spawned
//! tasks and re-enter the loop as completions carrying the ticket or
//! request that started them, so a late answer for an unmounted view or
//! a superseded session is dropped instead of applied.

use crate::channel::{AudioChannel, StatusUpdate};
use crate::controller::ResolutionRequest;
use crate::error::EngineError;
use crate::events::EngineEvent;
use crate::gate::{AccessState, ValidationTicket};
use crate::player::{ContentPlayer, PlayerSnapshot};
use crate::resource::PlaybackResource;
use crate::session::AccessSession;
use crate::status::StatusSync;
use crate::types::{Direction, EngineConfig, SeekTarget};
use marquee_core::{
    ActivationCodeValidator, CodeVerdict, ContentId, ContentItem, ContentRepository, CoreError,
    MediaUrlResolver,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, trace};

const COMMAND_BUFFER: usize = 64;

/// Identifies one mounted player view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViewId(u64);

impl ViewId {
    /// Numeric value
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "view-{}", self.0)
    }
}

/// Engine event tagged with the view that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeEvent {
    /// Originating view
    pub view: ViewId,
    /// Event
    pub event: EngineEvent,
}

/// External services the runtime calls
#[derive(Clone)]
pub struct Collaborators {
    /// Content lookup
    pub repository: Arc<dyn ContentRepository>,
    /// Activation code checks
    pub validator: Arc<dyn ActivationCodeValidator>,
    /// Lazy track URL lookup
    pub resolver: Arc<dyn MediaUrlResolver>,
}

impl Collaborators {
    /// Bundle three separate services
    pub fn new(
        repository: Arc<dyn ContentRepository>,
        validator: Arc<dyn ActivationCodeValidator>,
        resolver: Arc<dyn MediaUrlResolver>,
    ) -> Self {
        Self {
            repository,
            validator,
            resolver,
        }
    }

    /// Use one service for all three roles
    pub fn shared<S>(service: Arc<S>) -> Self
    where
        S: ContentRepository + ActivationCodeValidator + MediaUrlResolver + 'static,
    {
        Self {
            repository: service.clone(),
            validator: service.clone(),
            resolver: service,
        }
    }
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

type Reply<T> = oneshot::Sender<Result<T, EngineError>>;

enum Command {
    Mount {
        content: Arc<ContentItem>,
        reply: oneshot::Sender<ViewId>,
    },
    Evaluate {
        view: ViewId,
        reply: Reply<AccessState>,
    },
    SetCodeInput {
        view: ViewId,
        input: String,
        reply: Reply<()>,
    },
    SubmitCode {
        view: ViewId,
        code: String,
        reply: Reply<()>,
    },
    DismissDenial {
        view: ViewId,
        reply: Reply<()>,
    },
    StartPreview {
        view: ViewId,
        seconds: Option<u32>,
        reply: Reply<AccessSession>,
    },
    CancelPreview {
        view: ViewId,
        reply: Reply<()>,
    },
    TogglePlayPause {
        view: ViewId,
        reply: Reply<bool>,
    },
    Navigate {
        view: ViewId,
        direction: Direction,
        reply: Reply<usize>,
    },
    SkipTo {
        view: ViewId,
        index: usize,
        reply: Reply<usize>,
    },
    Seek {
        view: ViewId,
        target: SeekTarget,
        reply: Reply<Duration>,
    },
    SetAutoplay {
        view: ViewId,
        enabled: bool,
        reply: Reply<()>,
    },
    Snapshot {
        view: ViewId,
        reply: Reply<PlayerSnapshot>,
    },
    Unmount {
        view: ViewId,
        reply: Reply<()>,
    },
    PushStatus(StatusUpdate),
    Shutdown,
}

enum Completion {
    Validation {
        view: ViewId,
        ticket: ValidationTicket,
        outcome: Result<CodeVerdict, CoreError>,
    },
    Resolution {
        view: ViewId,
        request: ResolutionRequest,
        outcome: Result<String, CoreError>,
    },
}

/// Cloneable handle to a running engine
#[derive(Clone)]
pub struct EngineHandle {
    commands: mpsc::Sender<Command>,
    events: broadcast::Sender<RuntimeEvent>,
    repository: Arc<dyn ContentRepository>,
}

impl EngineHandle {
    /// Subscribe to engine events
    ///
    /// Only events published after the call are received.
    pub fn subscribe(&self) -> broadcast::Receiver<RuntimeEvent> {
        self.events.subscribe()
    }

    /// Fetch `content_id` and mount a player for it
    pub async fn mount(&self, content_id: &ContentId) -> Result<ViewId, EngineError> {
        let content = self.repository.fetch(content_id).await?;
        self.mount_item(content).await
    }

    /// Mount a player for an already fetched item
    pub async fn mount_item(&self, content: ContentItem) -> Result<ViewId, EngineError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Mount {
            content: Arc::new(content),
            reply,
        })
        .await?;
        rx.await.map_err(|_| EngineError::Closed)
    }

    /// Resolve the initial access mode
    pub async fn evaluate(&self, view: ViewId) -> Result<AccessState, EngineError> {
        self.request(|reply| Command::Evaluate { view, reply }).await
    }

    /// Update the code field text
    pub async fn set_code_input(&self, view: ViewId, input: impl Into<String>) -> Result<(), EngineError> {
        let input = input.into();
        self.request(|reply| Command::SetCodeInput { view, input, reply })
            .await
    }

    /// Submit an activation code
    ///
    /// Returns once validation has started; the outcome arrives as an
    /// `AccessStateChanged` event.
    pub async fn submit_code(&self, view: ViewId, code: impl Into<String>) -> Result<(), EngineError> {
        let code = code.into();
        self.request(|reply| Command::SubmitCode { view, code, reply })
            .await
    }

    /// Return from `Denied` to `Locked`
    pub async fn dismiss_denial(&self, view: ViewId) -> Result<(), EngineError> {
        self.request(|reply| Command::DismissDenial { view, reply })
            .await
    }

    /// Start a preview; `None` uses the configured length
    pub async fn start_preview(
        &self,
        view: ViewId,
        seconds: Option<u32>,
    ) -> Result<AccessSession, EngineError> {
        self.request(|reply| Command::StartPreview {
            view,
            seconds,
            reply,
        })
        .await
    }

    /// Cancel the running preview
    pub async fn cancel_preview(&self, view: ViewId) -> Result<(), EngineError> {
        self.request(|reply| Command::CancelPreview { view, reply })
            .await
    }

    /// Toggle play/pause; returns the new playing flag
    pub async fn toggle_play_pause(&self, view: ViewId) -> Result<bool, EngineError> {
        self.request(|reply| Command::TogglePlayPause { view, reply })
            .await
    }

    /// Next track or slide
    pub async fn next(&self, view: ViewId) -> Result<usize, EngineError> {
        self.navigate(view, Direction::Forward).await
    }

    /// Previous track or slide
    pub async fn previous(&self, view: ViewId) -> Result<usize, EngineError> {
        self.navigate(view, Direction::Backward).await
    }

    /// Move one track or slide in `direction`
    pub async fn navigate(&self, view: ViewId, direction: Direction) -> Result<usize, EngineError> {
        self.request(|reply| Command::Navigate {
            view,
            direction,
            reply,
        })
        .await
    }

    /// Jump to a track
    pub async fn skip_to(&self, view: ViewId, index: usize) -> Result<usize, EngineError> {
        self.request(|reply| Command::SkipTo { view, index, reply })
            .await
    }

    /// Seek within the current track
    pub async fn seek(&self, view: ViewId, target: SeekTarget) -> Result<Duration, EngineError> {
        self.request(|reply| Command::Seek {
            view,
            target,
            reply,
        })
        .await
    }

    /// Start or stop slideshow autoplay
    pub async fn set_autoplay(&self, view: ViewId, enabled: bool) -> Result<(), EngineError> {
        self.request(|reply| Command::SetAutoplay {
            view,
            enabled,
            reply,
        })
        .await
    }

    /// Current state of a view
    pub async fn snapshot(&self, view: ViewId) -> Result<PlayerSnapshot, EngineError> {
        self.request(|reply| Command::Snapshot { view, reply }).await
    }

    /// Tear a view down
    pub async fn unmount(&self, view: ViewId) -> Result<(), EngineError> {
        self.request(|reply| Command::Unmount { view, reply }).await
    }

    /// Forward a status push from a callback-driven platform channel
    pub async fn push_status(&self, update: StatusUpdate) -> Result<(), EngineError> {
        self.send(Command::PushStatus(update)).await
    }

    /// Unmount every view and stop the loop
    pub async fn shutdown(&self) -> Result<(), EngineError> {
        self.send(Command::Shutdown).await
    }

    async fn send(&self, command: Command) -> Result<(), EngineError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| EngineError::Closed)
    }

    async fn request<T>(&self, make: impl FnOnce(Reply<T>) -> Command) -> Result<T, EngineError> {
        let (reply, rx) = oneshot::channel();
        self.send(make(reply)).await?;
        rx.await.map_err(|_| EngineError::Closed)?
    }
}

impl fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineHandle")
            .field("closed", &self.commands.is_closed())
            .finish_non_exhaustive()
    }
}

/// The event loop
pub struct EngineRuntime {
    config: EngineConfig,
    resource: PlaybackResource,
    players: BTreeMap<ViewId, ContentPlayer>,
    sync: StatusSync,
    collaborators: Collaborators,
    next_view: u64,

    commands: mpsc::Receiver<Command>,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
    events: broadcast::Sender<RuntimeEvent>,
}

impl EngineRuntime {
    /// Spawn the loop on the current tokio runtime
    ///
    /// `channel` becomes the one playback channel every view shares.
    pub fn start(
        config: EngineConfig,
        channel: Box<dyn AudioChannel>,
        collaborators: Collaborators,
    ) -> (EngineHandle, JoinHandle<()>) {
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_BUFFER);
        let (events, _) = broadcast::channel(config.event_buffer.max(1));
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();

        let handle = EngineHandle {
            commands: commands_tx,
            events: events.clone(),
            repository: Arc::clone(&collaborators.repository),
        };

        let runtime = Self {
            config,
            resource: PlaybackResource::new(channel),
            players: BTreeMap::new(),
            sync: StatusSync::new(),
            collaborators,
            next_view: 1,
            commands: commands_rx,
            completions_tx,
            completions_rx,
            events,
        };

        let task = tokio::spawn(runtime.run());
        (handle, task)
    }

    async fn run(mut self) {
        info!(
            preview_seconds = self.config.preview_seconds,
            tick_ms = self.config.tick_resolution_ms,
            "Engine runtime started"
        );

        let resolution = self.config.tick_resolution().max(Duration::from_millis(1));
        let mut heartbeat = tokio::time::interval(resolution);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_beat = Instant::now();

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle_command(command),
                },

                Some(completion) = self.completions_rx.recv() => {
                    self.handle_completion(completion);
                }

                now = heartbeat.tick() => {
                    let elapsed = now.saturating_duration_since(last_beat);
                    last_beat = now;
                    self.on_heartbeat(elapsed);
                }
            }
            self.settle();
        }

        self.shutdown();
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Mount { content, reply } => {
                let view = ViewId(self.next_view);
                self.next_view += 1;
                info!(%view, content = %content.id, kind = ?content.kind(), "Player mounted");
                self.players
                    .insert(view, ContentPlayer::new(content, self.config.clone()));
                let _ = reply.send(view);
            }
            Command::Evaluate { view, reply } => {
                let _ = reply.send(self.with_player(view, |p, r| Ok(p.evaluate(r))));
            }
            Command::SetCodeInput { view, input, reply } => {
                let _ = reply.send(self.with_player(view, |p, _| {
                    p.set_code_input(input);
                    Ok(())
                }));
            }
            Command::SubmitCode { view, code, reply } => {
                let started = self.with_player(view, |p, _| {
                    let (ticket, code) = p.begin_code_submission(&code)?;
                    Ok((ticket, code, p.content().id.clone()))
                });
                let _ = reply.send(started.map(|(ticket, code, content_id)| {
                    self.spawn_validation(view, ticket, code, content_id);
                }));
            }
            Command::DismissDenial { view, reply } => {
                let _ = reply.send(self.with_player(view, |p, _| {
                    p.dismiss_denial();
                    Ok(())
                }));
            }
            Command::StartPreview {
                view,
                seconds,
                reply,
            } => {
                let _ = reply.send(self.with_player(view, |p, r| Ok(p.start_preview(seconds, r)?)));
            }
            Command::CancelPreview { view, reply } => {
                let _ = reply.send(self.with_player(view, |p, r| Ok(p.cancel_preview(r)?)));
            }
            Command::TogglePlayPause { view, reply } => {
                let _ = reply.send(self.with_player(view, |p, r| Ok(p.toggle_play_pause(r)?)));
            }
            Command::Navigate {
                view,
                direction,
                reply,
            } => {
                let _ = reply.send(self.with_player(view, |p, r| Ok(p.navigate(direction, r)?)));
            }
            Command::SkipTo { view, index, reply } => {
                let _ = reply.send(self.with_player(view, |p, r| Ok(p.skip_to(index, r)?)));
            }
            Command::Seek {
                view,
                target,
                reply,
            } => {
                let _ = reply.send(self.with_player(view, |p, r| Ok(p.seek(target, r)?)));
            }
            Command::SetAutoplay {
                view,
                enabled,
                reply,
            } => {
                let _ = reply.send(self.with_player(view, |p, _| Ok(p.set_autoplay(enabled)?)));
            }
            Command::Snapshot { view, reply } => {
                let _ = reply.send(self.with_player(view, |p, _| Ok(p.snapshot())));
            }
            Command::Unmount { view, reply } => {
                let _ = reply.send(self.unmount(view));
            }
            Command::PushStatus(update) => self.route_status(&update),
            Command::Shutdown => {}
        }
    }

    fn handle_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Validation {
                view,
                ticket,
                outcome,
            } => match self.players.get_mut(&view) {
                Some(player) => {
                    player.complete_code_submission(ticket, outcome, &mut self.resource);
                }
                None => debug!(%view, "Validation finished for unmounted view, dropping"),
            },
            Completion::Resolution {
                view,
                request,
                outcome,
            } => match self.players.get_mut(&view) {
                Some(player) => {
                    player.apply_resolution(&request, outcome, &mut self.resource);
                }
                None => debug!(%view, "Resolution finished for unmounted view, dropping"),
            },
        }
    }

    fn on_heartbeat(&mut self, elapsed: Duration) {
        for player in self.players.values_mut() {
            player.advance_clock(elapsed, &mut self.resource);
        }
        for update in self.resource.poll_status(elapsed) {
            self.route_status(&update);
        }
    }

    fn route_status(&mut self, update: &StatusUpdate) {
        let recipient = self
            .players
            .values_mut()
            .find(|player| player.active_session() == Some(update.ticket.session));
        match recipient {
            Some(player) => {
                player.deliver_status(update, &mut self.sync, &mut self.resource);
            }
            None => self.sync.discard(update),
        }
    }

    /// Post-turn bookkeeping: stand down losers, start lookups, publish events
    fn settle(&mut self) {
        let owner = self.resource.owner();
        for player in self.players.values_mut() {
            if player.holds_channel() && player.active_session() != owner {
                player.notify_superseded();
            }
        }

        for (&view, player) in &mut self.players {
            if let Some(request) = player.take_pending_resolution() {
                let resolver = Arc::clone(&self.collaborators.resolver);
                let completions = self.completions_tx.clone();
                tokio::spawn(async move {
                    let outcome = resolver.resolve(&request.track_id).await;
                    let _ = completions.send(Completion::Resolution {
                        view,
                        request,
                        outcome,
                    });
                });
            }
            publish(&self.events, view, player.drain_events());
        }
    }

    fn spawn_validation(&self, view: ViewId, ticket: ValidationTicket, code: String, content_id: ContentId) {
        let validator = Arc::clone(&self.collaborators.validator);
        let completions = self.completions_tx.clone();
        tokio::spawn(async move {
            let outcome = validator.validate(&code, &content_id).await;
            let _ = completions.send(Completion::Validation {
                view,
                ticket,
                outcome,
            });
        });
    }

    fn with_player<T>(
        &mut self,
        view: ViewId,
        op: impl FnOnce(&mut ContentPlayer, &mut PlaybackResource) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        let player = self
            .players
            .get_mut(&view)
            .ok_or(EngineError::ViewNotFound(view.0))?;
        op(player, &mut self.resource)
    }

    fn unmount(&mut self, view: ViewId) -> Result<(), EngineError> {
        let mut player = self
            .players
            .remove(&view)
            .ok_or(EngineError::ViewNotFound(view.0))?;
        player.unmount(&mut self.resource);
        publish(&self.events, view, player.drain_events());
        info!(%view, "Player unmounted");
        Ok(())
    }

    fn shutdown(&mut self) {
        let views: Vec<ViewId> = self.players.keys().copied().collect();
        for view in views {
            let _ = self.unmount(view);
        }
        info!(
            applied = self.sync.applied(),
            discarded = self.sync.discarded(),
            "Engine runtime stopped"
        );
    }
}

impl fmt::Debug for EngineRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineRuntime")
            .field("resource", &self.resource)
            .field("views", &self.players.len())
            .finish_non_exhaustive()
    }
}

fn publish(events: &broadcast::Sender<RuntimeEvent>, view: ViewId, drained: Vec<EngineEvent>) {
    for event in drained {
        trace!(%view, ?event, "Publishing event");
        // No subscribers is fine; events are advisory
        let _ = events.send(RuntimeEvent { view, event });
    }
}
