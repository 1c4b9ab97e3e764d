//! Battle session orchestrator.
//!
//! [`BattleSession`] is the explicit context object for one battle on one
//! participant. It owns the shared world, the event bus, the readiness
//! barrier, the heartbeat monitor and the turn scheduler, and routes inbound
//! network messages to them.
use std::sync::Arc;
use std::time::Duration;

use battle_core::{ActionCatalogue, ActorId, CombatError, Origin, Pipeline, Resolution, World};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::{
    Gate, NetMessage, NullSink, ParticipantId, PresentationSink, Result, RuntimeError, Transport,
};
use crate::barrier::ReadinessBarrier;
use crate::config::RuntimeConfig;
use crate::context::{Arena, BattleContext};
use crate::events::{Event, EventBus, PhaseEvent, Topic};
use crate::heartbeat::HeartbeatMonitor;
use crate::scheduler::{GameStatus, PhaseReport, Role, TurnContext, TurnScheduler};

type HostLostFallback = Arc<dyn Fn(Duration) + Send + Sync>;

pub struct BattleSession<W> {
    ctx: Arc<BattleContext<W>>,
    local: ParticipantId,
    /// Participant whose kicks a follower obeys.
    authority: ParticipantId,
    barrier: Arc<ReadinessBarrier>,
    heartbeat: Arc<HeartbeatMonitor>,
    scheduler: Arc<TurnScheduler<W>>,
    on_host_lost: HostLostFallback,
    shutdown: CancellationToken,
}

impl<W> BattleSession<W>
where
    W: World + Send + 'static,
{
    /// Create a new session builder
    pub fn builder() -> BattleSessionBuilder<W> {
        BattleSessionBuilder::new()
    }

    pub fn local(&self) -> ParticipantId {
        self.local
    }

    pub fn role(&self) -> Role {
        self.scheduler.role()
    }

    pub fn authority(&self) -> ParticipantId {
        self.authority
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.ctx.config
    }

    pub fn barrier(&self) -> &ReadinessBarrier {
        &self.barrier
    }

    pub fn heartbeat(&self) -> &HeartbeatMonitor {
        &self.heartbeat
    }

    pub fn scheduler(&self) -> &TurnScheduler<W> {
        &self.scheduler
    }

    /// Subscribe to events from a specific topic
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.ctx.bus.subscribe(topic)
    }

    /// Runs `f` against the world under the session lock.
    pub async fn with_world<R>(&self, f: impl FnOnce(&W) -> R) -> R {
        f(&self.ctx.arena.lock().await.world)
    }

    /// Mutable variant of [`with_world`](Self::with_world) for board setup.
    pub async fn with_world_mut<R>(&self, f: impl FnOnce(&mut W) -> R) -> R {
        f(&mut self.ctx.arena.lock().await.world)
    }

    /// Resolves a player action and replicates its stage intents.
    pub async fn use_ability(
        &self,
        actor: &ActorId,
        action_id: &str,
        target: Option<&ActorId>,
    ) -> Result<Resolution> {
        let action = self
            .ctx
            .catalogue
            .get(action_id)
            .ok_or_else(|| CombatError::UnknownAction(action_id.to_owned()))?;

        let resolution = {
            let mut arena = self.ctx.arena.lock().await;
            let Arena { world, rng } = &mut *arena;
            let mut pipeline = Pipeline::new(world, rng);
            pipeline.resolve(action, actor, Origin::PLAYER, target)?;
            pipeline.finish()
        };

        info!(
            target: "runtime::session",
            %actor,
            action = %action.id,
            events = resolution.events.len(),
            "ability used"
        );
        self.ctx.emit_combat(&resolution.events);
        self.ctx.schedule_removals(&resolution);
        for intent in resolution.stage_intents() {
            self.ctx
                .broadcast(NetMessage::AbilityUsed {
                    intent: intent.clone(),
                })
                .await;
        }
        Ok(resolution)
    }

    /// Runs the ally and hostile groups. See [`TurnScheduler::run_phase`].
    pub async fn run_enemy_phase(&self) -> Result<PhaseReport> {
        self.scheduler.run_phase().await
    }

    pub fn cancel_phase(&self) {
        self.scheduler.cancel();
    }

    pub fn turn_context(&self) -> TurnContext {
        self.scheduler.turn_context()
    }

    pub fn set_turn_context(&self, turn: TurnContext) {
        self.scheduler.set_turn_context(turn);
    }

    pub async fn status(&self) -> GameStatus {
        self.scheduler.status().await
    }

    pub async fn join(&self, participant: ParticipantId) {
        self.barrier.join(participant).await;
    }

    pub async fn leave(&self, participant: ParticipantId) -> Vec<Gate> {
        self.barrier.leave(participant).await
    }

    /// Removes `participant` and tells everyone. Only the authority kicks.
    pub async fn kick(&self, participant: ParticipantId) -> Result<Vec<Gate>> {
        if self.role() != Role::Authority {
            return Err(RuntimeError::NotAuthority("kick"));
        }
        info!(target: "runtime::session", %participant, "kicking participant");
        self.ctx.broadcast(NetMessage::Kick { participant }).await;
        Ok(self.barrier.leave(participant).await)
    }

    /// Signals that the local participant is ready at `gate`.
    ///
    /// The authority owns the barrier; followers forward the signal.
    pub async fn ready(&self, gate: Gate) -> bool {
        match self.role() {
            Role::Authority => self.barrier.ready(self.local, gate).await,
            Role::Follower => {
                self.ctx.broadcast(NetMessage::Ready { gate }).await;
                false
            }
        }
    }

    pub async fn request_countdown(&self, gate: Gate) -> bool {
        self.barrier.request_countdown(gate).await
    }

    pub async fn reset_readiness(&self) {
        self.barrier.reset().await;
    }

    /// Routes one inbound message.
    pub async fn handle_inbound(&self, from: ParticipantId, message: NetMessage) -> Result<()> {
        debug!(target: "runtime::net", %from, kind = message.kind(), "inbound message");

        match message {
            NetMessage::Ready { gate } => match self.role() {
                Role::Authority => {
                    self.barrier.ready(from, gate).await;
                }
                Role::Follower => {
                    debug!(target: "runtime::net", %from, "ready ignored on follower");
                }
            },
            NetMessage::Kick { participant } => {
                // The authority kicks through `kick`; followers trust only it.
                if self.role() == Role::Authority || from != self.authority {
                    warn!(
                        target: "runtime::net",
                        %from,
                        %participant,
                        "kick from non-authority ignored"
                    );
                    return Ok(());
                }
                self.barrier.leave(participant).await;
                if participant == self.local {
                    warn!(target: "runtime::session", "kicked from session");
                    self.shutdown();
                }
            }
            NetMessage::AbilityUsed { intent } => {
                let resolution = {
                    let mut arena = self.ctx.arena.lock().await;
                    let Arena { world, rng } = &mut *arena;
                    let mut pipeline = Pipeline::new(world, rng);
                    pipeline.apply(intent.clone());
                    pipeline.finish()
                };
                self.ctx.emit_combat(&resolution.events);
                self.ctx.schedule_removals(&resolution);

                if self.role() == Role::Authority {
                    self.relay(from, NetMessage::AbilityUsed { intent }).await?;
                }
            }
            NetMessage::Heartbeat { .. } => self.heartbeat.record_ping(),
            NetMessage::TurnFinished { actor } => self.scheduler.notify_finished(&actor),
            NetMessage::BeginCountdown { gate } => {
                self.ctx
                    .bus
                    .publish(Event::Phase(PhaseEvent::CountdownStarted { gate }));
            }
            NetMessage::PhaseAdvance { gate } => {
                self.ctx
                    .bus
                    .publish(Event::Phase(PhaseEvent::Advance { gate }));
            }
        }
        Ok(())
    }

    /// Decodes and routes one inbound frame.
    pub async fn handle_frame(&self, from: ParticipantId, frame: &[u8]) -> Result<()> {
        let message = NetMessage::decode(frame)?;
        self.handle_inbound(from, message).await
    }

    /// Starts the heartbeat task for this participant's role.
    pub fn start_heartbeat(&self) -> JoinHandle<()> {
        let heartbeat = Arc::clone(&self.heartbeat);
        let token = self.shutdown.child_token();

        match self.role() {
            Role::Authority => {
                let transport = Arc::clone(&self.ctx.transport);
                tokio::spawn(async move {
                    heartbeat.run_authority(transport.as_ref(), token).await;
                })
            }
            Role::Follower => {
                let bus = self.ctx.bus.clone();
                let fallback = Arc::clone(&self.on_host_lost);
                tokio::spawn(async move {
                    let result = heartbeat
                        .run_follower(&bus, token, |silent_for| fallback(silent_for))
                        .await;
                    if let Err(error) = result {
                        info!(target: "runtime::heartbeat", %error, "heartbeat monitor stopped");
                    }
                })
            }
        }
    }

    /// Stops background tasks and any running phase.
    pub fn shutdown(&self) {
        self.scheduler.cancel();
        self.shutdown.cancel();
    }

    /// Forwards to every participant except the sender and ourselves.
    async fn relay(&self, from: ParticipantId, message: NetMessage) -> Result<()> {
        for participant in self.barrier.participants().await {
            if participant == from || participant == self.local {
                continue;
            }
            self.ctx
                .transport
                .send_to_one(participant, &message)
                .await
                .map_err(|error| {
                    warn!(target: "runtime::net", %participant, %error, "relay failed");
                    error
                })?;
        }
        Ok(())
    }
}

/// Builder for [`BattleSession`].
pub struct BattleSessionBuilder<W> {
    world: Option<W>,
    catalogue: Option<Arc<ActionCatalogue>>,
    transport: Option<Arc<dyn Transport>>,
    sink: Arc<dyn PresentationSink>,
    config: RuntimeConfig,
    role: Role,
    local: ParticipantId,
    authority: Option<ParticipantId>,
    turn: TurnContext,
    seed: Option<u64>,
    on_host_lost: Option<HostLostFallback>,
}

impl<W> BattleSessionBuilder<W>
where
    W: World + Send + 'static,
{
    fn new() -> Self {
        Self {
            world: None,
            catalogue: None,
            transport: None,
            sink: Arc::new(NullSink),
            config: RuntimeConfig::default(),
            role: Role::Authority,
            local: ParticipantId(0),
            authority: None,
            turn: TurnContext::default(),
            seed: None,
            on_host_lost: None,
        }
    }

    pub fn world(mut self, world: W) -> Self {
        self.world = Some(world);
        self
    }

    pub fn catalogue(mut self, catalogue: impl Into<Arc<ActionCatalogue>>) -> Self {
        self.catalogue = Some(catalogue.into());
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn sink(mut self, sink: Arc<dyn PresentationSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    pub fn local(mut self, local: ParticipantId) -> Self {
        self.local = local;
        self
    }

    /// Authority participant seen by a follower. Defaults to `ParticipantId(0)`;
    /// an authority session is always its own authority.
    pub fn authority(mut self, authority: ParticipantId) -> Self {
        self.authority = Some(authority);
        self
    }

    pub fn turn_context(mut self, turn: TurnContext) -> Self {
        self.turn = turn;
        self
    }

    /// Fixes the roll sequence; unseeded sessions draw from entropy.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Called once when a follower stops hearing from the authority.
    pub fn on_host_lost(mut self, fallback: impl Fn(Duration) + Send + Sync + 'static) -> Self {
        self.on_host_lost = Some(Arc::new(fallback));
        self
    }

    pub fn build(self) -> Result<BattleSession<W>> {
        let world = self.world.ok_or(RuntimeError::MissingCollaborator("world"))?;
        let catalogue = self
            .catalogue
            .ok_or(RuntimeError::MissingCollaborator("action catalogue"))?;
        let transport = self
            .transport
            .ok_or(RuntimeError::MissingCollaborator("transport"))?;

        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let bus = EventBus::with_capacity(self.config.event_buffer);
        let heartbeat = Arc::new(HeartbeatMonitor::from_config(&self.config));
        let barrier = Arc::new(ReadinessBarrier::new(bus.clone(), Arc::clone(&transport)));

        let ctx = Arc::new(BattleContext {
            arena: Mutex::new(Arena { world, rng }),
            catalogue,
            bus,
            sink: self.sink,
            transport,
            config: self.config,
        });
        let scheduler = Arc::new(TurnScheduler::new(Arc::clone(&ctx), self.role, self.turn));

        let on_host_lost: HostLostFallback = match self.on_host_lost {
            Some(fallback) => fallback,
            None => Arc::new(log_host_lost),
        };

        let authority = match self.role {
            Role::Authority => self.local,
            Role::Follower => self.authority.unwrap_or(ParticipantId(0)),
        };

        info!(
            target: "runtime::session",
            local = %self.local,
            %authority,
            role = ?self.role,
            actions = ctx.catalogue.len(),
            "battle session ready"
        );

        Ok(BattleSession {
            ctx,
            local: self.local,
            authority,
            barrier,
            heartbeat,
            scheduler,
            on_host_lost,
            shutdown: CancellationToken::new(),
        })
    }
}

fn log_host_lost(silent_for: Duration) {
    warn!(target: "runtime::heartbeat", ?silent_for, "host lost, no fallback installed");
}
