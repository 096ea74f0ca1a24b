//! # Clustering Extension
//!
//! Wires the pipeline together behind the two operations the host UI calls:
//! [`ClusteringExtension::set_layout_active`] (the toolbar toggle) and
//! [`ClusteringExtension::apply_layout`] (choosing a clustering attribute).
//!
//! Both bump a run counter the moment they are called and return a future.
//! A pipeline run remembers the counter it started with and gives up with
//! [`RunOutcome::Stale`] as soon as it sees the counter has moved on, so
//! only the most recent trigger ever registers a layout or starts an
//! animation.
//!
//! ## Usage
//!
//! ```no_run
//! use std::rc::Rc;
//! use cluster_layout::prelude::*;
//!
//! let scene = Rc::new(MemoryScene::new());
//! let extension = ClusteringExtension::new(scene, ClusterConfig::default());
//!
//! extension.subscribe(|event| println!("{:?}", event));
//! let outcome = pollster::block_on(extension.set_layout_active(true));
//! while extension.update(1.0 / 60.0) {}
//! ```

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::mem;
use std::rc::Rc;

use log::{debug, info, warn};

use super::traits::ViewerExtension;
use crate::animation::{AnimationController, AnimationState, TransitionEvent};
use crate::config::ClusterConfig;
use crate::error::Result;
use crate::host::{HostEvent, SceneHost};
use crate::pipeline::{BoundingBoxProvider, ClusterBuilder, LayoutEngine, RotationAligner};
use crate::scene::{SourceId, AABB};

type Listener = Box<dyn FnMut(&TransitionEvent)>;

/// How a layout trigger finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// A layout was computed and registered (and animated to when active)
    Applied { clusters: usize, shapes: usize },
    /// The scene is animating back to its original pose
    Restored,
    /// The requested state was already in effect
    Unchanged,
    /// A newer trigger superseded this one; its result was dropped
    Stale,
    /// Clustering cannot run on the current scene
    Unavailable { reason: String },
}

/// Whether the loaded scene supports clustering
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    Available,
    Unavailable { reason: String },
}

/// Orchestrates clustering, layout and the animated transition for a host
pub struct ClusteringExtension<H: SceneHost> {
    host: Rc<H>,
    config: ClusterConfig,
    builder: ClusterBuilder<H>,
    boxes: BoundingBoxProvider<H>,
    aligner: Option<RotationAligner<H>>,
    layout: LayoutEngine,
    animation: RefCell<AnimationController>,
    listeners: RefCell<Vec<Listener>>,
    run_counter: Cell<u64>,
    layout_active: Cell<bool>,
    attribute: RefCell<Option<String>>,
    regions: RefCell<Vec<(String, AABB)>>,
    loaded: Cell<bool>,
}

impl<H: SceneHost> ClusteringExtension<H> {
    pub const NAME: &'static str = "cluster-layout";

    pub fn new(host: Rc<H>, config: ClusterConfig) -> Self {
        let aligner = config
            .align_rotation
            .then(|| RotationAligner::new(host.clone()));

        Self {
            builder: ClusterBuilder::new(host.clone(), &config),
            boxes: BoundingBoxProvider::new(host.clone()),
            aligner,
            layout: LayoutEngine::new(&config),
            animation: RefCell::new(AnimationController::new(
                config.transition_duration,
                config.easing,
            )),
            listeners: RefCell::new(Vec::new()),
            run_counter: Cell::new(0),
            layout_active: Cell::new(false),
            attribute: RefCell::new(None),
            regions: RefCell::new(Vec::new()),
            loaded: Cell::new(false),
            host,
            config,
        }
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.get()
    }

    pub fn is_layout_active(&self) -> bool {
        self.layout_active.get()
    }

    /// Attribute of the most recent `apply_layout`, if any
    pub fn current_attribute(&self) -> Option<String> {
        self.attribute.borrow().clone()
    }

    /// Number of triggers issued so far
    pub fn run_count(&self) -> u64 {
        self.run_counter.get()
    }

    pub fn is_transitioning(&self) -> bool {
        self.animation.borrow().is_transitioning()
    }

    /// Names of the layouts registered with the animation controller
    pub fn state_names(&self) -> Vec<String> {
        self.animation
            .borrow()
            .state_names()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Layout registered for `attribute`, if one is still valid
    pub fn layout_state(&self, attribute: &str) -> Option<AnimationState> {
        self.animation.borrow().state(attribute).cloned()
    }

    /// Region each cluster occupies in the last applied layout, for labels
    pub fn cluster_regions(&self) -> Vec<(String, AABB)> {
        self.regions.borrow().clone()
    }

    /// Sources whose property database is loaded
    fn clusterable_sources(&self) -> Vec<SourceId> {
        self.host
            .sources()
            .into_iter()
            .filter(|source| self.host.has_property_db(*source))
            .collect()
    }

    pub fn availability(&self) -> Availability {
        if self.host.sources().is_empty() {
            return Availability::Unavailable {
                reason: "no model loaded".to_string(),
            };
        }
        if self.clusterable_sources().is_empty() {
            return Availability::Unavailable {
                reason: "no loaded model has a property database".to_string(),
            };
        }
        Availability::Available
    }

    /// Listen for transition start/end notifications
    pub fn subscribe(&self, listener: impl FnMut(&TransitionEvent) + 'static) {
        self.listeners.borrow_mut().push(Box::new(listener));
    }

    fn begin_run(&self) -> u64 {
        let run = self.run_counter.get() + 1;
        self.run_counter.set(run);
        run
    }

    fn is_stale(&self, run: u64) -> bool {
        self.run_counter.get() != run
    }

    /// Cluster the scene by `attribute` and register the result as a
    /// layout named after it; animate to it when the layout is active.
    ///
    /// The run counter advances when this is called, not when the future
    /// is first polled.
    pub fn apply_layout(&self, attribute: &str) -> impl Future<Output = Result<RunOutcome>> + '_ {
        let run = self.begin_run();
        let attribute = attribute.to_string();
        *self.attribute.borrow_mut() = Some(attribute.clone());
        debug!("run {} requested layout by `{}`", run, attribute);

        async move { self.run_pipeline(run, attribute).await }
    }

    /// Blocking convenience over [`Self::apply_layout`]
    pub fn apply_layout_blocking(&self, attribute: &str) -> Result<RunOutcome> {
        pollster::block_on(self.apply_layout(attribute))
    }

    /// Toggle between the clustered layout and the original pose.
    ///
    /// Activating reuses the layout registered for the current attribute
    /// when one is still valid and computes it otherwise. Deactivating
    /// cancels any run in flight and animates back to the original pose.
    pub fn set_layout_active(&self, active: bool) -> impl Future<Output = Result<RunOutcome>> + '_ {
        let unchanged = self.layout_active.get() == active;
        let run = if unchanged {
            self.run_counter.get()
        } else {
            self.begin_run()
        };
        self.layout_active.set(active);

        async move {
            if unchanged {
                return Ok(RunOutcome::Unchanged);
            }
            if self.is_stale(run) {
                debug!("toggle run {} superseded before it was polled", run);
                return Ok(RunOutcome::Stale);
            }
            if !active {
                self.animation.borrow_mut().animate_to(None)?;
                self.dispatch_events();
                info!("layout deactivated");
                return Ok(RunOutcome::Restored);
            }

            let attribute = self
                .current_attribute()
                .unwrap_or_else(|| self.config.default_attribute.clone());
            let registered = self.animation.borrow().state(&attribute).map(|s| s.len());
            match registered {
                Some(shapes) => {
                    self.animation.borrow_mut().animate_to(Some(&attribute))?;
                    self.dispatch_events();
                    info!("layout `{}` reactivated from cache", attribute);
                    Ok(RunOutcome::Applied {
                        clusters: self.regions.borrow().len(),
                        shapes,
                    })
                }
                None => self.run_pipeline(run, attribute).await,
            }
        }
    }

    async fn run_pipeline(&self, run: u64, attribute: String) -> Result<RunOutcome> {
        if self.is_stale(run) {
            return Ok(RunOutcome::Stale);
        }
        let sources = self.clusterable_sources();
        if sources.is_empty() {
            let reason = match self.availability() {
                Availability::Unavailable { reason } => reason,
                Availability::Available => "no clusterable source".to_string(),
            };
            warn!("clustering unavailable: {}", reason);
            self.layout_active.set(false);
            return Ok(RunOutcome::Unavailable { reason });
        }

        let built = self
            .builder
            .build(&sources, &attribute, self.config.expand_to_descendants)
            .await;
        if self.is_stale(run) {
            warn!("run {} by `{}` superseded, dropping result", run, attribute);
            return Ok(RunOutcome::Stale);
        }
        let clusters = match built {
            Ok(clusters) => clusters,
            Err(err) => {
                warn!("clustering by `{}` failed: {}", attribute, err);
                return Err(err);
            }
        };

        if let Some(aligner) = &self.aligner {
            for (source, angle) in aligner.compute_rotation(&sources) {
                self.boxes.set_rotation(source, Some(angle));
            }
        }

        let layout = self.layout.compute_layout(&clusters, &self.boxes)?;
        let shapes = layout.len();
        *self.regions.borrow_mut() = layout.cluster_bounds().to_vec();

        {
            let mut animation = self.animation.borrow_mut();
            animation.register_state(attribute.clone(), AnimationState::from(layout));
            if self.layout_active.get() {
                animation.animate_to(Some(&attribute))?;
            }
        }
        self.dispatch_events();

        info!(
            "layout by `{}`: {} clusters, {} shapes",
            attribute,
            clusters.len(),
            shapes
        );
        Ok(RunOutcome::Applied {
            clusters: clusters.len(),
            shapes,
        })
    }

    /// Advance the running transition and push transforms to the host.
    /// Returns `true` while frames are still needed.
    pub fn update(&self, delta_time: f32) -> bool {
        let running = self
            .animation
            .borrow_mut()
            .update(delta_time, self.host.as_ref());
        self.dispatch_events();
        running
    }

    /// Cancel everything and snap the scene back to its original pose
    pub fn reset(&self) {
        self.begin_run();
        self.layout_active.set(false);
        self.animation.borrow_mut().reset(self.host.as_ref());
        self.dispatch_events();
    }

    /// Drop caches and layouts that depend on the scene's contents
    pub fn handle_event(&self, event: HostEvent) {
        match event {
            HostEvent::ModelAdded(source) | HostEvent::ModelRemoved(source) => {
                debug!("{:?}: invalidating leaves and bounds", event);
                self.builder.resolver().invalidate(source);
                self.boxes.invalidate(source);
                self.discard_layouts();
            }
            HostEvent::VisibilityChanged(source) | HostEvent::IsolationChanged(source) => {
                debug!("{:?}: invalidating bounds", event);
                self.boxes.invalidate(source);
                self.discard_layouts();
            }
            HostEvent::SelectionChanged => {}
        }
    }

    fn discard_layouts(&self) {
        let mut animation = self.animation.borrow_mut();
        let names: Vec<String> = animation
            .state_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        for name in names {
            animation.remove_state(&name);
        }
        self.regions.borrow_mut().clear();
    }

    fn dispatch_events(&self) {
        let events = self.animation.borrow_mut().take_events();
        if events.is_empty() {
            return;
        }

        // Listeners may subscribe or trigger runs while being called
        let mut listeners = mem::take(&mut *self.listeners.borrow_mut());
        for event in &events {
            for listener in listeners.iter_mut() {
                listener(event);
            }
        }
        let mut slot = self.listeners.borrow_mut();
        listeners.append(&mut slot);
        *slot = listeners;
    }
}

impl<H: SceneHost> ViewerExtension for ClusteringExtension<H> {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn load(&self) -> bool {
        self.loaded.set(true);
        info!("{} loaded", Self::NAME);
        true
    }

    fn unload(&self) {
        self.reset();
        self.builder.resolver().clear();
        self.boxes.clear();
        self.discard_layouts();
        self.listeners.borrow_mut().clear();
        self.loaded.set(false);
        info!("{} unloaded", Self::NAME);
    }

    fn update(&self, delta_time: f32) -> bool {
        ClusteringExtension::update(self, delta_time)
    }

    fn on_host_event(&self, event: HostEvent) {
        self.handle_event(event);
    }
}
