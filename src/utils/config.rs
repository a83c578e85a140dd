//! Scenario configuration
//!
//! A scenario is a JSON file naming the tracking server and the entities to
//! simulate. Every field except the callsign and the motion source falls back
//! to the usual defaults (port 8087, 5 kph, 4 s steps, `a-f-G-U-C`).

use crate::core::{
    EntityIdentity, PlaybackConfig, RetryPolicy, ServerEndpoint, DEFAULT_COT_DIMENSION, DEFAULT_COT_IDENTITY,
    DEFAULT_MAX_TIME_STEP_SECS, DEFAULT_REPORT_TYPE, DEFAULT_SPEED_KPH, DEFAULT_STALE_MINUTES,
};
use crate::entity::{MotionSource, Player};
use crate::playback::{play_group, GroupLayout, Supervisor};
use crate::sink::SinkFactory;
use crate::validation::error::{SimError, SimResult};
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

fn default_speed_kph() -> f64 {
    DEFAULT_SPEED_KPH
}

fn default_max_time_step_secs() -> f64 {
    DEFAULT_MAX_TIME_STEP_SECS
}

fn default_report_type() -> String {
    DEFAULT_REPORT_TYPE.to_string()
}

fn default_cot_identity() -> String {
    DEFAULT_COT_IDENTITY.to_string()
}

fn default_cot_dimension() -> String {
    DEFAULT_COT_DIMENSION.to_string()
}

fn default_stale_minutes() -> u32 {
    DEFAULT_STALE_MINUTES
}

/// One simulated entity as written in a scenario file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityConfig {
    pub callsign: String,
    pub motion: MotionSource,
    #[serde(default = "default_speed_kph")]
    pub speed_kph: f64,
    #[serde(default = "default_max_time_step_secs")]
    pub max_time_step_secs: f64,
    #[serde(default = "default_report_type")]
    pub report_type: String,
    #[serde(default = "default_cot_identity")]
    pub cot_identity: String,
    #[serde(default = "default_cot_dimension")]
    pub cot_dimension: String,
    #[serde(default = "default_stale_minutes")]
    pub stale_minutes: u32,
    /// Fixed random seed; fresh entropy on every run when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(default)]
    pub retry: RetryPolicy,
    /// Play as a group of offset copies instead of a single entity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<GroupLayout>,
}

impl EntityConfig {
    /// Entity with default pacing and identity fields
    pub fn new(callsign: impl Into<String>, motion: MotionSource) -> Self {
        Self {
            callsign: callsign.into(),
            motion,
            speed_kph: DEFAULT_SPEED_KPH,
            max_time_step_secs: DEFAULT_MAX_TIME_STEP_SECS,
            report_type: default_report_type(),
            cot_identity: default_cot_identity(),
            cot_dimension: default_cot_dimension(),
            stale_minutes: DEFAULT_STALE_MINUTES,
            seed: None,
            retry: RetryPolicy::none(),
            group: None,
        }
    }

    pub fn with_group(mut self, group: GroupLayout) -> Self {
        self.group = Some(group);
        self
    }

    pub fn playback_config(&self) -> PlaybackConfig {
        PlaybackConfig::new(self.speed_kph, self.max_time_step_secs)
            .with_report_type(self.report_type.clone())
            .with_retry(self.retry)
    }

    /// Build the player; a new uid is generated on every call
    pub fn player(&self, server: &ServerEndpoint) -> Player {
        let identity = EntityIdentity::new(self.callsign.clone())
            .with_cot_identity(self.cot_identity.clone())
            .with_cot_dimension(self.cot_dimension.clone())
            .with_stale_minutes(self.stale_minutes);

        let player = Player::new(server.clone(), self.callsign.clone(), self.motion.clone())
            .with_identity(identity)
            .with_config(self.playback_config());
        match self.seed {
            Some(seed) => player.with_seed(seed),
            None => player,
        }
    }

    pub fn validate(&self, server: &ServerEndpoint) -> SimResult<()> {
        self.player(server).validate()?;
        if let Some(group) = &self.group {
            group.validate()?;
        }
        Ok(())
    }
}

/// Contents of a scenario file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub server: ServerEndpoint,
    #[serde(default)]
    pub entities: Vec<EntityConfig>,
}

impl ScenarioConfig {
    pub fn new(server: ServerEndpoint) -> Self {
        Self {
            server,
            entities: Vec::new(),
        }
    }

    /// Check the server, every entity, and callsign uniqueness
    pub fn validate(&self) -> SimResult<()> {
        self.server.validate()?;

        let mut callsigns = HashSet::new();
        for entity in &self.entities {
            entity.validate(&self.server)?;
            if !callsigns.insert(entity.callsign.as_str()) {
                return Err(SimError::configuration(
                    "callsign",
                    &entity.callsign,
                    "callsigns must be unique within a scenario",
                ));
            }
        }
        Ok(())
    }
}

/// A player ready to launch, alone or as a group
#[derive(Debug, Clone)]
pub struct EntityLaunch {
    pub player: Player,
    pub group: Option<GroupLayout>,
}

/// Loads, edits and saves scenario files
#[derive(Debug)]
pub struct ConfigurationManager {
    scenario: ScenarioConfig,
    config_file_path: Option<String>,
    is_modified: bool,
}

impl ConfigurationManager {
    pub fn new(server: ServerEndpoint) -> Self {
        Self {
            scenario: ScenarioConfig::new(server),
            config_file_path: None,
            is_modified: false,
        }
    }

    /// Create a manager from a scenario file
    pub fn from_file<P: AsRef<Path>>(path: P) -> SimResult<Self> {
        let scenario = Self::read(path.as_ref())?;
        Ok(Self {
            scenario,
            config_file_path: Some(path.as_ref().to_string_lossy().to_string()),
            is_modified: false,
        })
    }

    fn read(path: &Path) -> SimResult<ScenarioConfig> {
        let content = fs::read_to_string(path)?;
        let scenario: ScenarioConfig = serde_json::from_str(&content)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Replace the current scenario with the contents of `path`.
    ///
    /// Nothing changes if the file cannot be read or fails validation.
    pub fn load_from_file<P: AsRef<Path>>(&mut self, path: P) -> SimResult<()> {
        let scenario = Self::read(path.as_ref())?;
        info!(
            "Loaded scenario {} with {} entities",
            path.as_ref().display(),
            scenario.entities.len()
        );

        self.scenario = scenario;
        self.config_file_path = Some(path.as_ref().to_string_lossy().to_string());
        self.is_modified = false;
        Ok(())
    }

    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> SimResult<()> {
        let content = serde_json::to_string_pretty(&self.scenario)?;
        fs::write(&path, content)?;

        self.config_file_path = Some(path.as_ref().to_string_lossy().to_string());
        self.is_modified = false;
        Ok(())
    }

    /// Save to the file the scenario was loaded from or last saved to
    pub fn save(&mut self) -> SimResult<()> {
        match self.config_file_path.clone() {
            Some(path) => self.save_to_file(path),
            None => Err(SimError::configuration(
                "path",
                "<none>",
                "no file path set for saving the scenario",
            )),
        }
    }

    pub fn is_modified(&self) -> bool {
        self.is_modified
    }

    pub fn scenario(&self) -> &ScenarioConfig {
        &self.scenario
    }

    pub fn validate(&self) -> SimResult<()> {
        self.scenario.validate()
    }

    pub fn set_server(&mut self, server: ServerEndpoint) -> SimResult<()> {
        server.validate()?;
        self.scenario.server = server;
        self.is_modified = true;
        Ok(())
    }

    /// Add an entity, rejecting invalid settings and duplicate callsigns
    pub fn add_entity(&mut self, entity: EntityConfig) -> SimResult<()> {
        entity.validate(&self.scenario.server)?;
        if self.entity(&entity.callsign).is_some() {
            return Err(SimError::configuration(
                "callsign",
                &entity.callsign,
                "callsigns must be unique within a scenario",
            ));
        }

        self.scenario.entities.push(entity);
        self.is_modified = true;
        Ok(())
    }

    pub fn entity(&self, callsign: &str) -> Option<&EntityConfig> {
        self.scenario.entities.iter().find(|e| e.callsign == callsign)
    }

    pub fn remove_entity(&mut self, callsign: &str) -> Option<EntityConfig> {
        let index = self.scenario.entities.iter().position(|e| e.callsign == callsign)?;
        self.is_modified = true;
        Some(self.scenario.entities.remove(index))
    }

    /// Build a player for every entity, each with a fresh uid
    pub fn build_players(&self) -> SimResult<Vec<EntityLaunch>> {
        self.validate()?;
        Ok(self
            .scenario
            .entities
            .iter()
            .map(|entity| EntityLaunch {
                player: entity.player(&self.scenario.server),
                group: entity.group,
            })
            .collect())
    }

    /// Plan every entity, then start all of them under one supervisor.
    ///
    /// Nothing starts unless every route plans. If a worker cannot be
    /// started, the ones already running are shut down before returning.
    pub fn launch(&self, sink_factory: &SinkFactory) -> SimResult<Supervisor> {
        let planned = self
            .build_players()?
            .into_iter()
            .map(|launch| {
                let mut rng = launch.player.rng();
                let job = launch.player.job_with(&mut rng)?;
                Ok((job, launch.group, rng))
            })
            .collect::<SimResult<Vec<_>>>()?;

        let mut supervisor = Supervisor::new();
        for (job, group, mut rng) in planned {
            let callsign = job.identity.callsign.clone();
            let summary = format!("{} ({}) -> {} at {} kph", callsign, job.identity.uid, job.endpoint, job.config.speed_kph);
            let started = match group {
                Some(layout) => match play_group(&job, layout, sink_factory, &mut rng, supervisor.token()) {
                    Ok(handle) => {
                        supervisor.adopt_group(handle);
                        Ok(())
                    }
                    Err(e) => Err(e),
                },
                None => supervisor.spawn(job, sink_factory()).map(|_| ()),
            };

            if let Err(e) = started {
                error!("Failed to start {}: {}", callsign, e);
                supervisor.shutdown();
                return Err(e);
            }
            info!("{}", summary);
        }
        Ok(supervisor)
    }
}
