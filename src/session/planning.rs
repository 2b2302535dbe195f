//! A single planning session: cameras in, sizing and assignment out.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::planner::{
    aggregate, derive_all, minimum_count, recommend, validate_cameras, validate_configuration,
    Assignment, AssignmentSession, AssignmentState, Calculations, CameraDefinition,
    CapacityResult, GatewayConfiguration, PlanError, Stream,
};

/// Everything the planner knows about one project's camera list.
#[derive(Debug, Clone)]
pub struct PlanningSession {
    pub id: String,
    pub cameras: Vec<CameraDefinition>,
    pub calculations: Calculations,
    pub recommendation: GatewayConfiguration,
    pub assignment: AssignmentSession,
    pub created_at: DateTime<Utc>,
}

impl PlanningSession {
    /// Size a validated camera list. Uses the recommendation unless an
    /// override is given, in which case the override must carry the load.
    pub fn new(
        id: String,
        cameras: Vec<CameraDefinition>,
        configuration: Option<GatewayConfiguration>,
    ) -> Result<Self, PlanError> {
        validate_cameras(&cameras)?;

        let streams = derive_all(&cameras);
        let calculations = aggregate(&streams);
        let recommendation = recommend(&calculations);

        let configuration = match configuration {
            Some(config) => {
                validate_configuration(&config, &calculations)?;
                config
            }
            None => recommendation,
        };

        Ok(Self {
            id,
            cameras,
            calculations,
            recommendation,
            assignment: AssignmentSession::new(streams, configuration),
            created_at: Utc::now(),
        })
    }

    /// Apply a user override. Rejected overrides leave the session as is.
    pub fn reconfigure(&mut self, configuration: GatewayConfiguration) -> Result<(), PlanError> {
        validate_configuration(&configuration, &self.calculations)?;
        self.assignment.reconfigure(configuration);
        Ok(())
    }

    /// Minimum unit count for the active type.
    pub fn minimum_count(&self) -> u32 {
        minimum_count(&self.calculations, &self.assignment.limits())
    }

    /// Build the export document. Only complete assignments export.
    pub fn export(&self, name: &str) -> Result<PlanExport, PlanError> {
        if name.trim().is_empty() {
            return Err(PlanError::InvalidInput("plan name cannot be empty".to_string()));
        }
        if !self.assignment.is_complete() {
            return Err(PlanError::Incomplete {
                unassigned: self.unassigned_ids(),
            });
        }

        Ok(PlanExport {
            name: name.trim().to_string(),
            cameras: self.cameras.clone(),
            configuration: self.assignment.configuration(),
            calculations: self.calculations,
            assignment: self.assignment.assignment().clone(),
            streams: self.assignment.streams().to_vec(),
            exported_at: Utc::now(),
        })
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            id: self.id.clone(),
            cameras: self.cameras.clone(),
            streams: self.assignment.streams().to_vec(),
            calculations: self.calculations,
            recommendation: self.recommendation,
            configuration: self.assignment.configuration(),
            minimum_count: self.minimum_count(),
            assignment: self.assignment.assignment().clone(),
            capacity: self.assignment.capacity(),
            state: self.assignment.state(),
            unassigned: self.unassigned_ids(),
            created_at: self.created_at,
        }
    }

    fn unassigned_ids(&self) -> Vec<String> {
        self.assignment
            .unassigned()
            .into_iter()
            .map(|s| s.id.clone())
            .collect()
    }
}

/// Snapshot of a session for clients.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub id: String,
    pub cameras: Vec<CameraDefinition>,
    pub streams: Vec<Stream>,
    pub calculations: Calculations,
    pub recommendation: GatewayConfiguration,
    pub configuration: GatewayConfiguration,
    pub minimum_count: u32,
    pub assignment: Assignment,
    pub capacity: Vec<CapacityResult>,
    pub state: AssignmentState,
    pub unassigned: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// The exported plan document.
#[derive(Debug, Clone, Serialize)]
pub struct PlanExport {
    pub name: String,
    pub cameras: Vec<CameraDefinition>,
    pub configuration: GatewayConfiguration,
    pub calculations: Calculations,
    pub assignment: Assignment,
    pub streams: Vec<Stream>,
    pub exported_at: DateTime<Utc>,
}
